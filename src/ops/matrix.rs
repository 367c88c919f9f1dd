//! Implementation of `avrkit matrix`.
//!
//! A matrix is a list of dimensions, each an ordered list of
//! (value, name fragment) pairs. Every combination of one value per
//! dimension is a cell: its configuration is the base configuration with
//! each value applied, and its basename is the base name followed by the
//! fragments in dimension order.
//!
//! Cells are independent. One failing cell is recorded and the others still
//! run.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::builder::{
    ArgumentError, BuildContext, BuildError, ConfigurationError, Pipeline, PipelineResult,
};
use crate::core::{BuildConfiguration, BuildTarget, OptLevel};
use crate::ops::build::resolve_inputs;
use crate::util::shell::Status;

/// Name of the built-in benchmark matrix.
pub const KALMAN_TIME_PRESET: &str = "kalman-time";

/// All built-in presets.
pub const PRESETS: &[&str] = &[KALMAN_TIME_PRESET];

/// Default separator between basename fragments.
pub const DEFAULT_SEPARATOR: &str = "-";

/// Configuration field a dimension varies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Setting {
    /// Appends a preprocessor definition (`NAME` or `NAME=VALUE`)
    Define,
    /// Sets the `KE_NUMERIC_TYPE` value
    NumericType,
    /// Sets the optimization level
    Optimization,
    /// Sets the language standard
    Standard,
    /// Sets the target MCU
    Mcu,
    /// Sets the clock frequency
    Fcpu,
}

impl Setting {
    /// Derive a configuration with `value` applied.
    pub fn apply(&self, config: &BuildConfiguration, value: &str) -> Result<BuildConfiguration, String> {
        let config = match self {
            Setting::Define => config.with_define(value),
            Setting::NumericType => config.with_numeric_type(value),
            Setting::Optimization => {
                let opt: OptLevel = value.parse().map_err(|e| format!("{}", e))?;
                config.with_opt(opt)
            }
            Setting::Standard => config.with_std(value),
            Setting::Mcu => config.with_mcu(value),
            Setting::Fcpu => config.with_fcpu(value),
        };
        Ok(config)
    }
}

/// One value of a dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionValue {
    /// Value applied to the configuration
    pub value: String,
    /// Text added to the cell basename
    pub fragment: String,
}

/// A named axis of the matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dimension {
    pub name: String,
    pub setting: Setting,
    pub values: Vec<DimensionValue>,
}

impl Dimension {
    /// Create a dimension without values.
    pub fn new(name: impl Into<String>, setting: Setting) -> Self {
        Dimension {
            name: name.into(),
            setting,
            values: Vec::new(),
        }
    }

    /// Add a value with its basename fragment.
    pub fn value(mut self, value: impl Into<String>, fragment: impl Into<String>) -> Self {
        self.values.push(DimensionValue {
            value: value.into(),
            fragment: fragment.into(),
        });
        self
    }

    fn validate(&self) -> Result<(), ArgumentError> {
        if self.values.is_empty() {
            return Err(ArgumentError::EmptyDimension {
                dimension: self.name.clone(),
            });
        }

        let mut seen = HashSet::new();
        for v in &self.values {
            if !seen.insert(v.fragment.as_str()) {
                return Err(ArgumentError::DuplicateFragment {
                    dimension: self.name.clone(),
                    fragment: v.fragment.clone(),
                });
            }
            self.setting
                .apply(&BuildConfiguration::default(), &v.value)
                .map_err(|message| ArgumentError::InvalidDimensionValue {
                    dimension: self.name.clone(),
                    value: v.value.clone(),
                    message,
                })?;
        }

        Ok(())
    }
}

/// Every combination of one item per axis, first axis outermost.
///
/// Equivalent to nested loops in axis order. An empty axis list yields one
/// empty combination; any empty axis yields none.
pub fn cartesian_product<T: Clone>(axes: &[Vec<T>]) -> Vec<Vec<T>> {
    axes.iter().fold(vec![Vec::new()], |combos, axis| {
        combos
            .iter()
            .flat_map(|prefix| {
                axis.iter().map(move |item| {
                    let mut combo = prefix.clone();
                    combo.push(item.clone());
                    combo
                })
            })
            .collect()
    })
}

/// Builds a cell basename from the base name and the cell's fragments.
pub trait BasenameFormatter: Send + Sync {
    fn format(&self, base: &str, fragments: &[&str]) -> String;
}

/// Joins the base name and fragments with a fixed separator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinFormatter {
    separator: String,
}

impl JoinFormatter {
    pub fn new(separator: impl Into<String>) -> Self {
        JoinFormatter {
            separator: separator.into(),
        }
    }
}

impl Default for JoinFormatter {
    fn default() -> Self {
        JoinFormatter::new(DEFAULT_SEPARATOR)
    }
}

impl BasenameFormatter for JoinFormatter {
    fn format(&self, base: &str, fragments: &[&str]) -> String {
        let mut name = base.to_string();
        for fragment in fragments {
            name.push_str(&self.separator);
            name.push_str(fragment);
        }
        name
    }
}

/// One combination of dimension values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixCell {
    /// Output basename of the cell
    pub basename: String,
    /// Fragments, in dimension order
    pub fragments: Vec<String>,
    /// Configuration with every dimension value applied
    pub config: BuildConfiguration,
}

/// A validated set of dimensions.
pub struct Matrix {
    dimensions: Vec<Dimension>,
    formatter: Box<dyn BasenameFormatter>,
    basename: Option<String>,
}

impl std::fmt::Debug for Matrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Matrix")
            .field("dimensions", &self.dimensions)
            .field("basename", &self.basename)
            .finish()
    }
}

impl Matrix {
    /// Create a matrix, rejecting empty layouts and ambiguous fragments.
    pub fn new(dimensions: Vec<Dimension>) -> Result<Self, ArgumentError> {
        if dimensions.is_empty() {
            return Err(ArgumentError::NoDimensions);
        }
        for dimension in &dimensions {
            dimension.validate()?;
        }

        Ok(Matrix {
            dimensions,
            formatter: Box::new(JoinFormatter::default()),
            basename: None,
        })
    }

    /// Use a different basename formatter.
    pub fn with_formatter(mut self, formatter: impl BasenameFormatter + 'static) -> Self {
        self.formatter = Box::new(formatter);
        self
    }

    /// Default base name used when none is given on the command line.
    pub fn with_basename(mut self, basename: impl Into<String>) -> Self {
        self.basename = Some(basename.into());
        self
    }

    /// Base name from the matrix definition, if any.
    pub fn basename(&self) -> Option<&str> {
        self.basename.as_deref()
    }

    /// Dimensions, in declaration order.
    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.dimensions.iter().map(|d| d.values.len()).product()
    }

    /// Whether the matrix has no cells.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Expand into cells, in nested-loop order.
    pub fn cells(
        &self,
        base: &BuildConfiguration,
        base_name: &str,
    ) -> Result<Vec<MatrixCell>, ArgumentError> {
        let axes: Vec<Vec<(usize, &DimensionValue)>> = self
            .dimensions
            .iter()
            .enumerate()
            .map(|(i, d)| d.values.iter().map(|v| (i, v)).collect())
            .collect();

        let mut names = HashSet::new();
        let mut cells = Vec::with_capacity(self.len());

        for combo in cartesian_product(&axes) {
            let mut config = base.clone();
            for &(i, v) in &combo {
                let dimension = &self.dimensions[i];
                config = dimension.setting.apply(&config, &v.value).map_err(|message| {
                    ArgumentError::InvalidDimensionValue {
                        dimension: dimension.name.clone(),
                        value: v.value.clone(),
                        message,
                    }
                })?;
            }

            let fragments: Vec<&str> = combo.iter().map(|(_, v)| v.fragment.as_str()).collect();
            let basename = self.formatter.format(base_name, &fragments);
            if !names.insert(basename.clone()) {
                return Err(ArgumentError::DuplicateBasename { basename });
            }

            cells.push(MatrixCell {
                config: config.with_output(basename.clone()),
                basename,
                fragments: fragments.iter().map(|f| f.to_string()).collect(),
            });
        }

        Ok(cells)
    }
}

/// On-disk matrix definition.
///
/// ```toml
/// basename = "kalman-time-avr"
///
/// [[dimension]]
/// name = "numeric-type"
/// kind = "numeric-type"
/// value = [{ value = "double" }, { value = "fp32_t" }]
///
/// [[dimension]]
/// name = "optimization"
/// kind = "optimization"
/// value = [{ value = "Os" }, { value = "O2" }]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatrixFile {
    /// Base name for cell basenames
    #[serde(default)]
    pub basename: Option<String>,

    /// Separator between basename fragments
    #[serde(default)]
    pub separator: Option<String>,

    #[serde(default, rename = "dimension")]
    pub dimensions: Vec<DimensionSpec>,
}

/// One `[[dimension]]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DimensionSpec {
    pub name: String,
    pub kind: Setting,
    #[serde(default, rename = "value")]
    pub values: Vec<ValueSpec>,
}

/// One value of a `[[dimension]]`; the fragment defaults to the value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValueSpec {
    pub value: String,
    #[serde(default)]
    pub fragment: Option<String>,
}

impl MatrixFile {
    /// Load a matrix file.
    pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigurationError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|message| ConfigurationError::Malformed {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Parse matrix file contents.
    pub fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Validate into a [`Matrix`].
    pub fn into_matrix(self) -> Result<Matrix, ArgumentError> {
        let dimensions = self
            .dimensions
            .into_iter()
            .map(|spec| {
                spec.values
                    .into_iter()
                    .fold(Dimension::new(spec.name, spec.kind), |d, v| {
                        let fragment = v.fragment.unwrap_or_else(|| v.value.clone());
                        d.value(v.value, fragment)
                    })
            })
            .collect();

        let mut matrix = Matrix::new(dimensions)?;
        if let Some(separator) = self.separator {
            matrix = matrix.with_formatter(JoinFormatter::new(separator));
        }
        if let Some(basename) = self.basename {
            matrix = matrix.with_basename(basename);
        }
        Ok(matrix)
    }
}

/// The Kalman filter timing benchmark: numeric type, gain mode and
/// optimization level.
pub fn kalman_time() -> Matrix {
    let dimensions = vec![
        Dimension::new("numeric-type", Setting::NumericType)
            .value("double", "double")
            .value("fp32_t", "fp32_t"),
        Dimension::new("gain", Setting::Define)
            .value("KE_UPDATE_KALMAN_GAIN=0", "fixed")
            .value("KE_UPDATE_KALMAN_GAIN=1", "updating"),
        Dimension::new("optimization", Setting::Optimization)
            .value("Os", "Os")
            .value("O2", "O2"),
    ];

    Matrix {
        dimensions,
        formatter: Box::new(JoinFormatter::default()),
        basename: None,
    }
}

/// Look up a built-in matrix by name.
pub fn preset(name: &str) -> Result<Matrix, ArgumentError> {
    match name {
        KALMAN_TIME_PRESET => Ok(kalman_time()),
        _ => Err(ArgumentError::UnknownPreset {
            name: name.to_string(),
            available: PRESETS.join(", "),
        }),
    }
}

/// Options for the matrix command.
#[derive(Debug, Clone, Default)]
pub struct MatrixOptions {
    /// Input files or glob patterns; all matches form one target
    pub patterns: Vec<String>,

    /// Maximum number of cells built at once
    pub jobs: Option<usize>,
}

/// Aggregate outcome of a matrix run.
#[derive(Debug, Default)]
pub struct MatrixSummary {
    /// One result per cell, in cell order
    pub results: Vec<PipelineResult>,
}

impl MatrixSummary {
    /// Number of cells that were run.
    pub fn attempted(&self) -> usize {
        self.results.len()
    }

    /// Number of cells whose every stage succeeded.
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    /// Failed cells, in cell order.
    pub fn failures(&self) -> impl Iterator<Item = &PipelineResult> {
        self.results.iter().filter(|r| !r.is_success())
    }

    /// Whether every cell succeeded.
    pub fn is_success(&self) -> bool {
        self.succeeded() == self.attempted()
    }

    /// End-of-run summary line.
    pub fn summary(&self) -> String {
        let attempted = self.attempted();
        if attempted == 0 {
            return "No files compiled".to_string();
        }
        format!(
            "Built {} of {} matrix cell{}",
            self.succeeded(),
            attempted,
            if attempted == 1 { "" } else { "s" }
        )
    }
}

/// Build every cell of `matrix` over the resolved inputs.
///
/// Argument errors are raised before any cell runs. Cell failures are
/// collected in the summary.
pub fn run_matrix(
    ctx: &BuildContext,
    config: &BuildConfiguration,
    matrix: &Matrix,
    opts: &MatrixOptions,
) -> Result<MatrixSummary, BuildError> {
    let files = resolve_inputs(&opts.patterns)?;
    let output = config.output.as_deref().or(matrix.basename());
    let Some(target) = BuildTarget::linked(files, output) else {
        return Ok(MatrixSummary::default());
    };

    let base_name = target.basename().to_string_lossy().into_owned();
    let cells = matrix.cells(config, &base_name)?;
    tracing::debug!("matrix over {} expands to {} cells", base_name, cells.len());

    let progress = ctx
        .shell()
        .progress(cells.len() as u64, format!("Building {}", base_name));

    let run_cell = |cell: &MatrixCell| {
        let pipeline = Pipeline::new(ctx, &cell.config);
        let result = pipeline.run(&target.renamed(&cell.basename));
        progress.inc(1);
        result
    };

    let results: Vec<PipelineResult> = match build_pool(opts.jobs) {
        Ok(pool) => pool.install(|| cells.par_iter().map(run_cell).collect()),
        Err(e) => {
            tracing::warn!("failed to start build threads, building cells one at a time: {}", e);
            cells.iter().map(run_cell).collect()
        }
    };
    progress.finish();

    let summary = MatrixSummary { results };
    ctx.shell().verbose(1, Status::Finished, summary.summary());
    Ok(summary)
}

fn build_pool(jobs: Option<usize>) -> Result<rayon::ThreadPool, rayon::ThreadPoolBuildError> {
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(jobs) = jobs {
        builder = builder.num_threads(jobs.max(1));
    }
    builder.build()
}
