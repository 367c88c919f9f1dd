//! Implementation of `avrkit build`.
//!
//! Input patterns are expanded into files, the files are grouped into
//! targets according to the entry mode, and each target goes through the
//! pipeline. The first failing target ends the run.

use std::path::PathBuf;

use crate::builder::{ArgumentError, BuildContext, BuildError, Pipeline, PipelineResult};
use crate::core::{BuildConfiguration, BuildTarget};
use crate::util::fs::glob_files;
use crate::util::shell::Status;

/// How resolved files are grouped into targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetMode {
    /// Every file is its own target
    #[default]
    PerFile,
    /// All files are linked into a single image
    LinkAll,
}

/// Options for the build command.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Input files or glob patterns, in order
    pub patterns: Vec<String>,

    /// Target grouping
    pub mode: TargetMode,
}

/// Result of a build run.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Number of source files that went through the pipeline
    pub files: usize,

    /// One result per target, in build order
    pub targets: Vec<PipelineResult>,
}

impl BuildReport {
    /// Whether no input matched at all.
    pub fn is_empty(&self) -> bool {
        self.files == 0
    }

    /// End-of-run summary line.
    pub fn summary(&self) -> String {
        processed_message(self.files)
    }
}

/// Expand input patterns into an ordered list of regular files.
///
/// Patterns are expanded independently and concatenated in pattern order.
/// A pattern that matches nothing contributes nothing.
pub fn resolve_inputs(patterns: &[String]) -> Result<Vec<PathBuf>, ArgumentError> {
    let mut files = Vec::new();

    for pattern in patterns {
        let matched = glob_files(pattern).map_err(|e| ArgumentError::InvalidPattern {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;
        tracing::debug!("pattern `{}` matched {} file(s)", pattern, matched.len());
        files.extend(matched);
    }

    Ok(files)
}

/// Group resolved files into build targets.
///
/// An explicit output basename is only valid for a single target: with
/// [`TargetMode::PerFile`] that means exactly one file.
pub fn plan_targets(
    files: Vec<PathBuf>,
    mode: TargetMode,
    output: Option<&str>,
) -> Result<Vec<BuildTarget>, ArgumentError> {
    match mode {
        TargetMode::PerFile => {
            if let Some(output) = output {
                if files.len() > 1 {
                    return Err(ArgumentError::OutputWithMultipleInputs {
                        output: output.to_string(),
                        count: files.len(),
                    });
                }
            }
            Ok(files
                .into_iter()
                .map(|file| BuildTarget::single(file, output))
                .collect())
        }
        TargetMode::LinkAll => Ok(BuildTarget::linked(files, output).into_iter().collect()),
    }
}

/// Resolve inputs and build every target.
///
/// Argument errors are raised before any stage runs.
pub fn build(
    ctx: &BuildContext,
    config: &BuildConfiguration,
    opts: &BuildOptions,
) -> Result<BuildReport, BuildError> {
    let files = resolve_inputs(&opts.patterns)?;
    let targets = plan_targets(files, opts.mode, config.output.as_deref())?;

    let mut report = BuildReport::default();
    if targets.is_empty() {
        return Ok(report);
    }

    let pipeline = Pipeline::new(ctx, config);
    for target in &targets {
        let result = pipeline.run(target).into_result()?;
        report.files += target.sources().len();
        report.targets.push(result);
    }

    ctx.shell().verbose(
        1,
        Status::Finished,
        format!("{} target(s) built", report.targets.len()),
    );

    Ok(report)
}

/// Plural-aware count message.
pub fn processed_message(count: usize) -> String {
    match count {
        0 => "No files compiled".to_string(),
        1 => "Processed 1 file".to_string(),
        n => format!("Processed {} files", n),
    }
}
