//! Per-target build pipeline.
//!
//! A target always goes through the same stages, strictly in order:
//!
//! ```text
//! Init -> CompileEach(Asm, Obj) -> LinkAll -> ExtractEep -> ExtractHex -> ReportSize -> Done
//! ```
//!
//! The Asm/Obj pair runs once per source file, in source order. The size
//! report only runs at verbosity 2 and above. The first failing stage ends
//! the target; nothing after it runs.

use std::path::{Path, PathBuf};

use crate::builder::command::{CommandBuilder, Stage};
use crate::builder::context::BuildContext;
use crate::builder::errors::{BuildError, ExternalToolError};
use crate::builder::toolchain::CommandSpec;
use crate::core::{BuildConfiguration, BuildTarget};
use crate::util::fs::ensure_parent_dir;
use crate::util::process::ProcessOutput;
use crate::util::shell::Status;

/// How a single stage ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    Succeeded,
    Failed { code: Option<i32> },
}

/// One executed stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageOutcome {
    pub stage: Stage,
    /// Main input of the stage (the source file for compile stages, the ELF or HEX otherwise)
    pub input: PathBuf,
    pub status: StageStatus,
}

/// Outcome of one target's run.
#[derive(Debug)]
pub struct PipelineResult {
    basename: PathBuf,
    outcomes: Vec<StageOutcome>,
    error: Option<BuildError>,
}

impl PipelineResult {
    /// Output basename of the target.
    pub fn basename(&self) -> &Path {
        &self.basename
    }

    /// Executed stages, in execution order.
    pub fn outcomes(&self) -> &[StageOutcome] {
        &self.outcomes
    }

    /// Executed stages, in execution order, without inputs.
    pub fn stages(&self) -> Vec<Stage> {
        self.outcomes.iter().map(|o| o.stage).collect()
    }

    /// Number of stages that were started.
    pub fn stage_count(&self) -> usize {
        self.outcomes.len()
    }

    /// Whether every executed stage succeeded.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// The error that stopped the target, if any.
    pub fn error(&self) -> Option<&BuildError> {
        self.error.as_ref()
    }

    /// Turn a failed run into its error.
    pub fn into_result(self) -> Result<PipelineResult, BuildError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(PipelineResult {
                basename: self.basename,
                outcomes: self.outcomes,
                error: None,
            }),
        }
    }
}

/// Runs the fixed stage sequence for targets sharing one configuration.
pub struct Pipeline<'a> {
    ctx: &'a BuildContext,
    commands: CommandBuilder<'a>,
}

impl<'a> Pipeline<'a> {
    /// Create a pipeline.
    pub fn new(ctx: &'a BuildContext, config: &'a BuildConfiguration) -> Self {
        Pipeline {
            ctx,
            commands: CommandBuilder::new(ctx.paths(), config),
        }
    }

    fn config(&self) -> &BuildConfiguration {
        self.commands.config()
    }

    /// Build one target.
    pub fn run(&self, target: &BuildTarget) -> PipelineResult {
        let shell = self.ctx.shell();
        if self.config().verbose > 0 {
            shell.status(
                Status::Building,
                format!(
                    "{} => {} .s/.o/.elf/.eep/.hex",
                    target.display_sources(),
                    target.basename().display()
                ),
            );
        }

        let mut outcomes = Vec::new();
        let error = self.run_stages(target, &mut outcomes).err();

        if let Some(ref e) = error {
            tracing::debug!("target {} stopped: {}", target.basename().display(), e);
        }

        PipelineResult {
            basename: target.basename().to_path_buf(),
            outcomes,
            error,
        }
    }

    fn run_stages(
        &self,
        target: &BuildTarget,
        outcomes: &mut Vec<StageOutcome>,
    ) -> Result<(), BuildError> {
        if self.ctx.is_cancelled() {
            return Err(BuildError::Cancelled {
                stage: Stage::CompileAssembly,
            });
        }
        self.prepare_output_dirs(target)?;

        for unit in target.units() {
            self.announce(Stage::CompileAssembly, &unit.source, &unit.asm());
            let spec = self.commands.compile_asm(unit);
            self.execute(Stage::CompileAssembly, &unit.source, &spec, outcomes)?;

            self.announce(Stage::CompileObject, &unit.source, &unit.object());
            let spec = self.commands.compile_obj(unit);
            self.execute(Stage::CompileObject, &unit.source, &spec, outcomes)?;
        }

        let elf = target.elf();
        let objects = target.objects();
        let first_object = objects.first().cloned().unwrap_or_default();
        self.announce(Stage::Link, &first_object, &elf);
        let spec = self.commands.link(target);
        self.execute(Stage::Link, &first_object, &spec, outcomes)?;

        self.announce(Stage::ExtractEeprom, &elf, &target.eep());
        let spec = self.commands.extract_eeprom(target);
        self.execute(Stage::ExtractEeprom, &elf, &spec, outcomes)?;

        self.announce(Stage::ExtractHex, &elf, &target.hex());
        let spec = self.commands.extract_hex(target);
        self.execute(Stage::ExtractHex, &elf, &spec, outcomes)?;

        if self.config().reports_size() {
            let hex = target.hex();
            if self.config().announces_stages() {
                self.ctx
                    .shell()
                    .status(Status::Size, format!("code and data sizes from {}", hex.display()));
            }
            let spec = self.commands.report_size(target);
            let output = self.execute(Stage::ReportSize, &hex, &spec, outcomes)?;
            self.ctx.shell().report_raw(&output.stdout);
        }

        Ok(())
    }

    fn prepare_output_dirs(&self, target: &BuildTarget) -> Result<(), BuildError> {
        let bases = target
            .units()
            .iter()
            .map(|u| u.output_base.as_path())
            .chain(std::iter::once(target.basename()));

        for base in bases {
            ensure_parent_dir(base).map_err(|source| BuildError::OutputDir {
                path: base.parent().map(Path::to_path_buf).unwrap_or_default(),
                source,
            })?;
        }
        Ok(())
    }

    fn announce(&self, stage: Stage, input: &Path, output: &Path) {
        if !self.config().announces_stages() {
            return;
        }
        let status = match stage {
            Stage::CompileAssembly | Stage::CompileObject => Status::Compiling,
            Stage::Link => Status::Linking,
            Stage::ExtractEeprom | Stage::ExtractHex => Status::Extracting,
            Stage::ReportSize => Status::Size,
            Stage::DumpMacros | Stage::Upload => Status::Running,
        };
        self.ctx.shell().status(
            status,
            format!("{}: {} => {}", stage, input.display(), output.display()),
        );
    }

    /// Run one stage's command, recording its outcome.
    fn execute(
        &self,
        stage: Stage,
        input: &Path,
        spec: &CommandSpec,
        outcomes: &mut Vec<StageOutcome>,
    ) -> Result<ProcessOutput, BuildError> {
        if self.ctx.is_cancelled() {
            return Err(BuildError::Cancelled { stage });
        }

        let mut outcome = StageOutcome {
            stage,
            input: input.to_path_buf(),
            status: StageStatus::Failed { code: None },
        };

        let output = match self.ctx.run_tool(stage, spec) {
            Ok(output) => output,
            Err(e) => {
                outcomes.push(outcome);
                return Err(e.into());
            }
        };

        if output.success() {
            outcome.status = StageStatus::Succeeded;
        } else {
            outcome.status = StageStatus::Failed { code: output.code };
        }
        outcomes.push(outcome);

        // Hidden diagnostics are still shown when they explain a failure
        let shell = self.ctx.shell();
        if stage.shows_diagnostics() || !output.success() {
            if stage != Stage::ReportSize {
                shell.tool_output(&output.stdout);
            }
            shell.tool_output(&output.stderr);
        } else if !output.stderr.is_empty() {
            tracing::trace!(stage = %stage, "{}", output.stderr_lossy());
        }

        if !output.success() {
            return Err(ExternalToolError::failed(stage, &spec.program, &output).into());
        }

        Ok(output)
    }
}
