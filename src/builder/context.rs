//! Build context - toolchain, process runner, output and cancellation.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::builder::command::Stage;
use crate::builder::errors::ExternalToolError;
use crate::builder::toolchain::{CommandSpec, ToolchainPaths};
use crate::util::cancel::CancellationToken;
use crate::util::process::{CommandRunner, ExecError, ProcessOutput, SystemRunner};
use crate::util::shell::{Shell, Status};

/// Everything a pipeline needs besides the build configuration.
///
/// The toolchain paths are resolved once and only ever read afterwards; the
/// context is shared by reference between matrix cells.
#[derive(Clone)]
pub struct BuildContext {
    paths: ToolchainPaths,
    runner: Arc<dyn CommandRunner>,
    shell: Shell,
    cancel: CancellationToken,
}

impl fmt::Debug for BuildContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildContext")
            .field("paths", &self.paths)
            .field("shell", &self.shell)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl BuildContext {
    /// Create a context that runs tools on the host.
    pub fn new(paths: ToolchainPaths, shell: Shell, timeout: Option<Duration>) -> Self {
        let runner = SystemRunner::new().with_timeout(timeout);
        Self::with_runner(paths, shell, Arc::new(runner))
    }

    /// Create a context with a custom process runner.
    pub fn with_runner(paths: ToolchainPaths, shell: Shell, runner: Arc<dyn CommandRunner>) -> Self {
        BuildContext {
            paths,
            runner,
            shell,
            cancel: CancellationToken::new(),
        }
    }

    /// Share `cancel` with this context.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Resolved toolchain programs.
    pub fn paths(&self) -> &ToolchainPaths {
        &self.paths
    }

    /// Process runner.
    pub fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    /// Output shell.
    pub fn shell(&self) -> &Shell {
        &self.shell
    }

    /// Cancellation token.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Whether the user asked to stop.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Run one toolchain command to completion.
    ///
    /// The command line is logged, and echoed at debug level 2. A non-zero
    /// exit is returned as output; only failing to run the program is an
    /// error here.
    pub fn run_tool(&self, stage: Stage, spec: &CommandSpec) -> Result<ProcessOutput, ExternalToolError> {
        let command = spec.display_command();
        tracing::debug!(stage = %stage, "{}", command);
        if self.shell.debug_level() > 1 {
            self.shell.status(Status::Running, &command);
        }

        let program = spec.program.display().to_string();
        self.runner.run(&spec.to_process()).map_err(|e| match e {
            ExecError::Spawn { source, .. } | ExecError::Wait { source, .. } => {
                ExternalToolError::Spawn {
                    stage,
                    program,
                    source,
                }
            }
            ExecError::TimedOut { timeout, .. } => ExternalToolError::TimedOut {
                stage,
                program,
                timeout,
            },
        })
    }
}
