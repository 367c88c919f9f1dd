//! Build error types.
//!
//! Errors fall into four kinds:
//! - configuration problems (toolchain root, config files), fatal before any stage
//! - argument problems (flag combinations, patterns, matrix layout), fatal before any stage
//! - external tool failures, fatal to one target
//! - cancellation requested by the user

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::builder::command::Stage;
use crate::builder::toolchain::Tool;
use crate::util::process::ProcessOutput;

/// Problems with the environment or configuration files.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("expected environment variable '{var}' to be set to the root of AVR-GCC")]
    RootNotSet { var: &'static str },

    #[error("environment variable '{var}' is empty; expected the root of AVR-GCC")]
    RootEmpty { var: &'static str },

    #[error("{tool} not found at {} (check the AVR-GCC root)", path.display())]
    ToolMissing { tool: Tool, path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {}: {message}", path.display())]
    Malformed { path: PathBuf, message: String },
}

/// Invalid command-line input.
#[derive(Debug, Error)]
pub enum ArgumentError {
    #[error("cannot use option '--output {output}' with multiple input files ({count} matched)")]
    OutputWithMultipleInputs { output: String, count: usize },

    #[error("invalid input pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("matrix has no dimensions")]
    NoDimensions,

    #[error("matrix dimension '{dimension}' has no values")]
    EmptyDimension { dimension: String },

    #[error("matrix dimension '{dimension}' uses name fragment '{fragment}' more than once")]
    DuplicateFragment { dimension: String, fragment: String },

    #[error("matrix cells would share the output basename '{basename}'")]
    DuplicateBasename { basename: String },

    #[error("invalid value '{value}' in matrix dimension '{dimension}': {message}")]
    InvalidDimensionValue {
        dimension: String,
        value: String,
        message: String,
    },

    #[error("unknown matrix preset '{name}' (available: {available})")]
    UnknownPreset { name: String, available: String },

    #[error("no such file: {}", path.display())]
    NoSuchFile { path: PathBuf },
}

/// A toolchain program could not complete its stage.
#[derive(Debug, Error)]
pub enum ExternalToolError {
    #[error("{stage} failed: could not run `{program}`: {source}")]
    Spawn {
        stage: Stage,
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{stage} failed with {}", describe_code(*code))]
    Failed {
        stage: Stage,
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("{stage} timed out after {}s (`{program}` was killed)", timeout.as_secs())]
    TimedOut {
        stage: Stage,
        program: String,
        timeout: Duration,
    },
}

impl ExternalToolError {
    /// Error for a tool that ran but exited unsuccessfully.
    pub fn failed(stage: Stage, program: &Path, output: &ProcessOutput) -> Self {
        ExternalToolError::Failed {
            stage,
            program: program.display().to_string(),
            code: output.code,
            stderr: output.stderr_lossy(),
        }
    }

    /// Stage whose tool failed.
    pub fn stage(&self) -> Stage {
        match self {
            ExternalToolError::Spawn { stage, .. }
            | ExternalToolError::Failed { stage, .. }
            | ExternalToolError::TimedOut { stage, .. } => *stage,
        }
    }

    /// Exit code of the failed tool, if it exited normally.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ExternalToolError::Failed { code, .. } => *code,
            _ => None,
        }
    }
}

fn describe_code(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

/// Any error raised while planning or running a build.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Argument(#[from] ArgumentError),

    #[error(transparent)]
    ExternalTool(#[from] ExternalToolError),

    #[error("failed to create output directory {}: {source}", path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cancelled before {stage}")]
    Cancelled { stage: Stage },
}

/// Coarse classification of a [`BuildError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Argument,
    ExternalTool,
    Cancelled,
}

impl BuildError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            BuildError::Configuration(_) => ErrorKind::Configuration,
            BuildError::Argument(_) => ErrorKind::Argument,
            BuildError::ExternalTool(_) | BuildError::OutputDir { .. } => ErrorKind::ExternalTool,
            BuildError::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }

    /// Stage the error occurred in, if it happened while a target was running.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            BuildError::ExternalTool(e) => Some(e.stage()),
            BuildError::Cancelled { stage } => Some(*stage),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Configuration => "configuration error",
            ErrorKind::Argument => "argument error",
            ErrorKind::ExternalTool => "external tool error",
            ErrorKind::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_with_multiple_inputs_message() {
        let err: BuildError = ArgumentError::OutputWithMultipleInputs {
            output: "fw".to_string(),
            count: 2,
        }
        .into();

        assert_eq!(err.kind(), ErrorKind::Argument);
        assert_eq!(
            err.to_string(),
            "cannot use option '--output fw' with multiple input files (2 matched)"
        );
    }

    #[test]
    fn test_external_tool_error_names_stage_and_code() {
        let err: BuildError = ExternalToolError::Failed {
            stage: Stage::Link,
            program: "avr-g++".to_string(),
            code: Some(1),
            stderr: "undefined reference to `main'".to_string(),
        }
        .into();

        assert_eq!(err.kind(), ErrorKind::ExternalTool);
        assert_eq!(err.stage(), Some(Stage::Link));
        assert_eq!(err.to_string(), "link to ELF failed with exit code 1");
    }

    #[test]
    fn test_root_not_set_message() {
        let err: BuildError = ConfigurationError::RootNotSet { var: "AVR_GCC_ROOT" }.into();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("AVR_GCC_ROOT"));
        assert_eq!(err.stage(), None);
    }

    #[test]
    fn test_signal_termination_message() {
        let err = ExternalToolError::Failed {
            stage: Stage::CompileObject,
            program: "avr-g++".to_string(),
            code: None,
            stderr: String::new(),
        };
        assert_eq!(err.exit_code(), None);
        assert!(err.to_string().contains("terminated by signal"));
    }
}
