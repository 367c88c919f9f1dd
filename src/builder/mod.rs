//! AVR-GCC build pipeline.
//!
//! This module resolves the cross toolchain, renders each stage's command
//! and runs the per-target stage sequence.

pub mod command;
pub mod context;
pub mod errors;
pub mod pipeline;
pub mod toolchain;

pub use command::{CommandBuilder, Stage};
pub use context::BuildContext;
pub use errors::{ArgumentError, BuildError, ConfigurationError, ErrorKind, ExternalToolError};
pub use pipeline::{Pipeline, PipelineResult, StageOutcome, StageStatus};
pub use toolchain::{CommandSpec, Tool, ToolchainPaths, ROOT_ENV_VAR};
