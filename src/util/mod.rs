//! Shared utilities

pub mod cancel;
pub mod config;
pub mod fs;
pub mod process;
pub mod shell;

pub use cancel::CancellationToken;
pub use config::Config;
pub use process::{CommandRunner, ExecError, ProcessBuilder, ProcessOutput, SystemRunner};
pub use shell::{ColorChoice, Shell, Status};
