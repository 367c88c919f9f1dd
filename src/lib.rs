//! avrkit - build-pipeline and benchmark-matrix driver for AVR-GCC
//!
//! This crate provides the core library functionality for avrkit,
//! including toolchain resolution, stage command rendering, the per-target
//! pipeline and matrix expansion.

pub mod builder;
pub mod core;
pub mod ops;
pub mod util;

/// Test utilities and fakes for avrkit unit tests.
///
/// This module is only available when compiling with `--cfg test`. It provides
/// a recording command runner so pipelines can be exercised without a real
/// cross toolchain.
#[cfg(test)]
pub mod test_support;

pub use builder::{
    BuildContext, BuildError, CommandBuilder, CommandSpec, Pipeline, PipelineResult, Stage,
    ToolchainPaths,
};
pub use core::{BuildConfiguration, BuildTarget, OptLevel};
pub use util::config::Config;
