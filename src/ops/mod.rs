//! High-level operations.
//!
//! This module contains the implementation of avrkit commands.

pub mod build;
pub mod matrix;
pub mod predefined;
pub mod upload;

pub use build::{build, processed_message, resolve_inputs, BuildOptions, BuildReport, TargetMode};
pub use matrix::{
    cartesian_product, kalman_time, preset, run_matrix, BasenameFormatter, Dimension,
    DimensionValue, JoinFormatter, Matrix, MatrixCell, MatrixFile, MatrixOptions, MatrixSummary,
    Setting,
};
pub use predefined::predefined_macros;
pub use upload::upload;
