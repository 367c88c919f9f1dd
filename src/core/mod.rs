//! Core data structures for avrkit.
//!
//! This module contains the foundational types used throughout avrkit:
//! - Build configuration (standard, optimization, MCU, clock, defines, includes)
//! - Build targets and their per-source compile units

pub mod config;
pub mod target;

pub use config::{
    BuildConfiguration, OptLevel, DEFAULT_FCPU, DEFAULT_MCU, DEFAULT_OPT, DEFAULT_STD,
    NUMERIC_TYPE_MACRO,
};
pub use target::{BuildTarget, CompileUnit};
