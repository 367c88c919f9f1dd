//! Configuration file support for avrkit.
//!
//! avrkit supports two configuration file locations:
//! - Global: `~/.avrkit/config.toml` - User-wide defaults
//! - Project: `.avrkit/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config, and command-line
//! flags take precedence over both.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::{BuildConfiguration, OptLevel};

/// Default device-programmer adapter.
pub const DEFAULT_PROGRAMMER: &str = "usbtiny";

/// avrkit configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Build settings
    pub build: BuildConfig,

    /// Device-programming settings
    pub upload: UploadConfig,
}

/// Build-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Default C++ standard (e.g., "c++17")
    pub std: Option<String>,

    /// Default optimization level (e.g., "2" or "Os")
    pub opt: Option<OptLevel>,

    /// Default target MCU
    pub mcu: Option<String>,

    /// Default CPU clock frequency in Hz
    pub fcpu: Option<String>,

    /// Default numeric type for `KE_NUMERIC_TYPE`
    pub numeric_type: Option<String>,

    /// Preprocessor definitions placed before command-line definitions
    pub defines: Vec<String>,

    /// Include paths placed before command-line include paths
    pub include: Vec<PathBuf>,

    /// Matrix build parallelism (None = one job per logical CPU)
    pub jobs: Option<usize>,

    /// Per-process timeout in seconds
    pub timeout_secs: Option<u64>,
}

/// Device-programming configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Programmer adapter passed to avrdude as `-c`
    pub programmer: Option<String>,

    /// MCU passed to avrdude as `-p`
    pub mcu: Option<String>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.build.std.is_some() {
            self.build.std = other.build.std;
        }
        if other.build.opt.is_some() {
            self.build.opt = other.build.opt;
        }
        if other.build.mcu.is_some() {
            self.build.mcu = other.build.mcu;
        }
        if other.build.fcpu.is_some() {
            self.build.fcpu = other.build.fcpu;
        }
        if other.build.numeric_type.is_some() {
            self.build.numeric_type = other.build.numeric_type;
        }
        if !other.build.defines.is_empty() {
            self.build.defines = other.build.defines;
        }
        if !other.build.include.is_empty() {
            self.build.include = other.build.include;
        }
        if other.build.jobs.is_some() {
            self.build.jobs = other.build.jobs;
        }
        if other.build.timeout_secs.is_some() {
            self.build.timeout_secs = other.build.timeout_secs;
        }

        if other.upload.programmer.is_some() {
            self.upload.programmer = other.upload.programmer;
        }
        if other.upload.mcu.is_some() {
            self.upload.mcu = other.upload.mcu;
        }
    }

    /// Build configuration from the file settings layered over built-ins.
    pub fn base_configuration(&self) -> BuildConfiguration {
        let defaults = BuildConfiguration::default();
        BuildConfiguration {
            numeric_type: self.build.numeric_type.clone(),
            std: self.build.std.clone().unwrap_or(defaults.std),
            opt: self.build.opt.clone().unwrap_or(defaults.opt),
            mcu: self.build.mcu.clone().unwrap_or(defaults.mcu),
            fcpu: self.build.fcpu.clone().unwrap_or(defaults.fcpu),
            defines: self.build.defines.clone(),
            include_dirs: self.build.include.clone(),
            ..defaults
        }
    }

    /// Programmer adapter, falling back to the built-in default.
    pub fn programmer(&self) -> &str {
        self.upload.programmer.as_deref().unwrap_or(DEFAULT_PROGRAMMER)
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.avrkit/config.toml)
/// 2. Global config (~/.avrkit/config.toml)
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Config {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        if global_path.exists() {
            config.merge(Config::load_or_default(global_path));
        }
    }

    if project_path.exists() {
        config.merge(Config::load_or_default(project_path));
    }

    config
}

/// Get the global avrkit config directory (~/.avrkit).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".avrkit"))
}

/// Get the global config path (~/.avrkit/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (.avrkit/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".avrkit").join("config.toml")
}
