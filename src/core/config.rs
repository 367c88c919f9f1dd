//! Build configuration shared by every stage of a target's pipeline.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default optimization level (`-O2`).
pub const DEFAULT_OPT: &str = "2";

/// Default C++ language standard.
pub const DEFAULT_STD: &str = "c++17";

/// Default target MCU.
///
/// atmega328: avr5 - "Enhanced" devices with 16 KiB up to 64 KiB of program memory.
pub const DEFAULT_MCU: &str = "atmega328p";

/// Default CPU clock frequency in Hz.
pub const DEFAULT_FCPU: &str = "16000000";

/// Preprocessor macro that selects the numeric representation.
pub const NUMERIC_TYPE_MACRO: &str = "KE_NUMERIC_TYPE";

/// Optimization level passed to the compiler as `-O<level>`.
///
/// Both `2` and `O2` spellings are accepted; the stored value never carries
/// the leading `O`. A bare `O` is level `1`, as with gcc's `-O`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OptLevel(String);

impl OptLevel {
    /// Get the level without the `O` prefix (e.g., "2", "s").
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get the compiler flag (e.g., "-O2").
    pub fn as_flag(&self) -> String {
        format!("-O{}", self.0)
    }
}

impl Default for OptLevel {
    fn default() -> Self {
        OptLevel(DEFAULT_OPT.to_string())
    }
}

impl std::str::FromStr for OptLevel {
    type Err = OptLevelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let level = s.strip_prefix("-").unwrap_or(s);
        let level = match level.strip_prefix('O') {
            Some("") => "1",
            Some(rest) => rest,
            None => level,
        };

        if level.is_empty() || !level.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(OptLevelParseError(s.to_string()));
        }

        Ok(OptLevel(level.to_string()))
    }
}

impl TryFrom<String> for OptLevel {
    type Error = OptLevelParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OptLevel> for String {
    fn from(value: OptLevel) -> Self {
        value.0
    }
}

impl fmt::Display for OptLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "O{}", self.0)
    }
}

/// Error returned when parsing an invalid optimization level.
#[derive(Debug, Clone)]
pub struct OptLevelParseError(pub String);

impl fmt::Display for OptLevelParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid optimization level '{}', expected e.g. 0, 1, 2, 3, s or O2",
            self.0
        )
    }
}

impl std::error::Error for OptLevelParseError {}

/// Options that shape the compile and link commands of a build target.
///
/// A configuration is never mutated once a build starts; matrix cells derive
/// their own copies through the `with_*` methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfiguration {
    /// Value for `KE_NUMERIC_TYPE`, if any
    pub numeric_type: Option<String>,
    /// C++ language standard (e.g., "c++17")
    pub std: String,
    /// Optimization level
    pub opt: OptLevel,
    /// Target MCU (e.g., "atmega328p")
    pub mcu: String,
    /// Clock frequency in Hz, passed as `F_CPU_HZ`
    pub fcpu: String,
    /// Preprocessor definitions, in command-line order
    pub defines: Vec<String>,
    /// Include search paths, in command-line order
    pub include_dirs: Vec<PathBuf>,
    /// Processing-step verbosity (0-3)
    pub verbose: u8,
    /// Debug detail (0-2)
    pub debug: u8,
    /// Explicit output basename
    pub output: Option<String>,
}

impl Default for BuildConfiguration {
    fn default() -> Self {
        BuildConfiguration {
            numeric_type: None,
            std: DEFAULT_STD.to_string(),
            opt: OptLevel::default(),
            mcu: DEFAULT_MCU.to_string(),
            fcpu: DEFAULT_FCPU.to_string(),
            defines: Vec::new(),
            include_dirs: Vec::new(),
            verbose: 0,
            debug: 0,
            output: None,
        }
    }
}

impl BuildConfiguration {
    /// Copy with a different numeric type.
    pub fn with_numeric_type(&self, numeric_type: impl Into<String>) -> Self {
        BuildConfiguration {
            numeric_type: Some(numeric_type.into()),
            ..self.clone()
        }
    }

    /// Copy with a different optimization level.
    pub fn with_opt(&self, opt: OptLevel) -> Self {
        BuildConfiguration {
            opt,
            ..self.clone()
        }
    }

    /// Copy with a different language standard.
    pub fn with_std(&self, std: impl Into<String>) -> Self {
        BuildConfiguration {
            std: std.into(),
            ..self.clone()
        }
    }

    /// Copy with a different MCU.
    pub fn with_mcu(&self, mcu: impl Into<String>) -> Self {
        BuildConfiguration {
            mcu: mcu.into(),
            ..self.clone()
        }
    }

    /// Copy with a different clock frequency.
    pub fn with_fcpu(&self, fcpu: impl Into<String>) -> Self {
        BuildConfiguration {
            fcpu: fcpu.into(),
            ..self.clone()
        }
    }

    /// Copy with one more preprocessor definition appended.
    pub fn with_define(&self, define: impl Into<String>) -> Self {
        let mut config = self.clone();
        config.defines.push(define.into());
        config
    }

    /// Copy with an explicit output basename.
    pub fn with_output(&self, output: impl Into<String>) -> Self {
        BuildConfiguration {
            output: Some(output.into()),
            ..self.clone()
        }
    }

    /// Whether size reports should run.
    pub fn reports_size(&self) -> bool {
        self.verbose > 1
    }

    /// Whether each stage should be announced.
    pub fn announces_stages(&self) -> bool {
        self.verbose > 2
    }
}
