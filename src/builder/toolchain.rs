//! AVR-GCC toolchain resolution.
//!
//! Every program the pipeline runs lives at a fixed place under one
//! installation root:
//!
//! ```text
//! $AVR_GCC_ROOT/bin/avr-g++
//! $AVR_GCC_ROOT/bin/avr-objcopy
//! $AVR_GCC_ROOT/bin/avr-size
//! $AVR_GCC_ROOT/bin/avrdude
//! ```
//!
//! The root is resolved once at startup into an immutable [`ToolchainPaths`]
//! that is then shared by reference with everything that runs a tool.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::builder::errors::ConfigurationError;
use crate::util::process::ProcessBuilder;

/// Environment variable naming the toolchain installation root.
pub const ROOT_ENV_VAR: &str = "AVR_GCC_ROOT";

/// A program shipped with the toolchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    /// C++ compiler driver (`avr-g++`)
    Compiler,
    /// Object copy utility (`avr-objcopy`)
    ObjCopy,
    /// Size reporter (`avr-size`)
    Size,
    /// Device programmer (`avrdude`)
    Programmer,
}

impl Tool {
    /// All tools, in pipeline order of first use.
    pub const ALL: [Tool; 4] = [Tool::Compiler, Tool::ObjCopy, Tool::Size, Tool::Programmer];

    /// Executable name without platform suffix.
    pub fn program_name(&self) -> &'static str {
        match self {
            Tool::Compiler => "avr-g++",
            Tool::ObjCopy => "avr-objcopy",
            Tool::Size => "avr-size",
            Tool::Programmer => "avrdude",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program_name())
    }
}

/// Absolute locations of the toolchain programs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainPaths {
    root: PathBuf,
    compiler: PathBuf,
    objcopy: PathBuf,
    size: PathBuf,
    programmer: PathBuf,
}

impl ToolchainPaths {
    /// Derive tool paths from the toolchain root.
    ///
    /// `None` and empty roots are configuration errors; no filesystem access
    /// happens here (see [`ToolchainPaths::verify`]).
    pub fn from_root(root: Option<&str>) -> Result<Self, ConfigurationError> {
        let root = root.ok_or(ConfigurationError::RootNotSet { var: ROOT_ENV_VAR })?;
        if root.trim().is_empty() {
            return Err(ConfigurationError::RootEmpty { var: ROOT_ENV_VAR });
        }

        let root = PathBuf::from(root);
        let bin = root.join("bin");
        let exe = |tool: Tool| bin.join(format!("{}{}", tool.program_name(), std::env::consts::EXE_SUFFIX));

        Ok(ToolchainPaths {
            compiler: exe(Tool::Compiler),
            objcopy: exe(Tool::ObjCopy),
            size: exe(Tool::Size),
            programmer: exe(Tool::Programmer),
            root,
        })
    }

    /// Fail fast if any of `tools` is missing on disk.
    pub fn verify(&self, tools: &[Tool]) -> Result<(), ConfigurationError> {
        for &tool in tools {
            let path = self.path(tool);
            if !path.is_file() {
                return Err(ConfigurationError::ToolMissing {
                    tool,
                    path: path.to_path_buf(),
                });
            }
        }
        Ok(())
    }

    /// Installation root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of one tool.
    pub fn path(&self, tool: Tool) -> &Path {
        match tool {
            Tool::Compiler => &self.compiler,
            Tool::ObjCopy => &self.objcopy,
            Tool::Size => &self.size,
            Tool::Programmer => &self.programmer,
        }
    }

    /// C++ compiler driver.
    pub fn compiler(&self) -> &Path {
        &self.compiler
    }

    /// Object copy utility.
    pub fn objcopy(&self) -> &Path {
        &self.objcopy
    }

    /// Size reporter.
    pub fn size(&self) -> &Path {
        &self.size
    }

    /// Device programmer.
    pub fn programmer(&self) -> &Path {
        &self.programmer
    }
}

/// A command to execute: program plus ordered arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// The program to run
    pub program: PathBuf,
    /// Command arguments
    pub args: Vec<String>,
    /// Data fed to standard input
    pub stdin: Option<Vec<u8>>,
}

impl CommandSpec {
    /// Create a new command spec.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        CommandSpec {
            program: program.into(),
            args: Vec::new(),
            stdin: None,
        }
    }

    /// Add an argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments.
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(|a| a.into()));
        self
    }

    /// Add a path argument.
    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.display().to_string())
    }

    /// Feed `data` to the program's standard input.
    pub fn stdin(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(data.into());
        self
    }

    /// Convert into a runnable process.
    pub fn to_process(&self) -> ProcessBuilder {
        let pb = ProcessBuilder::new(&self.program).args(&self.args);
        match &self.stdin {
            Some(data) => pb.stdin(data.clone()),
            None => pb,
        }
    }

    /// Render the command line for logs.
    pub fn display_command(&self) -> String {
        self.to_process().display_command()
    }
}
