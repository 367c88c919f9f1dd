//! Stage command rendering.
//!
//! [`CommandBuilder`] turns a [`BuildConfiguration`] and a target's file
//! names into the exact program and argument list of each pipeline stage.
//! Rendering is pure: identical inputs always give identical commands.

use std::fmt;
use std::path::Path;

use crate::builder::toolchain::{CommandSpec, ToolchainPaths};
use crate::core::{BuildConfiguration, BuildTarget, CompileUnit, NUMERIC_TYPE_MACRO};

/// Flags shared by both compile stages.
const CXXFLAGS: &[&str] = &[
    "-Wall",
    "-fno-exceptions",
    "-ffunction-sections",
    "-fdata-sections",
    "-fno-threadsafe-statics",
    "-MMD",
];

/// Link flags: LTO plus dead-section garbage collection.
const LFLAGS: &[&str] = &["-flto", "-fuse-linker-plugin", "-Wl,--gc-sections"];

/// One step of a target's pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    /// Source to `.s`, for inspection only
    CompileAssembly,
    /// Source to `.o` with LTO
    CompileObject,
    /// All objects to `.elf`
    Link,
    /// `.eeprom` section to `.eep`
    ExtractEeprom,
    /// Program memory to `.hex`
    ExtractHex,
    /// Size report of the `.hex`
    ReportSize,
    /// Predefined macro dump, outside the pipeline
    DumpMacros,
    /// Device programming, outside the pipeline
    Upload,
}

impl Stage {
    /// All pipeline stages, in order.
    pub const ALL: [Stage; 6] = [
        Stage::CompileAssembly,
        Stage::CompileObject,
        Stage::Link,
        Stage::ExtractEeprom,
        Stage::ExtractHex,
        Stage::ReportSize,
    ];

    /// Human-readable stage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::CompileAssembly => "compile to assembly",
            Stage::CompileObject => "compile to object code",
            Stage::Link => "link to ELF",
            Stage::ExtractEeprom => "create .eep",
            Stage::ExtractHex => "create .hex",
            Stage::ReportSize => "print code and data sizes",
            Stage::DumpMacros => "list predefined macros",
            Stage::Upload => "upload to device",
        }
    }

    /// Whether the stage's diagnostics are shown to the user.
    ///
    /// The assembly listing is a by-product; its diagnostics would only
    /// duplicate those of the object compile.
    pub fn shows_diagnostics(&self) -> bool {
        !matches!(self, Stage::CompileAssembly)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Renders stage commands for one build configuration.
#[derive(Debug, Clone, Copy)]
pub struct CommandBuilder<'a> {
    paths: &'a ToolchainPaths,
    config: &'a BuildConfiguration,
}

impl<'a> CommandBuilder<'a> {
    /// Create a command builder.
    pub fn new(paths: &'a ToolchainPaths, config: &'a BuildConfiguration) -> Self {
        CommandBuilder { paths, config }
    }

    /// The configuration commands are rendered from.
    pub fn config(&self) -> &BuildConfiguration {
        self.config
    }

    /// Preprocessor and code-generation flags shared by both compile stages.
    ///
    /// Both stages render from this one list so the assembly listing always
    /// matches the object that gets linked.
    pub fn compile_flags(&self, lto: bool) -> Vec<String> {
        let config = self.config;
        let mut flags = vec![format!("-std={}", config.std), config.opt.as_flag()];

        flags.extend(CXXFLAGS.iter().map(|f| f.to_string()));
        if lto {
            flags.push("-flto".to_string());
        }

        flags.push(format!("-mmcu={}", config.mcu));
        flags.push("-DAVR".to_string());
        flags.push(format!("-DF_CPU_HZ={}", config.fcpu));

        if let Some(ref numeric_type) = config.numeric_type {
            flags.push(format!("-D{}={}", NUMERIC_TYPE_MACRO, numeric_type));
        }

        for define in &config.defines {
            flags.push(format!("-D{}", define));
        }

        for dir in &config.include_dirs {
            flags.push(format!("-I{}", dir.display()));
        }

        flags
    }

    /// Compile one source to an assembly listing (`U.s`).
    pub fn compile_asm(&self, unit: &CompileUnit) -> CommandSpec {
        CommandSpec::new(self.paths.compiler())
            .args(self.compile_flags(false))
            .args(["-S", "-o"])
            .path_arg(&unit.asm())
            .path_arg(&unit.source)
    }

    /// Compile one source to a link-time-optimizable object (`U.o`).
    pub fn compile_obj(&self, unit: &CompileUnit) -> CommandSpec {
        CommandSpec::new(self.paths.compiler())
            .args(self.compile_flags(true))
            .args(["-c", "-o"])
            .path_arg(&unit.object())
            .path_arg(&unit.source)
    }

    /// Link every object of the target into `B.elf`, with the math library.
    pub fn link(&self, target: &BuildTarget) -> CommandSpec {
        let mut cmd = CommandSpec::new(self.paths.compiler())
            .arg(self.config.opt.as_flag())
            .args(LFLAGS.iter().copied())
            .arg(format!("-mmcu={}", self.config.mcu))
            .arg("-o")
            .path_arg(&target.elf());

        for object in target.objects() {
            cmd = cmd.path_arg(&object);
        }

        cmd.arg("-lm")
    }

    /// Copy the `.eeprom` section into `B.eep`, rebased to address zero.
    ///
    /// Images without EEPROM data produce an empty `.eep` instead of a
    /// warning.
    pub fn extract_eeprom(&self, target: &BuildTarget) -> CommandSpec {
        CommandSpec::new(self.paths.objcopy())
            .args([
                "-O",
                "ihex",
                "-j",
                ".eeprom",
                "--set-section-flags=.eeprom=alloc,load",
                "--no-change-warnings",
                "--change-section-lma",
                ".eeprom=0",
            ])
            .path_arg(&target.elf())
            .path_arg(&target.eep())
    }

    /// Copy everything except EEPROM into the flashable `B.hex`.
    pub fn extract_hex(&self, target: &BuildTarget) -> CommandSpec {
        CommandSpec::new(self.paths.objcopy())
            .args(["-O", "ihex", "-R", ".eeprom"])
            .path_arg(&target.elf())
            .path_arg(&target.hex())
    }

    /// Report code and data sizes of `B.hex`.
    pub fn report_size(&self, target: &BuildTarget) -> CommandSpec {
        CommandSpec::new(self.paths.size()).path_arg(&target.hex())
    }

    /// Dump the compiler's predefined macros for the configured standard and MCU.
    pub fn predefined_macros(&self) -> CommandSpec {
        CommandSpec::new(self.paths.compiler())
            .arg(format!("-std={}", self.config.std))
            .arg(format!("-mmcu={}", self.config.mcu))
            .args(["-E", "-dM", "-x", "c++", "-"])
            .stdin(Vec::new())
    }

    /// Write `hex` to the device's program memory.
    pub fn upload(&self, hex: &Path, programmer: &str) -> CommandSpec {
        CommandSpec::new(self.paths.programmer())
            .arg("-v")
            .arg(format!("-p{}", self.config.mcu))
            .arg(format!("-c{}", programmer))
            .arg(format!("-Uflash:w:{}:i", hex.display()))
    }
}
