//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use avrkit::util::ColorChoice;

/// avrkit - build AVR firmware with AVR-GCC, one target or a whole benchmark matrix
#[derive(Parser)]
#[command(name = "avrkit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile, link and extract images for each input (or list predefined macros)
    Build(BuildArgs),

    /// Build the inputs once per combination of matrix dimensions
    Matrix(MatrixArgs),

    /// Flash a .hex image into a device
    Upload(UploadArgs),
}

/// Output options shared by every command.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Report processing steps (-v targets, -vv sizes, -vvv every stage)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Report debug detail (-d environment and options, -dd command lines)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub debug: u8,

    /// Coloring: auto, always, never
    #[arg(long, value_name = "WHEN", default_value = "auto", global = true)]
    pub color: ColorChoice,
}

/// Where the toolchain lives and how long its programs may run.
#[derive(Args, Debug, Clone)]
pub struct ToolchainArgs {
    /// Root of the AVR-GCC installation
    #[arg(long, value_name = "DIR", env = "AVR_GCC_ROOT")]
    pub toolchain_root: Option<String>,

    /// Kill any toolchain program still running after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

/// Options that shape the compile and link commands.
#[derive(Args, Debug, Clone)]
pub struct CompileArgs {
    /// Preprocessor definition, e.g. -D KE_UPDATE_KALMAN_GAIN=0 (repeatable)
    #[arg(short = 'D', value_name = "DEF")]
    pub define: Vec<String>,

    /// Include search path (repeatable)
    #[arg(short = 'I', value_name = "DIR")]
    pub include: Vec<PathBuf>,

    /// Optimization level, e.g. 2, s, O2 or Os [default: 2]
    #[arg(short = 'O', value_name = "LEVEL")]
    pub opt: Option<String>,

    /// C++ language standard [default: c++17]
    #[arg(long, value_name = "STD")]
    pub std: Option<String>,

    /// Target MCU [default: atmega328p]
    #[arg(long, value_name = "MCU")]
    pub mmcu: Option<String>,

    /// CPU clock frequency in Hz [default: 16000000]
    #[arg(long, value_name = "HZ")]
    pub fcpu: Option<String>,

    /// Value of KE_NUMERIC_TYPE, e.g. double or fp32_t
    #[arg(long, value_name = "TYPE")]
    pub numeric_type: Option<String>,

    /// Output basename (only with a single input, or with --link-all)
    #[arg(short, long, value_name = "BASENAME")]
    pub output: Option<String>,
}

#[derive(Args)]
pub struct BuildArgs {
    /// Source files or glob patterns
    #[arg(value_name = "INPUT")]
    pub inputs: Vec<String>,

    /// Link all inputs into one image instead of one image per input
    #[arg(long)]
    pub link_all: bool,

    /// List the compiler's predefined macros instead of building
    #[arg(long)]
    pub predefined: bool,

    #[command(flatten)]
    pub compile: CompileArgs,

    #[command(flatten)]
    pub toolchain: ToolchainArgs,
}

#[derive(Args)]
pub struct MatrixArgs {
    /// Source files or glob patterns, linked into one image per cell
    #[arg(value_name = "INPUT", required = true)]
    pub inputs: Vec<String>,

    /// Built-in matrix to use [default: kalman-time]
    #[arg(long, value_name = "NAME", conflicts_with = "file")]
    pub preset: Option<String>,

    /// Matrix definition file
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Number of cells built at once [default: number of CPUs]
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,

    #[command(flatten)]
    pub compile: CompileArgs,

    #[command(flatten)]
    pub toolchain: ToolchainArgs,
}

#[derive(Args)]
pub struct UploadArgs {
    /// Intel HEX image to flash
    #[arg(value_name = "HEX")]
    pub hex: PathBuf,

    /// Target MCU [default: atmega328p]
    #[arg(long, value_name = "MCU")]
    pub mmcu: Option<String>,

    /// Programmer adapter [default: usbtiny]
    #[arg(short = 'c', long, value_name = "ID")]
    pub programmer: Option<String>,

    #[command(flatten)]
    pub toolchain: ToolchainArgs,
}
