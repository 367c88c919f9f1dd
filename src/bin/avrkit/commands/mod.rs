//! Command implementations

pub mod build;
pub mod matrix;
pub mod upload;

use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::cli::{CompileArgs, GlobalArgs, ToolchainArgs};
use avrkit::builder::{BuildContext, Tool, ToolchainPaths, ROOT_ENV_VAR};
use avrkit::core::{BuildConfiguration, OptLevel};
use avrkit::util::config::{global_config_path, load_config, project_config_path};
use avrkit::util::{CancellationToken, Config, Shell};

/// Resolve the toolchain root and check that `tools` are installed.
///
/// Runs before anything else so a missing root is reported before any
/// input file is looked at.
pub fn resolve_toolchain(args: &ToolchainArgs, tools: &[Tool]) -> Result<ToolchainPaths> {
    let paths = ToolchainPaths::from_root(args.toolchain_root.as_deref())?;
    paths.verify(tools)?;
    Ok(paths)
}

/// Load global and project configuration files.
pub fn load_settings() -> Config {
    let project_root = std::env::current_dir().unwrap_or_default();
    load_config(
        global_config_path().as_deref(),
        &project_config_path(&project_root),
    )
}

/// Layer command-line options over configuration files and built-ins.
pub fn build_configuration(
    args: &CompileArgs,
    settings: &Config,
    global: &GlobalArgs,
) -> Result<BuildConfiguration> {
    let mut config = settings.base_configuration();

    if let Some(ref opt) = args.opt {
        config.opt = opt
            .parse::<OptLevel>()
            .map_err(|e| anyhow!("invalid optimization level: {}", e))?;
    }
    if let Some(ref std) = args.std {
        config.std = std.clone();
    }
    if let Some(ref mcu) = args.mmcu {
        config.mcu = mcu.clone();
    }
    if let Some(ref fcpu) = args.fcpu {
        config.fcpu = fcpu.clone();
    }
    if args.numeric_type.is_some() {
        config.numeric_type = args.numeric_type.clone();
    }

    // Command-line definitions and paths follow the configured ones
    config.defines.extend(args.define.iter().cloned());
    config.include_dirs.extend(args.include.iter().cloned());

    config.output = args.output.clone();
    config.verbose = global.verbose;
    config.debug = global.debug;

    Ok(config)
}

/// Per-process timeout: command line, then configuration.
pub fn timeout(args: &ToolchainArgs, settings: &Config) -> Option<Duration> {
    args.timeout
        .or(settings.build.timeout_secs)
        .map(Duration::from_secs)
}

/// Shell for the global output options.
pub fn shell(global: &GlobalArgs) -> Shell {
    Shell::new(global.verbose, global.debug, global.color)
}

/// Build context that stops after the running stage on Ctrl-C.
pub fn context(paths: ToolchainPaths, shell: Shell, timeout: Option<Duration>) -> BuildContext {
    let cancel = CancellationToken::new();
    cancel.cancel_on_ctrlc();
    BuildContext::new(paths, shell, timeout).with_cancellation(cancel)
}

/// Print the environment, programs and options at debug level 1.
pub fn print_debug(shell: &Shell, paths: &ToolchainPaths, tools: &[Tool], config: &BuildConfiguration) {
    if shell.debug_level() == 0 {
        return;
    }

    shell.debug(
        1,
        format!("Environment: {}={}", ROOT_ENV_VAR, paths.root().display()),
    );
    for &tool in tools {
        shell.debug(1, format!("Program: {}", paths.path(tool).display()));
    }
    shell.debug(
        1,
        format!(
            "Options: -std={} -O{} -mmcu={} F_CPU_HZ={}",
            config.std,
            config.opt.as_str(),
            config.mcu,
            config.fcpu
        ),
    );
    if let Some(ref numeric_type) = config.numeric_type {
        shell.debug(1, format!("Numeric type: {}", numeric_type));
    }
    if !config.defines.is_empty() {
        shell.debug(1, format!("Defines: {}", config.defines.join(" ")));
    }
    for dir in &config.include_dirs {
        shell.debug(1, format!("Include: {}", dir.display()));
    }
}
