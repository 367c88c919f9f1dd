//! avrkit CLI - AVR-GCC build pipeline and benchmark matrix driver

use std::path::Path;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    // Set up logging; RUST_LOG wins over -d
    let level = match cli.global.debug {
        0 => "avrkit=warn",
        1 => "avrkit=debug",
        _ => "avrkit=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    if let Err(e) = run(cli) {
        eprintln!("{}: error: {}", program_name(), e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Build(args) => commands::build::execute(args, &cli.global),
        Commands::Matrix(args) => commands::matrix::execute(args, &cli.global),
        Commands::Upload(args) => commands::upload::execute(args, &cli.global),
    }
}

/// Basename of the invoked program, for error prefixes.
fn program_name() -> String {
    std::env::args_os()
        .next()
        .as_deref()
        .and_then(|arg0| Path::new(arg0).file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "avrkit".to_string())
}
