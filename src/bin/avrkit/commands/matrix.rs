//! `avrkit matrix` command

use anyhow::{bail, Result};

use crate::cli::{GlobalArgs, MatrixArgs};
use avrkit::builder::Tool;
use avrkit::ops::matrix::{kalman_time, preset, run_matrix, MatrixFile, MatrixOptions};

use super::{build_configuration, context, load_settings, print_debug, resolve_toolchain, shell, timeout};

pub fn execute(args: MatrixArgs, global: &GlobalArgs) -> Result<()> {
    let tools: &[Tool] = if global.verbose > 1 {
        &[Tool::Compiler, Tool::ObjCopy, Tool::Size]
    } else {
        &[Tool::Compiler, Tool::ObjCopy]
    };
    let paths = resolve_toolchain(&args.toolchain, tools)?;

    let settings = load_settings();
    let config = build_configuration(&args.compile, &settings, global)?;

    let matrix = match (&args.file, &args.preset) {
        (Some(file), _) => MatrixFile::load(file)?.into_matrix()?,
        (None, Some(name)) => preset(name)?,
        (None, None) => kalman_time(),
    };

    let shell = shell(global);
    print_debug(&shell, &paths, tools, &config);
    shell.debug(1, format!("Matrix: {} cells", matrix.len()));

    let ctx = context(paths, shell.clone(), timeout(&args.toolchain, &settings));
    let opts = MatrixOptions {
        patterns: args.inputs,
        jobs: args.jobs.or(settings.build.jobs),
    };

    let summary = run_matrix(&ctx, &config, &matrix, &opts)?;

    for failure in summary.failures() {
        if let Some(e) = failure.error() {
            shell.error(format!("{}: {}", failure.basename().display(), e));
        }
    }
    shell.report(summary.summary());

    if !summary.is_success() {
        bail!(
            "{} of {} matrix cells failed",
            summary.attempted() - summary.succeeded(),
            summary.attempted()
        );
    }

    Ok(())
}
