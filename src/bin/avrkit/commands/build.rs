//! `avrkit build` command

use anyhow::Result;

use crate::cli::{BuildArgs, GlobalArgs};
use avrkit::builder::Tool;
use avrkit::ops::build::{build, BuildOptions, TargetMode};
use avrkit::ops::predefined::predefined_macros;

use super::{build_configuration, context, load_settings, print_debug, resolve_toolchain, shell, timeout};

pub fn execute(args: BuildArgs, global: &GlobalArgs) -> Result<()> {
    let tools: &[Tool] = if args.predefined {
        &[Tool::Compiler]
    } else if global.verbose > 1 {
        &[Tool::Compiler, Tool::ObjCopy, Tool::Size]
    } else {
        &[Tool::Compiler, Tool::ObjCopy]
    };
    let paths = resolve_toolchain(&args.toolchain, tools)?;

    let settings = load_settings();
    let config = build_configuration(&args.compile, &settings, global)?;
    let shell = shell(global);
    print_debug(&shell, &paths, tools, &config);

    let ctx = context(paths, shell.clone(), timeout(&args.toolchain, &settings));

    if args.predefined {
        let macros = predefined_macros(&ctx, &config)?;
        shell.report_raw(macros.as_bytes());
        return Ok(());
    }

    let opts = BuildOptions {
        patterns: args.inputs,
        mode: if args.link_all {
            TargetMode::LinkAll
        } else {
            TargetMode::PerFile
        },
    };

    let report = build(&ctx, &config, &opts)?;
    shell.report(report.summary());

    Ok(())
}
