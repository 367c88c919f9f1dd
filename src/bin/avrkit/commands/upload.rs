//! `avrkit upload` command

use anyhow::Result;

use crate::cli::{GlobalArgs, UploadArgs};
use avrkit::builder::Tool;
use avrkit::ops::upload::upload;

use super::{context, load_settings, print_debug, resolve_toolchain, shell, timeout};

pub fn execute(args: UploadArgs, global: &GlobalArgs) -> Result<()> {
    let tools = &[Tool::Programmer];
    let paths = resolve_toolchain(&args.toolchain, tools)?;

    let settings = load_settings();
    let mut config = settings.base_configuration();
    if let Some(mcu) = args.mmcu.or_else(|| settings.upload.mcu.clone()) {
        config.mcu = mcu;
    }
    config.verbose = global.verbose;
    config.debug = global.debug;

    let programmer = args
        .programmer
        .unwrap_or_else(|| settings.programmer().to_string());

    let shell = shell(global);
    print_debug(&shell, &paths, tools, &config);
    shell.debug(1, format!("Programmer: {}", programmer));

    let ctx = context(paths, shell, timeout(&args.toolchain, &settings));
    upload(&ctx, &config, &args.hex, &programmer)?;

    Ok(())
}
