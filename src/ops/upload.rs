//! Implementation of `avrkit upload`.

use std::path::Path;

use crate::builder::{
    ArgumentError, BuildContext, BuildError, CommandBuilder, ExternalToolError, Stage,
};
use crate::core::BuildConfiguration;
use crate::util::shell::Status;

/// Flash `hex` into the program memory of the configured MCU.
///
/// The file must exist; the programmer's own output is forwarded as it
/// would be for any other stage.
pub fn upload(
    ctx: &BuildContext,
    config: &BuildConfiguration,
    hex: &Path,
    programmer: &str,
) -> Result<(), BuildError> {
    if !hex.is_file() {
        return Err(ArgumentError::NoSuchFile {
            path: hex.to_path_buf(),
        }
        .into());
    }
    if ctx.is_cancelled() {
        return Err(BuildError::Cancelled {
            stage: Stage::Upload,
        });
    }

    ctx.shell().verbose(
        1,
        Status::Uploading,
        format!("{} to {} via {}", hex.display(), config.mcu, programmer),
    );

    let spec = CommandBuilder::new(ctx.paths(), config).upload(hex, programmer);
    let output = ctx.run_tool(Stage::Upload, &spec)?;
    ctx.shell().tool_output(&output.stdout);
    ctx.shell().tool_output(&output.stderr);

    if !output.success() {
        return Err(ExternalToolError::failed(Stage::Upload, &spec.program, &output).into());
    }

    ctx.shell().status(Status::Uploaded, hex.display());
    Ok(())
}
