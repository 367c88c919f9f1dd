//! Implementation of `avrkit build --predefined`.

use crate::builder::{BuildContext, BuildError, CommandBuilder, ExternalToolError, Stage};
use crate::core::BuildConfiguration;

/// Ask the compiler for its predefined macros.
///
/// Returns the compiler's `#define` lines. No pipeline stage runs.
pub fn predefined_macros(
    ctx: &BuildContext,
    config: &BuildConfiguration,
) -> Result<String, BuildError> {
    let spec = CommandBuilder::new(ctx.paths(), config).predefined_macros();
    let output = ctx.run_tool(Stage::DumpMacros, &spec)?;

    if !output.success() {
        ctx.shell().tool_output(&output.stderr);
        return Err(ExternalToolError::failed(Stage::DumpMacros, &spec.program, &output).into());
    }

    Ok(output.stdout_lossy())
}
