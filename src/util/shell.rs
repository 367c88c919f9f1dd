//! Centralized shell output and progress management.
//!
//! The Shell module provides a unified API for all CLI output:
//! - Status messages with consistent formatting
//! - Verbosity (`-v`) and debug (`-d`) gating
//! - Pass-through of toolchain diagnostics
//! - Progress bars for matrix builds (via indicatif)

use std::fmt::Display;
use std::io::{self, IsTerminal, Write};

use indicatif::{ProgressBar, ProgressStyle};

/// Color output mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorChoice {
    /// Detect TTY and use colors if available.
    #[default]
    Auto,
    /// Always use ANSI colors.
    Always,
    /// Never use ANSI colors.
    Never,
}

impl std::str::FromStr for ColorChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(ColorChoice::Auto),
            "always" => Ok(ColorChoice::Always),
            "never" => Ok(ColorChoice::Never),
            _ => Err(format!(
                "invalid color choice '{}'; expected 'auto', 'always', or 'never'",
                s
            )),
        }
    }
}

/// Status types for output messages.
///
/// Shell handles all formatting - callers just specify the semantic status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    // Success statuses (green)
    Finished,
    Uploaded,

    // In-progress statuses (cyan)
    Building,
    Compiling,
    Linking,
    Extracting,
    Uploading,
    Running,

    // Info statuses (blue/default)
    Info,
    Size,

    // Error status (red)
    Error,
}

impl Status {
    /// Get the display text for this status.
    fn as_str(&self) -> &'static str {
        match self {
            Status::Finished => "Finished",
            Status::Uploaded => "Uploaded",
            Status::Building => "Building",
            Status::Compiling => "Compiling",
            Status::Linking => "Linking",
            Status::Extracting => "Extracting",
            Status::Uploading => "Uploading",
            Status::Running => "Running",
            Status::Info => "Info",
            Status::Size => "Size",
            Status::Error => "error",
        }
    }

    /// Get the ANSI color code for this status.
    fn color_code(&self) -> &'static str {
        match self {
            // Success: bold green
            Status::Finished | Status::Uploaded => "\x1b[1;32m",
            // In-progress: bold cyan
            Status::Building
            | Status::Compiling
            | Status::Linking
            | Status::Extracting
            | Status::Uploading
            | Status::Running => "\x1b[1;36m",
            // Info: bold blue
            Status::Info | Status::Size => "\x1b[1;34m",
            // Error: bold red
            Status::Error => "\x1b[1;31m",
        }
    }
}

/// Width of the right-aligned status column.
const STATUS_WIDTH: usize = 12;

/// Central shell for all CLI output.
#[derive(Debug, Clone)]
pub struct Shell {
    verbosity: u8,
    debug: u8,
    use_color: bool,
}

impl Shell {
    /// Create a new shell.
    ///
    /// `verbosity` counts `-v` flags (processing steps, 3 levels) and `debug`
    /// counts `-d` flags (debug detail, 2 levels).
    pub fn new(verbosity: u8, debug: u8, color: ColorChoice) -> Self {
        let use_color = match color {
            ColorChoice::Auto => io::stderr().is_terminal(),
            ColorChoice::Always => true,
            ColorChoice::Never => false,
        };

        Shell {
            verbosity,
            debug,
            use_color,
        }
    }

    /// Shell that prints nothing beyond errors and tool diagnostics.
    pub fn quiet() -> Self {
        Shell::new(0, 0, ColorChoice::Never)
    }

    /// Processing-step verbosity level.
    pub fn verbosity(&self) -> u8 {
        self.verbosity
    }

    /// Debug detail level.
    pub fn debug_level(&self) -> u8 {
        self.debug
    }

    /// Check if colors are enabled.
    pub fn use_color(&self) -> bool {
        self.use_color
    }

    /// Print a status message.
    ///
    /// Format: `{status:>12} {message}`
    pub fn status(&self, status: Status, msg: impl Display) {
        let prefix = self.format_status(status);
        eprintln!("{} {}", prefix, msg);
    }

    /// Print a status message if at least `level` `-v` flags were given.
    pub fn verbose(&self, level: u8, status: Status, msg: impl Display) {
        if self.verbosity >= level {
            self.status(status, msg);
        }
    }

    /// Print a debug line if at least `level` `-d` flags were given.
    pub fn debug(&self, level: u8, msg: impl Display) {
        if self.debug >= level {
            self.status(Status::Info, msg);
        }
    }

    /// Print an error message.
    pub fn error(&self, msg: impl Display) {
        self.status(Status::Error, msg);
    }

    /// Forward diagnostics captured from a toolchain program.
    pub fn tool_output(&self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        let mut stderr = io::stderr().lock();
        let _ = stderr.write_all(bytes);
        let _ = stderr.flush();
    }

    /// Print a report line on stdout.
    pub fn report(&self, msg: impl Display) {
        println!("{}", msg);
    }

    /// Print raw report text on stdout.
    pub fn report_raw(&self, bytes: &[u8]) {
        let mut stdout = io::stdout().lock();
        let _ = stdout.write_all(bytes);
        let _ = stdout.flush();
    }

    /// Format a status prefix with optional color.
    fn format_status(&self, status: Status) -> String {
        let text = status.as_str();

        if self.use_color {
            let color = status.color_code();
            format!("{}{:>width$}\x1b[0m", color, text, width = STATUS_WIDTH)
        } else {
            format!("{:>width$}", text, width = STATUS_WIDTH)
        }
    }

    /// Create a progress bar.
    ///
    /// In verbose mode, or when stderr is not a terminal, returns a no-op
    /// progress bar.
    pub fn progress(&self, total: u64, msg: impl Display) -> Progress {
        let pb = if self.verbosity > 0 || self.debug > 0 || !io::stderr().is_terminal() {
            None
        } else if total > 1 {
            let pb = ProgressBar::new(total);
            if let Ok(style) =
                ProgressStyle::default_bar().template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {pos}/{len}")
            {
                pb.set_style(style.progress_chars("#>-"));
            }
            pb.set_message(msg.to_string());
            Some(pb)
        } else {
            None
        };

        Progress { pb }
    }
}

impl Default for Shell {
    fn default() -> Self {
        Shell::new(0, 0, ColorChoice::Auto)
    }
}

/// Progress bar wrapper that respects shell mode.
pub struct Progress {
    pb: Option<ProgressBar>,
}

impl Progress {
    /// Increment progress.
    pub fn inc(&self, delta: u64) {
        if let Some(pb) = &self.pb {
            pb.inc(delta);
        }
    }

    /// Finish and remove the progress bar.
    pub fn finish(&self) {
        if let Some(pb) = &self.pb {
            pb.finish_and_clear();
        }
    }
}
