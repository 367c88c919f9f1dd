//! Test utilities and fakes for avrkit unit tests.
//!
//! [`RecordingRunner`] stands in for the cross toolchain: it records every
//! command it is asked to run and answers with canned results.
//!
//! # Example
//!
//! ```rust,ignore
//! use avrkit::test_support::{test_context, RecordingRunner};
//!
//! let runner = Arc::new(RecordingRunner::new().fail_when("-c -o demo.o", 1));
//! let ctx = test_context(runner.clone());
//! // run a pipeline, then inspect runner.calls()
//! ```

use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::builder::{BuildContext, ToolchainPaths};
use crate::util::process::{CommandRunner, ExecError, ProcessBuilder, ProcessOutput};
use crate::util::shell::Shell;

/// Toolchain root used by [`test_context`].
pub const TEST_ROOT: &str = "/avr";

/// Pattern for matching rendered commands.
#[derive(Debug, Clone)]
pub enum CommandPattern {
    /// Match if the command contains the substring.
    Contains(String),
    /// Match using a regex pattern.
    Regex(String),
    /// Match any command.
    Any,
}

impl CommandPattern {
    /// Check if this pattern matches the given command.
    pub fn matches(&self, cmd: &str) -> bool {
        match self {
            CommandPattern::Contains(s) => cmd.contains(s.as_str()),
            CommandPattern::Regex(pattern) => regex::Regex::new(pattern)
                .map(|re| re.is_match(cmd))
                .unwrap_or(false),
            CommandPattern::Any => true,
        }
    }
}

#[derive(Debug, Clone)]
enum Reply {
    Exit { code: i32, stdout: Vec<u8>, stderr: Vec<u8> },
    SpawnError,
    TimedOut(Duration),
}

/// Command runner that records calls instead of spawning processes.
///
/// Commands not matched by any rule succeed with empty output. Rules are
/// checked in the order they were added.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    rules: Vec<(CommandPattern, Reply)>,
    calls: Mutex<Vec<String>>,
}

impl RecordingRunner {
    /// Create a runner where every command succeeds.
    pub fn new() -> Self {
        RecordingRunner::default()
    }

    /// Exit with `code` for commands containing `needle`.
    pub fn fail_when(mut self, needle: &str, code: i32) -> Self {
        self.rules.push((
            CommandPattern::Contains(needle.to_string()),
            Reply::Exit {
                code,
                stdout: Vec::new(),
                stderr: format!("error: {} failed\n", needle).into_bytes(),
            },
        ));
        self
    }

    /// Exit with `code` for commands matching the regex `pattern`.
    pub fn fail_matching(mut self, pattern: &str, code: i32) -> Self {
        self.rules.push((
            CommandPattern::Regex(pattern.to_string()),
            Reply::Exit {
                code,
                stdout: Vec::new(),
                stderr: format!("error: {} failed\n", pattern).into_bytes(),
            },
        ));
        self
    }

    /// Report commands containing `needle` as killed after `timeout`.
    pub fn time_out_when(mut self, needle: &str, timeout: Duration) -> Self {
        self.rules
            .push((CommandPattern::Contains(needle.to_string()), Reply::TimedOut(timeout)));
        self
    }

    /// Fail to spawn commands containing `needle`.
    pub fn spawn_error_when(mut self, needle: &str) -> Self {
        self.rules
            .push((CommandPattern::Contains(needle.to_string()), Reply::SpawnError));
        self
    }

    /// Succeed with `stdout` for commands containing `needle`.
    pub fn respond_when(mut self, needle: &str, stdout: &str) -> Self {
        self.rules.push((
            CommandPattern::Contains(needle.to_string()),
            Reply::Exit {
                code: 0,
                stdout: stdout.as_bytes().to_vec(),
                stderr: Vec::new(),
            },
        ));
        self
    }

    /// Fail every command.
    pub fn fail_all(mut self, code: i32) -> Self {
        self.rules.push((
            CommandPattern::Any,
            Reply::Exit {
                code,
                stdout: Vec::new(),
                stderr: Vec::new(),
            },
        ));
        self
    }

    /// Every command run so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Commands run so far that contain `needle`.
    pub fn calls_matching(&self, needle: &str) -> Vec<String> {
        self.calls_where(&CommandPattern::Contains(needle.to_string()))
    }

    /// Commands run so far that match the regex `pattern`.
    pub fn calls_like(&self, pattern: &str) -> Vec<String> {
        self.calls_where(&CommandPattern::Regex(pattern.to_string()))
    }

    fn calls_where(&self, pattern: &CommandPattern) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| pattern.matches(c))
            .collect()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, process: &ProcessBuilder) -> Result<ProcessOutput, ExecError> {
        let cmd = process.display_command();
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(cmd.clone());
        }

        let reply = self
            .rules
            .iter()
            .find(|(pattern, _)| pattern.matches(&cmd))
            .map(|(_, reply)| reply.clone());

        match reply {
            None => Ok(ProcessOutput {
                code: Some(0),
                stdout: Vec::new(),
                stderr: Vec::new(),
            }),
            Some(Reply::Exit {
                code,
                stdout,
                stderr,
            }) => Ok(ProcessOutput {
                code: Some(code),
                stdout,
                stderr,
            }),
            Some(Reply::SpawnError) => Err(ExecError::Spawn {
                program: process.get_program().display().to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
            }),
            Some(Reply::TimedOut(timeout)) => Err(ExecError::TimedOut {
                program: process.get_program().display().to_string(),
                timeout,
            }),
        }
    }
}

/// Build context over [`TEST_ROOT`] with a quiet shell and the given runner.
pub fn test_context(runner: Arc<RecordingRunner>) -> BuildContext {
    let paths = ToolchainPaths::from_root(Some(TEST_ROOT)).expect("valid test root");
    BuildContext::with_runner(paths, Shell::quiet(), runner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regex_pattern_is_anchored() {
        let link = CommandPattern::Regex(r" -lm$".to_string());
        assert!(link.matches("/avr/bin/avr-g++ -O2 -o fw.elf fw.o -lm"));
        assert!(!link.matches("/avr/bin/avr-objcopy --change-section-lma .eeprom=0 fw.elf fw.eep"));
    }

    #[test]
    fn test_invalid_regex_matches_nothing() {
        assert!(!CommandPattern::Regex("(".to_string()).matches("("));
    }

    #[test]
    fn test_timed_out_reply() {
        let runner = RecordingRunner::new().time_out_when("avr-size", Duration::from_secs(3));
        let err = runner
            .run(&ProcessBuilder::new("/avr/bin/avr-size").arg("fw.hex"))
            .unwrap_err();
        assert!(matches!(err, ExecError::TimedOut { timeout, .. } if timeout == Duration::from_secs(3)));
    }
}
