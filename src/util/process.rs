//! Subprocess execution utilities.

use std::ffi::OsStr;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

/// Interval between exit polls while a deadline is armed.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Error raised when a subprocess cannot be run to completion.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to wait for `{program}`: {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("`{program}` did not finish within {}s and was killed", timeout.as_secs())]
    TimedOut { program: String, timeout: Duration },
}

/// Captured result of a finished subprocess.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, `None` if the process was terminated by a signal
    pub code: Option<i32>,
    /// Captured standard output
    pub stdout: Vec<u8>,
    /// Captured standard error
    pub stderr: Vec<u8>,
}

impl ProcessOutput {
    /// Whether the process exited with status zero.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Standard output as text.
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Standard error as text.
    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Builder for subprocess execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    stdin: Option<Vec<u8>>,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            stdin: None,
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Set stdin data.
    pub fn stdin(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(data.into());
        self
    }

    /// Get the program path.
    pub fn get_program(&self) -> &Path {
        &self.program
    }

    /// Get the arguments.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }

    fn program_name(&self) -> String {
        self.program.display().to_string()
    }

    /// Execute the command and wait for completion, capturing its output.
    ///
    /// With a timeout the child is polled until the deadline passes, then
    /// killed and reported as [`ExecError::TimedOut`].
    pub fn exec(&self, timeout: Option<Duration>) -> Result<ProcessOutput, ExecError> {
        let mut cmd = self.build_command();
        cmd.stdin(if self.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|source| ExecError::Spawn {
            program: self.program_name(),
            source,
        })?;

        if let Some(ref stdin_data) = self.stdin {
            if let Some(mut stdin) = child.stdin.take() {
                // A child that exits without reading its input is not an error
                let _ = stdin.write_all(stdin_data);
            }
        }

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let code = match timeout {
            Some(limit) => self.wait_until(&mut child, limit)?,
            None => child
                .wait()
                .map_err(|source| ExecError::Wait {
                    program: self.program_name(),
                    source,
                })?
                .code(),
        };

        Ok(ProcessOutput {
            code,
            stdout: stdout.join().unwrap_or_default(),
            stderr: stderr.join().unwrap_or_default(),
        })
    }

    fn wait_until(&self, child: &mut Child, limit: Duration) -> Result<Option<i32>, ExecError> {
        let deadline = Instant::now() + limit;
        loop {
            let polled = child.try_wait().map_err(|source| ExecError::Wait {
                program: self.program_name(),
                source,
            })?;

            if let Some(status) = polled {
                return Ok(status.code());
            }

            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ExecError::TimedOut {
                    program: self.program_name(),
                    timeout: limit,
                });
            }

            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Display the command for logs and error messages.
    ///
    /// Arguments containing whitespace or quotes are double-quoted, so the
    /// rendering is stable for identical builders.
    pub fn display_command(&self) -> String {
        let mut parts = vec![quote(&self.program_name())];
        parts.extend(self.args.iter().map(|a| quote(a)));
        parts.join(" ")
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

fn quote(arg: &str) -> String {
    if !arg.is_empty() && !arg.chars().any(|c| c.is_whitespace() || c == '"') {
        return arg.to_string();
    }
    format!("\"{}\"", arg.replace('"', "\\\""))
}

/// Runs fully-built processes.
///
/// The pipeline only ever talks to this trait, which lets tests substitute a
/// recording fake for the real cross toolchain.
pub trait CommandRunner: Send + Sync {
    /// Run the process to completion and capture its output.
    fn run(&self, process: &ProcessBuilder) -> Result<ProcessOutput, ExecError>;
}

/// Runs processes on the host, optionally bounded by a timeout.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    timeout: Option<Duration>,
}

impl SystemRunner {
    /// Create a runner without a timeout.
    pub fn new() -> Self {
        SystemRunner { timeout: None }
    }

    /// Kill every process still running after `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, process: &ProcessBuilder) -> Result<ProcessOutput, ExecError> {
        process.exec(self.timeout)
    }
}
