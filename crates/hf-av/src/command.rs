//! Builder for executing external tool commands with timeout and
//! cancellation support.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Default command timeout: 5 minutes.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Number of trailing stderr lines kept for error messages.
const STDERR_TAIL_LINES: usize = 20;

/// Output captured from a tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Process exit status.
    pub status: ExitStatus,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
}

/// A builder for constructing and executing external tool invocations.
///
/// # Example
///
/// ```no_run
/// use hf_av::ToolCommand;
/// use std::path::PathBuf;
///
/// # async fn example() -> hf_core::Result<()> {
/// let output = ToolCommand::new(PathBuf::from("ffmpeg"))
///     .arg("-hide_banner")
///     .arg("-version")
///     .execute()
///     .await?;
/// println!("{}", output.stdout);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl ToolCommand {
    /// Create a new command for the given program path.
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Set the maximum execution time.
    pub fn timeout(&mut self, d: Duration) -> &mut Self {
        self.timeout = d;
        self
    }

    /// The arguments accumulated so far.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    /// Execute the command, capturing stdout and stderr.
    ///
    /// # Errors
    ///
    /// - Returns [`hf_core::Error::Tool`] if the process times out (message
    ///   includes the timeout duration).
    /// - Returns [`hf_core::Error::Tool`] if the process exits with a non-zero
    ///   status (message includes stderr).
    /// - Returns [`hf_core::Error::Tool`] if spawning the process fails.
    pub async fn execute(&self) -> hf_core::Result<ToolOutput> {
        let program_name = self.program_name();

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| spawn_error(&program_name, e))?;

        // Dropping the future on timeout drops the child, and kill_on_drop
        // takes care of the process.
        let result = tokio::time::timeout(self.timeout, child.wait_with_output()).await;

        match result {
            Ok(Ok(output)) => {
                let tool_output = ToolOutput {
                    status: output.status,
                    stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                };

                if !output.status.success() {
                    return Err(hf_core::Error::Tool {
                        tool: program_name,
                        message: format!(
                            "exited with status {}: {}",
                            output.status,
                            tool_output.stderr.trim()
                        ),
                    });
                }

                Ok(tool_output)
            }
            Ok(Err(e)) => Err(hf_core::Error::Tool {
                tool: program_name,
                message: format!("I/O error waiting for process: {e}"),
            }),
            Err(_elapsed) => Err(self.timed_out(program_name)),
        }
    }

    fn timed_out(&self, program_name: String) -> hf_core::Error {
        hf_core::Error::Tool {
            tool: program_name,
            message: format!("timed out after {:?}", self.timeout),
        }
    }

    /// Execute the command, feeding every stderr line to `on_line` as it
    /// arrives.
    ///
    /// Stdout is discarded. The last few stderr lines are kept and attached to
    /// the error when the process fails.
    ///
    /// # Errors
    ///
    /// - [`hf_core::Error::Cancelled`] if `cancel` fires; the child is killed
    ///   and reaped first.
    /// - [`hf_core::Error::Tool`] on spawn failure, timeout, or non-zero exit.
    pub async fn execute_with_stderr_callback(
        &self,
        mut on_line: impl FnMut(&str),
        cancel: Option<CancellationToken>,
    ) -> hf_core::Result<ExitStatus> {
        let program_name = self.program_name();
        let cancel = cancel.unwrap_or_default();

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::null());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| spawn_error(&program_name, e))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| hf_core::Error::Internal("stderr was not captured".into()))?;

        let mut reader = BufReader::new(stderr);
        let mut buf = Vec::new();
        let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);
        let deadline = tokio::time::sleep(self.timeout);
        tokio::pin!(deadline);

        // Drain stderr until EOF, racing cancellation and the timeout. Lines
        // are decoded lossily since tools echo metadata and file names as raw
        // bytes.
        loop {
            tokio::select! {
                read = reader.read_until(b'\n', &mut buf) => match read {
                    Ok(0) => break,
                    Ok(_) => {
                        let line = String::from_utf8_lossy(&buf)
                            .trim_end_matches(['\n', '\r'])
                            .to_string();
                        buf.clear();
                        on_line(&line);
                        if tail.len() == STDERR_TAIL_LINES {
                            tail.pop_front();
                        }
                        tail.push_back(line);
                    }
                    Err(e) => {
                        tracing::debug!("{program_name}: stderr read error: {e}");
                        break;
                    }
                },
                _ = cancel.cancelled() => {
                    kill_and_reap(&mut child, &program_name).await;
                    return Err(cancelled(&program_name));
                }
                _ = &mut deadline => {
                    kill_and_reap(&mut child, &program_name).await;
                    return Err(self.timed_out(program_name));
                }
            }
        }

        let status = tokio::select! {
            status = child.wait() => status.map_err(|e| hf_core::Error::Tool {
                tool: program_name.clone(),
                message: format!("I/O error waiting for process: {e}"),
            })?,
            _ = cancel.cancelled() => {
                kill_and_reap(&mut child, &program_name).await;
                return Err(cancelled(&program_name));
            }
            _ = &mut deadline => {
                kill_and_reap(&mut child, &program_name).await;
                return Err(self.timed_out(program_name));
            }
        };

        if !status.success() {
            let diagnostic = tail.into_iter().collect::<Vec<_>>().join("\n");
            return Err(hf_core::Error::Tool {
                tool: program_name,
                message: format!("exited with status {status}: {}", diagnostic.trim()),
            });
        }

        Ok(status)
    }
}

fn cancelled(program_name: &str) -> hf_core::Error {
    hf_core::Error::Cancelled(format!("{program_name} was cancelled"))
}

fn spawn_error(program_name: &str, e: std::io::Error) -> hf_core::Error {
    if e.kind() == std::io::ErrorKind::NotFound {
        hf_core::Error::not_found("tool", program_name)
    } else {
        hf_core::Error::Tool {
            tool: program_name.to_string(),
            message: format!("failed to spawn: {e}"),
        }
    }
}

async fn kill_and_reap(child: &mut tokio::process::Child, program_name: &str) {
    if let Err(e) = child.kill().await {
        tracing::warn!("{program_name}: failed to kill child process: {e}");
    }
}
