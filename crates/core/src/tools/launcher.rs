//! Launching external programs with line-by-line output capture.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::error::ToolError;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Program, arguments and working directory of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Command line for log output.
    pub fn display(&self) -> String {
        let mut out = self.program.display().to_string();
        for arg in &self.args {
            out.push(' ');
            if arg.contains(' ') || arg.is_empty() {
                out.push('"');
                out.push_str(arg);
                out.push('"');
            } else {
                out.push_str(arg);
            }
        }
        out
    }
}

/// Which output stream a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSource {
    Stdout,
    Stderr,
}

/// Events of one running process. `Exited` is always the last event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    Stdout(String),
    Stderr(String),
    /// Exit code, `None` when the process was killed by a signal.
    Exited(Option<i32>),
}

/// Starts external programs and streams their output.
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    /// Launches the program. Output lines arrive in order per stream,
    /// followed by exactly one `Exited`.
    async fn launch(
        &self,
        command: &CommandSpec,
    ) -> Result<mpsc::UnboundedReceiver<ProcessEvent>, ToolError>;
}

/// Production launcher on top of `tokio::process`.
#[derive(Debug, Default, Clone)]
pub struct TokioLauncher;

impl TokioLauncher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessLauncher for TokioLauncher {
    async fn launch(
        &self,
        command: &CommandSpec,
    ) -> Result<mpsc::UnboundedReceiver<ProcessEvent>, ToolError> {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &command.working_dir {
            cmd.current_dir(dir);
        }
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            cmd.as_std_mut().creation_flags(CREATE_NO_WINDOW);
        }

        debug!("Launching: {}", command.display());
        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ToolError::NotFound {
                    program: command.program.clone(),
                }
            } else {
                ToolError::launch_failed(&command.program, e.to_string())
            }
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ToolError::launch_failed(&command.program, "stdout not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ToolError::launch_failed(&command.program, "stderr not captured"))?;

        let (tx, rx) = mpsc::unbounded_channel();
        let stdout_task = tokio::spawn(pump_lines(stdout, tx.clone(), ProcessEvent::Stdout));
        let stderr_task = tokio::spawn(pump_lines(stderr, tx.clone(), ProcessEvent::Stderr));
        let program = command.program.clone();

        tokio::spawn(async move {
            // Drain both pipes before reporting the exit so Exited stays last.
            let _ = stdout_task.await;
            let _ = stderr_task.await;
            let code = match child.wait().await {
                Ok(status) => status.code(),
                Err(e) => {
                    warn!("Failed to wait for {}: {}", program.display(), e);
                    None
                }
            };
            let _ = tx.send(ProcessEvent::Exited(code));
        });

        Ok(rx)
    }
}

/// Forwards output split on `\n` or `\r`; tools redraw status lines with a bare
/// carriage return.
async fn pump_lines<R>(
    reader: R,
    tx: mpsc::UnboundedSender<ProcessEvent>,
    wrap: fn(String) -> ProcessEvent,
) where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut pending: Vec<u8> = Vec::new();
    loop {
        let consumed = match reader.fill_buf().await {
            Ok([]) => break,
            Ok(buf) => {
                for &byte in buf {
                    if byte == b'\n' || byte == b'\r' {
                        if !pending.is_empty() {
                            let line = String::from_utf8_lossy(&pending).into_owned();
                            pending.clear();
                            if tx.send(wrap(line)).is_err() {
                                return;
                            }
                        }
                    } else {
                        pending.push(byte);
                    }
                }
                buf.len()
            }
            Err(e) => {
                debug!("Stopped reading process output: {}", e);
                break;
            }
        };
        reader.consume(consumed);
    }
    if !pending.is_empty() {
        let _ = tx.send(wrap(String::from_utf8_lossy(&pending).into_owned()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_spec_builder() {
        let spec = CommandSpec::new("yt-dlp")
            .arg("--no-playlist")
            .args(["https://example.com/v", "-o", "out dir/%(title)s"])
            .with_working_dir("/tmp");

        assert_eq!(spec.program, PathBuf::from("yt-dlp"));
        assert_eq!(spec.args.len(), 4);
        assert_eq!(spec.working_dir, Some(PathBuf::from("/tmp")));
        assert_eq!(
            spec.display(),
            "yt-dlp --no-playlist https://example.com/v -o \"out dir/%(title)s\""
        );
    }

    #[tokio::test]
    async fn test_missing_program_is_not_found() {
        let launcher = TokioLauncher::new();
        let result = launcher
            .launch(&CommandSpec::new("/nonexistent/yayd-test-binary"))
            .await;
        assert!(matches!(result, Err(ToolError::NotFound { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_captures_lines_then_exit() {
        let launcher = TokioLauncher::new();
        let spec = CommandSpec::new("sh")
            .args(["-c", "printf 'one\\r1%%\\n'; echo two 1>&2; exit 3"]);
        let mut rx = launcher.launch(&spec).await.unwrap();

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }

        assert!(events.contains(&ProcessEvent::Stdout("one".to_string())));
        assert!(events.contains(&ProcessEvent::Stdout("1%".to_string())));
        assert!(events.contains(&ProcessEvent::Stderr("two".to_string())));
        assert_eq!(events.last(), Some(&ProcessEvent::Exited(Some(3))));
    }
}
