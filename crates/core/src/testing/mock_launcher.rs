//! Mock process launcher for testing.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::tools::{CommandSpec, ProcessEvent, ProcessLauncher, ToolError};

/// Scripted behavior of one launched process.
#[derive(Debug, Clone)]
pub struct ScriptedRun {
    lines: Vec<ProcessEvent>,
    exit_code: Option<i32>,
    launch_error: Option<String>,
    output_file: Option<(String, Vec<u8>)>,
    delay: Option<Duration>,
}

impl ScriptedRun {
    /// A run that exits with `code` after emitting its lines.
    pub fn exit(code: i32) -> Self {
        Self {
            lines: Vec::new(),
            exit_code: Some(code),
            launch_error: None,
            output_file: None,
            delay: None,
        }
    }

    /// A run killed by a signal (no exit code).
    pub fn killed() -> Self {
        Self {
            exit_code: None,
            ..Self::exit(0)
        }
    }

    /// A launch that fails before any output.
    pub fn launch_failure(reason: impl Into<String>) -> Self {
        Self {
            launch_error: Some(reason.into()),
            ..Self::exit(0)
        }
    }

    pub fn stdout(mut self, line: impl Into<String>) -> Self {
        self.lines.push(ProcessEvent::Stdout(line.into()));
        self
    }

    pub fn stderr(mut self, line: impl Into<String>) -> Self {
        self.lines.push(ProcessEvent::Stderr(line.into()));
        self
    }

    /// Creates `file_name` next to the path given after `-o` (or as the last
    /// argument when there is no `-o`) before exiting.
    pub fn creates_output_file(mut self, file_name: impl Into<String>) -> Self {
        self.output_file = Some((file_name.into(), b"data".to_vec()));
        self
    }

    /// Waits before emitting anything.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// Mock implementation of the ProcessLauncher trait.
///
/// Runs are matched against the joined argument list: the first rule whose
/// pattern is contained in it wins, otherwise the default run is used.
/// Every launch is recorded for assertions.
///
/// # Example
///
/// ```rust,ignore
/// use yayd_core::testing::{MockLauncher, ScriptedRun};
///
/// let launcher = MockLauncher::new();
/// launcher.on_args_containing("--get-title", ScriptedRun::exit(0).stdout("A Song"));
/// launcher.set_default(ScriptedRun::exit(1));
/// ```
#[derive(Debug)]
pub struct MockLauncher {
    rules: Arc<Mutex<Vec<(String, ScriptedRun)>>>,
    default_run: Arc<Mutex<ScriptedRun>>,
    commands: Arc<Mutex<Vec<CommandSpec>>>,
}

impl Default for MockLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLauncher {
    /// Create a new mock launcher whose processes exit 0 without output.
    pub fn new() -> Self {
        Self {
            rules: Arc::new(Mutex::new(Vec::new())),
            default_run: Arc::new(Mutex::new(ScriptedRun::exit(0))),
            commands: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn set_default(&self, run: ScriptedRun) {
        *lock(&self.default_run) = run;
    }

    /// Use `run` for launches whose joined arguments contain `pattern`.
    pub fn on_args_containing(&self, pattern: impl Into<String>, run: ScriptedRun) {
        lock(&self.rules).push((pattern.into(), run));
    }

    /// Get all recorded launches.
    pub fn recorded_commands(&self) -> Vec<CommandSpec> {
        lock(&self.commands).clone()
    }

    /// Recorded launches whose joined arguments contain `pattern`.
    pub fn commands_containing(&self, pattern: &str) -> Vec<CommandSpec> {
        lock(&self.commands)
            .iter()
            .filter(|c| c.args.join(" ").contains(pattern))
            .cloned()
            .collect()
    }

    fn pick(&self, command: &CommandSpec) -> ScriptedRun {
        let joined = command.args.join(" ");
        lock(&self.rules)
            .iter()
            .find(|(pattern, _)| joined.contains(pattern.as_str()))
            .map(|(_, run)| run.clone())
            .unwrap_or_else(|| lock(&self.default_run).clone())
    }
}

#[async_trait]
impl ProcessLauncher for MockLauncher {
    async fn launch(
        &self,
        command: &CommandSpec,
    ) -> Result<mpsc::UnboundedReceiver<ProcessEvent>, ToolError> {
        lock(&self.commands).push(command.clone());
        let run = self.pick(command);

        if let Some(reason) = run.launch_error {
            return Err(ToolError::launch_failed(&command.program, reason));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let output_dir = output_dir(command);
        tokio::spawn(async move {
            if let Some(delay) = run.delay {
                tokio::time::sleep(delay).await;
            }
            for line in run.lines {
                let _ = tx.send(line);
            }
            if let (Some((name, data)), Some(dir)) = (run.output_file, output_dir) {
                let _ = tokio::fs::create_dir_all(&dir).await;
                let _ = tokio::fs::write(dir.join(name), data).await;
            }
            let _ = tx.send(ProcessEvent::Exited(run.exit_code));
        });

        Ok(rx)
    }
}

fn output_dir(command: &CommandSpec) -> Option<PathBuf> {
    let target = command
        .args
        .iter()
        .position(|a| a == "-o")
        .and_then(|i| command.args.get(i + 1))
        .or_else(|| command.args.iter().rev().find(|a| a.as_str() != "-y"))?;
    PathBuf::from(target).parent().map(|p| p.to_path_buf())
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
