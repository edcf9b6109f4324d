//! Generic worker wrapping one external process.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, warn};

use crate::metrics;
use crate::progress::ProgressReport;
use crate::tools::{CommandSpec, OutputSource, ProcessEvent, ProcessLauncher};
use crate::worker::{ComponentKind, Subscription, Worker, WorkerCore, WorkerId, WorkerStatus};

/// Per-variant interpretation of process output.
pub trait LineInterpreter: Send + 'static {
    /// Inspects one non-blank line. Returning a report publishes it as progress.
    fn interpret(&mut self, source: OutputSource, line: &str) -> Option<ProgressReport>;
}

/// Forwards output without interpreting it.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassThrough;

impl LineInterpreter for PassThrough {
    fn interpret(&mut self, _source: OutputSource, _line: &str) -> Option<ProgressReport> {
        None
    }
}

/// Runs one command and exposes it through the worker contract.
///
/// Every non-blank line is raised as `Output` (stdout) or `Error` (stderr)
/// and then handed to the interpreter. Exit code 0 finishes `Successful`;
/// anything else, including a failed launch, finishes `Error`.
pub struct ProcessWorker<I> {
    core: Arc<WorkerCore>,
    launcher: Arc<dyn ProcessLauncher>,
    command: CommandSpec,
    interpreter: Arc<Mutex<I>>,
}

impl<I: LineInterpreter> ProcessWorker<I> {
    pub fn from_parts(
        kind: ComponentKind,
        launcher: Arc<dyn ProcessLauncher>,
        command: CommandSpec,
        interpreter: I,
    ) -> Self {
        Self {
            core: Arc::new(WorkerCore::new(kind)),
            launcher,
            command,
            interpreter: Arc::new(Mutex::new(interpreter)),
        }
    }

    pub fn command(&self) -> &CommandSpec {
        &self.command
    }

    /// Reads interpreter state, e.g. values captured from the output.
    pub fn inspect<R>(&self, f: impl FnOnce(&I) -> R) -> R {
        let guard = self
            .interpreter
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }
}

impl<I: LineInterpreter> Worker for ProcessWorker<I> {
    fn id(&self) -> WorkerId {
        self.core.id()
    }

    fn kind(&self) -> ComponentKind {
        self.core.kind()
    }

    fn status(&self) -> WorkerStatus {
        self.core.status()
    }

    fn ready(&self) -> bool {
        self.core.ready()
    }

    fn start(&self) -> bool {
        if !self.core.try_start() {
            return false;
        }
        tokio::spawn(run_process(
            Arc::clone(&self.core),
            Arc::clone(&self.launcher),
            self.command.clone(),
            Arc::clone(&self.interpreter),
        ));
        true
    }

    fn subscribe(&self) -> Subscription {
        self.core.subscribe()
    }
}

async fn run_process<I: LineInterpreter>(
    core: Arc<WorkerCore>,
    launcher: Arc<dyn ProcessLauncher>,
    command: CommandSpec,
    interpreter: Arc<Mutex<I>>,
) {
    let kind = core.kind().to_string();
    let mut events = match launcher.launch(&command).await {
        Ok(events) => events,
        Err(e) => {
            warn!(worker = %core.provenance(), "Launch failed: {}", e);
            metrics::TOOL_RUNS
                .with_label_values(&[kind.as_str(), "launch_failed"])
                .inc();
            core.error_line(e.to_string());
            core.finish(WorkerStatus::Error);
            return;
        }
    };

    let mut exit_code = None;
    while let Some(event) = events.recv().await {
        let (source, line) = match event {
            ProcessEvent::Stdout(line) => (OutputSource::Stdout, line),
            ProcessEvent::Stderr(line) => (OutputSource::Stderr, line),
            ProcessEvent::Exited(code) => {
                exit_code = code;
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let report = interpreter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .interpret(source, &line);
        match source {
            OutputSource::Stdout => core.output(line),
            OutputSource::Stderr => core.error_line(line),
        }
        if let Some(report) = report {
            core.progress(report);
        }
    }

    match exit_code {
        Some(code) => core.output(format!("Exit code={}", code)),
        None => core.output("Exit code=none"),
    }
    debug!(worker = %core.provenance(), ?exit_code, "Process exited");

    let status = if exit_code == Some(0) {
        WorkerStatus::Successful
    } else {
        WorkerStatus::Error
    };
    metrics::TOOL_RUNS
        .with_label_values(&[kind.as_str(), status.as_str()])
        .inc();
    core.finish(status);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockLauncher, ScriptedRun};
    use crate::worker::WorkerEvent;

    #[derive(Default)]
    struct Counting {
        seen: Vec<String>,
    }

    impl LineInterpreter for Counting {
        fn interpret(&mut self, _source: OutputSource, line: &str) -> Option<ProgressReport> {
            self.seen.push(line.to_string());
            Some(ProgressReport::from_percent(self.seen.len() as f64))
        }
    }

    async fn collect(mut sub: Subscription) -> Vec<WorkerEvent> {
        let mut events = Vec::new();
        while let Some(event) = sub.recv().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_lines_then_exit_code_then_finished() {
        let launcher = Arc::new(MockLauncher::new());
        launcher.set_default(
            ScriptedRun::exit(0)
                .stdout("first")
                .stdout("   ")
                .stderr("warning"),
        );
        let worker = ProcessWorker::from_parts(
            ComponentKind::MediaDownload,
            launcher.clone(),
            CommandSpec::new("tool").arg("x"),
            Counting::default(),
        );

        let sub = worker.subscribe();
        assert!(!worker.start());
        assert!(worker.ready());
        assert!(worker.start());
        assert!(!worker.start());

        let events = collect(sub).await;
        let lines: Vec<String> = events
            .iter()
            .filter_map(|e| match e {
                WorkerEvent::Output(l) | WorkerEvent::Error(l) => Some(l.line().to_string()),
                _ => None,
            })
            .collect();
        assert_eq!(lines, vec!["first", "warning", "Exit code=0"]);
        assert_eq!(
            &events[events.len() - 2..],
            &[
                WorkerEvent::StatusChanged(WorkerStatus::Successful),
                WorkerEvent::Finished(WorkerStatus::Successful),
            ]
        );
        assert_eq!(worker.inspect(|c| c.seen.len()), 2);
        assert_eq!(launcher.recorded_commands().len(), 1);
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_error() {
        let launcher = Arc::new(MockLauncher::new());
        launcher.set_default(ScriptedRun::exit(1).stderr("ERROR: Unsupported URL"));
        let worker = ProcessWorker::from_parts(
            ComponentKind::MediaDownload,
            launcher,
            CommandSpec::new("tool"),
            PassThrough,
        );

        let sub = worker.subscribe();
        worker.ready();
        worker.start();
        let events = collect(sub).await;

        assert_eq!(events.last(), Some(&WorkerEvent::Finished(WorkerStatus::Error)));
        assert_eq!(worker.status(), WorkerStatus::Error);
    }

    #[tokio::test]
    async fn test_launch_failure_is_error() {
        let launcher = Arc::new(MockLauncher::new());
        launcher.set_default(ScriptedRun::launch_failure("no such program"));
        let worker = ProcessWorker::from_parts(
            ComponentKind::Transcode,
            launcher,
            CommandSpec::new("missing"),
            PassThrough,
        );

        let sub = worker.subscribe();
        worker.ready();
        worker.start();
        let events = collect(sub).await;

        assert!(events.iter().any(|e| matches!(e, WorkerEvent::Error(l) if l.line().contains("no such program"))));
        assert_eq!(events.last(), Some(&WorkerEvent::Finished(WorkerStatus::Error)));
    }
}
