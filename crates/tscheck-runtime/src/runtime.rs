//! Single-threaded reactor driving the orchestrator.

use tokio::sync::mpsc;
use tracing::{debug, info, trace};

use tscheck_core::{
    Orchestrator, OrchestratorConfig, TaskConfig, TaskHandle, TaskId, TaskObservers,
};

use crate::config::RuntimeConfig;
use crate::error::{Result, RuntimeError};
use crate::event::ProcessEvent;
use crate::launcher::TokioLauncher;

/// Owns the orchestrator and the inbound process event queue.
///
/// Events are applied strictly one at a time, in delivery order, so no two
/// handlers ever run concurrently.
pub struct Runtime {
    orchestrator: Orchestrator<TokioLauncher>,
    events: mpsc::Receiver<ProcessEvent>,
}

impl Runtime {
    /// Creates a runtime. Must be called from within a tokio runtime before
    /// any task is submitted.
    pub fn new(config: RuntimeConfig) -> Result<Self> {
        Self::with_orchestrator_config(
            OrchestratorConfig::new().with_max_concurrency(config.max_concurrency),
            config,
        )
    }

    /// Creates a runtime with explicit orchestrator settings such as global
    /// observers. `config.max_concurrency` is ignored in favor of the
    /// orchestrator config's value.
    pub fn with_orchestrator_config(
        orchestrator: OrchestratorConfig,
        config: RuntimeConfig,
    ) -> Result<Self> {
        config.validate()?;
        if orchestrator.max_concurrency == 0 {
            return Err(RuntimeError::InvalidConfig(
                "max_concurrency must be at least 1".to_string(),
            ));
        }

        let (tx, events) = mpsc::channel(config.channel_capacity);
        let launcher = TokioLauncher::new(tx, &config);
        debug!(
            max_concurrency = orchestrator.max_concurrency,
            channel_capacity = config.channel_capacity,
            "runtime created"
        );

        Ok(Self {
            orchestrator: Orchestrator::new(orchestrator, launcher),
            events,
        })
    }

    pub fn orchestrator(&self) -> &Orchestrator<TokioLauncher> {
        &self.orchestrator
    }

    pub fn orchestrator_mut(&mut self) -> &mut Orchestrator<TokioLauncher> {
        &mut self.orchestrator
    }

    /// Submits a run. See `Orchestrator::submit`.
    pub fn submit(&mut self, config: TaskConfig, observers: TaskObservers) -> TaskHandle {
        self.orchestrator.submit(config, observers)
    }

    /// Starts a pending task now, bypassing the admission limit.
    pub fn start(&mut self, handle: &TaskHandle) -> Result<()> {
        self.orchestrator.start(handle)?;
        Ok(())
    }

    /// Looks up a live task by id.
    pub fn task(&self, id: TaskId) -> Result<TaskHandle> {
        Ok(self.orchestrator.task(id)?)
    }

    /// Stops a started task. See `Orchestrator::stop`.
    pub fn stop(&mut self, handle: &TaskHandle) -> bool {
        self.orchestrator.stop(handle)
    }

    /// Stops every started task without admitting queued ones.
    ///
    /// Queued tasks stay pending. Returns the number of tasks stopped.
    pub fn stop_all(&mut self) -> usize {
        let limit = std::mem::replace(&mut self.orchestrator.config_mut().max_concurrency, 0);

        let handles: Vec<TaskHandle> = self.orchestrator.tasks().values().cloned().collect();
        let mut stopped = 0;
        for handle in &handles {
            if self.orchestrator.stop(handle) {
                stopped += 1;
            }
        }

        self.orchestrator.config_mut().max_concurrency = limit;
        info!(stopped, "stopped all tasks");
        stopped
    }

    /// Applies one process event to the orchestrator.
    pub fn dispatch(&mut self, event: ProcessEvent) {
        match event {
            ProcessEvent::Output { task_id, chunk } => {
                trace!(task_id = %task_id, len = chunk.len(), "dispatching output");
                if chunk.is_empty() {
                    self.orchestrator.handle_output(task_id, None);
                } else {
                    self.orchestrator.handle_output(task_id, Some(&chunk));
                }
            }
            ProcessEvent::Exited { task_id, status } => {
                self.orchestrator.handle_exit(task_id, status);
            }
        }
    }

    /// Waits for the next process event.
    pub async fn next_event(&mut self) -> Result<ProcessEvent> {
        self.events
            .recv()
            .await
            .ok_or_else(|| RuntimeError::Channel("process event channel closed".to_string()))
    }

    /// Dispatches events until no task is pending or running.
    pub async fn run_until_idle(&mut self) -> Result<()> {
        while !self.orchestrator.is_idle() {
            let event = self.next_event().await?;
            self.dispatch(event);
        }
        debug!("runtime idle");
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use tokio::time::timeout;
    use tscheck_core::{CoreError, CycleState};
    use tscheck_parser::Diagnostic;

    fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    const ONE_SHOT: &str = "\
echo \"src/a.ts(10,5): error TS2322: Type 'string' is not assignable to type 'number'.\"
echo \"src/b.ts(3,1): error TS2304: Cannot find name 'foo'.\"
echo \"  Did you mean 'for'?\"
exit 2";

    #[tokio::test]
    async fn test_new_rejects_invalid_config() {
        let result = Runtime::new(RuntimeConfig::new().with_max_concurrency(0));
        assert!(matches!(result, Err(RuntimeError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_one_shot_run_to_completion() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "fake-tsc", ONE_SHOT);
        let mut runtime = Runtime::new(RuntimeConfig::default()).unwrap();

        let reports: Arc<Mutex<Vec<Vec<Diagnostic>>>> = Arc::default();
        let sink = Arc::clone(&reports);
        let handle = runtime.submit(
            TaskConfig::new(script.to_string_lossy(), "tsconfig.json"),
            TaskObservers::new().on_report(move |_, report| sink.lock().unwrap().push(report.to_vec())),
        );

        timeout(Duration::from_secs(10), runtime.run_until_idle())
            .await
            .unwrap()
            .unwrap();

        let reports = reports.lock().unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].len(), 2);
        assert_eq!(reports[0][0].code, 2322);
        assert_eq!(reports[0][1].message, vec!["Cannot find name 'foo'.", "  Did you mean 'for'?"]);

        let task = handle.lock();
        assert!(task.is_ended());
        assert_eq!(task.exit_status(), Some(2));
    }

    #[tokio::test]
    async fn test_fatal_error_survives_end_of_output() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(
            dir.path(),
            "fake-tsc",
            "echo \"error TS5058: The specified path does not exist: 'tsconfig.json'.\"\nexit 1",
        );
        let mut runtime = Runtime::new(RuntimeConfig::default()).unwrap();

        let reports = Arc::new(Mutex::new(0usize));
        let errors = Arc::new(Mutex::new(Vec::new()));
        let (report_sink, error_sink) = (Arc::clone(&reports), Arc::clone(&errors));
        let handle = runtime.submit(
            TaskConfig::new(script.to_string_lossy(), "tsconfig.json"),
            TaskObservers::new()
                .on_report(move |_, _| *report_sink.lock().unwrap() += 1)
                .on_error(move |_, error| error_sink.lock().unwrap().push(error.code)),
        );

        timeout(Duration::from_secs(10), runtime.run_until_idle())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(*reports.lock().unwrap(), 1);
        assert_eq!(*errors.lock().unwrap(), vec![Some(5058)]);

        let task = handle.lock();
        assert_eq!(task.cycle(), CycleState::Failed);
        assert!(!task.has_report());
        assert_eq!(task.error().and_then(|e| e.code), Some(5058));
        assert_eq!(task.exit_status(), Some(1));
    }

    #[tokio::test]
    async fn test_start_and_lookup_errors() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "fake-tsc", "sleep 0.2\nexit 0");
        let mut runtime = Runtime::new(RuntimeConfig::new().with_max_concurrency(1)).unwrap();

        let first = runtime.submit(TaskConfig::new(script.to_string_lossy(), "a.json"), TaskObservers::new());
        let second = runtime.submit(TaskConfig::new(script.to_string_lossy(), "b.json"), TaskObservers::new());
        assert!(!second.lock().is_started());

        runtime.start(&second).unwrap();
        assert!(second.lock().is_running());
        assert!(matches!(
            runtime.start(&first),
            Err(RuntimeError::Core(CoreError::AlreadyStarted(_)))
        ));
        assert!(runtime.task(first.id()).unwrap().ptr_eq(&first));

        timeout(Duration::from_secs(10), runtime.run_until_idle())
            .await
            .unwrap()
            .unwrap();

        assert!(matches!(
            runtime.task(first.id()),
            Err(RuntimeError::Core(CoreError::TaskNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_missing_executable() {
        let mut runtime = Runtime::new(RuntimeConfig::default()).unwrap();
        let handle = runtime.submit(
            TaskConfig::new("/nonexistent/dir/tsc", "tsconfig.json"),
            TaskObservers::new(),
        );

        let task = handle.lock();
        assert!(task.is_ended());
        assert!(!task.is_started());
        assert_eq!(task.error().map(|e| e.code), Some(None));
        drop(task);
        assert!(runtime.orchestrator().is_idle());
    }

    #[tokio::test]
    async fn test_queue_limits_real_processes() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "fake-tsc", "sleep 0.2\nexit 0");
        let mut runtime = Runtime::new(RuntimeConfig::new().with_max_concurrency(1)).unwrap();

        let first = runtime.submit(TaskConfig::new(script.to_string_lossy(), "a.json"), TaskObservers::new());
        let second = runtime.submit(TaskConfig::new(script.to_string_lossy(), "b.json"), TaskObservers::new());

        assert!(first.lock().is_running());
        assert!(!second.lock().is_started());

        timeout(Duration::from_secs(10), runtime.run_until_idle())
            .await
            .unwrap()
            .unwrap();

        assert!(first.lock().is_ended());
        assert!(second.lock().is_ended());
        assert_eq!(second.lock().exit_status(), Some(0));
    }

    #[tokio::test]
    async fn test_watch_session_reports_and_stops() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(
            dir.path(),
            "fake-tsc",
            "echo '[1:00:00 PM] Starting incremental compilation...'\n\
             echo \"src/a.ts(1,1): error TS1005: ';' expected.\"\n\
             echo '[1:00:01 PM] Found 1 error. Watching for file changes.'\n\
             exec sleep 30",
        );
        let mut runtime = Runtime::new(RuntimeConfig::default()).unwrap();

        let ended = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&ended);
        let handle = runtime.submit(
            TaskConfig::new(script.to_string_lossy(), "tsconfig.json").with_watch(true),
            TaskObservers::new().on_ended(move |_| *flag.lock().unwrap() = true),
        );

        while !handle.lock().has_report() {
            let event = timeout(Duration::from_secs(10), runtime.next_event())
                .await
                .unwrap()
                .unwrap();
            runtime.dispatch(event);
        }

        assert_eq!(handle.lock().report().len(), 1);
        assert!(handle.lock().is_running());

        assert_eq!(runtime.stop_all(), 1);
        assert!(*ended.lock().unwrap());
        assert!(runtime.orchestrator().is_idle());
        assert_eq!(runtime.orchestrator().config().max_concurrency, 4);
    }
}
