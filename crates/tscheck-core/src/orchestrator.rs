//! Task orchestration: submission, dedup, admission and lifecycle.

use std::collections::BTreeMap;

use chrono::Utc;
use tracing::{debug, info, trace, warn};
use tscheck_parser::{classify, OutputEvent};

use crate::config::OrchestratorConfig;
use crate::error::{CoreError, Result};
use crate::launcher::{LaunchSpec, ProcessLauncher};
use crate::observer::TaskObservers;
use crate::queue::AdmissionQueue;
use crate::registry::TaskRegistry;
use crate::task::{Task, TaskConfig, TaskError, TaskHandle, TaskId};

/// Drives task lifecycles.
///
/// All methods run on the caller's thread and never block on a process.
/// Output and exit notifications must be delivered one at a time, in the
/// order they were produced, through `handle_output` and `handle_exit`.
///
/// # Example
///
/// ```ignore
/// use tscheck_core::{Orchestrator, OrchestratorConfig, TaskConfig, TaskObservers};
///
/// let mut orchestrator = Orchestrator::new(OrchestratorConfig::new(), launcher);
/// let task = orchestrator.submit(
///     TaskConfig::new("tsc", "tsconfig.json"),
///     TaskObservers::new().on_report(|_, report| println!("{} diagnostics", report.len())),
/// );
///
/// // later, from the event loop
/// orchestrator.handle_output(task.id(), Some("src/a.ts(1,1): error TS1005: ';' expected."));
/// orchestrator.handle_output(task.id(), None);
/// orchestrator.handle_exit(task.id(), Some(2));
/// ```
pub struct Orchestrator<L> {
    config: OrchestratorConfig,
    launcher: L,
    registry: TaskRegistry,
    queue: AdmissionQueue,
    next_id: u64,
}

impl<L: ProcessLauncher> Orchestrator<L> {
    /// Creates an orchestrator with an empty registry and queue.
    pub fn new(config: OrchestratorConfig, launcher: L) -> Self {
        Self {
            config,
            launcher,
            registry: TaskRegistry::new(),
            queue: AdmissionQueue::new(),
            next_id: 0,
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Mutable access to concurrency and global observers.
    ///
    /// Raising `max_concurrency` takes effect on the next `flush`.
    pub fn config_mut(&mut self) -> &mut OrchestratorConfig {
        &mut self.config
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    pub fn launcher_mut(&mut self) -> &mut L {
        &mut self.launcher
    }

    /// All tasks that have not ended, keyed by id.
    pub fn tasks(&self) -> &BTreeMap<TaskId, TaskHandle> {
        self.registry.tasks()
    }

    /// Looks up a live task.
    pub fn task(&self, id: TaskId) -> Result<TaskHandle> {
        self.registry
            .get(id)
            .cloned()
            .ok_or(CoreError::TaskNotFound(id))
    }

    /// Number of tasks waiting in the admission queue, stale entries included.
    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }

    /// Number of running tasks holding an admission slot.
    pub fn running_count(&self) -> usize {
        self.registry.running_queue_managed()
    }

    /// Returns true when no task is pending or running.
    pub fn is_idle(&self) -> bool {
        self.registry.is_empty()
    }

    /// Submits a run.
    ///
    /// Returns the canonical handle: the existing task if the submission
    /// was merged into an identical in-flight run, otherwise the new task.
    /// If the executable cannot be invoked the returned task has already
    /// ended with an uncoded error and its error observers have fired.
    pub fn submit(&mut self, config: TaskConfig, observers: TaskObservers) -> TaskHandle {
        self.next_id += 1;
        let id = TaskId::new(self.next_id);
        let handle = TaskHandle::new(Task::new(id, config, observers));

        let executable = handle.config().executable().to_string();
        if !self.launcher.is_invocable(&executable) {
            warn!(task_id = %id, executable = %executable, "executable unavailable");
            let mut task = handle.lock();
            let error = CoreError::ExecutableUnavailable(executable);
            task.reject(Utc::now(), TaskError::uncoded(error.to_string()));
            self.notify_error(&task);
            drop(task);
            return handle;
        }

        if handle.config().allow_dedup() {
            if let Some(existing) = self.registry.find_duplicate(handle.argv()) {
                let observers = handle.lock().take_observers();
                self.merge_into(&existing, id, observers);
                return existing;
            }
        }

        debug!(task_id = %id, argv = ?handle.argv(), "task registered");
        self.registry.register(handle.clone());

        if self.queue.enqueue(handle.clone()) {
            self.flush();
        } else if let Err(err) = self.start(&handle) {
            debug!(task_id = %id, error = %err, "task failed to start");
        }

        handle
    }

    /// Appends `observers` to an in-flight task and replays what they missed.
    fn merge_into(&self, existing: &TaskHandle, merged_id: TaskId, observers: TaskObservers) {
        let mut task = existing.lock();
        debug!(
            task_id = %existing.id(),
            merged = %merged_id,
            "merging duplicate submission"
        );

        if task.is_started() {
            observers.started.fire(&task);
        }
        if task.cycle().is_finished() {
            observers.report.fire(&task, task.report());
        }
        if let Some(error) = task.error() {
            observers.error.fire(&task, error);
        }
        if task.is_ended() {
            observers.ended.fire(&task);
        }

        task.observers_mut().merge(observers);
    }

    /// Starts a task now, bypassing the admission queue.
    ///
    /// A queued task started this way leaves a stale queue entry that
    /// `flush` skips. On spawn failure the task ends with an uncoded error
    /// and its error observers fire; "started" never fires.
    pub fn start(&mut self, handle: &TaskHandle) -> Result<()> {
        let result = self.launch(handle);
        if result.is_err() {
            self.flush();
        }
        result
    }

    fn launch(&mut self, handle: &TaskHandle) -> Result<()> {
        let id = handle.id();
        {
            let mut task = handle.lock();
            if !task.is_eligible() {
                return Err(CoreError::AlreadyStarted(id));
            }
            task.mark_started(Utc::now());
        }

        let spec = LaunchSpec {
            task_id: id,
            argv: handle.argv(),
            watch: handle.config().watch(),
        };

        match self.launcher.spawn(spec) {
            Ok(process) => {
                info!(task_id = %id, pid = ?process.id(), argv = ?handle.argv(), "task started");
                let mut task = handle.lock();
                task.attach_process(process);
                self.notify_started(&task);
                Ok(())
            }
            Err(err) => {
                warn!(task_id = %id, error = %err, "failed to spawn task");
                {
                    let mut task = handle.lock();
                    task.fail_launch(Utc::now(), TaskError::uncoded(err.to_string()));
                    self.notify_error(&task);
                }
                self.registry.remove(id);
                Err(err)
            }
        }
    }

    /// Stops a started task.
    ///
    /// Flips the task to ended immediately, requests process termination,
    /// fires "ended" and frees its admission slot. Output or exit
    /// notifications that arrive afterwards are discarded. Returns false if
    /// the task never started or has already ended.
    pub fn stop(&mut self, handle: &TaskHandle) -> bool {
        let id = handle.id();
        {
            let mut task = handle.lock();
            if !task.is_started() || task.is_ended() {
                return false;
            }
            if let Some(mut process) = task.mark_ended(None) {
                process.terminate();
            }
            info!(task_id = %id, "task stopped");
            self.notify_ended(&task);
        }

        self.registry.remove(id);
        self.flush();
        true
    }

    /// Feeds one chunk of process output to a task.
    ///
    /// `None` or an empty chunk marks the end of the output stream.
    pub fn handle_output(&mut self, id: TaskId, chunk: Option<&str>) {
        let Some(handle) = self.registry.get(id).cloned() else {
            trace!(task_id = %id, "output for unknown task ignored");
            return;
        };

        let mut task = handle.lock();
        if !task.is_running() {
            trace!(task_id = %id, "output for stopped task ignored");
            return;
        }

        let event = classify(chunk, task.config().watch());
        trace!(
            task_id = %id,
            kind = event.kind(),
            ends_cycle = event.ends_cycle(),
            "output classified"
        );

        match event {
            OutputEvent::CycleStart => {
                debug!(task_id = %id, "cycle started");
                task.begin_cycle(Utc::now());
            }
            OutputEvent::ReportData(entries) => {
                task.append_report(entries);
            }
            OutputEvent::EndOfSession => {
                if !task.complete_cycle(Utc::now()) {
                    trace!(task_id = %id, cycle = ?task.cycle(), "end of output after a finished cycle ignored");
                    return;
                }
                debug!(task_id = %id, diagnostics = task.report().len(), "report ready");
                self.notify_report(&task);
            }
            OutputEvent::FatalError(fatal) => {
                warn!(task_id = %id, code = fatal.code, message = %fatal.message, "checker reported a fatal error");
                task.fail_cycle(Utc::now(), TaskError::compiler(fatal.code, fatal.message));
                self.notify_report(&task);
                self.notify_error(&task);
            }
        }
    }

    /// Handles a process that terminated on its own.
    pub fn handle_exit(&mut self, id: TaskId, status: Option<i32>) {
        let Some(handle) = self.registry.remove(id) else {
            trace!(task_id = %id, "exit for unknown task ignored");
            return;
        };

        {
            let mut task = handle.lock();
            if task.is_ended() {
                return;
            }
            // The process is gone; drop the handle without terminating.
            drop(task.mark_ended(status));
            info!(task_id = %id, status = ?status, "task exited");
            self.notify_ended(&task);
        }

        self.flush();
    }

    /// Promotes queued tasks while admission slots are free.
    ///
    /// Safe to call at any time; does nothing when the queue is empty or
    /// the concurrency limit is reached.
    pub fn flush(&mut self) {
        while !self.queue.is_empty() {
            let running = self.registry.running_queue_managed();
            if running >= self.config.max_concurrency {
                trace!(
                    running,
                    max = self.config.max_concurrency,
                    queued = self.queue.len(),
                    "admission limit reached"
                );
                return;
            }

            let Some(handle) = self.queue.pop_eligible() else {
                return;
            };

            if let Err(err) = self.launch(&handle) {
                debug!(task_id = %handle.id(), error = %err, "queued task failed to start");
            }
        }
    }

    fn notify_started(&self, task: &Task) {
        task.observers().started.fire(task);
        if let Some(observer) = self.config.observers.started.as_deref() {
            observer(task);
        }
    }

    fn notify_report(&self, task: &Task) {
        task.observers().report.fire(task, task.report());
        if let Some(observer) = self.config.observers.report.as_deref() {
            observer(task, task.report());
        }
    }

    fn notify_error(&self, task: &Task) {
        let Some(error) = task.error() else {
            return;
        };
        task.observers().error.fire(task, error);
        if let Some(observer) = self.config.observers.error.as_deref() {
            observer(task, error);
        }
    }

    fn notify_ended(&self, task: &Task) {
        task.observers().ended.fire(task);
        if let Some(observer) = self.config.observers.ended.as_deref() {
            observer(task);
        }
    }
}
