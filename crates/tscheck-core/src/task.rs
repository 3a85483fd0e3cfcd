//! Task types: configuration, runtime state and shared handles.
//!
//! A `Task` is one invocation of the checker. Its configuration and argument
//! vector never change once built; everything else is runtime state written
//! by the `Orchestrator` only.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tscheck_parser::Diagnostic;

use crate::launcher::ProcessControl;
use crate::observer::TaskObservers;

/// Flag that switches the checker to type-check only.
pub const NO_EMIT_FLAG: &str = "--noEmit";
/// Flag that keeps the checker running and re-checking on change.
pub const WATCH_FLAG: &str = "--watch";
/// Short spelling of `WATCH_FLAG`.
pub const WATCH_SHORT_FLAG: &str = "-w";
/// Flag that enables incremental build info.
pub const INCREMENTAL_FLAG: &str = "--incremental";
/// Flag preceding the project path.
pub const PROJECT_FLAG: &str = "-p";

/// Unique, monotonically assigned task identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(u64);

impl TaskId {
    /// Wraps a raw id.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw id.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Immutable configuration of one checker invocation.
///
/// Built with `TaskConfig::new` and the `with_*` methods. Extra arguments
/// that duplicate the emit/watch/incremental switches are folded into the
/// corresponding setting and dropped from the tail.
///
/// # Example
///
/// ```
/// use tscheck_core::TaskConfig;
///
/// let config = TaskConfig::new("tsc", "tsconfig.json")
///     .with_args(["--watch", "--strict"]);
///
/// assert!(config.watch());
/// assert_eq!(
///     config.argv(),
///     vec!["tsc", "--noEmit", "--watch", "-p", "tsconfig.json", "--strict"]
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskConfig {
    executable: String,
    project: String,
    emit: bool,
    watch: bool,
    incremental: bool,
    extra_args: Vec<String>,
    queue: bool,
    allow_dedup: bool,
}

impl TaskConfig {
    /// Creates a check-only, one-shot, queued, dedup-enabled configuration.
    pub fn new(executable: impl Into<String>, project: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            project: project.into(),
            emit: false,
            watch: false,
            incremental: false,
            extra_args: Vec::new(),
            queue: true,
            allow_dedup: true,
        }
    }

    /// Sets whether output files are emitted.
    pub fn with_emit(mut self, emit: bool) -> Self {
        self.emit = emit;
        self
    }

    /// Sets watch mode.
    pub fn with_watch(mut self, watch: bool) -> Self {
        self.watch = watch;
        self
    }

    /// Sets incremental mode.
    pub fn with_incremental(mut self, incremental: bool) -> Self {
        self.incremental = incremental;
        self
    }

    /// Appends raw arguments, folding known switches into the settings.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for arg in args {
            let arg = arg.into();
            match arg.to_ascii_lowercase().as_str() {
                "--noemit" => self.emit = false,
                "--watch" | "-w" => self.watch = true,
                "--incremental" => self.incremental = true,
                _ => self.extra_args.push(arg),
            }
        }
        self
    }

    /// Sets whether the task waits in the admission queue.
    pub fn with_queue(mut self, queue: bool) -> Self {
        self.queue = queue;
        self
    }

    /// Sets whether the task may merge into an identical running task.
    pub fn with_dedup(mut self, allow_dedup: bool) -> Self {
        self.allow_dedup = allow_dedup;
        self
    }

    /// Returns the executable path.
    pub fn executable(&self) -> &str {
        &self.executable
    }

    /// Returns the project path.
    pub fn project(&self) -> &str {
        &self.project
    }

    /// Returns true if output files are emitted.
    pub fn emit(&self) -> bool {
        self.emit
    }

    /// Returns true for watch mode.
    pub fn watch(&self) -> bool {
        self.watch
    }

    /// Returns true for incremental mode.
    pub fn incremental(&self) -> bool {
        self.incremental
    }

    /// Returns the extra arguments left after folding.
    pub fn extra_args(&self) -> &[String] {
        &self.extra_args
    }

    /// Returns true if the task asked to be queued.
    pub fn queue(&self) -> bool {
        self.queue
    }

    /// Returns true if the task may be merged into a duplicate.
    pub fn allow_dedup(&self) -> bool {
        self.allow_dedup
    }

    /// Returns true if the task goes through the admission queue.
    ///
    /// Watch sessions are long-lived and never hold a concurrency slot.
    pub fn is_queue_managed(&self) -> bool {
        self.queue && !self.watch
    }

    /// Builds the argument vector, which is also the dedup key.
    pub fn argv(&self) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.extra_args.len() + 6);
        argv.push(self.executable.clone());
        if !self.emit {
            argv.push(NO_EMIT_FLAG.to_string());
        }
        if self.watch {
            argv.push(WATCH_FLAG.to_string());
        }
        if self.incremental {
            argv.push(INCREMENTAL_FLAG.to_string());
        }
        argv.push(PROJECT_FLAG.to_string());
        argv.push(self.project.clone());
        argv.extend(self.extra_args.iter().cloned());
        argv
    }
}

/// Last error recorded on a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskError {
    /// Checker error code; absent when the error did not come from the checker.
    pub code: Option<u32>,
    /// Human-readable message.
    pub message: String,
}

impl TaskError {
    /// An error reported by the checker itself.
    pub fn compiler(code: u32, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
        }
    }

    /// An error raised before or around the checker (missing binary, spawn failure).
    pub fn uncoded(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "error TS{}: {}", code, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Overall lifecycle of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Built and registered, waiting to start.
    #[default]
    Pending,
    /// Process spawned and output is being processed.
    Running,
    /// Terminal.
    Ended,
}

/// State of the current reporting cycle.
///
/// One-shot runs go through a single cycle; watch sessions repeat
/// `Buffering -> Reported | Failed` for every recompilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CycleState {
    /// No cycle has finished yet.
    #[default]
    Idle,
    /// A recompilation started and the report is being rebuilt.
    Buffering,
    /// The cycle finished with a report.
    Reported,
    /// The cycle finished with a checker error.
    Failed,
}

impl CycleState {
    /// Returns true once the cycle produced a report or an error.
    pub fn is_finished(&self) -> bool {
        matches!(self, CycleState::Reported | CycleState::Failed)
    }
}

/// One tracked invocation of the checker.
pub struct Task {
    id: TaskId,
    config: Arc<TaskConfig>,
    argv: Arc<[String]>,
    observers: TaskObservers,
    started: bool,
    running: bool,
    ended: bool,
    cycle: CycleState,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    error: Option<TaskError>,
    report: Vec<Diagnostic>,
    exit_status: Option<i32>,
    process: Option<Box<dyn ProcessControl>>,
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("argv", &self.argv)
            .field("lifecycle", &self.lifecycle())
            .field("cycle", &self.cycle)
            .field("error", &self.error)
            .field("report_len", &self.report.len())
            .field("process", &self.process.as_ref().and_then(|p| p.id()))
            .finish()
    }
}

impl Task {
    /// Creates a pending task.
    pub fn new(id: TaskId, config: TaskConfig, observers: TaskObservers) -> Self {
        let argv: Arc<[String]> = config.argv().into();
        Self {
            id,
            config: Arc::new(config),
            argv,
            observers,
            started: false,
            running: false,
            ended: false,
            cycle: CycleState::Idle,
            started_at: None,
            finished_at: None,
            error: None,
            report: Vec::new(),
            exit_status: None,
            process: None,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn config(&self) -> &TaskConfig {
        &self.config
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Returns true between a watch-mode cycle start and its completion.
    pub fn is_buffering(&self) -> bool {
        self.cycle == CycleState::Buffering
    }

    /// Returns true if the last cycle produced a report without error.
    pub fn has_report(&self) -> bool {
        self.cycle == CycleState::Reported
    }

    pub fn cycle(&self) -> CycleState {
        self.cycle
    }

    pub fn lifecycle(&self) -> LifecycleState {
        if self.ended {
            LifecycleState::Ended
        } else if self.running {
            LifecycleState::Running
        } else {
            LifecycleState::Pending
        }
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// Duration of the last completed cycle.
    pub fn elapsed(&self) -> Option<Duration> {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) if end >= start => Some(end - start),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&TaskError> {
        self.error.as_ref()
    }

    /// Diagnostics accumulated for the current cycle.
    pub fn report(&self) -> &[Diagnostic] {
        &self.report
    }

    pub fn exit_status(&self) -> Option<i32> {
        self.exit_status
    }

    /// Returns true while an OS process is attached.
    pub fn has_process(&self) -> bool {
        self.process.is_some()
    }

    /// Returns true if a queued run is still waiting for admission.
    pub fn is_eligible(&self) -> bool {
        !self.started && !self.running && !self.ended
    }

    pub(crate) fn observers(&self) -> &TaskObservers {
        &self.observers
    }

    pub(crate) fn observers_mut(&mut self) -> &mut TaskObservers {
        &mut self.observers
    }

    pub(crate) fn take_observers(&mut self) -> TaskObservers {
        std::mem::take(&mut self.observers)
    }

    pub(crate) fn mark_started(&mut self, now: DateTime<Utc>) {
        self.started = true;
        self.running = true;
        self.started_at = Some(now);
    }

    pub(crate) fn attach_process(&mut self, process: Box<dyn ProcessControl>) {
        self.process = Some(process);
    }

    pub(crate) fn begin_cycle(&mut self, now: DateTime<Utc>) {
        self.cycle = CycleState::Buffering;
        self.report.clear();
        self.error = None;
        self.started_at = Some(now);
    }

    pub(crate) fn append_report(&mut self, entries: Vec<Diagnostic>) {
        self.report.extend(entries);
    }

    /// Finishes the open cycle with its report.
    ///
    /// Returns false, changing nothing, if the cycle already finished and no
    /// new one has started; a failed cycle keeps its error.
    pub(crate) fn complete_cycle(&mut self, now: DateTime<Utc>) -> bool {
        if self.cycle.is_finished() {
            return false;
        }
        self.cycle = CycleState::Reported;
        self.finished_at = Some(now);
        true
    }

    pub(crate) fn fail_cycle(&mut self, now: DateTime<Utc>, error: TaskError) {
        self.cycle = CycleState::Failed;
        self.report.clear();
        self.error = Some(error);
        self.finished_at = Some(now);
    }

    /// Ends a task that never started.
    pub(crate) fn reject(&mut self, now: DateTime<Utc>, error: TaskError) {
        self.ended = true;
        self.error = Some(error);
        self.finished_at = Some(now);
    }

    /// Ends a task whose process could not be spawned.
    pub(crate) fn fail_launch(&mut self, now: DateTime<Utc>, error: TaskError) {
        self.running = false;
        self.ended = true;
        self.process = None;
        self.error = Some(error);
        self.finished_at = Some(now);
    }

    /// Marks the task ended and detaches its process handle.
    pub(crate) fn mark_ended(&mut self, exit_status: Option<i32>) -> Option<Box<dyn ProcessControl>> {
        self.running = false;
        self.ended = true;
        self.exit_status = exit_status;
        self.process.take()
    }

    /// Read-only, serializable view of the task.
    pub fn snapshot(&self) -> TaskSnapshot {
        TaskSnapshot {
            id: self.id,
            argv: self.argv.to_vec(),
            lifecycle: self.lifecycle(),
            cycle: self.cycle,
            started_at: self.started_at,
            finished_at: self.finished_at,
            error: self.error.clone(),
            report: self.report.clone(),
            exit_status: self.exit_status,
        }
    }
}

/// Serializable copy of a task's state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub id: TaskId,
    pub argv: Vec<String>,
    pub lifecycle: LifecycleState,
    pub cycle: CycleState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<TaskError>,
    #[serde(default)]
    pub report: Vec<Diagnostic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_status: Option<i32>,
}

/// Shared reference to a task.
///
/// Cloning is cheap; all clones refer to the same task. The id, config and
/// argument vector are readable without locking.
///
/// Observers are invoked while the orchestrator holds the task lock and
/// receive the task by reference. Locking the same handle from inside an
/// observer deadlocks.
#[derive(Clone)]
pub struct TaskHandle {
    id: TaskId,
    config: Arc<TaskConfig>,
    argv: Arc<[String]>,
    inner: Arc<Mutex<Task>>,
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.id)
            .field("argv", &self.argv)
            .finish()
    }
}

impl TaskHandle {
    /// Wraps a task in a shared handle.
    pub fn new(task: Task) -> Self {
        Self {
            id: task.id,
            config: Arc::clone(&task.config),
            argv: Arc::clone(&task.argv),
            inner: Arc::new(Mutex::new(task)),
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn config(&self) -> &TaskConfig {
        &self.config
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    /// Locks the task for reading or (crate-internal) writing.
    ///
    /// A poisoned lock is recovered: task state stays consistent because
    /// every transition is a handful of field writes.
    pub fn lock(&self) -> MutexGuard<'_, Task> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns a serializable copy of the task's current state.
    pub fn snapshot(&self) -> TaskSnapshot {
        self.lock().snapshot()
    }

    /// Returns true if both handles refer to the same task.
    pub fn ptr_eq(&self, other: &TaskHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
