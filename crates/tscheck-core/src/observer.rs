//! Observer chains for task events.
//!
//! Each task carries four chains (started, report, error, ended). Merging a
//! duplicate submission appends its observers to the existing chains, so
//! every submitter hears every event in registration order.

use std::fmt;
use std::sync::Arc;

use tscheck_parser::Diagnostic;

use crate::task::{Task, TaskError};

/// Observer for lifecycle events (started, ended).
pub type TaskCallback = dyn Fn(&Task) + Send + Sync;

/// Observer for finished reporting cycles.
pub type ReportCallback = dyn Fn(&Task, &[Diagnostic]) + Send + Sync;

/// Observer for task errors.
pub type ErrorCallback = dyn Fn(&Task, &TaskError) + Send + Sync;

/// Ordered list of observers for one event.
pub struct ObserverChain<F: ?Sized> {
    observers: Vec<Arc<F>>,
}

impl<F: ?Sized> ObserverChain<F> {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self {
            observers: Vec::new(),
        }
    }

    /// Appends one observer.
    pub fn push(&mut self, observer: Arc<F>) {
        self.observers.push(observer);
    }

    /// Moves every observer of `other` to the end of this chain.
    pub fn append(&mut self, other: &mut ObserverChain<F>) {
        self.observers.append(&mut other.observers);
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Iterates observers in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &F> {
        self.observers.iter().map(|observer| observer.as_ref())
    }
}

impl<F: ?Sized> Default for ObserverChain<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: ?Sized> Clone for ObserverChain<F> {
    fn clone(&self) -> Self {
        Self {
            observers: self.observers.clone(),
        }
    }
}

impl<F: ?Sized> fmt::Debug for ObserverChain<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverChain")
            .field("len", &self.observers.len())
            .finish()
    }
}

impl ObserverChain<TaskCallback> {
    pub fn fire(&self, task: &Task) {
        for observer in self.iter() {
            observer(task);
        }
    }
}

impl ObserverChain<ReportCallback> {
    pub fn fire(&self, task: &Task, report: &[Diagnostic]) {
        for observer in self.iter() {
            observer(task, report);
        }
    }
}

impl ObserverChain<ErrorCallback> {
    pub fn fire(&self, task: &Task, error: &TaskError) {
        for observer in self.iter() {
            observer(task, error);
        }
    }
}

/// The four observer chains attached to a task.
///
/// Observers that are never registered cost nothing: there is no no-op
/// placeholder, an absent observer simply adds no entry.
///
/// # Example
///
/// ```
/// use tscheck_core::TaskObservers;
///
/// let observers = TaskObservers::new()
///     .on_report(|task, report| println!("task {}: {} diagnostics", task.id(), report.len()))
///     .on_error(|task, error| eprintln!("task {}: {}", task.id(), error));
///
/// assert_eq!(observers.report.len(), 1);
/// assert!(observers.started.is_empty());
/// ```
#[derive(Clone, Debug, Default)]
pub struct TaskObservers {
    pub started: ObserverChain<TaskCallback>,
    pub report: ObserverChain<ReportCallback>,
    pub error: ObserverChain<ErrorCallback>,
    pub ended: ObserverChain<TaskCallback>,
}

impl TaskObservers {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a "started" observer.
    pub fn on_started<F>(mut self, observer: F) -> Self
    where
        F: Fn(&Task) + Send + Sync + 'static,
    {
        self.started.push(Arc::new(observer));
        self
    }

    /// Adds a "report" observer.
    pub fn on_report<F>(mut self, observer: F) -> Self
    where
        F: Fn(&Task, &[Diagnostic]) + Send + Sync + 'static,
    {
        self.report.push(Arc::new(observer));
        self
    }

    /// Adds an "error" observer.
    pub fn on_error<F>(mut self, observer: F) -> Self
    where
        F: Fn(&Task, &TaskError) + Send + Sync + 'static,
    {
        self.error.push(Arc::new(observer));
        self
    }

    /// Adds an "ended" observer.
    pub fn on_ended<F>(mut self, observer: F) -> Self
    where
        F: Fn(&Task) + Send + Sync + 'static,
    {
        self.ended.push(Arc::new(observer));
        self
    }

    /// Appends every chain of `other` after the matching chain of `self`.
    pub fn merge(&mut self, mut other: TaskObservers) {
        self.started.append(&mut other.started);
        self.report.append(&mut other.report);
        self.error.append(&mut other.error);
        self.ended.append(&mut other.ended);
    }

    /// Returns true if no observer is registered for any event.
    pub fn is_empty(&self) -> bool {
        self.started.is_empty()
            && self.report.is_empty()
            && self.error.is_empty()
            && self.ended.is_empty()
    }
}

/// Process-wide observer slots, invoked for every task after its own chain.
#[derive(Clone, Default)]
pub struct GlobalObservers {
    pub started: Option<Arc<TaskCallback>>,
    pub report: Option<Arc<ReportCallback>>,
    pub error: Option<Arc<ErrorCallback>>,
    pub ended: Option<Arc<TaskCallback>>,
}

impl fmt::Debug for GlobalObservers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobalObservers")
            .field("started", &self.started.is_some())
            .field("report", &self.report.is_some())
            .field("error", &self.error.is_some())
            .field("ended", &self.ended.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::task::{TaskConfig, TaskId};

    fn sample_task() -> Task {
        Task::new(TaskId::new(1), TaskConfig::new("tsc", "p.json"), TaskObservers::new())
    }

    #[test]
    fn test_chain_fires_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));

        let first = Arc::clone(&log);
        let second = Arc::clone(&log);
        let mut observers = TaskObservers::new()
            .on_started(move |_| first.lock().unwrap().push("first"));
        observers.merge(TaskObservers::new().on_started(move |_| second.lock().unwrap().push("second")));

        observers.started.fire(&sample_task());
        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn test_merge_keeps_chains_separate() {
        let mut a = TaskObservers::new().on_report(|_, _| {});
        let b = TaskObservers::new().on_error(|_, _| {}).on_ended(|_| {});
        a.merge(b);

        assert_eq!(a.report.len(), 1);
        assert_eq!(a.error.len(), 1);
        assert_eq!(a.ended.len(), 1);
        assert!(a.started.is_empty());
    }

    #[test]
    fn test_empty_observers_absorb_merge() {
        let mut a = TaskObservers::new().on_started(|_| {});
        a.merge(TaskObservers::new());

        assert_eq!(a.started.len(), 1);
        assert!(TaskObservers::new().is_empty());
    }

    #[test]
    fn test_report_chain_receives_report() {
        let seen = Arc::new(Mutex::new(0usize));
        let counter = Arc::clone(&seen);
        let observers = TaskObservers::new()
            .on_report(move |_, report| *counter.lock().unwrap() += report.len());

        let report = vec![
            Diagnostic::new(1, "a.ts", 1, 1, "x"),
            Diagnostic::new(2, "b.ts", 2, 2, "y"),
        ];
        observers.report.fire(&sample_task(), &report);

        assert_eq!(*seen.lock().unwrap(), 2);
    }
}
