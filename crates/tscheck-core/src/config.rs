//! Orchestrator configuration.

use std::sync::Arc;

use tscheck_parser::Diagnostic;

use crate::observer::GlobalObservers;
use crate::task::{Task, TaskError};

/// Default number of queue-managed tasks allowed to run at once.
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Process-wide settings shared by every task.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Maximum queue-managed tasks running concurrently.
    pub max_concurrency: usize,
    /// Observers invoked for every task.
    pub observers: GlobalObservers,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            observers: GlobalObservers::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Creates a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum concurrency.
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max;
        self
    }

    /// Sets the global "started" observer.
    pub fn on_started<F>(mut self, observer: F) -> Self
    where
        F: Fn(&Task) + Send + Sync + 'static,
    {
        self.observers.started = Some(Arc::new(observer));
        self
    }

    /// Sets the global "report" observer.
    pub fn on_report<F>(mut self, observer: F) -> Self
    where
        F: Fn(&Task, &[Diagnostic]) + Send + Sync + 'static,
    {
        self.observers.report = Some(Arc::new(observer));
        self
    }

    /// Sets the global "error" observer.
    pub fn on_error<F>(mut self, observer: F) -> Self
    where
        F: Fn(&Task, &TaskError) + Send + Sync + 'static,
    {
        self.observers.error = Some(Arc::new(observer));
        self
    }

    /// Sets the global "ended" observer.
    pub fn on_ended<F>(mut self, observer: F) -> Self
    where
        F: Fn(&Task) + Send + Sync + 'static,
    {
        self.observers.ended = Some(Arc::new(observer));
        self
    }
}
