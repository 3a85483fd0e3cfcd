//! Registry of pending and running tasks.

use std::collections::BTreeMap;

use crate::task::{TaskHandle, TaskId};

/// The set of tasks that have not ended, keyed by id.
///
/// Used for dedup lookups by argument vector and for concurrency
/// accounting. Entries are removed one by one as tasks end; there is no
/// bulk reset.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: BTreeMap<TaskId, TaskHandle>,
}

impl TaskRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a task. Replaces any entry with the same id.
    pub fn register(&mut self, handle: TaskHandle) {
        self.tasks.insert(handle.id(), handle);
    }

    /// Returns the oldest task whose argument vector equals `argv`.
    pub fn find_duplicate(&self, argv: &[String]) -> Option<TaskHandle> {
        self.tasks
            .values()
            .find(|handle| handle.argv() == argv)
            .cloned()
    }

    /// Removes a task, returning it if it was registered.
    pub fn remove(&mut self, id: TaskId) -> Option<TaskHandle> {
        self.tasks.remove(&id)
    }

    pub fn get(&self, id: TaskId) -> Option<&TaskHandle> {
        self.tasks.get(&id)
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.tasks.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// All registered tasks in id order.
    pub fn tasks(&self) -> &BTreeMap<TaskId, TaskHandle> {
        &self.tasks
    }

    /// Counts running tasks that hold an admission slot.
    ///
    /// Locks each queue-managed task briefly; callers must not hold a task
    /// lock while calling this.
    pub fn running_queue_managed(&self) -> usize {
        self.tasks
            .values()
            .filter(|handle| handle.config().is_queue_managed())
            .filter(|handle| handle.lock().is_running())
            .count()
    }
}
