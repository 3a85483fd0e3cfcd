//! FIFO admission queue.

use std::collections::VecDeque;

use tracing::trace;

use crate::task::{TaskHandle, TaskId};

/// Backlog of queue-managed tasks waiting for a concurrency slot.
///
/// Entries can go stale when a task is started directly or ends while
/// queued; stale entries are skipped when popped instead of being removed
/// eagerly.
#[derive(Debug, Default)]
pub struct AdmissionQueue {
    backlog: VecDeque<TaskHandle>,
}

impl AdmissionQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a task. Returns false for tasks that are not queue-managed.
    pub fn enqueue(&mut self, handle: TaskHandle) -> bool {
        if !handle.config().is_queue_managed() {
            return false;
        }
        trace!(task_id = %handle.id(), position = self.backlog.len(), "task queued");
        self.backlog.push_back(handle);
        true
    }

    /// Pops entries until one that can still be started is found.
    ///
    /// Must not be called while holding a task lock.
    pub fn pop_eligible(&mut self) -> Option<TaskHandle> {
        while let Some(handle) = self.backlog.pop_front() {
            if handle.lock().is_eligible() {
                return Some(handle);
            }
            trace!(task_id = %handle.id(), "skipping stale queue entry");
        }
        None
    }

    pub fn len(&self) -> usize {
        self.backlog.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backlog.is_empty()
    }

    /// Returns true if the task is somewhere in the backlog.
    pub fn contains(&self, id: TaskId) -> bool {
        self.backlog.iter().any(|handle| handle.id() == id)
    }

    /// Ids in admission order.
    pub fn ids(&self) -> Vec<TaskId> {
        self.backlog.iter().map(TaskHandle::id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::TaskObservers;
    use crate::task::{Task, TaskConfig};
    use chrono::Utc;

    fn handle(id: u64, config: TaskConfig) -> TaskHandle {
        TaskHandle::new(Task::new(TaskId::new(id), config, TaskObservers::new()))
    }

    #[test]
    fn test_fifo_order() {
        let mut queue = AdmissionQueue::new();
        for id in 1..=3 {
            assert!(queue.enqueue(handle(id, TaskConfig::new("tsc", "p.json"))));
        }

        assert_eq!(queue.ids(), vec![TaskId::new(1), TaskId::new(2), TaskId::new(3)]);
        assert_eq!(queue.pop_eligible().unwrap().id(), TaskId::new(1));
        assert_eq!(queue.pop_eligible().unwrap().id(), TaskId::new(2));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_rejects_unmanaged_tasks() {
        let mut queue = AdmissionQueue::new();
        assert!(!queue.enqueue(handle(1, TaskConfig::new("tsc", "p.json").with_watch(true))));
        assert!(!queue.enqueue(handle(2, TaskConfig::new("tsc", "p.json").with_queue(false))));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_stale_entries_are_skipped() {
        let mut queue = AdmissionQueue::new();
        let started = handle(1, TaskConfig::new("tsc", "a.json"));
        let ended = handle(2, TaskConfig::new("tsc", "b.json"));
        let fresh = handle(3, TaskConfig::new("tsc", "c.json"));

        queue.enqueue(started.clone());
        queue.enqueue(ended.clone());
        queue.enqueue(fresh);

        started.lock().mark_started(Utc::now());
        ended.lock().mark_ended(None);

        assert!(queue.contains(TaskId::new(2)));
        assert_eq!(queue.pop_eligible().unwrap().id(), TaskId::new(3));
        assert!(queue.pop_eligible().is_none());
    }
}
