//! Process events delivered to the reactor.

use tscheck_core::TaskId;

/// Events produced by spawned checker processes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    /// A chunk of stdout. An empty chunk marks the end of the stream.
    Output {
        /// Task the process belongs to.
        task_id: TaskId,
        /// One or more complete lines.
        chunk: String,
    },
    /// The process terminated.
    Exited {
        /// Task the process belongs to.
        task_id: TaskId,
        /// Exit code, absent when killed by a signal.
        status: Option<i32>,
    },
}

impl ProcessEvent {
    /// Returns the task this event belongs to.
    pub fn task_id(&self) -> TaskId {
        match self {
            ProcessEvent::Output { task_id, .. } => *task_id,
            ProcessEvent::Exited { task_id, .. } => *task_id,
        }
    }

    /// Returns true if this is an exit notification.
    pub fn is_exit(&self) -> bool {
        matches!(self, ProcessEvent::Exited { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_task_id() {
        let id = TaskId::new(4);

        let event = ProcessEvent::Output {
            task_id: id,
            chunk: "Watching for file changes.".to_string(),
        };
        assert_eq!(event.task_id(), id);
        assert!(!event.is_exit());

        let event = ProcessEvent::Exited {
            task_id: id,
            status: Some(0),
        };
        assert_eq!(event.task_id(), id);
        assert!(event.is_exit());
    }
}
