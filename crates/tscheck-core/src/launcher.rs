//! Seam between the orchestrator and the operating system.
//!
//! The orchestrator never touches processes directly. A `ProcessLauncher`
//! spawns the argument vector and arranges for output chunks and the exit
//! notification to be fed back through `Orchestrator::handle_output` and
//! `Orchestrator::handle_exit`.

use crate::error::Result;
use crate::task::TaskId;

/// What to launch.
#[derive(Debug, Clone, Copy)]
pub struct LaunchSpec<'a> {
    /// Task the process belongs to; used to route its events back.
    pub task_id: TaskId,
    /// Full argument vector, executable first.
    pub argv: &'a [String],
    /// Whether the process runs in watch mode.
    pub watch: bool,
}

/// Control over one spawned process.
pub trait ProcessControl: Send {
    /// OS process id, if known.
    fn id(&self) -> Option<u32>;

    /// Requests termination. Returns immediately; the exit is reported
    /// asynchronously.
    fn terminate(&mut self);
}

/// Spawns checker processes.
pub trait ProcessLauncher {
    /// Returns true if `executable` can be invoked.
    fn is_invocable(&self, executable: &str) -> bool;

    /// Spawns the process described by `spec`.
    fn spawn(&mut self, spec: LaunchSpec<'_>) -> Result<Box<dyn ProcessControl>>;
}
