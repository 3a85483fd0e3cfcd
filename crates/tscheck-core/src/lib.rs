//! Task orchestration for TypeScript compiler checks.
//!
//! This crate owns the lifecycle of checker runs:
//! - `Task` / `TaskHandle` - one invocation and its runtime state
//! - `TaskObservers` - composable started/report/error/ended callbacks
//! - `TaskRegistry` - in-flight tasks, used for dedup and slot accounting
//! - `AdmissionQueue` - FIFO backlog of tasks waiting for a slot
//! - `Orchestrator` - submit, start, stop and the output/exit handlers
//!
//! Processes are reached only through the `ProcessLauncher` trait, so the
//! whole state machine can be driven synchronously in tests.
//!
//! # Example
//!
//! ```
//! use tscheck_core::{TaskConfig, TaskObservers};
//!
//! let config = TaskConfig::new("tsc", "tsconfig.json").with_incremental(true);
//! let observers = TaskObservers::new()
//!     .on_ended(|task| println!("task {} ended", task.id()));
//!
//! assert_eq!(config.argv()[1], "--noEmit");
//! assert!(!observers.is_empty());
//! ```

pub mod config;
pub mod error;
pub mod launcher;
pub mod observer;
pub mod orchestrator;
pub mod queue;
pub mod registry;
pub mod task;

pub use config::{OrchestratorConfig, DEFAULT_MAX_CONCURRENCY};
pub use error::{CoreError, Result};
pub use launcher::{LaunchSpec, ProcessControl, ProcessLauncher};
pub use observer::{GlobalObservers, ObserverChain, TaskObservers};
pub use orchestrator::Orchestrator;
pub use queue::AdmissionQueue;
pub use registry::TaskRegistry;
pub use task::{
    CycleState, LifecycleState, Task, TaskConfig, TaskError, TaskHandle, TaskId, TaskSnapshot,
};
