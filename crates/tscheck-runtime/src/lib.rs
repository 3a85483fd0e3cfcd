//! Async runtime for tscheck.
//!
//! This crate connects the orchestrator to real processes:
//! - `TokioLauncher` - spawns the checker and forwards its output
//! - `LineChunker` - groups raw stdout into self-delimited chunks
//! - `Runtime` - reactor applying process events one at a time
//!
//! # Example
//!
//! ```ignore
//! use tscheck_core::{TaskConfig, TaskObservers};
//! use tscheck_runtime::{Runtime, RuntimeConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut runtime = Runtime::new(RuntimeConfig::from_env()?)?;
//!
//!     runtime.submit(
//!         TaskConfig::new("tsc", "tsconfig.json"),
//!         TaskObservers::new().on_report(|task, report| {
//!             println!("task {}: {} diagnostics", task.id(), report.len());
//!         }),
//!     );
//!
//!     runtime.run_until_idle().await?;
//!     Ok(())
//! }
//! ```

pub mod chunker;
pub mod config;
pub mod error;
pub mod event;
pub mod launcher;
pub mod runtime;

pub use chunker::LineChunker;
pub use config::{RuntimeConfig, MAX_CONCURRENCY_ENV};
pub use error::{Result, RuntimeError};
pub use event::ProcessEvent;
pub use launcher::{TokioLauncher, TokioProcess};
pub use runtime::Runtime;
