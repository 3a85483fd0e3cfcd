//! Output parsing for TypeScript compiler runs.
//!
//! This crate turns raw `tsc` output into structured values:
//! - `classify` - maps one chunk of output to an `OutputEvent`
//! - `parse_diagnostics` - extracts `Diagnostic` entries from report text
//! - `patterns` - the compiled line grammars and watch-mode markers
//!
//! Classification is stateless: every call looks only at the chunk it is
//! given and the watch flag supplied by the caller.
//!
//! # Example
//!
//! ```
//! use tscheck_parser::{classify, OutputEvent};
//!
//! let chunk = "src/a.ts(10,5): error TS2322: Type 'string' is not assignable to type 'number'.";
//! match classify(Some(chunk), false) {
//!     OutputEvent::ReportData(entries) => {
//!         assert_eq!(entries.len(), 1);
//!         assert_eq!(entries[0].code, 2322);
//!     }
//!     other => panic!("unexpected event: {:?}", other),
//! }
//! ```

pub mod classify;
pub mod diagnostic;
pub mod event;
pub mod patterns;

pub use classify::{classify, parse_diagnostics};
pub use diagnostic::Diagnostic;
pub use event::{FatalError, OutputEvent};
