//! Classified output events.

use crate::diagnostic::Diagnostic;

/// A compiler-level error that is not tied to a file, e.g. a broken
/// project file or an unknown flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FatalError {
    /// Numeric part of the `TSxxxx` code.
    pub code: u32,
    /// Message text following the code.
    pub message: String,
}

/// The single event produced for one chunk of output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputEvent {
    /// The run finished (one-shot) or a watch cycle completed.
    EndOfSession,
    /// A watch-mode recompilation started.
    CycleStart,
    /// The checker reported a fatal error.
    FatalError(FatalError),
    /// Diagnostic entries found in the chunk. May be empty.
    ReportData(Vec<Diagnostic>),
}

impl OutputEvent {
    /// Returns true if this event completes a reporting cycle.
    pub fn ends_cycle(&self) -> bool {
        matches!(self, OutputEvent::EndOfSession | OutputEvent::FatalError(_))
    }

    /// Returns a short label for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            OutputEvent::EndOfSession => "end_of_session",
            OutputEvent::CycleStart => "cycle_start",
            OutputEvent::FatalError(_) => "fatal_error",
            OutputEvent::ReportData(_) => "report_data",
        }
    }
}
