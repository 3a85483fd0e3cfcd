//! Line grammars and markers for `tsc` output.

use regex::{Captures, Regex};
use std::sync::OnceLock;

/// Substring printed when a watch-mode recompilation begins.
pub const CYCLE_START_MARKER: &str = "Starting incremental compilation";

/// Substring printed when a watch-mode cycle has finished reporting.
pub const WATCHING_MARKER: &str = "Watching for file changes";

/// A compiled, named pattern.
#[derive(Debug)]
pub struct Pattern {
    /// The regex pattern.
    regex: Regex,
}

impl Pattern {
    /// Creates a new pattern.
    ///
    /// Only called with the literal grammars below, which are known to
    /// compile.
    pub fn new(pattern: &str) -> Self {
        Self {
            regex: Regex::new(pattern).expect("Invalid regex pattern"),
        }
    }

    /// Checks if the pattern matches the given text.
    pub fn matches(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// Returns the captures of the first match.
    pub fn captures<'t>(&self, text: &'t str) -> Option<Captures<'t>> {
        self.regex.captures(text)
    }
}

/// `<path>(<line>,<col>): error TS<code>: <message>`
pub fn diagnostic_header() -> &'static Pattern {
    static PATTERN: OnceLock<Pattern> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Pattern::new(
            r"^(?P<path>.+?)\((?P<line>\d+),(?P<column>\d+)\): error TS(?P<code>\d+): (?P<message>.*)$",
        )
    })
}

/// Anything shaped like a header, even if its fields are garbled.
///
/// Lines matching this but not `diagnostic_header` are dropped instead of
/// being read as message continuations.
pub fn header_like() -> &'static Pattern {
    static PATTERN: OnceLock<Pattern> = OnceLock::new();
    PATTERN.get_or_init(|| Pattern::new(r"^.+\([^)]*\): error TS"))
}

/// `error TS<code>: <message>` at the very start of a chunk.
pub fn fatal_error() -> &'static Pattern {
    static PATTERN: OnceLock<Pattern> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Pattern::new(
            r"^\s*error TS(?P<code>\d+): (?P<message>[^\r\n]*)",
        )
    })
}

/// Returns true if the chunk carries the watch-mode cycle start marker.
pub fn is_cycle_start(text: &str) -> bool {
    text.contains(CYCLE_START_MARKER)
}

/// Returns true if the chunk carries the watch-mode idle marker.
pub fn is_watching(text: &str) -> bool {
    text.contains(WATCHING_MARKER)
}

/// Returns true if the line carries either watch-mode marker.
pub fn is_watch_marker(text: &str) -> bool {
    is_cycle_start(text) || is_watching(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_header_captures() {
        let caps = diagnostic_header()
            .captures("src/a.ts(10,5): error TS2322: Type mismatch.")
            .unwrap();

        assert_eq!(&caps["path"], "src/a.ts");
        assert_eq!(&caps["line"], "10");
        assert_eq!(&caps["column"], "5");
        assert_eq!(&caps["code"], "2322");
        assert_eq!(&caps["message"], "Type mismatch.");
    }

    #[test]
    fn test_diagnostic_header_path_with_parens() {
        let caps = diagnostic_header()
            .captures("src/(app)/page.ts(2,1): error TS1005: ';' expected.")
            .unwrap();
        assert_eq!(&caps["path"], "src/(app)/page.ts");
    }

    #[test]
    fn test_header_like_catches_garbled_header() {
        let line = "src/a.ts(ten,5): error TS2322: Type mismatch.";
        assert!(!diagnostic_header().matches(line));
        assert!(header_like().matches(line));
        assert!(!header_like().matches("  Type 'string' is not assignable."));
    }

    #[test]
    fn test_fatal_error_only_at_chunk_start() {
        assert!(fatal_error().matches("error TS5057: Cannot find a tsconfig.json file."));
        assert!(!fatal_error().matches("src/a.ts(1,1): error TS5057: nope"));
        assert!(!fatal_error().matches("noise\nerror TS5057: late"));
    }

    #[test]
    fn test_markers() {
        assert!(is_cycle_start(
            "[10:00:00 AM] File change detected. Starting incremental compilation..."
        ));
        assert!(is_watching(
            "[10:00:01 AM] Found 0 errors. Watching for file changes."
        ));
        assert!(is_watch_marker("Watching for file changes."));
        assert!(!is_watch_marker("Starting compilation in watch mode..."));
    }
}
