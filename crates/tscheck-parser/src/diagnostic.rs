//! Diagnostic entries reported by the checker.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One issue reported by the checker.
///
/// Paths are kept exactly as the checker printed them. Line and column are
/// 1-based, as reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Numeric part of the `TSxxxx` code.
    pub code: u32,
    /// File path as reported.
    pub path: String,
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number.
    pub column: u32,
    /// Message lines in emission order.
    pub message: Vec<String>,
}

impl Diagnostic {
    /// Creates a diagnostic with a single message line.
    pub fn new(
        code: u32,
        path: impl Into<String>,
        line: u32,
        column: u32,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            path: path.into(),
            line,
            column,
            message: vec![message.into()],
        }
    }

    /// Appends a continuation line to the message.
    pub fn push_line(&mut self, line: impl Into<String>) {
        self.message.push(line.into());
    }

    /// Returns the first message line, which carries the summary.
    pub fn summary(&self) -> &str {
        self.message.first().map(String::as_str).unwrap_or_default()
    }

    /// Returns the code in the checker's `TSxxxx` spelling.
    pub fn code_name(&self) -> String {
        format!("TS{}", self.code)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({},{}): error {}: {}",
            self.path,
            self.line,
            self.column,
            self.code_name(),
            self.summary()
        )?;
        for line in self.message.iter().skip(1) {
            write!(f, "\n{}", line)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_checker_format() {
        let mut diag = Diagnostic::new(2345, "src/b.ts", 3, 14, "Argument mismatch.");
        diag.push_line("  Types of property 'x' are incompatible.");

        assert_eq!(
            diag.to_string(),
            "src/b.ts(3,14): error TS2345: Argument mismatch.\n  Types of property 'x' are incompatible."
        );
        assert_eq!(diag.code_name(), "TS2345");
        assert_eq!(diag.summary(), "Argument mismatch.");
    }

    #[test]
    fn test_serialize_shape() {
        let diag = Diagnostic::new(1005, "a.ts", 1, 2, "';' expected.");
        let json = serde_json::to_value(&diag).unwrap();

        assert_eq!(json["code"], 1005);
        assert_eq!(json["path"], "a.ts");
        assert_eq!(json["line"], 1);
        assert_eq!(json["column"], 2);
        assert_eq!(json["message"][0], "';' expected.");
    }
}
