//! Chunk classification and diagnostic extraction.

use crate::diagnostic::Diagnostic;
use crate::event::{FatalError, OutputEvent};
use crate::patterns;

/// Classifies one chunk of checker output.
///
/// Checked in order: end of session (absent/empty chunk, or the watching
/// marker in watch mode), cycle start (watch mode only), fatal error at the
/// start of the chunk, and finally report data.
pub fn classify(chunk: Option<&str>, watch: bool) -> OutputEvent {
    let chunk = match chunk {
        Some(text) if !text.is_empty() => text,
        _ => return OutputEvent::EndOfSession,
    };

    if watch && patterns::is_watching(chunk) {
        return OutputEvent::EndOfSession;
    }

    if watch && patterns::is_cycle_start(chunk) {
        return OutputEvent::CycleStart;
    }

    if let Some(fatal) = parse_fatal(chunk) {
        return OutputEvent::FatalError(fatal);
    }

    OutputEvent::ReportData(parse_diagnostics(chunk))
}

fn parse_fatal(chunk: &str) -> Option<FatalError> {
    let caps = patterns::fatal_error().captures(chunk)?;
    let code = caps["code"].parse().ok()?;

    Some(FatalError {
        code,
        message: caps["message"].trim_end().to_string(),
    })
}

/// Extracts diagnostic entries from report text.
///
/// Header lines open a new entry. Following non-blank lines are appended to
/// that entry until the next header. Blank lines are skipped. Text before
/// the first header, and headers whose fields do not parse, are dropped.
pub fn parse_diagnostics(text: &str) -> Vec<Diagnostic> {
    let mut entries: Vec<Diagnostic> = Vec::new();
    let mut current: Option<Diagnostic> = None;

    for raw in text.lines() {
        let line = raw.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        if let Some(diag) = parse_header(line) {
            entries.extend(current.replace(diag));
            continue;
        }

        if patterns::header_like().matches(line) {
            // Garbled header: close the open entry so its continuation lines
            // are not attributed to the wrong diagnostic.
            entries.extend(current.take());
            continue;
        }

        if let Some(diag) = current.as_mut() {
            diag.push_line(line);
        }
    }

    entries.extend(current);
    entries
}

fn parse_header(line: &str) -> Option<Diagnostic> {
    let caps = patterns::diagnostic_header().captures(line)?;

    Some(Diagnostic::new(
        caps["code"].parse().ok()?,
        &caps["path"],
        caps["line"].parse().ok()?,
        caps["column"].parse().ok()?,
        &caps["message"],
    ))
}
