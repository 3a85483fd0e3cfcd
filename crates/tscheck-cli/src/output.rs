//! Report rendering for the terminal.

use serde::Serialize;

use tscheck_core::{Task, TaskError, TaskId};
use tscheck_parser::Diagnostic;

/// One JSON line per finished cycle.
#[derive(Debug, Serialize)]
struct ReportLine<'a> {
    task_id: TaskId,
    project: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    elapsed_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a TaskError>,
    diagnostics: &'a [Diagnostic],
}

/// Renders a finished report.
pub fn render_report(task: &Task, report: &[Diagnostic], json: bool) -> String {
    let line = ReportLine {
        task_id: task.id(),
        project: task.config().project(),
        elapsed_ms: task.elapsed().map(|d| d.num_milliseconds()),
        error: task.error(),
        diagnostics: report,
    };
    if json {
        return to_json(&line);
    }

    let mut out = String::new();
    for diagnostic in report {
        out.push_str(&diagnostic.to_string());
        out.push('\n');
    }
    out.push_str(&summary(&line));
    out
}

/// Renders a task error for stderr.
pub fn render_error(task: &Task, error: &TaskError, json: bool) -> String {
    if json {
        let line = ReportLine {
            task_id: task.id(),
            project: task.config().project(),
            elapsed_ms: None,
            error: Some(error),
            diagnostics: &[],
        };
        return to_json(&line);
    }
    format!("{}: {}", task.config().project(), error)
}

fn summary(line: &ReportLine<'_>) -> String {
    let count = line.diagnostics.len();
    let noun = if count == 1 { "error" } else { "errors" };
    match line.elapsed_ms {
        Some(ms) => format!("Found {} {} in {} ({} ms)", count, noun, line.project, ms),
        None => format!("Found {} {} in {}", count, noun, line.project),
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!("{{\"error\":\"{}\"}}", e))
}
