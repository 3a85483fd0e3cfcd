//! Splits raw stdout into self-delimited chunks.
//!
//! Classification looks at one chunk at a time, so every chunk must hold
//! whole logical units: a diagnostic header travels with its continuation
//! lines, a fatal error line starts its own chunk, and in watch mode each
//! marker line is emitted alone.

use tscheck_parser::patterns;

/// Incremental line grouper for one process's stdout.
#[derive(Debug)]
pub struct LineChunker {
    watch: bool,
    partial: Vec<u8>,
    group: Vec<String>,
}

impl LineChunker {
    /// Creates a chunker for a one-shot or watch-mode process.
    pub fn new(watch: bool) -> Self {
        Self {
            watch,
            partial: Vec::with_capacity(8 * 1024),
            group: Vec::new(),
        }
    }

    /// Feeds raw bytes and returns the chunks completed by them.
    ///
    /// The trailing group is held back because later lines may still be
    /// continuation lines of its last diagnostic.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.partial.extend_from_slice(bytes);

        let mut chunks = Vec::new();
        while let Some(pos) = self.partial.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.partial.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']).to_string();
            self.accept(line, &mut chunks);
        }
        chunks
    }

    /// Flushes everything held back, including an unterminated last line.
    pub fn finish(&mut self) -> Vec<String> {
        let mut chunks = Vec::new();
        if !self.partial.is_empty() {
            let raw = std::mem::take(&mut self.partial);
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']).to_string();
            self.accept(line, &mut chunks);
        }
        self.flush_group(&mut chunks);
        chunks
    }

    fn accept(&mut self, line: String, chunks: &mut Vec<String>) {
        if self.watch && patterns::is_watch_marker(&line) {
            self.flush_group(chunks);
            chunks.push(line);
        } else if starts_entry(&line) {
            self.flush_group(chunks);
            self.group.push(line);
        } else {
            self.group.push(line);
        }
    }

    fn flush_group(&mut self, chunks: &mut Vec<String>) {
        let group = std::mem::take(&mut self.group);
        if group.iter().all(|line| line.trim().is_empty()) {
            return;
        }
        chunks.push(group.join("\n"));
    }
}

/// Returns true for lines that open a new diagnostic or a fatal error.
fn starts_entry(line: &str) -> bool {
    patterns::header_like().matches(line) || patterns::fatal_error().matches(line)
}
