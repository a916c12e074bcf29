use std::io::Write;

use crate::traits::ProgressSink;

/// Writes progress to stderr, indented two spaces per level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalProgress;

impl ProgressSink for TerminalProgress {
    fn emit(&self, level: usize, message: &str) {
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(stderr, "{}", render(level, message));
    }
}

fn render(level: usize, message: &str) -> String {
    format!("{}{message}", "  ".repeat(level))
}

/// Discards all progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentProgress;

impl ProgressSink for SilentProgress {
    fn emit(&self, _level: usize, _message: &str) {}
}
