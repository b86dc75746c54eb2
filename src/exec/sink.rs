// src/exec/sink.rs

//! Live pass-through destinations for provider output.

use std::io::Write;
use std::sync::Mutex;

/// Receives each output line as soon as it arrives.
pub trait OutputSink: Send + Sync {
    fn write_line(&self, line: &str);
}

/// Echo lines to this process's stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl OutputSink for StdoutSink {
    fn write_line(&self, line: &str) {
        let mut out = std::io::stdout().lock();
        // A closed stdout must not take the run down with it.
        let _ = writeln!(out, "{line}");
        let _ = out.flush();
    }
}

/// Discard output (the log file still receives everything).
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl OutputSink for NullSink {
    fn write_line(&self, _line: &str) {}
}

/// Collect lines in memory; handy for tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .map(|l| l.clone())
            .unwrap_or_default()
    }
}

impl OutputSink for MemorySink {
    fn write_line(&self, line: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line.to_string());
        }
    }
}
