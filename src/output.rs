//! Where formatting failures are surfaced to the user.
//!
//! Editors expose an append-only output pane that can be raised to the
//! front; the CLI writes to stderr.

use std::sync::Mutex;

/// An append-only text sink with a "bring to front" action.
pub trait OutputSink: Send + Sync {
    fn append_line(&self, line: &str);

    /// Raise the output to the foreground. `preserve_focus` keeps keyboard
    /// focus in the editor.
    fn show(&self, preserve_focus: bool);
}

/// Sink for the command line: lines go to the `log` facade, and `show`
/// prints the latest one to stderr.
#[derive(Debug, Default)]
pub struct StderrSink {
    last_line: Mutex<Option<String>>,
}

impl OutputSink for StderrSink {
    fn append_line(&self, line: &str) {
        log::info!("{line}");
        if let Ok(mut last) = self.last_line.lock() {
            *last = Some(line.to_string());
        }
    }

    fn show(&self, _preserve_focus: bool) {
        if let Some(line) = self.last_line.lock().ok().and_then(|mut l| l.take()) {
            eprintln!("{line}");
        }
    }
}

/// Sink that records everything in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
    shown: Mutex<usize>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// How many times `show` was called.
    pub fn shown(&self) -> usize {
        self.shown.lock().map(|s| *s).unwrap_or_default()
    }
}

impl OutputSink for MemorySink {
    fn append_line(&self, line: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line.to_string());
        }
    }

    fn show(&self, _preserve_focus: bool) {
        if let Ok(mut shown) = self.shown.lock() {
            *shown += 1;
        }
    }
}
