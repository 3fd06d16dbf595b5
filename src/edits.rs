//! Turning a formatter run into editor edits.
//!
//! A successful run becomes exactly one edit replacing the whole document
//! with the tool's stdout. Anything else becomes no edits at all, so a
//! document is never partially rewritten.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::exec::ExecResult;
use crate::output::OutputSink;

/// Zero-based line and UTF-16 character offset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub const fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextRange {
    pub start: Position,
    pub end: Position,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEdit {
    pub range: TextRange,
    pub new_text: String,
}

/// Range from the first character to the end of the last line, including
/// its line break. `\n`, `\r\n` and a lone `\r` all end a line, as they do
/// for LSP clients.
pub fn full_document_range(text: &str) -> TextRange {
    let mut line = 0;
    let mut line_start = 0;
    while let Some((idx, len)) = next_line_break(&text[line_start..]) {
        line += 1;
        line_start += idx + len;
    }

    TextRange {
        start: Position::new(0, 0),
        end: Position::new(line, utf16_len(&text[line_start..])),
    }
}

/// Byte index and length of the first line break in `s`.
fn next_line_break(s: &str) -> Option<(usize, usize)> {
    let idx = s.find(['\n', '\r'])?;
    let len = if s[idx..].starts_with("\r\n") { 2 } else { 1 };
    Some((idx, len))
}

fn utf16_len(s: &str) -> u32 {
    s.encode_utf16().count() as u32
}

/// Byte offset of `position` in `text`, clamped to the end of its line.
pub fn position_to_offset(text: &str, position: Position) -> usize {
    let mut line_start = 0;
    for _ in 0..position.line {
        match next_line_break(&text[line_start..]) {
            Some((idx, len)) => line_start += idx + len,
            None => return text.len(),
        }
    }

    let line_end = next_line_break(&text[line_start..]).map_or(text.len(), |(idx, _)| line_start + idx);
    let mut units = 0u32;
    for (i, ch) in text[line_start..line_end].char_indices() {
        if units >= position.character {
            return line_start + i;
        }
        units += ch.len_utf16() as u32;
    }
    line_end
}

/// Apply non-overlapping edits to `text`.
pub fn apply_edits(text: &str, edits: &[TextEdit]) -> String {
    let mut sorted: Vec<&TextEdit> = edits.iter().collect();
    sorted.sort_by(|a, b| b.range.start.cmp(&a.range.start));

    let mut result = text.to_string();
    for edit in sorted {
        let start = position_to_offset(text, edit.range.start);
        let end = position_to_offset(text, edit.range.end).max(start);
        result.replace_range(start..end, &edit.new_text);
    }
    result
}

/// The message describing a failed run, or `None` if the run succeeded.
///
/// A run fails when the process failed, or when it produced nothing on
/// stdout but wrote to stderr. meson prints some errors on stdout, so stdout
/// is the message whenever stderr is blank. When both streams are blank the
/// process error itself is the message.
pub fn failure_message(result: &ExecResult) -> Option<Cow<'_, str>> {
    let failed = result.error.is_some() || (result.stdout.is_empty() && !result.stderr.trim().is_empty());
    if !failed {
        return None;
    }

    if !result.stderr.trim().is_empty() {
        return Some(Cow::Borrowed(&result.stderr));
    }
    match &result.error {
        Some(error) if result.stdout.trim().is_empty() => Some(Cow::Owned(error.to_string())),
        _ => Some(Cow::Borrowed(&result.stdout)),
    }
}

/// Convert a formatter run over `original` into edits.
pub fn reconcile(result: &ExecResult, original: &str, sink: &dyn OutputSink) -> Vec<TextEdit> {
    if let Some(message) = failure_message(result) {
        if let Some(error) = &result.error {
            log::debug!("formatter failed: {error}");
        }
        log::debug!("formatter stderr: {:?}, stdout: {:?}", result.stderr, result.stdout);
        sink.append_line(&format!("Failed to format document with meson: {message}"));
        sink.show(true);
        return Vec::new();
    }

    vec![TextEdit {
        range: full_document_range(original),
        new_text: result.stdout.clone(),
    }]
}
