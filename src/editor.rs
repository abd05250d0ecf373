//! Host editor contract and an in-memory implementation.
//!
//! The engine only talks to a document through [`Editor`]. Columns are measured
//! in characters. Line edits are expressed with `replace_range`; the helpers
//! below build line-level insert/remove/set on top of it.

use serde::Serialize;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Position {
    pub line: usize,
    pub ch: usize,
}

impl Position {
    pub fn new(line: usize, ch: usize) -> Self {
        Self { line, ch }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ScrollInfo {
    pub left: f64,
    pub top: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ViewMode {
    #[default]
    Source,
    Preview,
}

pub trait Editor {
    fn line_count(&self) -> usize;

    fn line(&self, index: usize) -> Option<String>;

    /// Whole document, lines joined with `\n`.
    fn value(&self) -> String;

    /// Replace the half-open range `[from, to)` with `text`.
    fn replace_range(&mut self, text: &str, from: Position, to: Position) -> Result<()>;

    fn cursor(&self) -> Position;

    fn set_cursor(&mut self, pos: Position);

    fn scroll_info(&self) -> ScrollInfo;

    fn scroll_to(&mut self, left: f64, top: f64);

    fn view_mode(&self) -> ViewMode {
        ViewMode::Source
    }

    fn set_view_mode(&mut self, _mode: ViewMode) {}

    /// Wait for a view-mode switch to take effect before touching the buffer.
    fn settle(&mut self) {}

    /// Snapshot of all lines.
    fn lines(&self) -> Vec<String> {
        (0..self.line_count())
            .map(|i| self.line(i).unwrap_or_default())
            .collect()
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn byte_offset(s: &str, ch: usize) -> Option<usize> {
    if ch == char_len(s) {
        return Some(s.len());
    }
    s.char_indices().nth(ch).map(|(i, _)| i)
}

/// Overwrite the text of one line.
pub fn set_line<E: Editor + ?Sized>(editor: &mut E, index: usize, text: &str) -> Result<()> {
    let current = editor
        .line(index)
        .ok_or_else(|| Error::Buffer(format!("line {} does not exist", index)))?;
    editor.replace_range(
        text,
        Position::new(index, 0),
        Position::new(index, char_len(&current)),
    )
}

/// Insert whole lines before line `at`; `at == line_count()` appends.
pub fn insert_lines<E: Editor + ?Sized>(editor: &mut E, at: usize, lines: &[String]) -> Result<()> {
    if lines.is_empty() {
        return Ok(());
    }
    let count = editor.line_count();
    if at > count {
        return Err(Error::Buffer(format!(
            "insert at line {} past end ({} lines)",
            at, count
        )));
    }

    let joined = lines.join("\n");
    if count == 0 {
        let origin = Position::new(0, 0);
        return editor.replace_range(&joined, origin, origin);
    }
    if at < count {
        editor.replace_range(
            &format!("{}\n", joined),
            Position::new(at, 0),
            Position::new(at, 0),
        )
    } else {
        let last = count - 1;
        let end = Position::new(last, char_len(&editor.line(last).unwrap_or_default()));
        editor.replace_range(&format!("\n{}", joined), end, end)
    }
}

/// Remove the inclusive line range `[start, end]`.
pub fn remove_lines<E: Editor + ?Sized>(editor: &mut E, start: usize, end: usize) -> Result<()> {
    let count = editor.line_count();
    if start > end || end >= count {
        return Err(Error::Buffer(format!(
            "remove lines {}..={} out of range ({} lines)",
            start, end, count
        )));
    }

    if end + 1 < count {
        editor.replace_range("", Position::new(start, 0), Position::new(end + 1, 0))
    } else if start > 0 {
        // Last lines: eat the newline that precedes them instead
        let prev = start - 1;
        let from = Position::new(prev, char_len(&editor.line(prev).unwrap_or_default()));
        let to = Position::new(end, char_len(&editor.line(end).unwrap_or_default()));
        editor.replace_range("", from, to)
    } else {
        let to = Position::new(end, char_len(&editor.line(end).unwrap_or_default()));
        editor.replace_range("", Position::new(0, 0), to)
    }
}

/// In-memory line buffer standing in for an editor surface.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBuffer {
    lines: Vec<String>,
    cursor: Position,
    scroll: ScrollInfo,
}

impl TextBuffer {
    pub fn new(text: &str) -> Self {
        Self {
            lines: text.split('\n').map(str::to_string).collect(),
            cursor: Position::default(),
            scroll: ScrollInfo::default(),
        }
    }

    #[cfg(test)]
    pub fn with_cursor(mut self, cursor: Position) -> Self {
        self.cursor = cursor;
        self
    }

    #[cfg(test)]
    pub fn with_scroll(mut self, left: f64, top: f64) -> Self {
        self.scroll = ScrollInfo { left, top };
        self
    }

    fn check(&self, pos: Position) -> Result<usize> {
        let line = self.lines.get(pos.line).ok_or_else(|| {
            Error::Buffer(format!(
                "line {} past end ({} lines)",
                pos.line,
                self.lines.len()
            ))
        })?;
        byte_offset(line, pos.ch)
            .ok_or_else(|| Error::Buffer(format!("column {} past end of line {}", pos.ch, pos.line)))
    }
}

impl Editor for TextBuffer {
    fn line_count(&self) -> usize {
        self.lines.len()
    }

    fn line(&self, index: usize) -> Option<String> {
        self.lines.get(index).cloned()
    }

    fn value(&self) -> String {
        self.lines.join("\n")
    }

    fn replace_range(&mut self, text: &str, from: Position, to: Position) -> Result<()> {
        if to < from {
            return Err(Error::Buffer(format!(
                "range end {:?} before start {:?}",
                to, from
            )));
        }
        let from_byte = self.check(from)?;
        let to_byte = self.check(to)?;

        let prefix = &self.lines[from.line][..from_byte];
        let suffix = &self.lines[to.line][to_byte..];
        let merged = format!("{}{}{}", prefix, text, suffix);
        let replacement: Vec<String> = merged.split('\n').map(str::to_string).collect();

        self.lines.splice(from.line..=to.line, replacement);
        Ok(())
    }

    fn cursor(&self) -> Position {
        self.cursor
    }

    fn set_cursor(&mut self, pos: Position) {
        self.cursor = pos;
    }

    fn scroll_info(&self) -> ScrollInfo {
        self.scroll
    }

    fn scroll_to(&mut self, left: f64, top: f64) {
        self.scroll = ScrollInfo { left, top };
    }

    fn lines(&self) -> Vec<String> {
        self.lines.clone()
    }
}
