//! Relocation engine: remove queued task spans and re-insert them under the
//! archive heading, then put the cursor and scroll offset back.

use serde::Serialize;
use tracing::debug;

use crate::archive::{self, ArchiveSection};
use crate::classify::{indent_of, is_blank, is_checkbox};
use crate::config::ArchiveConfig;
use crate::detect::{ChangeSet, MovedTask};
use crate::editor::{self, Editor, Position};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relocation {
    /// Number of tasks moved
    pub moved: usize,
    /// Lines taken out of their original positions
    pub removed_lines: usize,
    /// Lines written under the archive heading (separator included)
    pub inserted_lines: usize,
    pub separator_added: bool,
    /// Line the first archived entry was written at
    pub insert_at: usize,
    pub cursor_was_inside: bool,
    pub cursor: Position,
}

/// Where the cursor ends up relative to the removed spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CursorFate {
    /// Cursor sat in a moved task; `anchor` is the post-removal index of the
    /// line just before that task, if any.
    Inside { anchor: Option<usize> },
    Outside { removed_above: usize },
}

fn removed_before(tasks: &[&MovedTask], line: usize) -> usize {
    tasks
        .iter()
        .filter(|t| t.block.end < line)
        .map(|t| t.block.len())
        .sum()
}

fn cursor_fate(tasks: &[&MovedTask], cursor: Position) -> CursorFate {
    match tasks.iter().find(|t| t.block.contains(cursor.line)) {
        Some(task) => {
            let start = task.block.start - removed_before(tasks, task.block.start);
            CursorFate::Inside {
                anchor: start.checked_sub(1),
            }
        }
        None => CursorFate::Outside {
            removed_above: removed_before(tasks, cursor.line),
        },
    }
}

/// Apply the moves in `changes`. Returns `None` when there is nothing to move.
pub fn relocate<E: Editor + ?Sized>(
    editor: &mut E,
    changes: &ChangeSet,
    config: &ArchiveConfig,
) -> Result<Option<Relocation>> {
    if !changes.has_moves() {
        return Ok(None);
    }

    let mut tasks: Vec<&MovedTask> = changes
        .individuals
        .iter()
        .chain(changes.blocks.iter())
        .collect();

    let cursor = editor.cursor();
    let scroll = editor.scroll_info();
    let fate = cursor_fate(&tasks, cursor);

    // Highest span first so earlier indices stay valid
    tasks.sort_by(|a, b| b.block.start.cmp(&a.block.start));
    let mut removed_lines = 0;
    for task in &tasks {
        editor::remove_lines(editor, task.block.start, task.block.end)?;
        removed_lines += task.block.len();
        debug!(start = task.block.start, end = task.block.end, "removed task span");
    }

    let insert_at = archive::locate(editor, config)?;

    let separator_added = needs_separator(editor, insert_at, config);
    let mut at = insert_at;
    if separator_added {
        editor::insert_lines(editor, at, &[String::new()])?;
        at += 1;
    }

    tasks.sort_by_key(|t| t.block.start);
    for task in &tasks {
        editor::insert_lines(editor, at, &task.lines)?;
        at += task.line_count();
    }
    let inserted_lines = at - insert_at;
    debug!(insert_at, inserted_lines, "inserted archived tasks");

    let cursor = restore_cursor(editor, cursor, fate, insert_at, inserted_lines);
    editor.set_cursor(cursor);
    editor.scroll_to(scroll.left, scroll.top);

    Ok(Some(Relocation {
        moved: tasks.len(),
        removed_lines,
        inserted_lines,
        separator_added,
        insert_at,
        cursor_was_inside: matches!(fate, CursorFate::Inside { .. }),
        cursor,
    }))
}

/// A blank line goes in first only when appending outside any archive section
/// and the line above is unrelated top-level text. Inside a section a blank
/// line would end its content, and later entries would land above it.
fn needs_separator<E: Editor + ?Sized>(editor: &E, at: usize, config: &ArchiveConfig) -> bool {
    if ArchiveSection::find(&editor.lines(), &config.heading).is_some() {
        return false;
    }
    let Some(prev) = at.checked_sub(1).and_then(|i| editor.line(i)) else {
        return false;
    };
    !is_blank(&prev) && !is_checkbox(&prev) && indent_of(&prev) == 0
}

fn restore_cursor<E: Editor + ?Sized>(
    editor: &E,
    original: Position,
    fate: CursorFate,
    insert_at: usize,
    inserted: usize,
) -> Position {
    let shift = |line: usize| if insert_at <= line { line + inserted } else { line };
    let last = editor.line_count().saturating_sub(1);
    let char_len = |line: usize| editor.line(line).map(|l| l.chars().count()).unwrap_or(0);

    match fate {
        CursorFate::Outside { removed_above } => {
            let line = shift(original.line.saturating_sub(removed_above)).min(last);
            Position::new(line, original.ch.min(char_len(line)))
        }
        CursorFate::Inside { anchor: None } => Position::new(0, 0),
        CursorFate::Inside { anchor: Some(anchor) } => {
            let mut line = shift(anchor).min(last);
            while line > 0 && editor.line(line).is_some_and(|l| is_blank(&l)) {
                line -= 1;
            }
            Position::new(line, char_len(line))
        }
    }
}
