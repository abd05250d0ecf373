//! Indentation-defined blocks over a flat line snapshot.
//!
//! The document has no explicit tree; a task's subtree is every following line
//! indented deeper than the task itself.

use crate::classify::{Markers, checkbox_state, indent_of, is_blank};

/// Inclusive line range of an item plus all its descendants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskBlock {
    pub start: usize,
    pub end: usize,
}

impl TaskBlock {
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn contains(&self, line: usize) -> bool {
        line >= self.start && line <= self.end
    }
}

/// Resolve the block starting at `start`.
///
/// Blank lines do not end the block as long as deeper content follows them;
/// trailing blank lines are left outside.
pub fn resolve_block<S: AsRef<str>>(lines: &[S], start: usize) -> TaskBlock {
    let base = indent_of(lines[start].as_ref());
    let mut end = start;

    for (i, line) in lines.iter().enumerate().skip(start + 1) {
        let line = line.as_ref();
        if is_blank(line) {
            continue;
        }
        if indent_of(line) <= base {
            break;
        }
        end = i;
    }

    TaskBlock { start, end }
}

/// True iff the item at `parent` has at least one checkbox descendant and every
/// one of them is checked or already carries a completion marker.
pub fn all_subtasks_complete<S: AsRef<str>>(
    lines: &[S],
    parent: usize,
    markers: &Markers,
) -> bool {
    let base = indent_of(lines[parent].as_ref());
    let mut subtasks = 0;
    let mut completed = 0;

    for line in lines.iter().skip(parent + 1) {
        let line = line.as_ref();
        if is_blank(line) {
            continue;
        }
        if indent_of(line) <= base {
            break;
        }
        if let Some(checked) = checkbox_state(line) {
            subtasks += 1;
            if checked || markers.has_stamp(line) || markers.has_icon(line) {
                completed += 1;
            }
        }
    }

    subtasks > 0 && completed == subtasks
}

/// True iff any checkbox line appears below `index` before indentation returns
/// to its level. Nested non-checkbox content does not count.
pub fn has_subtasks<S: AsRef<str>>(lines: &[S], index: usize) -> bool {
    let base = indent_of(lines[index].as_ref());

    for line in lines.iter().skip(index + 1) {
        let line = line.as_ref();
        if is_blank(line) {
            continue;
        }
        if indent_of(line) <= base {
            return false;
        }
        if checkbox_state(line).is_some() {
            return true;
        }
    }

    false
}

/// A block was already archived when it holds a standalone marker line. A stamp
/// on the task line itself does not count.
pub fn block_has_marker<S: AsRef<str>>(lines: &[S], block: TaskBlock, markers: &Markers) -> bool {
    lines[block.start + 1..=block.end]
        .iter()
        .any(|l| markers.is_marker_line(l.as_ref()))
}
