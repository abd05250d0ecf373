//! Two-pass change detection.
//!
//! Pass 1 finds checked top-level parents whose checkbox descendants are all
//! complete and reserves their whole block. Pass 2 walks the remaining lines:
//! checked subtasks are stamped in place right away (the edit never changes the
//! line count), checked top-level leaves are queued for relocation.

use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

use crate::archive::ArchiveSection;
use crate::block::{self, TaskBlock};
use crate::classify::{MARKER_INDENT, Markers};
use crate::editor::{self, Editor};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Checked top-level task without checkbox descendants
    Individual,
    /// Checked top-level task whose checkbox descendants are all complete
    ParentBlock,
}

/// A task queued for relocation: its original span and the text to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovedTask {
    pub kind: TaskKind,
    pub block: TaskBlock,
    pub lines: Vec<String>,
}

impl MovedTask {
    pub fn line(&self) -> usize {
        self.block.start
    }

    /// Lines this task occupies once inserted.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }
}

/// A subtask stamped in place during detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub line: usize,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub individuals: Vec<MovedTask>,
    pub blocks: Vec<MovedTask>,
    pub annotations: Vec<Annotation>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty() && self.blocks.is_empty() && self.annotations.is_empty()
    }

    pub fn has_moves(&self) -> bool {
        !self.individuals.is_empty() || !self.blocks.is_empty()
    }
}

pub struct Detector<'a> {
    markers: &'a Markers,
    /// Rendered timestamp shared by every marker written in this cycle
    stamp: &'a str,
    heading: &'a str,
}

impl<'a> Detector<'a> {
    pub fn new(markers: &'a Markers, stamp: &'a str, heading: &'a str) -> Self {
        Self {
            markers,
            stamp,
            heading,
        }
    }

    /// Scan the document. Subtask annotations are written to `editor`
    /// immediately; moves are returned for the relocation engine.
    ///
    /// Indices in `seen` are skipped and every classified index is added to it.
    pub fn detect<E: Editor + ?Sized>(
        &self,
        editor: &mut E,
        seen: &mut HashSet<usize>,
    ) -> Result<ChangeSet> {
        let mut lines = editor.lines();
        let section = ArchiveSection::find(&lines, self.heading);
        let in_archive = |i: usize| section.is_some_and(|s| s.covers(i));
        let marker = self.markers.marker(self.stamp);

        let mut changes = ChangeSet::default();
        let mut reserved: HashSet<usize> = HashSet::new();

        // Pass 1: completed parent blocks
        for i in 0..lines.len() {
            if in_archive(i) || reserved.contains(&i) || seen.contains(&i) {
                continue;
            }
            let Some(cb) = self.markers.classify(i, &lines[i]) else {
                continue;
            };
            if cb.indent != 0 || !cb.checked || !block::has_subtasks(&lines, i) {
                continue;
            }
            if !block::all_subtasks_complete(&lines, i, self.markers) {
                debug!(line = i, "parent has open subtasks");
                continue;
            }

            let span = block::resolve_block(&lines, i);
            if block::block_has_marker(&lines, span, self.markers) {
                debug!(line = i, "parent block already archived");
                reserved.extend(span.start..=span.end);
                continue;
            }

            reserved.extend(span.start..=span.end);
            seen.insert(i);

            let mut text: Vec<String> = lines[span.start..=span.end].to_vec();
            if !self.markers.has_stamp(&lines[i]) {
                text.push(format!("{}{}", MARKER_INDENT, marker));
            }
            debug!(line = i, end = span.end, "parent block complete");
            changes.blocks.push(MovedTask {
                kind: TaskKind::ParentBlock,
                block: span,
                lines: text,
            });
        }

        // Pass 2: leaves
        for i in 0..lines.len() {
            if in_archive(i) || reserved.contains(&i) || seen.contains(&i) {
                continue;
            }
            let Some(cb) = self.markers.classify(i, &lines[i]) else {
                continue;
            };
            if !cb.checked || cb.has_marker {
                continue;
            }

            if cb.indent > 0 {
                let text = format!("{} {}", lines[i].trim_end(), marker);
                editor::set_line(editor, i, &text)?;
                lines[i] = text.clone();
                seen.insert(i);
                debug!(line = i, "stamped subtask");
                changes.annotations.push(Annotation { line: i, text });
                continue;
            }

            if block::has_subtasks(&lines, i) {
                // Checked parent with open subtasks stays put
                continue;
            }

            let span = block::resolve_block(&lines, i);
            if block::block_has_marker(&lines, span, self.markers) {
                continue;
            }

            seen.insert(i);
            let mut text: Vec<String> = lines[span.start..=span.end].to_vec();
            text.push(format!("{}{}", MARKER_INDENT, marker));
            debug!(line = i, "individual task complete");
            changes.individuals.push(MovedTask {
                kind: TaskKind::Individual,
                block: span,
                lines: text,
            });
        }

        Ok(changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::TextBuffer;
    use crate::timestamp::DatePattern;

    const STAMP: &str = "2024-01-01 10:00:00";
    const HEADING: &str = "## Completed Tasks";

    fn markers() -> Markers {
        let pattern = DatePattern::parse("YYYY-MM-DD HH:mm:ss").unwrap();
        Markers::new("✅", "🔔", &pattern).unwrap()
    }

    fn detect(text: &str) -> (ChangeSet, TextBuffer) {
        let m = markers();
        let mut buf = TextBuffer::new(text);
        let changes = Detector::new(&m, STAMP, HEADING)
            .detect(&mut buf, &mut HashSet::new())
            .unwrap();
        (changes, buf)
    }

    #[test]
    fn test_individual_task() {
        let (changes, buf) = detect("# Todo\n- [x] Buy milk\n- [ ] Open\n");
        assert_eq!(changes.individuals.len(), 1);
        let task = &changes.individuals[0];
        assert_eq!(task.kind, TaskKind::Individual);
        assert_eq!(task.block, TaskBlock { start: 1, end: 1 });
        assert_eq!(
            task.lines,
            vec!["- [x] Buy milk".to_string(), "    ✅ 2024-01-01 10:00:00".to_string()]
        );
        assert!(changes.blocks.is_empty());
        assert!(changes.annotations.is_empty());
        assert_eq!(buf.value(), "# Todo\n- [x] Buy milk\n- [ ] Open\n", "detection defers moves");
    }

    #[test]
    fn test_individual_carries_nested_notes() {
        let (changes, _) = detect("- [x] Call\n    phone: 555\n- [ ] Other");
        assert_eq!(changes.individuals.len(), 1);
        assert_eq!(changes.individuals[0].block, TaskBlock { start: 0, end: 1 });
        assert_eq!(changes.individuals[0].line_count(), 3);
    }

    #[test]
    fn test_subtask_annotated_in_place() {
        let (changes, buf) = detect("- [ ] Ship\n    - [x] Design\n    - [ ] Build");
        assert!(!changes.has_moves());
        assert_eq!(
            changes.annotations,
            vec![Annotation {
                line: 1,
                text: "    - [x] Design ✅ 2024-01-01 10:00:00".to_string()
            }]
        );
        assert_eq!(
            buf.lines()[1],
            "    - [x] Design ✅ 2024-01-01 10:00:00",
            "annotation written immediately"
        );
    }

    #[test]
    fn test_parent_not_checked_only_annotates_child() {
        let text = "- [ ] Ship feature\n    - [x] Design ✅ 2023-12-31 09:00:00\n    - [x] Implement";
        let (changes, buf) = detect(text);
        assert!(!changes.has_moves(), "unchecked parent is never moved");
        assert_eq!(changes.annotations.len(), 1);
        assert_eq!(changes.annotations[0].line, 2);
        assert_eq!(buf.lines()[0], "- [ ] Ship feature");
    }

    #[test]
    fn test_parent_block_all_complete() {
        let text = "- [x] Ship\n    - [x] Design\n        detail\n    - [x] Build\n- [ ] Next";
        let (changes, buf) = detect(text);
        assert_eq!(changes.blocks.len(), 1);
        let block = &changes.blocks[0];
        assert_eq!(block.block, TaskBlock { start: 0, end: 3 });
        assert_eq!(
            block.lines,
            vec![
                "- [x] Ship",
                "    - [x] Design",
                "        detail",
                "    - [x] Build",
                "    ✅ 2024-01-01 10:00:00",
            ]
        );
        assert!(
            changes.annotations.is_empty(),
            "reserved subtasks are not annotated"
        );
        assert_eq!(buf.value(), text);
    }

    #[test]
    fn test_stamped_parent_moves_without_extra_marker() {
        let text = "- [x] Release ✅ 2023-12-31 09:00:00\n    - [x] Build\n    - [x] Publish\n- [ ] Next";
        let (changes, buf) = detect(text);
        assert_eq!(changes.blocks.len(), 1, "tagged parent still moves once complete");
        assert_eq!(
            changes.blocks[0].lines,
            vec![
                "- [x] Release ✅ 2023-12-31 09:00:00",
                "    - [x] Build",
                "    - [x] Publish",
            ],
            "no marker line appended for a parent that already has one"
        );
        assert!(changes.annotations.is_empty(), "reserved children are not stamped");
        assert_eq!(buf.value(), text);
    }

    #[test]
    fn test_archived_parent_block_is_ignored() {
        let text = "- [x] Ship\n    - [x] Build\n    ✅ 2023-12-31 09:00:00";
        let (changes, _) = detect(text);
        assert!(changes.is_empty(), "standalone marker line means already processed");
    }

    #[test]
    fn test_parent_with_incomplete_subtasks_is_left_alone() {
        let text = "- [x] Ship\n    - [x] Design\n    - [ ] Build\n    - [ ] Test";
        let (changes, buf) = detect(text);
        assert!(changes.blocks.is_empty());
        assert!(changes.individuals.is_empty());
        assert_eq!(changes.annotations.len(), 1, "only the checked child is stamped");
        assert_eq!(buf.lines()[0], "- [x] Ship", "parent line untouched");
    }

    #[test]
    fn test_marker_tagged_subtasks_count_as_complete() {
        let text = "- [x] P\n    - [ ] A ✅\n    - [x] B";
        let (changes, _) = detect(text);
        assert_eq!(changes.blocks.len(), 1);
    }

    #[test]
    fn test_parent_with_only_plain_nested_content_is_individual() {
        // Nested non-checkbox content does not make a parent
        let (changes, _) = detect("- [x] P\n    some notes\n    more notes");
        assert!(changes.blocks.is_empty());
        assert_eq!(changes.individuals.len(), 1);
        assert_eq!(changes.individuals[0].block.end, 2);
    }

    #[test]
    fn test_archive_section_is_skipped() {
        let text = "- [ ] a\n\n## Completed Tasks\n---\n- [x] old\n    - [x] old child\n";
        let (changes, buf) = detect(text);
        assert!(changes.is_empty());
        assert_eq!(buf.value(), text);
    }

    #[test]
    fn test_already_stamped_individual_is_ignored() {
        let (changes, _) = detect("- [x] Done\n    ✅ 2023-05-05 08:00:00\n- [x] Inline ✅ 2023-05-05 08:00:00");
        assert!(changes.is_empty());
    }

    #[test]
    fn test_reminder_lines_are_skipped() {
        let (changes, _) = detect("    - [x] ping 🔔 ✅ 2024-01-01 09:00:00\n- [x] call 🔔 ✅ 2024-01-01 09:00:00");
        assert!(changes.is_empty());
    }

    #[test]
    fn test_seen_lines_are_skipped() {
        let m = markers();
        let mut buf = TextBuffer::new("- [x] a\n- [x] b");
        let mut seen: HashSet<usize> = [0].into_iter().collect();
        let changes = Detector::new(&m, STAMP, HEADING)
            .detect(&mut buf, &mut seen)
            .unwrap();
        assert_eq!(changes.individuals.len(), 1);
        assert_eq!(changes.individuals[0].line(), 1);
        assert!(seen.contains(&1));
    }

    #[test]
    fn test_order_is_ascending() {
        let text = "- [x] one\n- [x] P\n    - [x] c\n- [x] two";
        let (changes, _) = detect(text);
        let individual_lines: Vec<usize> = changes.individuals.iter().map(MovedTask::line).collect();
        assert_eq!(individual_lines, vec![0, 3]);
        assert_eq!(changes.blocks[0].line(), 1);
    }
}
