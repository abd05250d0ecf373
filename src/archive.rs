//! Archive section lookup, creation and clearing.

use tracing::debug;

use crate::classify::{indent_of, is_blank, is_heading};
use crate::config::ArchiveConfig;
use crate::editor::{self, Editor, Position};
use crate::error::{Error, Result};

const SEPARATOR: &str = "---";

/// Line ranges of the archive section in a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveSection {
    pub heading: usize,
    /// First content line (after the optional separator)
    pub content_start: usize,
    /// One past the last content line; new entries are inserted here
    pub content_end: usize,
}

impl ArchiveSection {
    /// First line whose trimmed text equals the trimmed heading.
    pub fn find<S: AsRef<str>>(lines: &[S], heading: &str) -> Option<Self> {
        let wanted = heading.trim();
        if wanted.is_empty() {
            return None;
        }
        let heading_idx = lines.iter().position(|l| l.as_ref().trim() == wanted)?;

        let mut content_start = heading_idx + 1;
        if lines
            .get(content_start)
            .is_some_and(|l| l.as_ref().trim() == SEPARATOR)
        {
            content_start += 1;
        }

        let content_end = content_end(lines, content_start);

        Some(Self {
            heading: heading_idx,
            content_start,
            content_end,
        })
    }

    /// Lines the change detector must not look at.
    pub fn covers(&self, line: usize) -> bool {
        line >= self.heading && line < self.content_end
    }

    pub fn content_len(&self) -> usize {
        self.content_end - self.content_start
    }
}

/// Advance over content lines. A blank line ends the section unless indented
/// content follows it (a moved block that contained blank lines).
fn content_end<S: AsRef<str>>(lines: &[S], start: usize) -> usize {
    let mut i = start;
    while i < lines.len() {
        let line = lines[i].as_ref();
        if is_heading(line) {
            break;
        }
        if is_blank(line) {
            let continues = lines[i + 1..]
                .iter()
                .map(|l| l.as_ref())
                .find(|l: &&str| !is_blank(l))
                .is_some_and(|l| indent_of(l) > 0 && !is_heading(l));
            if !continues {
                break;
            }
        }
        i += 1;
    }
    i
}

/// Insertion line for archived tasks, creating the section when configured.
pub fn locate<E: Editor + ?Sized>(editor: &mut E, config: &ArchiveConfig) -> Result<usize> {
    let lines = editor.lines();
    if let Some(section) = ArchiveSection::find(&lines, &config.heading) {
        debug!(
            heading = section.heading,
            insert_at = section.content_end,
            "found archive section"
        );
        return Ok(section.content_end);
    }

    if config.auto_create && !config.heading.trim().is_empty() {
        return create(editor, config);
    }

    // No section: append at the end, before a trailing empty line if any
    let count = lines.len();
    if lines.last().is_some_and(|l| is_blank(l)) {
        Ok(count - 1)
    } else {
        Ok(count)
    }
}

fn create<E: Editor + ?Sized>(editor: &mut E, config: &ArchiveConfig) -> Result<usize> {
    let count = editor.line_count();
    let last_idx = count.saturating_sub(1);
    let last = editor.line(last_idx).unwrap_or_default();

    let prefix = if count <= 1 && last.is_empty() {
        ""
    } else if is_blank(&last) {
        "\n"
    } else {
        "\n\n"
    };
    let mut text = format!("{}{}", prefix, config.heading.trim());
    if config.add_separator {
        text.push('\n');
        text.push_str(SEPARATOR);
    }
    text.push('\n');

    let end = Position::new(last_idx, last.chars().count());
    editor.replace_range(&text, end, end)?;

    let lines = editor.lines();
    let section = ArchiveSection::find(&lines, &config.heading)
        .ok_or_else(|| Error::Buffer("archive heading missing after creation".to_string()))?;
    debug!(
        heading = section.heading,
        insert_at = section.content_end,
        "created archive section"
    );
    Ok(section.content_end)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearOutcome {
    AlreadyEmpty,
    Cleared(usize),
}

/// Delete every content line of the archive section, keeping heading and separator.
pub fn clear<E: Editor + ?Sized>(editor: &mut E, config: &ArchiveConfig) -> Result<ClearOutcome> {
    let lines = editor.lines();
    let section = ArchiveSection::find(&lines, &config.heading).ok_or_else(|| {
        Error::SectionNotFound {
            heading: config.heading.trim().to_string(),
        }
    })?;

    if section.content_len() == 0 {
        return Ok(ClearOutcome::AlreadyEmpty);
    }

    editor::remove_lines(editor, section.content_start, section.content_end - 1)?;
    Ok(ClearOutcome::Cleared(section.content_len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::TextBuffer;

    fn cfg(auto_create: bool, add_separator: bool) -> ArchiveConfig {
        ArchiveConfig {
            heading: "## Completed Tasks".to_string(),
            auto_create,
            add_separator,
        }
    }

    #[test]
    fn test_find_section_ranges() {
        let lines: Vec<&str> = "# Todo\n- [ ] a\n\n## Completed Tasks\n---\n- [x] old\n    ✅ 2024-01-01 10:00:00\n\n## Other\n"
            .split('\n')
            .collect();
        let section = ArchiveSection::find(&lines, "  ## Completed Tasks  ").unwrap();
        assert_eq!(section.heading, 3);
        assert_eq!(section.content_start, 5);
        assert_eq!(section.content_end, 7);
        assert!(section.covers(3));
        assert!(section.covers(6));
        assert!(!section.covers(1));
        assert!(!section.covers(8));
    }

    #[test]
    fn test_find_section_without_separator() {
        let lines = vec!["## Completed Tasks", "- [x] a", "## Next"];
        let section = ArchiveSection::find(&lines, "## Completed Tasks").unwrap();
        assert_eq!(section.content_start, 1);
        assert_eq!(section.content_end, 2);
    }

    #[test]
    fn test_find_section_first_match_wins() {
        let lines = vec!["## Completed Tasks", "- [x] a", "", "## Completed Tasks", "- [x] b"];
        let section = ArchiveSection::find(&lines, "## Completed Tasks").unwrap();
        assert_eq!(section.heading, 0);
    }

    #[test]
    fn test_content_spans_blank_line_inside_block() {
        let lines = vec![
            "## Completed Tasks",
            "---",
            "- [x] Parent",
            "    - [x] A",
            "",
            "    - [x] B",
            "",
            "Trailing paragraph",
        ];
        let section = ArchiveSection::find(&lines, "## Completed Tasks").unwrap();
        assert_eq!(section.content_end, 6);
    }

    #[test]
    fn test_locate_existing_section() {
        let mut buf = TextBuffer::new("- [ ] a\n\n## Completed Tasks\n---\n- [x] old\n");
        let at = locate(&mut buf, &cfg(true, true)).unwrap();
        assert_eq!(at, 5);
        assert_eq!(buf.line_count(), 6, "no mutation when the section exists");
    }

    #[test]
    fn test_locate_creates_section_with_separator() {
        let mut buf = TextBuffer::new("- [ ] a\n");
        let at = locate(&mut buf, &cfg(true, true)).unwrap();
        assert_eq!(
            buf.value(),
            "- [ ] a\n\n## Completed Tasks\n---\n",
            "heading appended after one blank line"
        );
        assert_eq!(at, 4);
        assert_eq!(buf.line(at).as_deref(), Some(""));
    }

    #[test]
    fn test_locate_creates_section_without_separator() {
        let mut buf = TextBuffer::new("- [ ] a");
        let at = locate(&mut buf, &cfg(true, false)).unwrap();
        assert_eq!(buf.value(), "- [ ] a\n\n## Completed Tasks\n");
        assert_eq!(at, 3);
    }

    #[test]
    fn test_locate_in_empty_document() {
        let mut buf = TextBuffer::new("");
        let at = locate(&mut buf, &cfg(true, true)).unwrap();
        assert_eq!(buf.value(), "## Completed Tasks\n---\n");
        assert_eq!(at, 2);
    }

    #[test]
    fn test_locate_without_auto_create_appends_at_end() {
        let mut buf = TextBuffer::new("- [ ] a\nb\n");
        let at = locate(&mut buf, &cfg(false, true)).unwrap();
        assert_eq!(at, 2, "before the trailing empty line");
        assert_eq!(buf.value(), "- [ ] a\nb\n");

        let mut buf = TextBuffer::new("- [ ] a\nb");
        assert_eq!(locate(&mut buf, &cfg(false, true)).unwrap(), 2);
    }

    #[test]
    fn test_clear_section() {
        let mut buf = TextBuffer::new(
            "- [ ] keep\n\n## Completed Tasks\n---\n- [x] a\n    ✅ 2024-01-01 10:00:00\n- [x] b\n\n## Notes\ntext",
        );
        let outcome = clear(&mut buf, &cfg(true, true)).unwrap();
        assert_eq!(outcome, ClearOutcome::Cleared(3));
        assert_eq!(
            buf.value(),
            "- [ ] keep\n\n## Completed Tasks\n---\n\n## Notes\ntext"
        );
    }

    #[test]
    fn test_clear_empty_section_reports_already_empty() {
        let text = "- [ ] keep\n\n## Completed Tasks\n---\n";
        let mut buf = TextBuffer::new(text);
        assert_eq!(clear(&mut buf, &cfg(true, true)).unwrap(), ClearOutcome::AlreadyEmpty);
        assert_eq!(buf.value(), text);
    }

    #[test]
    fn test_clear_missing_section() {
        let mut buf = TextBuffer::new("- [ ] a");
        let err = clear(&mut buf, &cfg(true, true)).unwrap_err();
        assert!(matches!(err, Error::SectionNotFound { .. }));
        assert_eq!(buf.value(), "- [ ] a");
    }
}
