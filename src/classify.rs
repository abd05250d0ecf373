//! Line classification: checkbox detection, indentation and completion markers.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};
use crate::timestamp::DatePattern;

static CHECKBOX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^- \[([ xX])\]").unwrap());

static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^#{1,6}(\s|$)").unwrap());

/// Indentation used for standalone marker lines under a task.
pub const MARKER_INDENT: &str = "    ";

/// Derived view of one checkbox line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckboxLine {
    pub index: usize,
    pub indent: usize,
    pub checked: bool,
    pub has_marker: bool,
    pub raw: String,
}

/// Count of leading whitespace characters (tabs count as one).
pub fn indent_of(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}

pub fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

pub fn is_heading(line: &str) -> bool {
    HEADING_RE.is_match(line.trim_start())
}

/// `Some(checked)` for `- [ ]` / `- [x]` lines, `None` otherwise.
pub fn checkbox_state(line: &str) -> Option<bool> {
    CHECKBOX_RE
        .captures(line.trim())
        .map(|caps| !caps[1].trim().is_empty())
}

pub fn is_checkbox(line: &str) -> bool {
    checkbox_state(line).is_some()
}

/// Compiled completion-marker patterns for one icon/date-format combination.
#[derive(Debug, Clone)]
pub struct Markers {
    icon: String,
    reminder: String,
    /// icon followed by a timestamp, anywhere on the line
    stamped: Regex,
    /// a line consisting only of icon + timestamp
    standalone: Regex,
}

impl Markers {
    pub fn new(icon: &str, reminder: &str, pattern: &DatePattern) -> Result<Self> {
        let icon = icon.trim();
        let date = pattern.regex_fragment();
        let stamped = format!(r"{}\s*{}", regex::escape(icon), date);
        let standalone = format!(r"^\s*{}\s*{}\s*$", regex::escape(icon), date);

        let compile = |src: &str| {
            Regex::new(src).map_err(|e| Error::InvalidPattern {
                pattern: pattern.as_str().to_string(),
                reason: e.to_string(),
            })
        };

        Ok(Self {
            icon: icon.to_string(),
            reminder: reminder.trim().to_string(),
            stamped: compile(&stamped)?,
            standalone: compile(&standalone)?,
        })
    }

    /// Marker text for a given rendered timestamp.
    pub fn marker(&self, stamp: &str) -> String {
        format!("{} {}", self.icon, stamp)
    }

    /// Line carries icon followed by a date in the configured format.
    pub fn has_stamp(&self, line: &str) -> bool {
        self.stamped.is_match(line)
    }

    /// Looser check used for subtasks: the icon anywhere on the line.
    pub fn has_icon(&self, line: &str) -> bool {
        !self.icon.is_empty() && line.contains(&self.icon)
    }

    /// Line is nothing but a completion marker.
    pub fn is_marker_line(&self, line: &str) -> bool {
        self.standalone.is_match(line)
    }

    /// Lines tagged by the reminder feature (full marker plus the bell) are
    /// never touched.
    pub fn is_reminder_tagged(&self, line: &str) -> bool {
        !self.reminder.is_empty() && line.contains(&self.reminder) && self.has_stamp(line)
    }

    /// Classify a single line. Reminder-tagged and non-checkbox lines yield `None`.
    ///
    /// Indented lines use the looser icon check since subtasks carry their
    /// marker inline; top-level lines need the full stamp.
    pub fn classify(&self, index: usize, line: &str) -> Option<CheckboxLine> {
        if self.is_reminder_tagged(line) {
            return None;
        }
        let checked = checkbox_state(line)?;
        let indent = indent_of(line);
        let has_marker = if indent > 0 {
            self.has_stamp(line) || self.has_icon(line)
        } else {
            self.has_stamp(line)
        };
        Some(CheckboxLine {
            index,
            indent,
            checked,
            has_marker,
            raw: line.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn markers() -> Markers {
        let pattern = DatePattern::parse("YYYY-MM-DD HH:mm:ss").unwrap();
        Markers::new("✅", "🔔", &pattern).unwrap()
    }

    #[test]
    fn test_checkbox_state() {
        let cases = vec![
            ("- [ ] Buy milk", Some(false)),
            ("- [x] Buy milk", Some(true)),
            ("- [X] Buy milk", Some(true)),
            ("    - [x] nested", Some(true)),
            ("\t- [ ] tabbed", Some(false)),
            ("- [x]", Some(true)),
            ("* [x] star bullet", None),
            ("- [y] other", None),
            ("-[x] no space", None),
            ("plain text", None),
            ("", None),
        ];

        for (line, want) in cases {
            let got = checkbox_state(line);
            assert_eq!(got, want, "checkbox_state({:?}) = {:?}, want {:?}", line, got, want);
        }
    }

    #[test]
    fn test_indent_of() {
        let cases = vec![
            ("- [ ] a", 0),
            ("  - [ ] a", 2),
            ("\t- [ ] a", 1),
            ("\t  - [ ] a", 3),
            ("    ", 4),
        ];

        for (line, want) in cases {
            assert_eq!(indent_of(line), want, "indent_of({:?})", line);
        }
    }

    #[test]
    fn test_is_heading() {
        assert!(is_heading("## Completed Tasks"));
        assert!(is_heading("#"));
        assert!(is_heading("  ### Indented"));
        assert!(!is_heading("#hashtag"));
        assert!(!is_heading("- [ ] # not a heading"));
    }

    #[test]
    fn test_marker_detection() {
        let m = markers();
        assert!(m.has_stamp("- [x] Done ✅ 2024-01-01 10:00:00"));
        assert!(m.has_stamp("✅2024-01-01 10:00:00"));
        assert!(!m.has_stamp("- [x] Done ✅"));
        assert!(!m.has_stamp("- [x] Done ✅ yesterday"));

        assert!(m.is_marker_line("    ✅ 2024-01-01 10:00:00"));
        assert!(!m.is_marker_line("- [x] Done ✅ 2024-01-01 10:00:00"));

        assert!(m.has_icon("  - [x] sub ✅"));
        assert_eq!(m.marker("2024-01-01 10:00:00"), "✅ 2024-01-01 10:00:00");
    }

    #[test]
    fn test_reminder_tagged_lines_are_excluded() {
        let m = markers();
        let line = "- [x] Call bob 🔔 ✅ 2024-01-01 10:00:00";
        assert!(m.is_reminder_tagged(line));
        assert_eq!(m.classify(3, line), None);

        // Bell alone is not enough
        let bell_only = "- [x] Call bob 🔔";
        assert!(!m.is_reminder_tagged(bell_only));
        assert!(m.classify(3, bell_only).is_some());
    }

    #[test]
    fn test_classify_subtask_uses_loose_icon_check() {
        let m = markers();

        let sub = m.classify(1, "    - [x] sub ✅").unwrap();
        assert!(sub.has_marker, "indented line with icon counts as tagged");

        let top = m.classify(0, "- [x] top ✅").unwrap();
        assert!(!top.has_marker, "top-level line needs a full stamp");

        let top_stamped = m.classify(0, "- [x] top ✅ 2024-01-01 10:00:00").unwrap();
        assert!(top_stamped.has_marker);
        assert_eq!(top_stamped.indent, 0);
        assert!(top_stamped.checked);
    }
}
