//! Markdown files on disk: loading into a [`TextBuffer`], the front-matter
//! opt-in check and write-back.

use std::fs;
use std::path::{Path, PathBuf};

use serde_yaml::Value;
use tracing::{debug, warn};

use crate::editor::{Editor, TextBuffer};
use crate::error::{Error, Result};

/// Front-matter key that opts a document in.
pub const ENABLE_KEY: &str = "automove";

/// Extract the YAML between a leading `---` line and the next `---`/`...` line.
pub fn front_matter(text: &str) -> Option<&str> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut lines = text.split_inclusive('\n');
    let first = lines.next()?;
    if first.trim_end() != "---" {
        return None;
    }

    let start = first.len();
    let mut offset = start;
    for line in lines {
        let trimmed = line.trim_end();
        if trimmed == "---" || trimmed == "..." {
            return Some(&text[start..offset]);
        }
        offset += line.len();
    }
    None
}

/// True when the front matter carries `automove: true` (boolean, or a string
/// equal to "true" ignoring case and surrounding quotes).
pub fn is_enabled(text: &str) -> bool {
    let Some(yaml) = front_matter(text) else {
        return false;
    };
    let value: Value = match serde_yaml::from_str(yaml) {
        Ok(v) => v,
        Err(e) => {
            warn!("ignoring malformed front matter: {}", e);
            return false;
        }
    };

    match value.get(ENABLE_KEY) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s
            .trim()
            .trim_matches(|c| c == '"' || c == '\'')
            .eq_ignore_ascii_case("true"),
        _ => false,
    }
}

/// A markdown file loaded into an editable buffer.
#[derive(Debug)]
pub struct Document {
    path: PathBuf,
    /// Content as loaded, newline-normalized
    original: String,
    crlf: bool,
    buffer: TextBuffer,
}

impl Document {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::NoDocument {
                path: path.to_path_buf(),
            });
        }
        let raw = fs::read_to_string(path)
            .map_err(|e| Error::io(format!("reading {}", path.display()), e))?;

        let crlf = raw.contains("\r\n");
        let original = if crlf {
            raw.replace("\r\n", "\n")
        } else {
            raw
        };
        debug!(path = %path.display(), crlf, "loaded document");

        Ok(Self {
            path: path.to_path_buf(),
            buffer: TextBuffer::new(&original),
            original,
            crlf,
        })
    }

    pub fn buffer(&self) -> &TextBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut TextBuffer {
        &mut self.buffer
    }

    /// Eligibility is decided on the content as loaded.
    pub fn is_eligible(&self) -> bool {
        is_enabled(&self.original)
    }

    pub fn is_dirty(&self) -> bool {
        self.buffer.value() != self.original
    }

    /// Write the buffer back if it changed. Returns whether a write happened.
    pub fn save(&mut self) -> Result<bool> {
        if !self.is_dirty() {
            return Ok(false);
        }
        let value = self.buffer.value();
        let text = if self.crlf {
            value.replace('\n', "\r\n")
        } else {
            value.clone()
        };
        fs::write(&self.path, text)
            .map_err(|e| Error::io(format!("writing {}", self.path.display()), e))?;
        self.original = value;
        debug!(path = %self.path.display(), "saved document");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_enabled() {
        let cases = vec![
            ("---\nautomove: true\n---\n# Doc", true),
            ("---\nautomove: TRUE\n---\n", true),
            ("---\nautomove: \"True\"\n---\n", true),
            ("---\nautomove: \"'true'\"\n---\n", true),
            ("---\ntitle: x\nautomove: true\n...\nbody", true),
            ("\u{feff}---\nautomove: true\n---\n", true),
            ("---\r\nautomove: true\r\n---\r\n", true),
            ("---\nautomove: false\n---\n", false),
            ("---\nautomove: yes please\n---\n", false),
            ("---\nautomove: 1\n---\n", false),
            ("---\ntitle: x\n---\n", false),
            ("# No front matter\nautomove: true", false),
            ("---\nautomove: true\n", false),
            ("---\nautomove: [true\n---\n", false),
            ("", false),
        ];

        for (text, want) in cases {
            assert_eq!(is_enabled(text), want, "is_enabled({:?})", text);
        }
    }

    #[test]
    fn test_front_matter_bounds() {
        assert_eq!(front_matter("---\na: 1\nb: 2\n---\nrest"), Some("a: 1\nb: 2\n"));
        assert_eq!(front_matter("---\n---\n"), Some(""));
        assert_eq!(front_matter("text\n---\na: 1\n---"), None);
    }

    #[test]
    fn test_load_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let err = Document::load(&tmp.path().join("nope.md")).unwrap_err();
        assert!(matches!(err, Error::NoDocument { .. }));
    }

    #[test]
    fn test_save_only_when_changed() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("todo.md");
        fs::write(&path, "- [ ] a\n").unwrap();

        let mut doc = Document::load(&path).unwrap();
        assert!(!doc.is_dirty());
        assert!(!doc.save().unwrap(), "unchanged document is not written");

        crate::editor::set_line(doc.buffer_mut(), 0, "- [x] a").unwrap();
        assert!(doc.is_dirty());
        assert!(doc.save().unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "- [x] a\n");
        assert!(!doc.is_dirty(), "saved content becomes the new baseline");
    }

    #[test]
    fn test_crlf_preserved() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("win.md");
        fs::write(&path, "- [ ] a\r\n- [ ] b\r\n").unwrap();

        let mut doc = Document::load(&path).unwrap();
        assert_eq!(doc.buffer().line(0).as_deref(), Some("- [ ] a"));
        crate::editor::set_line(doc.buffer_mut(), 1, "- [x] b").unwrap();
        doc.save().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "- [ ] a\r\n- [x] b\r\n");
    }
}
