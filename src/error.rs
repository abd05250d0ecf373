//! Error types shared by the engine and the commands.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// No document to operate on (missing path or file does not exist)
    #[error("no active document: {}", .path.display())]
    NoDocument { path: PathBuf },

    /// Front matter is missing `automove: true`
    #[error("{} is not enabled for automove (add `automove: true` to its front matter)", .path.display())]
    NotEligible { path: PathBuf },

    /// Archive heading not present when clearing
    #[error("no section titled '{heading}' found")]
    SectionNotFound { heading: String },

    /// Date pattern or marker pattern failed to compile
    #[error("invalid date pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Watch mode requested while `behavior.auto_move` is off
    #[error("automatic moving is disabled (behavior.auto_move is false)")]
    AutoMoveDisabled,

    /// Another cycle is active or just finished
    #[error("a move cycle is already in progress")]
    Busy,

    /// Out-of-range edit against the text buffer
    #[error("buffer edit out of range: {0}")]
    Buffer(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("git: {0}")]
    Git(String),

    /// Unexpected failure surfaced by an entry point
    #[error("failed to {action}: {source}")]
    Failed {
        action: &'static str,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Error::Io {
            context: context.into(),
            source,
        }
    }

    /// True for errors the user can act on directly (reported as-is rather than
    /// wrapped in a generic failure).
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            Error::NoDocument { .. }
                | Error::NotEligible { .. }
                | Error::SectionNotFound { .. }
                | Error::InvalidPattern { .. }
                | Error::AutoMoveDisabled
                | Error::Busy
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_errors_are_not_wrapped() {
        let cases = vec![
            (
                Error::NoDocument {
                    path: PathBuf::from("x.md"),
                },
                true,
            ),
            (
                Error::SectionNotFound {
                    heading: "## Done".to_string(),
                },
                true,
            ),
            (Error::Busy, true),
            (Error::Buffer("line 9".to_string()), false),
            (Error::Git("boom".to_string()), false),
        ];

        for (err, want) in cases {
            assert_eq!(err.is_expected(), want, "is_expected({:?})", err);
        }
    }

    #[test]
    fn test_failed_message_includes_cause() {
        let err = Error::Failed {
            action: "move completed tasks",
            source: Box::new(Error::Buffer("line 12 past end".to_string())),
        };
        assert_eq!(
            err.to_string(),
            "failed to move completed tasks: buffer edit out of range: line 12 past end"
        );
    }
}
