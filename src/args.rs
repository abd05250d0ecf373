//! Shared CLI argument structs for consistent flag definitions across commands.
//!
//! Use `#[command(flatten)]` to include them in command-specific Args structs.

use std::path::PathBuf;

use clap::Args;

use crate::editor::{Position, ScrollInfo};
use crate::output::OutputFormat;

// ============================================================================
// FormatArgs - Output format flags
// ============================================================================

/// Common output format flags.
///
/// Provides consistent --format/-f and --json flags across commands.
/// Use `resolve()` to get the effective format with TTY auto-detection.
#[derive(Args, Clone, Debug, Default)]
pub struct FormatArgs {
    /// Output format (auto-detects TTY for pretty vs plain)
    #[arg(short = 'f', long, value_enum, default_value = "pretty")]
    pub format: OutputFormat,

    /// Output as JSON (shorthand for --format=json)
    #[arg(long, conflicts_with = "format")]
    pub json: bool,
}

impl FormatArgs {
    /// Resolve the effective output format.
    ///
    /// Handles --json shorthand and applies TTY auto-detection for pretty mode.
    pub fn resolve(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            self.format.resolve()
        }
    }
}

// ============================================================================
// CommitArgs - Git commit flags
// ============================================================================

#[derive(Args, Clone, Debug, Default)]
pub struct CommitArgs {
    /// Commit the document after changing it
    #[arg(long)]
    pub commit: bool,

    /// Commit message (implies --commit)
    #[arg(short = 'm', long = "message", value_name = "MSG")]
    pub message: Option<String>,
}

impl CommitArgs {
    /// Commit requested by flag, message, or config.
    pub fn wanted(&self, auto_commit: bool) -> bool {
        self.commit || self.message.is_some() || auto_commit
    }
}

// ============================================================================
// DocumentArgs - target file
// ============================================================================

#[derive(Args, Clone, Debug)]
pub struct DocumentArgs {
    /// Markdown file to operate on
    pub file: PathBuf,
}

// ============================================================================
// Position parsing
// ============================================================================

/// Parse `LINE` or `LINE:COL` (both 0-based).
pub fn parse_cursor(s: &str) -> Result<Position, String> {
    let (line, ch) = match s.split_once(':') {
        Some((l, c)) => (l, Some(c)),
        None => (s, None),
    };
    let line = line
        .trim()
        .parse::<usize>()
        .map_err(|_| format!("invalid line '{}'", line))?;
    let ch = match ch {
        Some(c) => c
            .trim()
            .parse::<usize>()
            .map_err(|_| format!("invalid column '{}'", c))?,
        None => 0,
    };
    Ok(Position::new(line, ch))
}

/// Parse `LEFT,TOP` scroll offsets.
pub fn parse_scroll(s: &str) -> Result<ScrollInfo, String> {
    let (left, top) = s
        .split_once(',')
        .ok_or_else(|| format!("expected LEFT,TOP, got '{}'", s))?;
    let left = left
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("invalid scroll offset '{}'", left))?;
    let top = top
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("invalid scroll offset '{}'", top))?;
    Ok(ScrollInfo { left, top })
}
