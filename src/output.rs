//! Output formatting utilities with TTY auto-detection and semantic styling.

use std::io::IsTerminal;

use clap::ValueEnum;
use colored::{ColoredString, Colorize};
use serde::Serialize;

use crate::detect::TaskKind;
use crate::error::Result;

/// Output format for commands.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-optimized: colors, tables
    #[default]
    Pretty,
    /// Script-friendly: no colors, pipe-delimited
    Plain,
    /// Machine-readable JSON
    Json,
    /// Machine-readable YAML
    Yaml,
}

impl OutputFormat {
    /// Resolve the output format, applying TTY auto-detection.
    ///
    /// If format is Pretty but stdout is not a TTY, returns Plain.
    pub fn resolve(self) -> Self {
        match self {
            OutputFormat::Pretty if !std::io::stdout().is_terminal() => OutputFormat::Plain,
            other => other,
        }
    }
}

/// Print `value` as pretty JSON or YAML. No-op for the human formats.
pub fn emit<T: Serialize>(format: OutputFormat, value: &T) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{}", json);
        }
        OutputFormat::Yaml => {
            let yaml = serde_yaml::to_string(value)?;
            print!("{}", yaml);
        }
        OutputFormat::Pretty | OutputFormat::Plain => {}
    }
    Ok(())
}

// ============================================================================
// Semantic Styling - Centralized color/style decisions
// ============================================================================

/// Task kind colors.
/// - Green: moves as a single task
/// - Cyan: moves with its whole block
/// - Yellow: stamped in place
pub fn style_kind(kind: &str) -> ColoredString {
    match kind {
        "individual" => kind.green(),
        "parent_block" => kind.cyan(),
        "subtask" => kind.yellow(),
        _ => kind.normal(),
    }
}

pub fn kind_label(kind: TaskKind) -> &'static str {
    match kind {
        TaskKind::Individual => "individual",
        TaskKind::ParentBlock => "parent_block",
    }
}

/// Style for line numbers - always dimmed.
pub fn style_line_no(line: usize) -> ColoredString {
    line.to_string().dimmed()
}

/// Style for paths.
pub fn style_path(path: &str) -> ColoredString {
    path.bold()
}

// ============================================================================
// Terminal utilities
// ============================================================================

/// Get terminal width, defaulting to 80 if unavailable.
pub fn terminal_width() -> usize {
    terminal_size::terminal_size()
        .map(|(w, _)| w.0 as usize)
        .unwrap_or(80)
}

/// Truncate a string from the back, showing "prefix…".
pub fn truncate_back(s: &str, max_chars: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max_chars {
        s.to_string()
    } else if max_chars <= 1 {
        "…".to_string()
    } else {
        let truncated: String = s.chars().take(max_chars - 1).collect();
        format!("{}…", truncated)
    }
}
