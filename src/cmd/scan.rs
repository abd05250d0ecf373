//! Dry run: classify what the next cycle would do without touching the file.

use std::collections::HashSet;
use std::path::Path;

use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::archive::ArchiveSection;
use crate::args::{DocumentArgs, FormatArgs};
use crate::classify::Markers;
use crate::cmd::Context;
use crate::config::{Config, is_quiet};
use crate::detect::{ChangeSet, Detector};
use crate::document::Document;
use crate::editor::Editor;
use crate::error::Result;
use crate::output::{self, OutputFormat};
use crate::timestamp::DatePattern;

#[derive(Args)]
pub struct ScanArgs {
    #[command(flatten)]
    doc: DocumentArgs,

    #[command(flatten)]
    format: FormatArgs,
}

impl ScanArgs {
    pub fn file(&self) -> &Path {
        &self.doc.file
    }
}

/// One pending change; `line` is 1-based.
#[derive(Serialize)]
struct Change {
    line: usize,
    kind: &'static str,
    lines: usize,
    text: String,
}

#[derive(Serialize)]
struct ArchiveInfo {
    heading: String,
    exists: bool,
    content_lines: usize,
}

#[derive(Serialize)]
struct ScanOutput {
    path: String,
    eligible: bool,
    archive: ArchiveInfo,
    changes: Vec<Change>,
}

#[derive(Tabled)]
struct ChangeRow {
    #[tabled(rename = "LINE")]
    line: String,
    #[tabled(rename = "KIND")]
    kind: String,
    #[tabled(rename = "LINES")]
    lines: String,
    #[tabled(rename = "TASK")]
    text: String,
}

pub fn run(args: ScanArgs, ctx: &Context) -> Result<()> {
    let format = args.format.resolve();
    let config = &ctx.config;

    let doc = Document::load(&ctx.file)?;
    let changes = preview(doc.buffer(), config)?;

    let lines = doc.buffer().lines();
    let section = ArchiveSection::find(&lines, &config.archive.heading);

    let out = ScanOutput {
        path: ctx.display(),
        eligible: doc.is_eligible(),
        archive: ArchiveInfo {
            heading: config.archive.heading.trim().to_string(),
            exists: section.is_some(),
            content_lines: section.map_or(0, |s| s.content_len()),
        },
        changes: collect(&changes, &lines),
    };

    match format {
        OutputFormat::Pretty => output_pretty(&out, config),
        OutputFormat::Plain => output_plain(&out),
        OutputFormat::Json | OutputFormat::Yaml => output::emit(format, &out),
    }
}

/// Run detection against a scratch copy of the buffer.
fn preview<E: Editor + Clone>(buffer: &E, config: &Config) -> Result<ChangeSet> {
    let pattern = DatePattern::parse(&config.tasks.date_format)?;
    let markers = Markers::new(
        &config.tasks.completion_icon,
        &config.tasks.reminder_icon,
        &pattern,
    )?;
    let stamp = pattern.format_now();
    let mut scratch = buffer.clone();
    Detector::new(&markers, &stamp, &config.archive.heading)
        .detect(&mut scratch, &mut HashSet::new())
}

fn collect(changes: &ChangeSet, lines: &[String]) -> Vec<Change> {
    let mut out: Vec<Change> = changes
        .individuals
        .iter()
        .chain(changes.blocks.iter())
        .map(|task| Change {
            line: task.line() + 1,
            kind: output::kind_label(task.kind),
            lines: task.block.len(),
            text: lines[task.line()].trim().to_string(),
        })
        .chain(changes.annotations.iter().map(|a| Change {
            line: a.line + 1,
            kind: "subtask",
            lines: 1,
            text: lines[a.line].trim().to_string(),
        }))
        .collect();
    out.sort_by_key(|c| c.line);
    out
}

fn output_pretty(out: &ScanOutput, config: &Config) -> Result<()> {
    println!("{} {}", "Pending changes in".bold(), output::style_path(&out.path));
    if !out.eligible {
        println!(
            "{}",
            "Not enabled: add `automove: true` to the front matter".yellow()
        );
    }
    println!();

    if out.changes.is_empty() {
        println!("{}", "No completed tasks to move.".dimmed());
        return Ok(());
    }

    let width = output::terminal_width().saturating_sub(32).max(20);
    let rows: Vec<ChangeRow> = out
        .changes
        .iter()
        .map(|c| ChangeRow {
            line: output::style_line_no(c.line).to_string(),
            kind: output::style_kind(c.kind).to_string(),
            lines: c.lines.to_string(),
            text: output::truncate_back(&c.text, width),
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}", table);

    if !out.archive.exists && !is_quiet(config) {
        println!(
            "{}",
            format!("Hint: '{}' will be created on the next move", out.archive.heading).dimmed()
        );
    }
    Ok(())
}

fn output_plain(out: &ScanOutput) -> Result<()> {
    println!("Path: {}", out.path);
    println!("Eligible: {}", out.eligible);
    println!(
        "Archive: {} ({})",
        out.archive.heading,
        if out.archive.exists { "present" } else { "missing" }
    );
    println!();
    println!("LINE | KIND | LINES | TASK");
    for c in &out.changes {
        println!("{} | {} | {} | {}", c.line, c.kind, c.lines, c.text);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::TextBuffer;

    #[test]
    fn test_preview_leaves_buffer_untouched() {
        let text = "- [ ] a\n    - [x] b\n- [x] c\n";
        let buf = TextBuffer::new(text);
        let changes = preview(&buf, &Config::default()).unwrap();
        assert_eq!(changes.annotations.len(), 1);
        assert_eq!(changes.individuals.len(), 1);
        assert_eq!(buf.value(), text);
    }

    #[test]
    fn test_collect_sorted_and_one_based() {
        let text = "- [x] P\n    - [x] c\n- [ ] open\n    - [x] d\n- [x] leaf";
        let buf = TextBuffer::new(text);
        let changes = preview(&buf, &Config::default()).unwrap();
        let rows = collect(&changes, &buf.lines());
        let got: Vec<(usize, &str, usize)> = rows.iter().map(|c| (c.line, c.kind, c.lines)).collect();
        assert_eq!(
            got,
            vec![(1, "parent_block", 2), (4, "subtask", 1), (5, "individual", 1)]
        );
        assert_eq!(rows[0].text, "- [x] P");
    }
}
