use std::path::Path;

use clap::Args;
use colored::Colorize;
use serde::Serialize;

use crate::args::{CommitArgs, DocumentArgs, FormatArgs, parse_cursor, parse_scroll};
use crate::cmd::Context;
use crate::config::{Config, is_quiet};
use crate::cycle::{self, CycleGuard, MoveReport};
use crate::document::Document;
use crate::editor::{Editor, Position, ScrollInfo};
use crate::error::Result;
use crate::git;
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct MoveArgs {
    #[command(flatten)]
    doc: DocumentArgs,

    /// Cursor before the move, LINE[:COL] (0-based)
    #[arg(long, value_name = "LINE[:COL]", value_parser = parse_cursor)]
    cursor: Option<Position>,

    /// Scroll offset before the move, LEFT,TOP
    #[arg(long, value_name = "LEFT,TOP", value_parser = parse_scroll)]
    scroll: Option<ScrollInfo>,

    #[command(flatten)]
    commit: CommitArgs,

    #[command(flatten)]
    format: FormatArgs,
}

impl MoveArgs {
    pub fn file(&self) -> &Path {
        &self.doc.file
    }
}

#[derive(Serialize)]
struct MoveOutput {
    path: String,
    #[serde(flatten)]
    report: MoveReport,
    cursor: Position,
    scroll: ScrollInfo,
    written: bool,
    committed: bool,
}

pub fn run(args: MoveArgs, ctx: &Context) -> Result<()> {
    let format = args.format.resolve();
    let config = &ctx.config;

    let mut doc = Document::load(&ctx.file)?;
    if let Some(cursor) = args.cursor {
        doc.buffer_mut().set_cursor(cursor);
    }
    if let Some(scroll) = args.scroll {
        doc.buffer_mut().scroll_to(scroll.left, scroll.top);
    }

    let rel = ctx.display();
    let mut guard = CycleGuard::default();
    let report = cycle::move_completed(doc.buffer_mut(), Path::new(&rel), config, &mut guard)?;
    let written = doc.save()?;

    let committed = if written && args.commit.wanted(config.behavior.auto_commit) {
        let msg = args
            .commit
            .message
            .clone()
            .unwrap_or_else(|| git::commit_message("move completed tasks", &ctx.file));
        git::commit_document(&ctx.file, &msg)?
    } else {
        false
    };

    let out = MoveOutput {
        path: rel,
        cursor: doc.buffer().cursor(),
        scroll: doc.buffer().scroll_info(),
        report,
        written,
        committed,
    };

    match format {
        OutputFormat::Pretty => output_pretty(&out, config),
        OutputFormat::Plain => output_plain(&out),
        OutputFormat::Json | OutputFormat::Yaml => output::emit(format, &out),
    }
}

fn output_pretty(out: &MoveOutput, config: &Config) -> Result<()> {
    if out.report.is_noop() {
        println!("{} {}", out.report.summary().dimmed(), output::style_path(&out.path));
        return Ok(());
    }

    println!(
        "{} {} {}",
        "✓".green(),
        out.report.summary(),
        output::style_path(&out.path)
    );
    if let Some(relocation) = &out.report.relocation {
        println!(
            "  {} {}:{}",
            "cursor".dimmed(),
            relocation.cursor.line,
            relocation.cursor.ch
        );
    }
    if out.written && !out.committed && !is_quiet(config) {
        println!("{}", "Hint: use --commit to commit the change".dimmed());
    }
    Ok(())
}

fn output_plain(out: &MoveOutput) -> Result<()> {
    println!("{} | {}", out.report.summary(), out.path);
    println!("cursor | {}:{}", out.cursor.line, out.cursor.ch);
    println!("written | {}", out.written);
    println!("committed | {}", out.committed);
    Ok(())
}
