use std::path::Path;

use clap::Args;
use colored::Colorize;
use serde::Serialize;

use crate::archive::ClearOutcome;
use crate::args::{CommitArgs, DocumentArgs, FormatArgs};
use crate::cmd::Context;
use crate::cycle::{self, CycleGuard};
use crate::document::Document;
use crate::error::Result;
use crate::git;
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct ClearArgs {
    #[command(flatten)]
    doc: DocumentArgs,

    #[command(flatten)]
    commit: CommitArgs,

    #[command(flatten)]
    format: FormatArgs,
}

impl ClearArgs {
    pub fn file(&self) -> &Path {
        &self.doc.file
    }
}

#[derive(Serialize)]
struct ClearOutput {
    path: String,
    heading: String,
    cleared_lines: usize,
    already_empty: bool,
    committed: bool,
}

pub fn run(args: ClearArgs, ctx: &Context) -> Result<()> {
    let format = args.format.resolve();
    let config = &ctx.config;

    let mut doc = Document::load(&ctx.file)?;
    let rel = ctx.display();
    let mut guard = CycleGuard::default();
    let outcome = cycle::clear_section(doc.buffer_mut(), Path::new(&rel), config, &mut guard)?;
    let written = doc.save()?;

    let committed = if written && args.commit.wanted(config.behavior.auto_commit) {
        let msg = args
            .commit
            .message
            .clone()
            .unwrap_or_else(|| git::commit_message("clear completed tasks", &ctx.file));
        git::commit_document(&ctx.file, &msg)?
    } else {
        false
    };

    let out = ClearOutput {
        path: rel,
        heading: config.archive.heading.trim().to_string(),
        cleared_lines: match outcome {
            ClearOutcome::Cleared(n) => n,
            ClearOutcome::AlreadyEmpty => 0,
        },
        already_empty: outcome == ClearOutcome::AlreadyEmpty,
        committed,
    };

    match format {
        OutputFormat::Pretty => {
            if out.already_empty {
                println!("{}", "Completed tasks section is already empty".dimmed());
            } else {
                println!(
                    "{} Cleared {} line{} under '{}' in {}",
                    "✓".green(),
                    out.cleared_lines,
                    if out.cleared_lines == 1 { "" } else { "s" },
                    out.heading,
                    output::style_path(&out.path)
                );
            }
            Ok(())
        }
        OutputFormat::Plain => {
            if out.already_empty {
                println!("Completed tasks section is already empty | {}", out.path);
            } else {
                println!("Cleared {} lines | {}", out.cleared_lines, out.path);
            }
            Ok(())
        }
        OutputFormat::Json | OutputFormat::Yaml => output::emit(format, &out),
    }
}
