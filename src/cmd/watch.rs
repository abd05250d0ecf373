//! Poll a document and run a move cycle after each settled change.

use std::fs;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant, SystemTime};

use clap::Args;
use colored::Colorize;
use tracing::{debug, info, warn};

use crate::args::{CommitArgs, DocumentArgs};
use crate::cmd::Context;
use crate::cycle::{self, CycleGuard};
use crate::document::Document;
use crate::error::{Error, Result};
use crate::git;

#[derive(Args)]
pub struct WatchArgs {
    #[command(flatten)]
    doc: DocumentArgs,

    /// Poll interval in milliseconds
    #[arg(long, default_value = "250", value_name = "MS")]
    interval: u64,

    /// Exit after this many cycles (the initial one included)
    #[arg(long, value_name = "N")]
    max_cycles: Option<usize>,

    #[command(flatten)]
    commit: CommitArgs,
}

impl WatchArgs {
    pub fn file(&self) -> &Path {
        &self.doc.file
    }
}

fn modified(path: &Path) -> Result<SystemTime> {
    let meta = fs::metadata(path).map_err(|_| Error::NoDocument {
        path: path.to_path_buf(),
    })?;
    meta.modified()
        .map_err(|e| Error::io(format!("reading mtime of {}", path.display()), e))
}

pub fn run(args: WatchArgs, ctx: &Context) -> Result<()> {
    let config = &ctx.config;
    if !config.behavior.auto_move {
        return Err(Error::AutoMoveDisabled);
    }

    let rel = ctx.display();
    let interval = Duration::from_millis(args.interval.max(10));
    let delay = config.trigger_delay();
    let mut guard = CycleGuard::default();

    println!(
        "{} {} {}",
        "Watching".bold(),
        rel,
        format!("(delay {}ms, Ctrl-C to stop)", delay.as_millis()).dimmed()
    );

    let mut cycles = 0;
    let mut last_seen = modified(&ctx.file)?;
    // First cycle runs right away
    let mut pending = Some(Instant::now().checked_sub(delay).unwrap_or_else(Instant::now));

    loop {
        if let Some(since) = pending
            && since.elapsed() >= delay
        {
            match run_cycle(&args, ctx, &rel, &mut guard) {
                Ok(()) => {
                    pending = None;
                    cycles += 1;
                }
                Err(Error::Busy) => debug!("latch closed, retrying"),
                Err(e @ Error::NoDocument { .. }) => return Err(e),
                Err(e) => {
                    warn!("{}", e);
                    eprintln!("{} {}", "error:".red(), e);
                    pending = None;
                    cycles += 1;
                }
            }
            // Our own write must not re-trigger
            last_seen = modified(&ctx.file)?;

            if args.max_cycles.is_some_and(|max| cycles >= max) {
                return Ok(());
            }
        }

        thread::sleep(interval);
        if guard.expire_seen() {
            debug!("de-dup set expired");
        }

        let current = modified(&ctx.file)?;
        if current != last_seen {
            debug!("change detected");
            last_seen = current;
            pending = Some(Instant::now());
        }
    }
}

fn run_cycle(args: &WatchArgs, ctx: &Context, rel: &str, guard: &mut CycleGuard) -> Result<()> {
    let mut doc = Document::load(&ctx.file)?;
    let report = match cycle::move_completed(doc.buffer_mut(), Path::new(rel), &ctx.config, guard) {
        Ok(report) => report,
        Err(Error::NotEligible { .. }) => {
            info!("document not enabled, skipping");
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    if !doc.save()? {
        return Ok(());
    }
    println!("{} {}", "✓".green(), report.summary());

    if args.commit.wanted(ctx.config.behavior.auto_commit) {
        let msg = args
            .commit
            .message
            .clone()
            .unwrap_or_else(|| git::commit_message("move completed tasks", &ctx.file));
        if git::commit_document(&ctx.file, &msg)? {
            println!("  {}", "committed".dimmed());
        }
    }
    Ok(())
}
