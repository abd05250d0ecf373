//! Entry points for one relocation cycle and the latch that keeps cycles from
//! overlapping.

use std::collections::HashSet;
use std::path::Path;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::archive::{self, ClearOutcome};
use crate::classify::Markers;
use crate::config::Config;
use crate::detect::Detector;
use crate::document;
use crate::editor::{Editor, ViewMode};
use crate::error::{Error, Result};
use crate::relocate::{self, Relocation};
use crate::timestamp::DatePattern;

/// How long the latch stays closed after a cycle finishes.
pub const RELEASE_DELAY: Duration = Duration::from_millis(100);

/// Proof that [`CycleGuard::begin`] succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

/// Latch plus the per-cycle de-duplication set.
#[derive(Debug)]
pub struct CycleGuard {
    busy: bool,
    generation: u64,
    released_at: Option<Instant>,
    release_delay: Duration,
    seen: HashSet<usize>,
}

impl Default for CycleGuard {
    fn default() -> Self {
        Self::new(RELEASE_DELAY)
    }
}

impl CycleGuard {
    pub fn new(release_delay: Duration) -> Self {
        Self {
            busy: false,
            generation: 0,
            released_at: None,
            release_delay,
            seen: HashSet::new(),
        }
    }

    /// Close the latch. Fails while a cycle is active or the release delay of
    /// the previous one has not elapsed.
    pub fn begin(&mut self) -> Result<Ticket> {
        if self.busy {
            return Err(Error::Busy);
        }
        if let Some(at) = self.released_at
            && at.elapsed() < self.release_delay
        {
            return Err(Error::Busy);
        }
        self.busy = true;
        self.generation += 1;
        self.seen.clear();
        Ok(Ticket(self.generation))
    }

    /// Reopen the latch. A ticket from an earlier generation is ignored.
    pub fn finish(&mut self, ticket: Ticket) -> bool {
        if !self.busy || ticket.0 != self.generation {
            warn!(ticket = ticket.0, generation = self.generation, "stale cycle ticket");
            return false;
        }
        self.busy = false;
        self.released_at = Some(Instant::now());
        true
    }

    #[cfg(test)]
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Lines already classified in the current or just finished cycle.
    pub fn seen(&self) -> &HashSet<usize> {
        &self.seen
    }

    /// Drop the de-dup set once the release delay after the last cycle has
    /// passed. Returns whether anything was cleared.
    pub fn expire_seen(&mut self) -> bool {
        if self.busy || self.seen.is_empty() {
            return false;
        }
        match self.released_at {
            Some(at) if at.elapsed() >= self.release_delay => {
                self.seen.clear();
                true
            }
            _ => false,
        }
    }
}

/// What a move cycle did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MoveReport {
    /// Subtasks stamped in place
    pub annotated: usize,
    pub relocation: Option<Relocation>,
}

impl MoveReport {
    pub fn moved(&self) -> usize {
        self.relocation.as_ref().map_or(0, |r| r.moved)
    }

    pub fn is_noop(&self) -> bool {
        self.annotated == 0 && self.relocation.is_none()
    }

    pub fn summary(&self) -> String {
        match (self.moved(), self.annotated) {
            (0, 0) => "No completed tasks to move".to_string(),
            (0, n) => format!("Marked {} completed subtask{}", n, plural(n)),
            (m, 0) => format!("Moved {} completed task{}", m, plural(m)),
            (m, n) => format!(
                "Moved {} completed task{}, marked {} subtask{}",
                m,
                plural(m),
                n,
                plural(n)
            ),
        }
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}

/// Run one full cycle: stamp completed subtasks, move completed tasks and
/// blocks under the archive heading, restore cursor and scroll.
///
/// `name` identifies the document in errors.
pub fn move_completed<E: Editor + ?Sized>(
    editor: &mut E,
    name: &Path,
    config: &Config,
    guard: &mut CycleGuard,
) -> Result<MoveReport> {
    check_eligible(editor, name)?;
    let ticket = guard.begin()?;

    let result = with_source_view(editor, config, |editor| {
        let pattern = DatePattern::parse(&config.tasks.date_format)?;
        let stamp = pattern.format_now();
        run_move(editor, config, &mut guard.seen, &stamp)
    });

    guard.finish(ticket);
    result.map_err(|e| surface("move completed tasks", e))
}

/// Delete everything under the archive heading, keeping heading and separator.
pub fn clear_section<E: Editor + ?Sized>(
    editor: &mut E,
    name: &Path,
    config: &Config,
    guard: &mut CycleGuard,
) -> Result<ClearOutcome> {
    check_eligible(editor, name)?;
    let ticket = guard.begin()?;

    let result = with_source_view(editor, config, |editor| {
        let outcome = archive::clear(editor, &config.archive)?;
        match outcome {
            ClearOutcome::AlreadyEmpty => info!("archive section already empty"),
            ClearOutcome::Cleared(n) => info!(lines = n, "cleared archive section"),
        }
        Ok(outcome)
    });

    guard.finish(ticket);
    result.map_err(|e| surface("clear completed tasks", e))
}

fn check_eligible<E: Editor + ?Sized>(editor: &E, name: &Path) -> Result<()> {
    if document::is_enabled(&editor.value()) {
        Ok(())
    } else {
        Err(Error::NotEligible {
            path: name.to_path_buf(),
        })
    }
}

/// Run `f` in source view when configured, switching back afterwards.
fn with_source_view<E, T, F>(editor: &mut E, config: &Config, f: F) -> Result<T>
where
    E: Editor + ?Sized,
    F: FnOnce(&mut E) -> Result<T>,
{
    let previous = editor.view_mode();
    let switched = config.view.switch_to_source && previous != ViewMode::Source;
    if switched {
        debug!("switching to source view");
        editor.set_view_mode(ViewMode::Source);
        editor.settle();
    }

    let result = f(editor);

    if switched && config.view.restore_previous {
        editor.settle();
        editor.set_view_mode(previous);
    }
    result
}

/// The cycle body with a fixed timestamp.
pub(crate) fn run_move<E: Editor + ?Sized>(
    editor: &mut E,
    config: &Config,
    seen: &mut HashSet<usize>,
    stamp: &str,
) -> Result<MoveReport> {
    let pattern = DatePattern::parse(&config.tasks.date_format)?;
    let markers = Markers::new(
        &config.tasks.completion_icon,
        &config.tasks.reminder_icon,
        &pattern,
    )?;

    let changes = Detector::new(&markers, stamp, &config.archive.heading).detect(editor, seen)?;
    debug!(
        individuals = changes.individuals.len(),
        blocks = changes.blocks.len(),
        annotations = changes.annotations.len(),
        "detection finished"
    );
    if changes.is_empty() {
        return Ok(MoveReport::default());
    }

    let relocation = relocate::relocate(editor, &changes, &config.archive)?;
    let report = MoveReport {
        annotated: changes.annotations.len(),
        relocation,
    };
    info!(
        moved = report.moved(),
        annotated = report.annotated,
        "cycle finished"
    );
    Ok(report)
}

/// Expected errors pass through; anything else is logged and wrapped.
fn surface(action: &'static str, e: Error) -> Error {
    if e.is_expected() {
        debug!("{}", e);
        e
    } else {
        error!(error = %e, "failed to {}", action);
        Error::Failed {
            action,
            source: Box::new(e),
        }
    }
}
