//! Cascade resolution as an explicit state machine.
//!
//! `Matching → Clearing → Collapsing → Refilling → Matching …` until a
//! matching pass finds nothing. Each step reports a settle delay for the
//! presentation layer; headless drivers hand it to an [`Immediate`] settle.

use std::collections::BTreeSet;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::BoardConfig;
use crate::events::{BoardEvent, Cause};
use crate::grid::{FruitId, Grid, Pos};
use crate::matcher::{self, MatchSet};

/// Presentation pauses between cascade steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub swap: Duration,
    pub clear: Duration,
    pub rescan: Duration,
    pub potion: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            swap: Duration::from_millis(600),
            clear: Duration::from_millis(320),
            rescan: Duration::from_millis(800),
            potion: Duration::from_millis(1000),
        }
    }
}

impl Pacing {
    /// No pauses at all.
    pub const INSTANT: Self = Self {
        swap: Duration::ZERO,
        clear: Duration::ZERO,
        rescan: Duration::ZERO,
        potion: Duration::ZERO,
    };
}

/// Waits out a settle delay between steps.
pub trait Settle {
    fn settle(&mut self, delay: Duration);
}

/// Ignores delays.
#[derive(Debug, Clone, Copy, Default)]
pub struct Immediate;

impl Settle for Immediate {
    fn settle(&mut self, _delay: Duration) {}
}

/// Blocks the thread for each delay.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sleep;

impl Settle for Sleep {
    fn settle(&mut self, delay: Duration) {
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }
}

/// Totals of one finished cascade.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CascadeSummary {
    /// Clearing passes run.
    pub passes: u32,
    pub cleared: usize,
    pub score: u64,
    /// The pass cap stopped resolution with matches still on the board.
    pub truncated: bool,
}

/// Outcome of one `Board::step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Nothing was running.
    Idle,
    /// Call again after the delay.
    Pending(Duration),
    /// The cascade finished and the board is unlocked.
    Settled(CascadeSummary),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseKind {
    Idle,
    Matching,
    Clearing,
    Collapsing,
    Refilling,
}

#[derive(Debug, Clone, PartialEq)]
enum Phase {
    Matching { seeds: Vec<Pos> },
    Clearing { cells: MatchSet },
    Collapsing { columns: BTreeSet<usize> },
    Refilling { columns: BTreeSet<usize>, moved: Vec<Pos> },
}

pub(crate) enum Advance {
    Continue(Duration),
    Done(CascadeSummary),
}

/// A running cascade. Owned by the board while the shift lock is held.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Cascade {
    cause: Cause,
    phase: Phase,
    summary: CascadeSummary,
}

impl Cascade {
    pub(crate) fn clearing(cause: Cause, cells: MatchSet) -> Self {
        Self {
            cause,
            phase: Phase::Clearing { cells },
            summary: CascadeSummary::default(),
        }
    }

    pub(crate) fn matching(cause: Cause, seeds: Vec<Pos>) -> Self {
        Self {
            cause,
            phase: Phase::Matching { seeds },
            summary: CascadeSummary::default(),
        }
    }

    pub(crate) fn phase(&self) -> PhaseKind {
        match self.phase {
            Phase::Matching { .. } => PhaseKind::Matching,
            Phase::Clearing { .. } => PhaseKind::Clearing,
            Phase::Collapsing { .. } => PhaseKind::Collapsing,
            Phase::Refilling { .. } => PhaseKind::Refilling,
        }
    }

    pub(crate) fn summary(&self) -> CascadeSummary {
        self.summary
    }

    /// Runs one phase. On `Done` the caller drops the cascade.
    pub(crate) fn advance(
        &mut self,
        grid: &mut Grid,
        mut fill: impl FnMut() -> FruitId,
        config: &BoardConfig,
        events: &mut Vec<BoardEvent>,
    ) -> Advance {
        let phase = std::mem::replace(
            &mut self.phase,
            Phase::Matching { seeds: Vec::new() },
        );
        match phase {
            Phase::Matching { seeds } => {
                let scan = matcher::scan(grid, seeds);
                if !scan.found() {
                    return self.settle(events);
                }
                if self.summary.passes >= config.max_cascade_passes {
                    warn!(
                        passes = self.summary.passes,
                        pending = scan.cells.len(),
                        "cascade pass cap reached"
                    );
                    self.summary.truncated = true;
                    return self.settle(events);
                }
                debug!(cells = scan.cells.len(), "matching pass found cells");
                self.phase = Phase::Clearing { cells: scan.cells };
                Advance::Continue(Duration::ZERO)
            }
            Phase::Clearing { cells } => {
                let fruits: Vec<(Pos, FruitId)> = cells
                    .iter()
                    .filter_map(|p| grid.get(p).map(|f| (p, f)))
                    .collect();
                if fruits.is_empty() {
                    return self.settle(events);
                }
                self.summary.passes += 1;
                let score = fruits.len() as u64 * config.score_per_cell;
                self.summary.cleared += fruits.len();
                self.summary.score += score;
                debug!(pass = self.summary.passes, cells = fruits.len(), score, "clearing");
                let columns = fruits.iter().map(|(p, _)| p.x).collect();
                let vacate: Vec<Pos> = fruits.iter().map(|(p, _)| *p).collect();
                events.push(BoardEvent::Cleared {
                    cells: fruits,
                    score,
                    pass: self.summary.passes,
                });
                for pos in vacate {
                    grid.set(pos, None);
                }
                self.phase = Phase::Collapsing { columns };
                Advance::Continue(config.pacing.clear)
            }
            Phase::Collapsing { columns } => {
                let moved: Vec<Pos> = columns
                    .iter()
                    .flat_map(|&x| grid.collapse_column(x))
                    .collect();
                debug!(columns = columns.len(), moved = moved.len(), "collapsed");
                self.phase = Phase::Refilling { columns, moved };
                Advance::Continue(Duration::ZERO)
            }
            Phase::Refilling { columns, mut moved } => {
                let empties = grid.empty_cells(&columns);
                for &pos in &empties {
                    grid.set(pos, Some(fill()));
                }
                debug!(refilled = empties.len(), "refilled");
                moved.extend(empties);
                self.phase = Phase::Matching { seeds: moved };
                Advance::Continue(config.pacing.rescan)
            }
        }
    }

    fn settle(&mut self, events: &mut Vec<BoardEvent>) -> Advance {
        debug!(summary = ?self.summary, "cascade settled");
        events.push(BoardEvent::CascadeSettled {
            cause: self.cause,
            summary: self.summary,
        });
        Advance::Done(self.summary)
    }
}
