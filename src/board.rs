//! The board: grid ownership, the shift lock, swaps, power-up areas and the
//! cascade driver.

use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info};

use crate::cascade::{Advance, Cascade, CascadeSummary, Pacing, PhaseKind, Settle, Step};
use crate::config::{BoardConfig, GameMode};
use crate::error::{ConfigError, Rejection};
use crate::events::{BoardEvent, Cause};
use crate::grid::{Direction, FruitId, Grid, Pos};
use crate::matcher::{self, MatchSet};
use crate::powerup::{self, Point, PowerUpKind};
use crate::probability::FruitPicker;

/// Redraws per cell before the initial fill takes the first allowed kind.
const MAX_FILL_ATTEMPTS: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapOutcome {
    /// No match: the grid was put back exactly as it was.
    Reverted,
    /// The cascade started; step the board after `settle`.
    Matched {
        cells: usize,
        groups: usize,
        settle: Duration,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerUpOutcome {
    pub kind: PowerUpKind,
    /// Cells cleared (bomb, lightning) or re-rolled (potion).
    pub cells: usize,
    pub settle: Duration,
}

#[derive(Debug, Clone)]
pub struct Board {
    config: BoardConfig,
    grid: Grid,
    picker: FruitPicker,
    rng: StdRng,
    /// The shift lock: held while a cascade runs.
    cascade: Option<Cascade>,
    score: u64,
    events: Vec<BoardEvent>,
}

impl Board {
    /// Validates `config` and fills a fresh board with no matches on it.
    /// Collection mode rolls a random probability table and targets its
    /// rarest fruit; other modes draw evenly.
    pub fn new(config: BoardConfig, mode: GameMode, seed: Option<u64>) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut rng = seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        let picker = if mode == GameMode::Collection {
            FruitPicker::collection(config.fruit_kinds, config.collection_probability, &mut rng)
        } else {
            FruitPicker::uniform(config.fruit_kinds)
        };
        let grid = Grid::new(config.width, config.height);
        let mut board = Self {
            config,
            grid,
            picker,
            rng,
            cascade: None,
            score: 0,
            events: Vec::new(),
        };
        board.fill();
        info!(
            width = board.config.width,
            height = board.config.height,
            kinds = board.config.fruit_kinds,
            target = ?board.picker.collection_target(),
            "board ready"
        );
        Ok(board)
    }

    /// Board with a given layout. The grid's dimensions override the
    /// config's; empty cells are allowed and refill on the first cascade.
    pub fn with_grid(
        config: BoardConfig,
        grid: Grid,
        picker: FruitPicker,
        seed: u64,
    ) -> Result<Self, ConfigError> {
        let config = BoardConfig {
            width: grid.width(),
            height: grid.height(),
            ..config
        };
        config.validate()?;
        Ok(Self {
            config,
            grid,
            picker,
            rng: StdRng::seed_from_u64(seed),
            cascade: None,
            score: 0,
            events: Vec::new(),
        })
    }

    fn fill(&mut self) {
        for pos in self.grid.positions() {
            let mut fruit = self.picker.initial(&mut self.rng);
            let mut attempts = 1;
            while self.repeats_two_back(pos, fruit) {
                if attempts >= MAX_FILL_ATTEMPTS {
                    if let Some(first) = self.first_allowed(pos) {
                        fruit = first;
                    }
                    break;
                }
                fruit = self.picker.initial(&mut self.rng);
                attempts += 1;
            }
            self.grid.set(pos, Some(fruit));
        }
        debug!(grid = %self.grid, "initial fill");
    }

    /// Same kind as the cell two back in its row or column.
    fn repeats_two_back(&self, pos: Pos, fruit: FruitId) -> bool {
        let row = pos.x >= 2 && self.grid.get(Pos::new(pos.x - 2, pos.y)) == Some(fruit);
        let column = pos.y >= 2 && self.grid.get(Pos::new(pos.x, pos.y - 2)) == Some(fruit);
        row || column
    }

    fn first_allowed(&self, pos: Pos) -> Option<FruitId> {
        (0..self.config.fruit_kinds)
            .filter_map(|i| u8::try_from(i).ok().map(FruitId))
            .find(|&f| !self.repeats_two_back(pos, f))
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn pacing(&self) -> Pacing {
        self.config.pacing
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn picker(&self) -> &FruitPicker {
        &self.picker
    }

    /// Rare fruit to collect, in collection mode.
    pub fn collection_target(&self) -> Option<FruitId> {
        self.picker.collection_target()
    }

    /// Whether the shift lock is held.
    pub fn is_shifting(&self) -> bool {
        self.cascade.is_some()
    }

    pub fn phase(&self) -> PhaseKind {
        self.cascade.as_ref().map_or(PhaseKind::Idle, Cascade::phase)
    }

    /// Takes queued events, oldest first.
    pub fn drain_events(&mut self) -> Vec<BoardEvent> {
        std::mem::take(&mut self.events)
    }

    fn check_swap(&self, pos: Pos, dir: Direction) -> Result<Pos, Rejection> {
        if self.is_shifting() {
            return Err(Rejection::BoardBusy);
        }
        if !self.grid.contains(pos) {
            return Err(Rejection::OutOfBounds);
        }
        let fruit = self.grid.get(pos).ok_or(Rejection::EmptyCell)?;
        let other = self.grid.neighbor(pos, dir).ok_or(Rejection::NoNeighbor)?;
        match self.grid.get(other) {
            None => Err(Rejection::EmptyCell),
            Some(f) if f == fruit => Err(Rejection::SameFruit),
            Some(_) => Ok(other),
        }
    }

    /// Swaps the fruit at `pos` with its neighbor in `dir`. Without a match
    /// the swap is undone; with one the shift lock is taken and the cascade
    /// starts at clearing.
    pub fn swap(&mut self, pos: Pos, dir: Direction) -> Result<SwapOutcome, Rejection> {
        let other = match self.check_swap(pos, dir) {
            Ok(other) => other,
            Err(reason) => {
                debug!(%pos, ?dir, %reason, "swap rejected");
                self.events.push(BoardEvent::SwapRejected { at: pos, reason });
                return Err(reason);
            }
        };
        self.grid.swap(pos, other);
        self.events.push(BoardEvent::Swapped {
            from: pos,
            to: other,
        });
        let scan = matcher::scan(&self.grid, [pos, other]);
        if !scan.found() {
            self.grid.swap(pos, other);
            debug!(%pos, %other, "swap reverted");
            return Ok(SwapOutcome::Reverted);
        }
        self.events.push(BoardEvent::UniqueMatches {
            groups: scan.groups,
        });
        let cells = scan.cells.len();
        debug!(%pos, %other, cells, groups = scan.groups, "swap matched");
        self.cascade = Some(Cascade::clearing(Cause::Swap, scan.cells));
        Ok(SwapOutcome::Matched {
            cells,
            groups: scan.groups,
            settle: self.config.pacing.swap,
        })
    }

    /// Fires a power-up at `impact`. Inventory rules live in the session;
    /// the board only refuses while shifting or when the impact misses.
    pub fn fire(&mut self, kind: PowerUpKind, impact: Point) -> Result<PowerUpOutcome, Rejection> {
        if self.is_shifting() {
            return Err(Rejection::BoardBusy);
        }
        if !impact.is_on(&self.grid) {
            return Err(Rejection::OutOfBounds);
        }
        let cause = Cause::PowerUp(kind);
        let (cascade, cells, settle) = match kind {
            PowerUpKind::Bomb => {
                let set = powerup::bomb_cells(&self.grid, impact, self.config.bomb_radius);
                let n = set.len();
                (Cascade::clearing(cause, set), n, Duration::ZERO)
            }
            PowerUpKind::Lightning => {
                let set =
                    powerup::lightning_cells(&self.grid, impact, self.config.lightning_half_width);
                let n = set.len();
                (Cascade::clearing(cause, set), n, Duration::ZERO)
            }
            PowerUpKind::Potion => {
                let cells = self.reroll(impact);
                let n = cells.len();
                (Cascade::matching(cause, cells), n, self.config.pacing.potion)
            }
        };
        info!(%kind, x = impact.x, y = impact.y, cells, "power-up fired");
        self.events.push(BoardEvent::PowerUpFired {
            kind,
            impact,
            cells,
        });
        self.cascade = Some(cascade);
        Ok(PowerUpOutcome {
            kind,
            cells,
            settle,
        })
    }

    fn reroll(&mut self, impact: Point) -> Vec<Pos> {
        let cells = powerup::cells_in_radius(&self.grid, impact, self.config.potion_radius);
        for &pos in &cells {
            let fruit = self.picker.refill(&mut self.rng);
            self.grid.set(pos, Some(fruit));
        }
        self.events.push(BoardEvent::Rerolled {
            cells: cells.clone(),
        });
        cells
    }

    /// Runs one cascade phase. The lock is released when the cascade settles.
    pub fn step(&mut self) -> Step {
        let Some(cascade) = self.cascade.as_mut() else {
            return Step::Idle;
        };
        let picker = &self.picker;
        let rng = &mut self.rng;
        let before = cascade.summary().score;
        let advance = cascade.advance(
            &mut self.grid,
            || picker.refill(&mut *rng),
            &self.config,
            &mut self.events,
        );
        self.score += cascade.summary().score - before;
        match advance {
            Advance::Continue(delay) => Step::Pending(delay),
            Advance::Done(summary) => {
                self.cascade = None;
                Step::Settled(summary)
            }
        }
    }

    /// Steps until idle. Returns the summary of the cascade that was running.
    pub fn resolve(&mut self, settle: &mut impl Settle) -> Option<CascadeSummary> {
        loop {
            match self.step() {
                Step::Idle => return None,
                Step::Pending(delay) => settle.settle(delay),
                Step::Settled(summary) => return Some(summary),
            }
        }
    }

    /// Drops a running cascade mid-way and releases the lock. Cells already
    /// vacated are refilled so the grid stays full, redrawing any fruit that
    /// would complete a match. Runs lined up by the collapse itself are left
    /// in place and only clear once a later cascade reaches them.
    pub fn cancel(&mut self) -> bool {
        if self.cascade.take().is_none() {
            return false;
        }
        let columns = (0..self.grid.width()).collect();
        for x in 0..self.grid.width() {
            self.grid.collapse_column(x);
        }
        for pos in self.grid.empty_cells(&columns) {
            let fruit = self.quiet_refill(pos);
            self.grid.set(pos, Some(fruit));
        }
        info!("cascade cancelled");
        self.events.push(BoardEvent::CascadeCancelled);
        true
    }

    /// Refill draw for the empty cell `pos` that does not complete a match,
    /// when one of the kinds allows it.
    fn quiet_refill(&mut self, pos: Pos) -> FruitId {
        let mut fruit = self.picker.refill(&mut self.rng);
        let mut attempts = 1;
        while completes_match(&mut self.grid, pos, fruit) {
            if attempts >= MAX_FILL_ATTEMPTS {
                let kinds = (0..self.config.fruit_kinds).filter_map(|i| u8::try_from(i).ok().map(FruitId));
                for other in kinds {
                    if !completes_match(&mut self.grid, pos, other) {
                        return other;
                    }
                }
                break;
            }
            fruit = self.picker.refill(&mut self.rng);
            attempts += 1;
        }
        fruit
    }

    /// Every match currently on the board.
    pub fn matches(&self) -> MatchSet {
        matcher::find_all(&self.grid)
    }
}

/// Whether placing `fruit` in the empty cell `pos` lines up a match.
fn completes_match(grid: &mut Grid, pos: Pos, fruit: FruitId) -> bool {
    grid.set(pos, Some(fruit));
    let found = !matcher::matches_at(grid, pos).is_empty();
    grid.set(pos, None);
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cascade::Immediate;
    use crate::probability::ProbabilityTable;
    use proptest::prelude::*;

    fn config() -> BoardConfig {
        BoardConfig {
            pacing: Pacing::INSTANT,
            ..BoardConfig::default()
        }
    }

    fn board(rows: &[&str]) -> Board {
        let grid = Grid::from_rows(rows).unwrap();
        Board::with_grid(config(), grid, FruitPicker::uniform(5), 1).unwrap()
    }

    /// Board whose refills always draw A.
    fn board_refilling_a(rows: &[&str]) -> Board {
        let grid = Grid::from_rows(rows).unwrap();
        let table = ProbabilityTable::from_weights(&[1.0, 0.0, 0.0, 0.0, 0.0]).unwrap();
        Board::with_grid(config(), grid, FruitPicker::with_table(table, None), 1).unwrap()
    }

    #[test]
    fn invalid_config_fails_fast() {
        let config = BoardConfig {
            fruit_kinds: 1,
            ..config()
        };
        assert!(Board::new(config, GameMode::Feeding, Some(1)).is_err());
    }

    #[test]
    fn swap_without_match_is_reverted() {
        let mut b = board(&["ABC", "BCA", "CAB"]);
        let before = b.grid().clone();
        let outcome = b.swap(Pos::new(0, 0), Direction::Right);
        assert_eq!(outcome, Ok(SwapOutcome::Reverted));
        assert_eq!(b.grid(), &before);
        assert!(!b.is_shifting());
        let events = b.drain_events();
        assert!(matches!(events[..], [BoardEvent::Swapped { .. }]));
    }

    #[test]
    fn matching_swap_takes_the_lock_until_settled() {
        // Moving the A at (2, 1) down lines up the bottom row.
        let mut b = board(&["DED", "ECA", "AAC"]);
        let outcome = b.swap(Pos::new(2, 1), Direction::Down).unwrap();
        assert!(matches!(outcome, SwapOutcome::Matched { cells: 3, groups: 1, .. }));
        assert!(b.is_shifting());
        assert_eq!(b.phase(), PhaseKind::Clearing);
        assert_eq!(
            b.swap(Pos::new(0, 2), Direction::Right),
            Err(Rejection::BoardBusy)
        );
        let summary = b.resolve(&mut Immediate).unwrap();
        assert!(summary.passes >= 1);
        assert!(!b.is_shifting());
        assert!(b.grid().is_full());
        assert!(b.score() >= 30);
    }

    #[test]
    fn rejections_leave_board_untouched() {
        let mut b = board(&["AAB", "BCA", "CAB"]);
        let before = b.grid().clone();
        assert_eq!(b.swap(Pos::new(9, 0), Direction::Up), Err(Rejection::OutOfBounds));
        assert_eq!(b.swap(Pos::new(0, 0), Direction::Left), Err(Rejection::NoNeighbor));
        assert_eq!(b.swap(Pos::new(0, 2), Direction::Right), Err(Rejection::SameFruit));
        assert_eq!(b.grid(), &before);
        assert!(!b.is_shifting());
        let rejected = b
            .drain_events()
            .iter()
            .filter(|e| matches!(e, BoardEvent::SwapRejected { .. }))
            .count();
        assert_eq!(rejected, 3);
    }

    #[test]
    fn empty_cell_cannot_swap() {
        let mut b = board(&["A.B", "BCA", "CAB"]);
        assert_eq!(b.swap(Pos::new(1, 2), Direction::Down), Err(Rejection::EmptyCell));
        assert_eq!(b.swap(Pos::new(0, 2), Direction::Right), Err(Rejection::EmptyCell));
    }

    #[test]
    fn bomb_feeds_clearing() {
        let mut b = board(&["ABA", "BAB", "ACA"]);
        let out = b.fire(PowerUpKind::Bomb, Point::new(1.0, 1.0)).unwrap();
        assert_eq!(out.cells, 5);
        assert_eq!(b.phase(), PhaseKind::Clearing);
        assert_eq!(
            b.fire(PowerUpKind::Bomb, Point::new(1.0, 1.0)),
            Err(Rejection::BoardBusy)
        );
        b.resolve(&mut Immediate);
        assert!(!b.is_shifting());
        let cleared: usize = b
            .drain_events()
            .iter()
            .filter_map(|e| match e {
                BoardEvent::Cleared { cells, pass: 1, .. } => Some(cells.len()),
                _ => None,
            })
            .sum();
        assert_eq!(cleared, 5);
    }

    #[test]
    fn potion_without_match_settles_and_unlocks() {
        let mut b = board(&["ABC", "BCD", "CDE"]);
        let out = b.fire(PowerUpKind::Potion, Point::new(1.0, 1.0)).unwrap();
        assert_eq!(out.cells, 5);
        assert_eq!(b.phase(), PhaseKind::Matching);
        b.resolve(&mut Immediate);
        assert!(!b.is_shifting());
        assert!(b.matches().is_empty());
    }

    #[test]
    fn potion_match_clears_only_the_matched_cells() {
        // Re-rolling the plus around (1, 1) to all A lines up a row and a
        // column of three through it.
        let mut b = board_refilling_a(&["BCDB", "CDBC", "DBCD", "BCDB"]);
        let out = b.fire(PowerUpKind::Potion, Point::new(1.0, 1.0)).unwrap();
        assert_eq!(out.cells, 5);
        assert_eq!(b.phase(), PhaseKind::Matching);
        b.resolve(&mut Immediate);
        assert!(!b.is_shifting());
        assert!(b.grid().is_full());
        let events = b.drain_events();
        let first_clear = events
            .iter()
            .find_map(|e| match e {
                BoardEvent::Cleared { cells, pass: 1, .. } => Some(cells.clone()),
                _ => None,
            })
            .unwrap();
        let mut cleared: Vec<Pos> = first_clear.iter().map(|&(pos, _)| pos).collect();
        cleared.sort_by_key(|p| (p.x, p.y));
        assert_eq!(
            cleared,
            [
                Pos::new(0, 1),
                Pos::new(1, 0),
                Pos::new(1, 1),
                Pos::new(1, 2),
                Pos::new(2, 1),
            ]
        );
        assert!(first_clear.iter().all(|&(_, fruit)| fruit == FruitId(0)));
    }

    #[test]
    fn impact_off_the_board_is_refused() {
        let mut b = board(&["ABC", "BCA", "CAB"]);
        assert_eq!(
            b.fire(PowerUpKind::Lightning, Point::new(7.0, 1.0)),
            Err(Rejection::OutOfBounds)
        );
        assert!(!b.is_shifting());
    }

    #[test]
    fn cancel_releases_the_lock_and_refills() {
        let mut b = board(&["DED", "ECA", "AAC"]);
        b.swap(Pos::new(2, 1), Direction::Down).unwrap();
        b.step();
        assert!(!b.grid().is_full());
        assert!(b.cancel());
        assert!(!b.is_shifting());
        assert!(b.grid().is_full());
        assert!(!b.cancel());
        assert_eq!(b.step(), Step::Idle);
    }

    #[test]
    fn cancel_refill_avoids_new_matches() {
        // Clearing the bottom row leaves the top row empty after the collapse;
        // three A refills there would line up.
        let mut b = board_refilling_a(&["DED", "ECA", "AAC"]);
        b.swap(Pos::new(2, 1), Direction::Down).unwrap();
        b.step();
        assert!(b.cancel());
        assert!(b.grid().is_full());
        assert!(b.matches().is_empty());
        assert_ne!(b.grid().get(Pos::new(2, 2)), Some(FruitId(0)));
    }

    proptest! {
        #[test]
        fn fresh_boards_have_no_matches(
            seed in any::<u64>(),
            width in 3usize..10,
            height in 3usize..10,
            kinds in 3usize..=6,
            collection in any::<bool>(),
        ) {
            let config = BoardConfig { width, height, fruit_kinds: kinds, ..config() };
            let mode = if collection { GameMode::Collection } else { GameMode::Feeding };
            let b = Board::new(config, mode, Some(seed)).unwrap();
            let g = b.grid();
            prop_assert!(g.is_full());
            for pos in g.positions() {
                let fruit = g.get(pos);
                if pos.x >= 2 {
                    prop_assert_ne!(fruit, g.get(Pos::new(pos.x - 2, pos.y)));
                }
                if pos.y >= 2 {
                    prop_assert_ne!(fruit, g.get(Pos::new(pos.x, pos.y - 2)));
                }
            }
            prop_assert!(b.matches().is_empty());
        }

        #[test]
        fn cascades_settle_within_the_pass_cap(
            seed in any::<u64>(),
            x in 0usize..6,
            y in 0usize..6,
            dir in prop::sample::select(Direction::ALL.to_vec()),
            kind in prop::sample::select(PowerUpKind::ALL.to_vec()),
        ) {
            let config = BoardConfig { width: 6, height: 6, fruit_kinds: 3, ..config() };
            let mut b = Board::new(config, GameMode::Feeding, Some(seed)).unwrap();
            let _ = b.swap(Pos::new(x, y), dir);
            if let Some(summary) = b.resolve(&mut Immediate) {
                prop_assert!(summary.passes <= 64);
            }
            prop_assert!(!b.is_shifting());
            let impact = Point::center_of(Pos::new(x, y));
            prop_assert!(b.fire(kind, impact).is_ok());
            b.resolve(&mut Immediate);
            prop_assert!(!b.is_shifting());
            prop_assert!(b.grid().is_full());
        }
    }
}
