//! A level being played: a board plus objective, budgets, combo multiplier,
//! inventory and the profile it reports to.

use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::board::{Board, PowerUpOutcome, SwapOutcome};
use crate::cascade::{CascadeSummary, Immediate, Step};
use crate::config::{BoardConfig, Difficulty, GameMode, ModeRules, PlayMode};
use crate::error::{ConfigError, Rejection};
use crate::events::{BoardEvent, EventDispatcher};
use crate::grid::{Direction, FruitId, Pos};
use crate::powerup::{Inventory, Point, PowerUpKind};
use crate::profile::{LevelRecord, ProfileStore};

/// Highest combo multiplier factor.
const MAX_FACTOR: u32 = 5;
/// Games in a row before difficulty moves.
const MAX_CONSECUTIVE_GAMES: u32 = 1;
/// Mixed into the seed so the session's own rolls differ from the board's.
const SESSION_SEED_SALT: u64 = 0x5eed_ba75;

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSetup {
    pub mode: GameMode,
    pub board: BoardConfig,
    pub rules: ModeRules,
    /// Level index being played, 0-based.
    pub level: u32,
    /// Overrides the profile's difficulty.
    pub difficulty: Option<Difficulty>,
    pub seed: Option<u64>,
}

impl Default for SessionSetup {
    fn default() -> Self {
        Self {
            mode: GameMode::default(),
            board: BoardConfig::default(),
            rules: ModeRules::default(),
            level: 0,
            difficulty: None,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LossReason {
    OutOfMoves,
    /// The time-to-match window ran out.
    OutOfTime,
    /// The level timer of the time objective ran out.
    TimeUp,
    Abandoned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Playing,
    Won { stars: u8 },
    Lost(LossReason),
}

impl SessionStatus {
    pub fn is_over(self) -> bool {
        self != Self::Playing
    }
}

/// Final numbers of a finished session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameResult {
    pub status: SessionStatus,
    pub score: u64,
    pub stars: u8,
    pub bonus: u64,
    pub coins_awarded: u64,
    /// Newly unlocked level index, when the current level was beaten.
    pub unlocked_level: Option<u32>,
    pub difficulty: Difficulty,
}

/// Objective progress towards `goal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Objective {
    pub mode: GameMode,
    pub goal: u64,
    pub progress: u64,
    /// Fruit to collect in collection mode.
    pub target: Option<FruitId>,
}

impl Objective {
    pub fn complete(&self) -> bool {
        self.progress >= self.goal
    }

    pub fn remaining(&self) -> u64 {
        self.goal.saturating_sub(self.progress)
    }
}

/// Time-to-match window of timed play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchClock {
    base: Duration,
    min: Duration,
    penalty: Duration,
    max_strikes: u32,
    window: Duration,
    strikes: u32,
    penalized: bool,
    started: Instant,
}

impl MatchClock {
    fn new(rules: &ModeRules, now: Instant) -> Self {
        Self {
            base: rules.time_to_match,
            min: rules.min_time_to_match,
            penalty: rules.penalty,
            max_strikes: rules.penalty_strikes,
            window: rules.time_to_match,
            strikes: 0,
            penalized: false,
            started: now,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn strikes(&self) -> u32 {
        self.strikes
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        self.window
            .saturating_sub(now.saturating_duration_since(self.started))
    }

    pub fn expired(&self, now: Instant) -> bool {
        self.remaining(now).is_zero()
    }

    fn restart(&mut self, now: Instant) {
        self.started = now;
    }

    fn penalize(&mut self) {
        self.window = self
            .window
            .saturating_sub(self.penalty)
            .max(self.min)
            .min(self.base);
        self.strikes = self.max_strikes;
        self.penalized = true;
    }

    fn matched(&mut self) {
        if !self.penalized {
            return;
        }
        self.strikes = self.strikes.saturating_sub(1);
        if self.strikes == 0 {
            self.window = (self.window + self.penalty).min(self.base);
            self.penalized = self.window < self.base;
        }
    }
}

/// Combo multiplier of the scoring objective.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Multiplier {
    pub streak: u32,
    pub factor: u32,
    pub active: bool,
    sum: u64,
}

impl Multiplier {
    fn on_swap<R: Rng + ?Sized>(&mut self, groups: usize, probability: f64, rng: &mut R) {
        if groups > 1 {
            self.streak += 1;
        }
        if !self.active && rng.random_bool(probability) {
            self.active = true;
            self.factor = (2 + self.streak).min(MAX_FACTOR);
            self.sum = 0;
            debug!(factor = self.factor, "multiplier active");
        }
    }

    fn on_clear(&mut self, score: u64) {
        if self.active {
            self.sum += score;
        }
    }

    /// Pays out and resets. Returns the bonus.
    fn settle(&mut self) -> u64 {
        if !self.active {
            return 0;
        }
        let bonus = self.sum * u64::from(self.factor - 1);
        *self = Self::default();
        bonus
    }
}

pub struct Session<S: ProfileStore> {
    mode: GameMode,
    rules: ModeRules,
    level: u32,
    difficulty: Difficulty,
    board: Board,
    inventory: Inventory,
    store: S,
    objective: Objective,
    moves_left: u32,
    clock: Option<MatchClock>,
    deadline: Option<Instant>,
    multiplier: Multiplier,
    bonus_score: u64,
    rng: StdRng,
    dispatcher: EventDispatcher,
    ended: bool,
    result: Option<GameResult>,
}

impl<S: ProfileStore> Session<S> {
    pub fn new(setup: SessionSetup, store: S, now: Instant) -> Result<Self, ConfigError> {
        setup.rules.validate()?;
        let board = Board::new(setup.board, setup.mode, setup.seed)?;
        let rng = setup.seed.map_or_else(StdRng::from_os_rng, |s| {
            StdRng::seed_from_u64(s ^ SESSION_SEED_SALT)
        });
        let difficulty = setup.difficulty.unwrap_or(store.profile().difficulty);
        let rules = setup.rules;
        let objective = Objective {
            mode: setup.mode,
            goal: rules.goal(setup.mode, difficulty),
            progress: 0,
            target: board.collection_target(),
        };
        let (clock, deadline) = match setup.mode.play_mode() {
            PlayMode::MovesLimited => (None, None),
            PlayMode::TimedMatch => (Some(MatchClock::new(&rules, now)), Some(now + rules.total_time)),
        };
        info!(
            mode = setup.mode.name(),
            level = setup.level,
            difficulty = difficulty.get(),
            goal = objective.goal,
            "session started"
        );
        Ok(Self {
            mode: setup.mode,
            level: setup.level,
            difficulty,
            inventory: store.profile().inventory(),
            moves_left: rules.moves,
            rules,
            board,
            store,
            objective,
            clock,
            deadline,
            multiplier: Multiplier::default(),
            bonus_score: 0,
            rng,
            dispatcher: EventDispatcher::new(),
            ended: false,
            result: None,
        })
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn rules(&self) -> &ModeRules {
        &self.rules
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    /// Grants infinite uses of `kind` for `duration`.
    pub fn make_infinite(&mut self, kind: PowerUpKind, duration: Duration, now: Instant) {
        self.inventory.make_infinite(kind, duration, now);
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn dispatcher_mut(&mut self) -> &mut EventDispatcher {
        &mut self.dispatcher
    }

    pub fn moves_left(&self) -> Option<u32> {
        (self.mode.play_mode() == PlayMode::MovesLimited).then_some(self.moves_left)
    }

    pub fn clock(&self) -> Option<&MatchClock> {
        self.clock.as_ref()
    }

    /// Time left on the level timer of the time objective.
    pub fn time_left(&self, now: Instant) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(now))
    }

    pub fn multiplier(&self) -> Multiplier {
        self.multiplier
    }

    /// Board score plus multiplier bonuses.
    pub fn score(&self) -> u64 {
        self.board.score() + self.bonus_score
    }

    pub fn stars(&self) -> u8 {
        let bar = self.rules.score_bar.max(1);
        let stars = (self.score().saturating_mul(3) / bar).min(3);
        u8::try_from(stars).unwrap_or(3)
    }

    /// Player level used for power-up unlocks.
    fn player_level(&self) -> u32 {
        self.store.profile().level
    }

    pub fn swap(&mut self, pos: Pos, dir: Direction, now: Instant) -> Result<SwapOutcome, Rejection> {
        if self.status(now).is_over() {
            return Err(Rejection::SessionOver);
        }
        let result = self.board.swap(pos, dir);
        if let Ok(outcome) = result {
            if self.mode.play_mode() == PlayMode::MovesLimited {
                self.moves_left = self.moves_left.saturating_sub(1);
            }
            match outcome {
                SwapOutcome::Reverted => {
                    if let Some(clock) = self.clock.as_mut() {
                        clock.penalize();
                        info!(window = ?clock.window(), "time to match shortened");
                    }
                }
                SwapOutcome::Matched { groups, .. } => {
                    if let Some(clock) = self.clock.as_mut() {
                        clock.matched();
                    }
                    match self.mode {
                        GameMode::Time => self.objective.progress += 1,
                        GameMode::Scoring => self.multiplier.on_swap(
                            groups,
                            self.rules.multiplier_probability,
                            &mut self.rng,
                        ),
                        GameMode::Feeding | GameMode::Collection => {}
                    }
                }
            }
        }
        self.pump(now);
        result
    }

    pub fn use_power_up(
        &mut self,
        kind: PowerUpKind,
        impact: Point,
        now: Instant,
    ) -> Result<PowerUpOutcome, Rejection> {
        if self.status(now).is_over() {
            return Err(Rejection::SessionOver);
        }
        if self.board.is_shifting() {
            return Err(Rejection::BoardBusy);
        }
        let level = self.player_level();
        self.inventory.check(kind, level, now)?;
        let outcome = self.board.fire(kind, impact)?;
        let used = self.inventory.consume(kind, level, now)?;
        self.store.set_power_up_amount(kind, used.remaining);
        self.pump(now);
        Ok(outcome)
    }

    /// One cascade phase; see [`Board::step`].
    pub fn step(&mut self, now: Instant) -> Step {
        let step = self.board.step();
        self.pump(now);
        step
    }

    /// Resolves the running cascade without pauses.
    pub fn resolve(&mut self, now: Instant) -> Option<CascadeSummary> {
        let summary = self.board.resolve(&mut Immediate);
        self.pump(now);
        summary
    }

    /// Applies board events to the trackers, then hands them to listeners.
    fn pump(&mut self, now: Instant) {
        for event in self.board.drain_events() {
            match &event {
                BoardEvent::Cleared { cells, score, .. } => {
                    match self.mode {
                        GameMode::Feeding => self.objective.progress += cells.len() as u64,
                        GameMode::Collection => {
                            let hits = cells
                                .iter()
                                .filter(|(_, f)| Some(*f) == self.objective.target)
                                .count();
                            self.objective.progress += hits as u64;
                        }
                        GameMode::Scoring | GameMode::Time => {}
                    }
                    self.multiplier.on_clear(*score);
                    if *score > 0 {
                        if let Some(clock) = self.clock.as_mut() {
                            clock.restart(now);
                        }
                    }
                }
                BoardEvent::CascadeSettled { .. } => {
                    let bonus = self.multiplier.settle();
                    if bonus > 0 {
                        info!(bonus, "multiplier paid out");
                        self.bonus_score += bonus;
                    }
                }
                _ => {}
            }
            self.dispatcher.dispatch(&event);
        }
        if self.mode == GameMode::Scoring {
            self.objective.progress = self.score();
        }
    }

    /// Win/lose evaluation. Stays `Playing` while the board is shifting.
    pub fn status(&self, now: Instant) -> SessionStatus {
        if let Some(result) = self.result {
            return result.status;
        }
        if self.ended {
            return SessionStatus::Lost(LossReason::Abandoned);
        }
        if self.board.is_shifting() {
            return SessionStatus::Playing;
        }
        let complete = self.objective.complete();
        let stars = self.stars();
        if complete && stars >= 3 {
            return SessionStatus::Won { stars };
        }
        let exhausted = match self.mode.play_mode() {
            PlayMode::MovesLimited => (self.moves_left == 0).then_some(LossReason::OutOfMoves),
            PlayMode::TimedMatch => {
                if self.clock.is_some_and(|c| c.expired(now)) {
                    Some(LossReason::OutOfTime)
                } else if self.deadline.is_some_and(|d| now >= d) {
                    Some(LossReason::TimeUp)
                } else {
                    None
                }
            }
        };
        match exhausted {
            None => SessionStatus::Playing,
            Some(_) if complete && stars >= 1 => SessionStatus::Won { stars },
            Some(reason) => SessionStatus::Lost(reason),
        }
    }

    /// Records the outcome once the session is over: rewards, level record,
    /// next level and difficulty. Later calls return the same result.
    pub fn finish(&mut self, now: Instant) -> Option<GameResult> {
        if self.result.is_some() {
            return self.result;
        }
        let status = self.status(now);
        if !status.is_over() {
            return None;
        }
        let score = self.score();
        let stars = self.stars();
        let mut result = GameResult {
            status,
            score,
            stars,
            bonus: 0,
            coins_awarded: 0,
            unlocked_level: None,
            difficulty: self.difficulty,
        };
        match status {
            SessionStatus::Won { .. } => {
                result.bonus = self.win_bonus(now);
                self.record_win(&mut result);
            }
            SessionStatus::Lost(LossReason::Abandoned) => {}
            SessionStatus::Lost(_) => self.record_loss(&mut result),
            SessionStatus::Playing => return None,
        }
        info!(?result, "session finished");
        self.board.cancel();
        self.result = Some(result);
        self.result
    }

    fn win_bonus(&self, now: Instant) -> u64 {
        match self.mode.play_mode() {
            PlayMode::MovesLimited => u64::from(self.moves_left),
            PlayMode::TimedMatch => self.time_left(now).map_or(0, |t| t.as_secs() / 10),
        }
    }

    fn record_win(&mut self, result: &mut GameResult) {
        let profile = self.store.profile().clone();
        let index = self.level as usize;
        if self.level == profile.level {
            result.coins_awarded = self.rules.level_reward + result.bonus;
            self.store.set_coins(profile.coins + result.coins_awarded);
            self.store.set_level(profile.level + 1);
            result.unlocked_level = Some(profile.level + 1);
        }
        let old = profile.record(index);
        let best = LevelRecord {
            stars: old.stars.max(result.stars),
            score: old.score.max(result.score),
        };
        if best != old {
            self.store.set_level_record(index, best);
        }
        let mut victories = profile.victories + 1;
        let mut difficulty = profile.difficulty;
        if victories >= MAX_CONSECUTIVE_GAMES {
            difficulty = difficulty.harder();
            victories = 0;
        }
        self.store.set_difficulty(difficulty, victories, 0);
        result.difficulty = difficulty;
    }

    fn record_loss(&mut self, result: &mut GameResult) {
        let profile = self.store.profile();
        let mut defeats = profile.defeats + 1;
        let mut difficulty = profile.difficulty;
        if defeats >= MAX_CONSECUTIVE_GAMES {
            difficulty = difficulty.easier();
            defeats = 0;
        }
        self.store.set_difficulty(difficulty, 0, defeats);
        result.difficulty = difficulty;
    }

    /// Stops the session, cancelling any running cascade.
    pub fn end(&mut self) {
        if self.ended {
            return;
        }
        self.ended = true;
        self.board.cancel();
        self.pump(Instant::now());
        info!("session ended");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cascade::Pacing;
    use crate::events::EventKind;
    use crate::profile::{MemoryProfileStore, Profile};
    use std::cell::Cell;
    use std::rc::Rc;

    fn setup(mode: GameMode) -> SessionSetup {
        SessionSetup {
            mode,
            board: BoardConfig {
                pacing: Pacing::INSTANT,
                ..BoardConfig::default()
            },
            seed: Some(42),
            ..SessionSetup::default()
        }
    }

    fn session(mode: GameMode) -> (Session<MemoryProfileStore>, Instant) {
        let now = Instant::now();
        let s = Session::new(setup(mode), MemoryProfileStore::default(), now).unwrap();
        (s, now)
    }

    /// First swap on the board that makes a match, if any.
    fn find_matching_swap<S: ProfileStore>(s: &Session<S>) -> Option<(Pos, Direction)> {
        let grid = s.board().grid();
        for pos in grid.positions() {
            for dir in [Direction::Right, Direction::Up] {
                let Some(other) = grid.neighbor(pos, dir) else {
                    continue;
                };
                if grid.get(pos) == grid.get(other) {
                    continue;
                }
                let mut g = grid.clone();
                g.swap(pos, other);
                if crate::matcher::scan(&g, [pos, other]).found() {
                    return Some((pos, dir));
                }
            }
        }
        None
    }

    fn find_reverting_swap<S: ProfileStore>(s: &Session<S>) -> Option<(Pos, Direction)> {
        let grid = s.board().grid();
        for pos in grid.positions() {
            let Some(other) = grid.neighbor(pos, Direction::Right) else {
                continue;
            };
            if grid.get(pos) == grid.get(other) {
                continue;
            }
            let mut g = grid.clone();
            g.swap(pos, other);
            if !crate::matcher::scan(&g, [pos, other]).found() {
                return Some((pos, Direction::Right));
            }
        }
        None
    }

    #[test]
    fn objective_goal_follows_difficulty() {
        let now = Instant::now();
        let profile = Profile {
            difficulty: Difficulty::new(2),
            ..Profile::default()
        };
        let s = Session::new(setup(GameMode::Feeding), MemoryProfileStore::new(profile), now).unwrap();
        assert_eq!(s.objective().goal, 44);
        assert_eq!(s.moves_left(), Some(20));
        assert!(s.clock().is_none());
    }

    #[test]
    fn collection_targets_the_rarest_fruit() {
        let (s, _) = session(GameMode::Collection);
        let target = s.objective().target.unwrap();
        assert_eq!(Some(target), s.board().collection_target());
        assert_eq!(target, s.board().picker().table().rarest());
    }

    #[test]
    fn every_accepted_swap_costs_a_move() {
        let (mut s, now) = session(GameMode::Feeding);
        let (pos, dir) = find_reverting_swap(&s).unwrap();
        assert_eq!(s.swap(pos, dir, now), Ok(SwapOutcome::Reverted));
        assert_eq!(s.moves_left(), Some(19));

        let (pos, dir) = find_matching_swap(&s).unwrap();
        assert!(matches!(s.swap(pos, dir, now), Ok(SwapOutcome::Matched { .. })));
        assert_eq!(s.moves_left(), Some(18));
        s.resolve(now);
        assert!(s.objective().progress >= 3);

        // Rejected swaps are free.
        assert!(s.swap(Pos::new(99, 0), Direction::Up, now).is_err());
        assert_eq!(s.moves_left(), Some(18));
    }

    #[test]
    fn listeners_see_clears() {
        let (mut s, now) = session(GameMode::Feeding);
        let cleared = Rc::new(Cell::new(0usize));
        let seen = Rc::clone(&cleared);
        s.dispatcher_mut().on(EventKind::Cleared, move |e| {
            if let BoardEvent::Cleared { cells, .. } = e {
                seen.set(seen.get() + cells.len());
            }
        });
        let (pos, dir) = find_matching_swap(&s).unwrap();
        s.swap(pos, dir, now).unwrap();
        s.resolve(now);
        assert_eq!(cleared.get() as u64, s.objective().progress);
    }

    #[test]
    fn penalty_shrinks_window_and_three_matches_restore_it() {
        let now = Instant::now();
        let mut clock = MatchClock::new(&ModeRules::default(), now);
        clock.penalize();
        assert_eq!(clock.window(), Duration::from_secs(8));
        assert_eq!(clock.strikes(), 3);
        clock.matched();
        clock.matched();
        assert_eq!(clock.window(), Duration::from_secs(8));
        clock.matched();
        assert_eq!(clock.window(), Duration::from_secs(10));
        assert!(!clock.penalized);
    }

    #[test]
    fn penalty_never_goes_below_minimum() {
        let now = Instant::now();
        let mut clock = MatchClock::new(&ModeRules::default(), now);
        for _ in 0..10 {
            clock.penalize();
        }
        assert_eq!(clock.window(), Duration::from_secs(3));
        assert_eq!(clock.remaining(now + Duration::from_secs(1)), Duration::from_secs(2));
        assert!(clock.expired(now + Duration::from_secs(3)));
    }

    #[test]
    fn no_match_swap_in_time_mode_is_penalized() {
        let (mut s, now) = session(GameMode::Time);
        let (pos, dir) = find_reverting_swap(&s).unwrap();
        s.swap(pos, dir, now).unwrap();
        assert_eq!(s.clock().unwrap().window(), Duration::from_secs(8));
        assert_eq!(s.moves_left(), None);
    }

    #[test]
    fn time_mode_loses_when_window_runs_out() {
        let (mut s, now) = session(GameMode::Time);
        assert_eq!(s.status(now), SessionStatus::Playing);
        let late = now + Duration::from_secs(11);
        assert_eq!(s.status(late), SessionStatus::Lost(LossReason::OutOfTime));
        let result = s.finish(late).unwrap();
        assert_eq!(result.coins_awarded, 0);
        assert_eq!(s.swap(Pos::new(0, 0), Direction::Up, late), Err(Rejection::SessionOver));
    }

    #[test]
    fn multiplier_pays_sum_times_factor_minus_one() {
        let mut m = Multiplier::default();
        let mut rng = StdRng::seed_from_u64(1);
        m.on_swap(2, 1.0, &mut rng);
        assert!(m.active);
        assert_eq!(m.factor, 3);
        m.on_clear(30);
        m.on_clear(40);
        assert_eq!(m.settle(), 140);
        assert!(!m.active);
        assert_eq!(m.settle(), 0);
    }

    #[test]
    fn settled_cascade_adds_multiplier_bonus_to_the_score() {
        let now = Instant::now();
        let mut always = setup(GameMode::Scoring);
        always.rules.multiplier_probability = 1.0;
        let mut s = Session::new(always, MemoryProfileStore::default(), now).unwrap();
        let cleared = Rc::new(Cell::new(0u64));
        let seen = Rc::clone(&cleared);
        s.dispatcher_mut().on(EventKind::Cleared, move |e| {
            if let BoardEvent::Cleared { score, .. } = e {
                seen.set(seen.get() + score);
            }
        });
        let (pos, dir) = find_matching_swap(&s).unwrap();
        s.swap(pos, dir, now).unwrap();
        let factor = s.multiplier().factor;
        assert!(s.multiplier().active);
        assert!(factor >= 2);
        s.resolve(now);

        let base = cleared.get();
        assert!(base > 0);
        assert_eq!(s.board().score(), base);
        assert_eq!(s.score(), base * u64::from(factor));
        assert_eq!(s.objective().progress, s.score());
        assert!(!s.multiplier().active);
        assert_eq!(s.multiplier().factor, 0);
    }

    #[test]
    fn multiplier_factor_is_capped() {
        let mut m = Multiplier::default();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..6 {
            m.on_swap(3, 0.0, &mut rng);
        }
        m.on_swap(3, 1.0, &mut rng);
        assert_eq!(m.factor, MAX_FACTOR);
    }

    #[test]
    fn stars_follow_score_bar_thirds() {
        let (mut s, _) = session(GameMode::Scoring);
        s.rules.score_bar = 300;
        assert_eq!(s.stars(), 0);
        s.bonus_score = 100;
        assert_eq!(s.stars(), 1);
        s.bonus_score = 200;
        assert_eq!(s.stars(), 2);
        s.bonus_score = 900;
        assert_eq!(s.stars(), 3);
    }

    #[test]
    fn out_of_moves_with_objective_is_a_win_on_the_current_level() {
        let (mut s, now) = session(GameMode::Feeding);
        s.moves_left = 0;
        s.objective.progress = s.objective.goal;
        s.bonus_score = s.rules.score_bar / 3;
        assert_eq!(s.status(now), SessionStatus::Won { stars: 1 });
        let result = s.finish(now).unwrap();
        assert_eq!(result.bonus, 0);
        assert_eq!(result.coins_awarded, s.rules.level_reward);
        assert_eq!(result.unlocked_level, Some(1));
        let profile = s.store().profile();
        assert_eq!(profile.coins, 50);
        assert_eq!(profile.level, 1);
        assert_eq!(profile.record(0).stars, 1);
        assert_eq!(profile.difficulty, Difficulty::new(2));
        // Finishing twice does not pay twice.
        assert_eq!(s.finish(now), Some(result));
        assert_eq!(s.store().profile().coins, 50);
    }

    #[test]
    fn three_stars_with_objective_ends_early_with_move_bonus() {
        let (mut s, now) = session(GameMode::Feeding);
        s.objective.progress = s.objective.goal;
        s.bonus_score = s.rules.score_bar;
        assert_eq!(s.status(now), SessionStatus::Won { stars: 3 });
        let result = s.finish(now).unwrap();
        assert_eq!(result.bonus, 20);
        assert_eq!(result.coins_awarded, 70);
    }

    #[test]
    fn replaying_an_old_level_keeps_best_record_without_coins() {
        let now = Instant::now();
        let mut profile = Profile {
            level: 3,
            ..Profile::default()
        };
        profile.levels = vec![LevelRecord { stars: 3, score: 50 }];
        let mut s = Session::new(setup(GameMode::Feeding), MemoryProfileStore::new(profile), now).unwrap();
        s.moves_left = 0;
        s.objective.progress = s.objective.goal;
        s.bonus_score = s.rules.score_bar / 3;
        let result = s.finish(now).unwrap();
        assert_eq!(result.coins_awarded, 0);
        assert_eq!(result.unlocked_level, None);
        let record = s.store().profile().record(0);
        assert_eq!(record.stars, 3);
        assert!(record.score >= 400);
    }

    #[test]
    fn losing_lowers_difficulty() {
        let now = Instant::now();
        let profile = Profile {
            difficulty: Difficulty::new(5),
            ..Profile::default()
        };
        let mut s = Session::new(setup(GameMode::Feeding), MemoryProfileStore::new(profile), now).unwrap();
        s.moves_left = 0;
        assert_eq!(s.status(now), SessionStatus::Lost(LossReason::OutOfMoves));
        let result = s.finish(now).unwrap();
        assert_eq!(result.difficulty, Difficulty::new(4));
        assert_eq!(s.store().profile().difficulty, Difficulty::new(4));
    }

    #[test]
    fn power_up_spends_stock_and_persists_amount() {
        let (mut s, now) = session(GameMode::Feeding);
        let out = s
            .use_power_up(PowerUpKind::Bomb, Point::new(3.0, 3.0), now)
            .unwrap();
        assert!(out.cells > 0);
        assert_eq!(
            s.use_power_up(PowerUpKind::Bomb, Point::new(3.0, 3.0), now),
            Err(Rejection::BoardBusy)
        );
        s.resolve(now);
        assert_eq!(s.inventory().amount(PowerUpKind::Bomb), 2);
        assert_eq!(s.store().profile().power_ups[&PowerUpKind::Bomb], 2);
        assert!(matches!(
            s.use_power_up(PowerUpKind::Potion, Point::new(3.0, 3.0), now),
            Err(Rejection::Locked { .. })
        ));
        assert_eq!(
            s.use_power_up(PowerUpKind::Bomb, Point::new(30.0, 3.0), now),
            Err(Rejection::OutOfBounds)
        );
        assert_eq!(s.inventory().amount(PowerUpKind::Bomb), 2);
    }

    #[test]
    fn end_cancels_the_cascade() {
        let (mut s, now) = session(GameMode::Feeding);
        let (pos, dir) = find_matching_swap(&s).unwrap();
        s.swap(pos, dir, now).unwrap();
        assert!(s.board().is_shifting());
        s.end();
        assert!(!s.board().is_shifting());
        assert_eq!(s.status(now), SessionStatus::Lost(LossReason::Abandoned));
        let result = s.finish(now).unwrap();
        assert_eq!(result.difficulty, Difficulty::MIN);
        assert_eq!(s.store().writes(), 0);
    }
}
