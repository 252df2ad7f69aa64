//! Board and game-rule configuration.

use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::cascade::Pacing;
use crate::error::ConfigError;

pub const MIN_FRUIT_KINDS: usize = 3;
pub const MAX_FRUIT_KINDS: usize = 6;
pub const MIN_BOARD_SIDE: usize = 3;
pub const MAX_BOARD_SIDE: usize = 32;

/// Board geometry, scoring and power-up tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardConfig {
    pub width: usize,
    pub height: usize,
    pub fruit_kinds: usize,
    pub score_per_cell: u64,
    /// Covers a 3x3 block at the default.
    pub bomb_radius: f32,
    pub potion_radius: f32,
    pub lightning_half_width: f32,
    /// Chance that a refill landing on the rare fruit keeps it (collection mode).
    pub collection_probability: f64,
    pub max_cascade_passes: u32,
    pub pacing: Pacing,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            width: 8,
            height: 8,
            fruit_kinds: 5,
            score_per_cell: 10,
            bomb_radius: 1.5,
            potion_radius: 1.0,
            lightning_half_width: 0.1,
            collection_probability: 0.3,
            max_cascade_passes: 64,
            pacing: Pacing::default(),
        }
    }
}

impl BoardConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fruit_kinds < MIN_FRUIT_KINDS {
            return Err(ConfigError::TooFewFruitKinds {
                kinds: self.fruit_kinds,
                min: MIN_FRUIT_KINDS,
            });
        }
        if self.fruit_kinds > MAX_FRUIT_KINDS {
            return Err(ConfigError::TooManyFruitKinds {
                kinds: self.fruit_kinds,
                max: MAX_FRUIT_KINDS,
            });
        }
        if self.width < MIN_BOARD_SIDE || self.height < MIN_BOARD_SIDE {
            return Err(ConfigError::BoardTooSmall {
                width: self.width,
                height: self.height,
                min: MIN_BOARD_SIDE,
            });
        }
        if self.width > MAX_BOARD_SIDE || self.height > MAX_BOARD_SIDE {
            return Err(ConfigError::BoardTooLarge {
                width: self.width,
                height: self.height,
                max: MAX_BOARD_SIDE,
            });
        }
        check_probability("collection_probability", self.collection_probability)?;
        for (name, value) in [
            ("bomb_radius", self.bomb_radius),
            ("potion_radius", self.potion_radius),
            ("lightning_half_width", self.lightning_half_width),
        ] {
            // NaN fails this comparison too.
            if !(value > 0.0) {
                return Err(ConfigError::NonPositive {
                    name,
                    value: f64::from(value),
                });
            }
        }
        if self.score_per_cell == 0 {
            return Err(ConfigError::Zero {
                name: "score_per_cell",
            });
        }
        if self.max_cascade_passes == 0 {
            return Err(ConfigError::Zero {
                name: "max_cascade_passes",
            });
        }
        Ok(())
    }
}

fn check_probability(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::ProbabilityOutOfRange { name, value })
    }
}

/// Objective mode of a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum, Serialize, Deserialize)]
pub enum GameMode {
    /// Clear a number of fruits of any kind.
    #[default]
    Feeding,
    /// Reach a score; combo multiplier active.
    Scoring,
    /// Make a number of matching swaps before the level timer runs out.
    Time,
    /// Clear a number of the rarest fruit.
    Collection,
}

impl GameMode {
    pub const ALL: [Self; 4] = [Self::Feeding, Self::Scoring, Self::Time, Self::Collection];

    pub fn name(self) -> &'static str {
        match self {
            Self::Feeding => "Feeding",
            Self::Scoring => "Scoring",
            Self::Time => "Time",
            Self::Collection => "Collection",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Feeding => "Feed the bat!",
            Self::Scoring => "Beat the score!",
            Self::Time => "Pick the fruits before the time runs out!",
            Self::Collection => "Collect all orders!",
        }
    }

    pub fn play_mode(self) -> PlayMode {
        match self {
            Self::Time => PlayMode::TimedMatch,
            Self::Feeding | Self::Scoring | Self::Collection => PlayMode::MovesLimited,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayMode {
    MovesLimited,
    TimedMatch,
}

/// Difficulty 1..=10. Objective goals grow by a tenth per step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub struct Difficulty(u8);

impl Difficulty {
    pub const MIN: Self = Self(1);
    pub const MAX: Self = Self(10);

    pub fn new(value: u8) -> Self {
        Self(value.clamp(Self::MIN.0, Self::MAX.0))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn harder(self) -> Self {
        Self::new(self.0.saturating_add(1))
    }

    pub fn easier(self) -> Self {
        Self::new(self.0.saturating_sub(1))
    }

    /// `base * (1 + (d - 1) / 10)`, rounded up.
    pub fn scale(self, base: u64) -> u64 {
        let factor = 9 + u64::from(self.0);
        (base.saturating_mul(factor)).div_ceil(10)
    }
}

impl From<u8> for Difficulty {
    fn from(value: u8) -> Self {
        Self::new(value)
    }
}

impl From<Difficulty> for u8 {
    fn from(value: Difficulty) -> Self {
        value.0
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Self::MIN
    }
}

/// Budgets and goals for one level.
#[derive(Debug, Clone, PartialEq)]
pub struct ModeRules {
    pub moves: u32,
    pub time_to_match: Duration,
    pub min_time_to_match: Duration,
    pub penalty: Duration,
    pub penalty_strikes: u32,
    /// Level timer of the time objective.
    pub total_time: Duration,
    pub feeding_goal: u64,
    pub score_goal: u64,
    pub match_goal: u64,
    pub collection_goal: u64,
    /// Score needed for three stars.
    pub score_bar: u64,
    pub multiplier_probability: f64,
    pub level_reward: u64,
}

impl Default for ModeRules {
    fn default() -> Self {
        Self {
            moves: 20,
            time_to_match: Duration::from_secs(10),
            min_time_to_match: Duration::from_secs(3),
            penalty: Duration::from_secs(2),
            penalty_strikes: 3,
            total_time: Duration::from_secs(90),
            feeding_goal: 40,
            score_goal: 1500,
            match_goal: 15,
            collection_goal: 8,
            score_bar: 1200,
            multiplier_probability: 0.25,
            level_reward: 50,
        }
    }
}

impl ModeRules {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_probability("multiplier_probability", self.multiplier_probability)?;
        for (name, zero) in [
            ("moves", self.moves == 0),
            ("time_to_match", self.time_to_match.is_zero()),
            ("total_time", self.total_time.is_zero()),
            ("score_bar", self.score_bar == 0),
        ] {
            if zero {
                return Err(ConfigError::Zero { name });
            }
        }
        Ok(())
    }

    /// Objective target for `mode` at `difficulty`.
    pub fn goal(&self, mode: GameMode, difficulty: Difficulty) -> u64 {
        let base = match mode {
            GameMode::Feeding => self.feeding_goal,
            GameMode::Scoring => self.score_goal,
            GameMode::Time => self.match_goal,
            GameMode::Collection => self.collection_goal,
        };
        difficulty.scale(base)
    }
}
