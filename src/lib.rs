//! Headless match-3 engine in the style of Hungry Bat.
//!
//! The [`Board`] owns the grid and runs the swap → clear → collapse → refill
//! cascade as an explicit state machine. A [`Session`] wraps a board with the
//! game rules: objective modes, move and time budgets, power-up inventory,
//! scoring and persistence through a [`ProfileStore`].

pub mod board;
pub mod cascade;
pub mod config;
pub mod error;
pub mod events;
pub mod grid;
pub mod matcher;
pub mod powerup;
pub mod probability;
pub mod profile;
pub mod session;

pub use board::{Board, PowerUpOutcome, SwapOutcome};
pub use cascade::{CascadeSummary, Immediate, Pacing, PhaseKind, Settle, Sleep, Step};
pub use config::{BoardConfig, Difficulty, GameMode, ModeRules, PlayMode};
pub use error::{ConfigError, Rejection};
pub use events::{BoardEvent, Cause, EventDispatcher, EventKind};
pub use grid::{Direction, FruitId, Grid, Pos};
pub use matcher::{MIN_MATCH, MatchSet};
pub use powerup::{Inventory, Point, PowerUpKind};
pub use probability::{FruitPicker, ProbabilityTable};
pub use profile::{JsonProfileStore, LevelRecord, MemoryProfileStore, Profile, ProfileError, ProfileStore};
pub use session::{GameResult, LossReason, Session, SessionSetup, SessionStatus};
