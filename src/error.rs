use thiserror::Error;

use crate::powerup::PowerUpKind;

/// Invalid engine configuration. Construction fails instead of degrading.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("at least {min} fruit kinds are needed, got {kinds}")]
    TooFewFruitKinds { kinds: usize, min: usize },
    #[error("at most {max} fruit kinds are supported, got {kinds}")]
    TooManyFruitKinds { kinds: usize, max: usize },
    #[error("board must be at least {min}x{min}, got {width}x{height}")]
    BoardTooSmall {
        width: usize,
        height: usize,
        min: usize,
    },
    #[error("board must be at most {max}x{max}, got {width}x{height}")]
    BoardTooLarge {
        width: usize,
        height: usize,
        max: usize,
    },
    #[error("{name} must be within [0, 1], got {value}")]
    ProbabilityOutOfRange { name: &'static str, value: f64 },
    #[error("{name} must be positive, got {value}")]
    NonPositive { name: &'static str, value: f64 },
    #[error("{name} must be greater than zero")]
    Zero { name: &'static str },
}

/// Why a swap or power-up was refused. The board is left untouched and unlocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("the board is still moving")]
    BoardBusy,
    #[error("that cell is outside the board")]
    OutOfBounds,
    #[error("there is no fruit there")]
    EmptyCell,
    #[error("there is nothing to swap with in that direction")]
    NoNeighbor,
    #[error("both fruits are the same")]
    SameFruit,
    #[error("no {0} left")]
    OutOfStock(PowerUpKind),
    #[error("{kind} is cooling down for another {remaining_secs}s")]
    CoolingDown {
        kind: PowerUpKind,
        remaining_secs: u64,
    },
    #[error("{kind} unlocks at level {unlock_level}")]
    Locked {
        kind: PowerUpKind,
        unlock_level: u32,
    },
    #[error("the game is over")]
    SessionOver,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_messages_name_the_power_up() {
        assert_eq!(
            Rejection::OutOfStock(PowerUpKind::Bomb).to_string(),
            "no Bomb left"
        );
        assert_eq!(
            Rejection::Locked {
                kind: PowerUpKind::Potion,
                unlock_level: 5
            }
            .to_string(),
            "Potion unlocks at level 5"
        );
    }

    #[test]
    fn config_error_messages() {
        let err = ConfigError::BoardTooSmall {
            width: 2,
            height: 8,
            min: 3,
        };
        assert_eq!(err.to_string(), "board must be at least 3x3, got 2x8");
    }
}
