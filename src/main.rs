//! hungrybat: Hungry Bat style match-3 in the terminal.

mod app;
mod input;
mod theme;
mod ui;

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use app::App;
use clap::{Parser, ValueEnum};
use hungrybat::{
    BoardConfig, ConfigError, Difficulty, GameMode, JsonProfileStore, ModeRules, Pacing,
    SessionSetup,
};

/// Options derived from the CLI that shape every level started in this run.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub board: BoardConfig,
    pub rules: ModeRules,
    /// Overrides the profile's difficulty.
    pub difficulty: Option<Difficulty>,
    /// Replays this level instead of the profile's current one.
    pub level: Option<u32>,
    pub seed: Option<u64>,
}

impl GameConfig {
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        let board = BoardConfig {
            width: args.width,
            height: args.height,
            fruit_kinds: args.kinds,
            pacing: if args.no_animation {
                Pacing::INSTANT
            } else {
                Pacing::default()
            },
            ..BoardConfig::default()
        };
        board.validate()?;
        let rules = ModeRules {
            moves: args.moves,
            total_time: Duration::from_secs(args.time_limit),
            ..ModeRules::default()
        };
        rules.validate()?;
        Ok(Self {
            board,
            rules,
            difficulty: args.difficulty.map(Difficulty::new),
            level: args.level.map(|l| l.saturating_sub(1)),
            seed: args.seed,
        })
    }

    /// Session setup for `mode`; `current_level` is the profile's level.
    pub fn setup(&self, mode: GameMode, current_level: u32) -> SessionSetup {
        SessionSetup {
            mode,
            board: self.board.clone(),
            rules: self.rules.clone(),
            level: self.level.unwrap_or(current_level),
            difficulty: self.difficulty,
            seed: self.seed,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref(), args.log_level)?;
    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_default();
    let config = GameConfig::from_args(&args).context("invalid game options")?;
    let store = match &args.profile {
        Some(path) => JsonProfileStore::open(path),
        None => JsonProfileStore::open_default().context("cannot locate the profile")?,
    };
    let mut app = App::new(args, config, theme, store)?;
    app.run()?;
    Ok(())
}

/// The terminal belongs to the UI, so logs only go to a file.
fn init_logging(path: Option<&Path>, level: LogLevel) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("cannot open log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_max_level(level.level())
        .init();
    Ok(())
}

/// Hungry Bat style match-3 puzzle in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "hungrybat",
    version,
    about = "Hungry Bat style match-3 in the terminal. Swap fruits, make rows of three and feed the bat.",
    long_about = "hungrybat is a terminal match-3 game.\n\n\
        Swap two neighbouring fruits to line up three or more of a kind. Matched fruits are \
        eaten, the rest fall down and new fruits drop in, which may chain into cascades.\n\n\
        MODES:\n  feeding     Eat a number of fruits\n  scoring     Beat the score (combo multiplier)\n  \
        time        Make matches before the clock runs out\n  collection  Collect the rarest fruit\n\n\
        CONTROLS:\n  Arrows/hjkl  Move cursor   Space/Enter  Grab, then arrow to swap\n  \
        1 2 3        Arm bomb, lightning, potion; Space fires it at the cursor\n  \
        Esc          Drop grab    P  Pause    R  Restart level    Q  Quit\n\n\
        Progress (level, coins, power-ups, best stars) is saved to the local data directory."
)]
pub struct Args {
    /// Objective of the level.
    #[arg(short, long, default_value = "feeding")]
    pub mode: GameMode,

    /// Difficulty 1-10. Defaults to the profile's difficulty, which adapts to wins and losses.
    #[arg(short, long, value_name = "N", value_parser = clap::value_parser!(u8).range(1..=10))]
    pub difficulty: Option<u8>,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Board width in cells (3-32).
    #[arg(long, default_value = "8", value_name = "COLS")]
    pub width: usize,

    /// Board height in cells (3-32).
    #[arg(long, default_value = "8", value_name = "ROWS")]
    pub height: usize,

    /// Number of fruit kinds (3-6).
    #[arg(long, default_value = "5", value_name = "N")]
    pub kinds: usize,

    /// Move budget in feeding, scoring and collection modes.
    #[arg(long, default_value = "20", value_name = "N")]
    pub moves: u32,

    /// Level timer of the time mode, in seconds.
    #[arg(long, default_value = "90", value_name = "SECS")]
    pub time_limit: u64,

    /// Replay this level (1-based) instead of the current one. Replays keep the best stars but pay no coins.
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub level: Option<u32>,

    /// Fixed RNG seed; every level of the run starts from the same board.
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Disable cascade pacing and the clear fade (instant resolution).
    #[arg(long)]
    pub no_animation: bool,

    /// Skip main menu and start game immediately.
    #[arg(long)]
    pub no_menu: bool,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Profile file. Defaults to <local data dir>/hungrybat/profile.json.
    #[arg(long, value_name = "FILE")]
    pub profile: Option<PathBuf>,

    /// Write logs to this file.
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Most verbose level written to the log file.
    #[arg(long, default_value = "info")]
    pub log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn level(self) -> tracing::Level {
        match self {
            Self::Error => tracing::Level::ERROR,
            Self::Warn => tracing::Level::WARN,
            Self::Info => tracing::Level::INFO,
            Self::Debug => tracing::Level::DEBUG,
            Self::Trace => tracing::Level::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn args_build_the_session_setup() {
        let args = Args::try_parse_from([
            "hungrybat",
            "--mode",
            "collection",
            "--kinds",
            "4",
            "--level",
            "3",
            "--seed",
            "7",
            "--no-animation",
        ])
        .unwrap();
        let config = GameConfig::from_args(&args).unwrap();
        assert_eq!(config.board.pacing, Pacing::INSTANT);
        let setup = config.setup(args.mode, 0);
        assert_eq!(setup.mode, GameMode::Collection);
        assert_eq!(setup.board.fruit_kinds, 4);
        assert_eq!(setup.level, 2);
        assert_eq!(setup.seed, Some(7));
        assert_eq!(setup.difficulty, None);
    }

    #[test]
    fn current_level_is_used_without_override() {
        let args = Args::try_parse_from(["hungrybat", "-d", "4"]).unwrap();
        let config = GameConfig::from_args(&args).unwrap();
        let setup = config.setup(GameMode::Feeding, 5);
        assert_eq!(setup.level, 5);
        assert_eq!(setup.difficulty, Some(Difficulty::new(4)));
    }

    #[test]
    fn bad_board_options_are_rejected() {
        let args = Args::try_parse_from(["hungrybat", "--kinds", "9"]).unwrap();
        assert!(matches!(
            GameConfig::from_args(&args),
            Err(ConfigError::TooManyFruitKinds { .. })
        ));
        let wide = Args::try_parse_from(["hungrybat", "--width", "30000"]).unwrap();
        assert!(matches!(
            GameConfig::from_args(&wide),
            Err(ConfigError::BoardTooLarge { .. })
        ));
        assert!(Args::try_parse_from(["hungrybat", "-d", "11"]).is_err());
    }
}
