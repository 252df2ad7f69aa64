//! Player profile and where it is persisted.
//!
//! Writes are fire-and-forget: a store applies the change in memory and
//! flushes it, logging a warning when the flush fails.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Difficulty;
use crate::powerup::{Inventory, PowerUpKind};

const APP_DIR: &str = "hungrybat";
const FILENAME: &str = "profile.json";

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("profile i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("profile is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("could not determine a local data directory")]
    NoDataDir,
}

/// Best result on one level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelRecord {
    #[serde(rename = "Stars")]
    pub stars: u8,
    #[serde(rename = "Score")]
    pub score: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub coins: u64,
    /// Highest unlocked level, 0-based.
    pub level: u32,
    pub difficulty: Difficulty,
    pub victories: u32,
    pub defeats: u32,
    pub levels: Vec<LevelRecord>,
    #[serde(rename = "powerUps")]
    pub power_ups: BTreeMap<PowerUpKind, u32>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            coins: 0,
            level: 0,
            difficulty: Difficulty::MIN,
            victories: 0,
            defeats: 0,
            levels: Vec::new(),
            power_ups: PowerUpKind::ALL.into_iter().map(|k| (k, 3)).collect(),
        }
    }
}

impl Profile {
    pub fn record(&self, index: usize) -> LevelRecord {
        self.levels.get(index).copied().unwrap_or_default()
    }

    pub fn inventory(&self) -> Inventory {
        Inventory::new(self.power_ups.iter().map(|(k, v)| (*k, *v)))
    }

    fn put_record(&mut self, index: usize, record: LevelRecord) {
        if self.levels.len() <= index {
            self.levels.resize(index + 1, LevelRecord::default());
        }
        self.levels[index] = record;
    }
}

/// Persistence sink for the profile.
pub trait ProfileStore {
    fn profile(&self) -> &Profile;
    fn set_coins(&mut self, coins: u64);
    fn set_level(&mut self, level: u32);
    fn set_level_record(&mut self, index: usize, record: LevelRecord);
    fn set_power_up_amount(&mut self, kind: PowerUpKind, amount: u32);
    fn set_difficulty(&mut self, difficulty: Difficulty, victories: u32, defeats: u32);
}

/// Profile kept as a JSON document on disk.
#[derive(Debug, Clone)]
pub struct JsonProfileStore {
    path: PathBuf,
    profile: Profile,
}

impl JsonProfileStore {
    /// `<local data dir>/hungrybat/profile.json`.
    pub fn default_path() -> Result<PathBuf, ProfileError> {
        dirs::data_local_dir()
            .map(|dir| dir.join(APP_DIR).join(FILENAME))
            .ok_or(ProfileError::NoDataDir)
    }

    /// Opens the store at the default path.
    pub fn open_default() -> Result<Self, ProfileError> {
        Ok(Self::open(Self::default_path()?))
    }

    /// Opens the store at `path`. A missing or unreadable file starts a
    /// fresh profile.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let profile = if path.exists() {
            match Self::load(&path) {
                Ok(profile) => {
                    info!(path = %path.display(), "profile loaded");
                    profile
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to load profile, starting fresh");
                    Profile::default()
                }
            }
        } else {
            info!(path = %path.display(), "no profile found, starting fresh");
            Profile::default()
        };
        Self { path, profile }
    }

    pub fn load(path: &Path) -> Result<Profile, ProfileError> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Writes the profile, creating the directory if needed.
    pub fn save(&self) -> Result<(), ProfileError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.profile)?;
        fs::write(&self.path, json)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) {
        if let Err(e) = self.save() {
            warn!(path = %self.path.display(), error = %e, "failed to save profile");
        }
    }
}

impl ProfileStore for JsonProfileStore {
    fn profile(&self) -> &Profile {
        &self.profile
    }

    fn set_coins(&mut self, coins: u64) {
        self.profile.coins = coins;
        self.flush();
    }

    fn set_level(&mut self, level: u32) {
        self.profile.level = level;
        self.flush();
    }

    fn set_level_record(&mut self, index: usize, record: LevelRecord) {
        self.profile.put_record(index, record);
        self.flush();
    }

    fn set_power_up_amount(&mut self, kind: PowerUpKind, amount: u32) {
        self.profile.power_ups.insert(kind, amount);
        self.flush();
    }

    fn set_difficulty(&mut self, difficulty: Difficulty, victories: u32, defeats: u32) {
        self.profile.difficulty = difficulty;
        self.profile.victories = victories;
        self.profile.defeats = defeats;
        self.flush();
    }
}

/// In-memory store; counts writes.
#[derive(Debug, Clone, Default)]
pub struct MemoryProfileStore {
    profile: Profile,
    writes: usize,
}

impl MemoryProfileStore {
    pub fn new(profile: Profile) -> Self {
        Self { profile, writes: 0 }
    }

    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl ProfileStore for MemoryProfileStore {
    fn profile(&self) -> &Profile {
        &self.profile
    }

    fn set_coins(&mut self, coins: u64) {
        self.profile.coins = coins;
        self.writes += 1;
    }

    fn set_level(&mut self, level: u32) {
        self.profile.level = level;
        self.writes += 1;
    }

    fn set_level_record(&mut self, index: usize, record: LevelRecord) {
        self.profile.put_record(index, record);
        self.writes += 1;
    }

    fn set_power_up_amount(&mut self, kind: PowerUpKind, amount: u32) {
        self.profile.power_ups.insert(kind, amount);
        self.writes += 1;
    }

    fn set_difficulty(&mut self, difficulty: Difficulty, victories: u32, defeats: u32) {
        self.profile.difficulty = difficulty;
        self.profile.victories = victories;
        self.profile.defeats = defeats;
        self.writes += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("hungrybat-test-{}-{name}", std::process::id()))
            .join(FILENAME)
    }

    #[test]
    fn json_uses_level_record_keys() {
        let mut profile = Profile::default();
        profile.put_record(1, LevelRecord { stars: 2, score: 900 });
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["coins"], 0);
        assert_eq!(json["levels"][1]["Stars"], 2);
        assert_eq!(json["levels"][1]["Score"], 900);
        assert_eq!(json["levels"][0]["Stars"], 0);
        assert_eq!(json["powerUps"]["Bomb"], 3);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let profile: Profile = serde_json::from_str(r#"{ "coins": 12 }"#).unwrap();
        assert_eq!(profile.coins, 12);
        assert_eq!(profile.level, 0);
        assert_eq!(profile.difficulty, Difficulty::MIN);
    }

    #[test]
    fn json_store_round_trips_through_disk() {
        let path = temp_path("roundtrip");
        let mut store = JsonProfileStore::open(&path);
        assert_eq!(store.profile(), &Profile::default());
        store.set_coins(250);
        store.set_level(3);
        store.set_level_record(2, LevelRecord { stars: 3, score: 2000 });
        store.set_power_up_amount(PowerUpKind::Lightning, 7);

        let reopened = JsonProfileStore::open(&path);
        assert_eq!(reopened.profile().coins, 250);
        assert_eq!(reopened.profile().level, 3);
        assert_eq!(reopened.profile().record(2).stars, 3);
        assert_eq!(reopened.profile().inventory().amount(PowerUpKind::Lightning), 7);
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn corrupt_file_starts_fresh() {
        let path = temp_path("corrupt");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "not json").unwrap();
        assert!(matches!(JsonProfileStore::load(&path), Err(ProfileError::Json(_))));
        let store = JsonProfileStore::open(&path);
        assert_eq!(store.profile(), &Profile::default());
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn memory_store_counts_writes() {
        let mut store = MemoryProfileStore::default();
        store.set_coins(1);
        store.set_difficulty(Difficulty::new(4), 1, 0);
        assert_eq!(store.writes(), 2);
        assert_eq!(store.profile().difficulty.get(), 4);
    }
}
