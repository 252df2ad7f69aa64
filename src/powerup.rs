//! Power-up kinds, their board areas and the player's inventory.

use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::Rejection;
use crate::grid::{Grid, Pos};
use crate::matcher::{MIN_MATCH, MatchSet};

/// Cooldown started by using a power-up while it is infinite.
pub const COOLDOWN: Duration = Duration::from_secs(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PowerUpKind {
    Bomb,
    Lightning,
    Potion,
}

impl PowerUpKind {
    pub const ALL: [Self; 3] = [Self::Bomb, Self::Lightning, Self::Potion];

    pub fn name(self) -> &'static str {
        match self {
            Self::Bomb => "Bomb",
            Self::Lightning => "Lightning",
            Self::Potion => "Potion",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Bomb => "Remove fruits in a radius, a real explosion of fun!",
            Self::Lightning => {
                "Eliminate rows and columns of fruit, unleash the storm of destruction on the board!"
            }
            Self::Potion => "Revolutionize fruits within a radius, prepare the chaos of combinations!",
        }
    }

    /// Level (1-based) at which the kind becomes usable.
    pub fn unlock_level(self) -> u32 {
        match self {
            Self::Bomb => 1,
            Self::Lightning => 3,
            Self::Potion => 5,
        }
    }
}

impl fmt::Display for PowerUpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// World-space point. Cell `(x, y)` has its centre at `(x, y)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn center_of(pos: Pos) -> Self {
        Self::new(pos.x as f32, pos.y as f32)
    }

    pub fn distance(self, other: Self) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Whether the point lands on some cell's unit square.
    #[allow(clippy::cast_precision_loss)]
    pub fn is_on(self, grid: &Grid) -> bool {
        let w = grid.width() as f32;
        let h = grid.height() as f32;
        self.x >= -0.5 && self.x < w - 0.5 && self.y >= -0.5 && self.y < h - 0.5
    }
}

/// Cell whose square holds the point, clamped to the board.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn nearest_cell(grid: &Grid, impact: Point) -> Option<Pos> {
    if grid.width() == 0 || grid.height() == 0 {
        return None;
    }
    let x = (impact.x.round().max(0.0) as usize).min(grid.width() - 1);
    let y = (impact.y.round().max(0.0) as usize).min(grid.height() - 1);
    Some(Pos::new(x, y))
}

/// Occupied cells whose centre lies within `radius` of `impact`.
pub fn cells_in_radius(grid: &Grid, impact: Point, radius: f32) -> Vec<Pos> {
    grid.positions()
        .filter(|&p| grid.get(p).is_some())
        .filter(|&p| Point::center_of(p).distance(impact) <= radius)
        .collect()
}

/// Bomb area. When at least [`MIN_MATCH`] cells in the radius share the kind
/// of the cell nearest the impact, only those go; otherwise the whole area.
pub fn bomb_cells(grid: &Grid, impact: Point, radius: f32) -> MatchSet {
    let area = cells_in_radius(grid, impact, radius);
    let target = nearest_cell(grid, impact).and_then(|p| grid.get(p));
    let same: Vec<Pos> = area
        .iter()
        .copied()
        .filter(|&p| target.is_some() && grid.get(p) == target)
        .collect();
    if same.len() >= MIN_MATCH {
        same.into_iter().collect()
    } else {
        area.into_iter().collect()
    }
}

/// A vertical and a horizontal strip through the impact. A cell goes when
/// its unit square overlaps either strip.
pub fn lightning_cells(grid: &Grid, impact: Point, half_width: f32) -> MatchSet {
    let reach = 0.5 + half_width;
    grid.positions()
        .filter(|&p| grid.get(p).is_some())
        .filter(|&p| {
            let c = Point::center_of(p);
            (c.x - impact.x).abs() < reach || (c.y - impact.y).abs() < reach
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub amount: u32,
    pub unlock_level: u32,
    infinite_until: Option<Instant>,
    cooldown_until: Option<Instant>,
}

impl Slot {
    fn new(kind: PowerUpKind, amount: u32) -> Self {
        Self {
            amount,
            unlock_level: kind.unlock_level(),
            infinite_until: None,
            cooldown_until: None,
        }
    }
}

/// Result of a successful activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Consumed {
    pub kind: PowerUpKind,
    pub remaining: u32,
    /// True when the use started a cooldown instead of spending stock.
    pub cooldown: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inventory {
    slots: BTreeMap<PowerUpKind, Slot>,
}

impl Default for Inventory {
    fn default() -> Self {
        Self::new([])
    }
}

impl Inventory {
    /// Kinds not listed start with zero stock.
    pub fn new(amounts: impl IntoIterator<Item = (PowerUpKind, u32)>) -> Self {
        let mut slots: BTreeMap<_, _> = PowerUpKind::ALL
            .into_iter()
            .map(|k| (k, Slot::new(k, 0)))
            .collect();
        for (kind, amount) in amounts {
            if let Some(slot) = slots.get_mut(&kind) {
                slot.amount = amount;
            }
        }
        Self { slots }
    }

    pub fn slot(&self, kind: PowerUpKind) -> Option<&Slot> {
        self.slots.get(&kind)
    }

    pub fn amount(&self, kind: PowerUpKind) -> u32 {
        self.slots.get(&kind).map_or(0, |s| s.amount)
    }

    pub fn add(&mut self, kind: PowerUpKind, amount: u32) {
        if let Some(slot) = self.slots.get_mut(&kind) {
            slot.amount = slot.amount.saturating_add(amount);
        }
    }

    /// Unlimited uses until `now + duration`, each use starting a cooldown.
    pub fn make_infinite(&mut self, kind: PowerUpKind, duration: Duration, now: Instant) {
        if let Some(slot) = self.slots.get_mut(&kind) {
            slot.infinite_until = Some(now + duration);
        }
    }

    pub fn is_infinite(&self, kind: PowerUpKind, now: Instant) -> bool {
        self.slots
            .get(&kind)
            .and_then(|s| s.infinite_until)
            .is_some_and(|until| now < until)
    }

    pub fn cooldown_remaining(&self, kind: PowerUpKind, now: Instant) -> Option<Duration> {
        self.slots
            .get(&kind)
            .and_then(|s| s.cooldown_until)
            .map(|until| until.saturating_duration_since(now))
            .filter(|left| !left.is_zero())
    }

    /// `level` is the player's 0-based level index.
    pub fn is_unlocked(&self, kind: PowerUpKind, level: u32) -> bool {
        self.slots
            .get(&kind)
            .is_some_and(|s| s.unlock_level <= level.saturating_add(1))
    }

    /// Checks every activation rule without changing anything.
    pub fn check(&self, kind: PowerUpKind, level: u32, now: Instant) -> Result<(), Rejection> {
        let Some(slot) = self.slots.get(&kind) else {
            return Err(Rejection::OutOfStock(kind));
        };
        if !self.is_unlocked(kind, level) {
            return Err(Rejection::Locked {
                kind,
                unlock_level: slot.unlock_level,
            });
        }
        if let Some(left) = self.cooldown_remaining(kind, now) {
            return Err(Rejection::CoolingDown {
                kind,
                remaining_secs: left.as_secs().max(1),
            });
        }
        if slot.amount == 0 && !self.is_infinite(kind, now) {
            return Err(Rejection::OutOfStock(kind));
        }
        Ok(())
    }

    /// Spends one unit, or starts the cooldown while the kind is infinite.
    pub fn consume(
        &mut self,
        kind: PowerUpKind,
        level: u32,
        now: Instant,
    ) -> Result<Consumed, Rejection> {
        self.check(kind, level, now)?;
        let infinite = self.is_infinite(kind, now);
        let slot = self
            .slots
            .get_mut(&kind)
            .ok_or(Rejection::OutOfStock(kind))?;
        if infinite {
            slot.cooldown_until = Some(now + COOLDOWN);
        } else {
            slot.amount -= 1;
        }
        Ok(Consumed {
            kind,
            remaining: slot.amount,
            cooldown: infinite,
        })
    }
}
