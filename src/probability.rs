//! Weighted fruit draws.
//!
//! A [`ProbabilityTable`] maps fruit kinds to normalized weights sorted from
//! most to least likely; the last entry is the rarest kind. [`FruitPicker`]
//! adds the collection-mode bias that keeps the rare kind scarce on refills.

use rand::Rng;
use tracing::debug;

use crate::grid::FruitId;

/// Upper bound on rare-kind redraws during one refill.
const MAX_REDRAWS: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityTable {
    entries: Vec<(FruitId, f64)>,
}

impl ProbabilityTable {
    /// Equal weights for `kinds` fruit kinds (at least one).
    pub fn uniform(kinds: usize) -> Self {
        let kinds = kinds.clamp(1, usize::from(u8::MAX));
        Self::normalized((0..kinds).map(|i| (fruit(i), 1.0)).collect())
    }

    /// A fresh random relative weight per kind.
    pub fn random<R: Rng + ?Sized>(kinds: usize, rng: &mut R) -> Self {
        let kinds = kinds.clamp(1, usize::from(u8::MAX));
        let entries = (0..kinds)
            .map(|i| (fruit(i), f64::from(rng.random_range(1u32..=100))))
            .collect();
        let table = Self::normalized(entries);
        debug!(entries = ?table.entries, "probability table rolled");
        table
    }

    /// Table from explicit weights, indexed by kind. `None` when empty, when a
    /// weight is negative or not finite, or when all weights are zero.
    pub fn from_weights(weights: &[f64]) -> Option<Self> {
        if weights.is_empty() || weights.len() > usize::from(u8::MAX) {
            return None;
        }
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return None;
        }
        if weights.iter().sum::<f64>() <= 0.0 {
            return None;
        }
        Some(Self::normalized(
            weights.iter().enumerate().map(|(i, w)| (fruit(i), *w)).collect(),
        ))
    }

    fn normalized(mut entries: Vec<(FruitId, f64)>) -> Self {
        let total: f64 = entries.iter().map(|(_, w)| w).sum();
        for (_, w) in &mut entries {
            *w /= total;
        }
        // Stable: equal weights keep ascending kind order.
        entries.sort_by(|a, b| b.1.total_cmp(&a.1));
        Self { entries }
    }

    pub fn kinds(&self) -> usize {
        self.entries.len()
    }

    /// Entries ordered from most to least likely.
    pub fn entries(&self) -> &[(FruitId, f64)] {
        &self.entries
    }

    pub fn weight(&self, fruit: FruitId) -> f64 {
        self.entries
            .iter()
            .find(|(f, _)| *f == fruit)
            .map_or(0.0, |(_, w)| *w)
    }

    /// Least likely kind.
    pub fn rarest(&self) -> FruitId {
        self.entries.last().map_or(FruitId(0), |(f, _)| *f)
    }

    /// Cumulative-weight roulette.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> FruitId {
        let mut roll: f64 = rng.random();
        for (fruit, weight) in &self.entries {
            if roll < *weight {
                return *fruit;
            }
            roll -= weight;
        }
        // Rounding can leave a sliver past the last bucket.
        self.rarest()
    }
}

fn fruit(i: usize) -> FruitId {
    FruitId(u8::try_from(i).unwrap_or(u8::MAX))
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Collection {
    target: FruitId,
    keep_probability: f64,
}

/// Fruit source for one board session.
#[derive(Debug, Clone, PartialEq)]
pub struct FruitPicker {
    table: ProbabilityTable,
    collection: Option<Collection>,
}

impl FruitPicker {
    /// Equal odds, no rare kind.
    pub fn uniform(kinds: usize) -> Self {
        Self {
            table: ProbabilityTable::uniform(kinds),
            collection: None,
        }
    }

    /// Random weights; the rarest kind becomes the collection target and
    /// survives a refill draw only with `keep_probability`.
    pub fn collection<R: Rng + ?Sized>(kinds: usize, keep_probability: f64, rng: &mut R) -> Self {
        Self::with_table(ProbabilityTable::random(kinds, rng), Some(keep_probability))
    }

    pub fn with_table(table: ProbabilityTable, keep_probability: Option<f64>) -> Self {
        let collection = keep_probability.map(|p| Collection {
            target: table.rarest(),
            keep_probability: p.clamp(0.0, 1.0),
        });
        Self { table, collection }
    }

    pub fn table(&self) -> &ProbabilityTable {
        &self.table
    }

    pub fn collection_target(&self) -> Option<FruitId> {
        self.collection.map(|c| c.target)
    }

    /// Plain weighted draw, used for the initial fill.
    pub fn initial<R: Rng + ?Sized>(&self, rng: &mut R) -> FruitId {
        self.table.draw(rng)
    }

    /// Weighted draw with the rare kind suppressed in collection mode.
    pub fn refill<R: Rng + ?Sized>(&self, rng: &mut R) -> FruitId {
        let mut fruit = self.table.draw(rng);
        let Some(collection) = self.collection else {
            return fruit;
        };
        for _ in 0..MAX_REDRAWS {
            if fruit != collection.target || rng.random::<f64>() < collection.keep_probability {
                break;
            }
            fruit = self.table.draw(rng);
        }
        fruit
    }
}
