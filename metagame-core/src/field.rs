//! Turning popularity weights into a concrete list of entrants.
use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};
use serde::{Deserialize, Serialize};

use crate::archetype::{Metagame, Variant};
use crate::config::ConfigError;
use crate::deck::{Deck, DeckId};
use crate::numbers::{count_to_f64, floor_f64_to_usize};

/// How a field of a given size is drawn from the metagame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldMode {
    /// Weights are taken as literal deck counts.
    #[default]
    Counts,
    /// Shares scaled to the field size, rounded by largest remainder.
    Exact,
    /// Multinomial sample of the field size, redrawn every trial.
    Sampled,
}

/// Number of entrants per concrete variant.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Field {
    entries: Vec<(Variant, usize)>,
}

impl Field {
    /// Field from explicit counts.
    #[must_use]
    pub fn from_counts(counts: impl IntoIterator<Item = (Variant, usize)>) -> Self {
        Self {
            entries: counts.into_iter().filter(|(_, n)| *n > 0).collect(),
        }
    }

    /// Field whose counts are the metagame weights, rounded down.
    #[must_use]
    pub fn from_weights(meta: &Metagame) -> Self {
        Self::from_counts(
            meta.variants()
                .map(|v| (v, floor_f64_to_usize(meta.variant_weight(v)))),
        )
    }

    /// Field of exactly `n` entrants, each variant as close to its share as
    /// integer counts allow. Leftover seats go to the largest remainders.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::EmptyField` when `n > 0` but the metagame has no
    /// variants.
    pub fn exact(meta: &Metagame, n: usize) -> Result<Self, ConfigError> {
        if n > 0 && meta.variant_count() == 0 {
            return Err(ConfigError::EmptyField);
        }
        let scaled: Vec<f64> = meta
            .variants()
            .map(|v| meta.variant_share(v) * count_to_f64(n))
            .collect();
        let mut counts: Vec<usize> = scaled.iter().map(|c| floor_f64_to_usize(*c)).collect();
        let mut by_remainder: Vec<usize> = (0..scaled.len()).collect();
        by_remainder.sort_by(|&a, &b| {
            let ra = scaled[a] - scaled[a].floor();
            let rb = scaled[b] - scaled[b].floor();
            rb.total_cmp(&ra)
        });
        let mut assigned: usize = counts.iter().sum();
        for index in by_remainder.into_iter().cycle() {
            if assigned >= n {
                break;
            }
            counts[index] += 1;
            assigned += 1;
        }
        Ok(Self::from_counts(meta.variants().zip(counts)))
    }

    /// Multinomial sample of `n` entrants by variant share.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::EmptyField` when `n > 0` but nothing can be drawn.
    pub fn sampled<R: Rng + ?Sized>(meta: &Metagame, n: usize, rng: &mut R) -> Result<Self, ConfigError> {
        if n == 0 {
            return Ok(Self::default());
        }
        let variants: Vec<Variant> = meta.variants().collect();
        let weights: Vec<f64> = variants.iter().map(|v| meta.variant_share(*v)).collect();
        let dist = WeightedIndex::new(&weights).map_err(|_| ConfigError::EmptyField)?;
        let mut counts = vec![0usize; variants.len()];
        for _ in 0..n {
            counts[dist.sample(rng)] += 1;
        }
        Ok(Self::from_counts(variants.into_iter().zip(counts)))
    }

    /// Build the field according to `mode`.
    ///
    /// # Errors
    ///
    /// Propagates the errors of the chosen constructor.
    pub fn build<R: Rng + ?Sized>(
        meta: &Metagame,
        mode: FieldMode,
        players: Option<usize>,
        rng: &mut R,
    ) -> Result<Self, ConfigError> {
        let weights_total = || floor_f64_to_usize(meta.total_weight());
        match mode {
            FieldMode::Counts => Ok(Self::from_weights(meta)),
            FieldMode::Exact => Self::exact(meta, players.unwrap_or_else(weights_total)),
            FieldMode::Sampled => Self::sampled(meta, players.unwrap_or_else(weights_total), rng),
        }
    }

    /// Total entrants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.iter().map(|(_, n)| n).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn count(&self, variant: Variant) -> usize {
        self.entries
            .iter()
            .filter(|(v, _)| *v == variant)
            .map(|(_, n)| n)
            .sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Variant, usize)> + '_ {
        self.entries.iter().copied()
    }

    /// Fresh decks numbered from zero in field order.
    #[must_use]
    pub fn decks(&self) -> Vec<Deck> {
        self.entries
            .iter()
            .flat_map(|(variant, n)| std::iter::repeat_n(*variant, *n))
            .enumerate()
            .map(|(index, variant)| Deck::new(DeckId(crate::numbers::usize_to_u32(index)), variant))
            .collect()
    }
}
