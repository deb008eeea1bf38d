//! Archetype mix at the top of the standings over the course of an event.
use serde::{Deserialize, Serialize};

use crate::deck::{Deck, DeckId};
use crate::numbers::u32_to_usize;
use crate::tournament::standings::index;

/// Archetype fractions within the top `cutoff` decks, one row per slot.
///
/// Slot 0 is the opening order, slot `i` follows Swiss round `i`, and the
/// last slot holds the final standings after any top cut.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CutoffSnapshot {
    pub cutoff: u32,
    /// `rows[slot][archetype]`
    pub rows: Vec<Vec<f64>>,
}

impl CutoffSnapshot {
    #[must_use]
    pub fn new(cutoff: u32, slots: usize, archetypes: usize) -> Self {
        Self {
            cutoff,
            rows: vec![vec![0.0; archetypes]; slots],
        }
    }

    /// Add `1 / cutoff` for each of the first `cutoff` decks in `order`.
    pub fn record(&mut self, slot: usize, order: &[DeckId], decks: &[Deck]) {
        let Some(row) = self.rows.get_mut(slot) else {
            return;
        };
        let weight = 1.0 / f64::from(self.cutoff);
        for id in order.iter().take(u32_to_usize(self.cutoff)) {
            let archetype = decks[index(*id)].variant.archetype.index();
            row[archetype] += weight;
        }
    }

    /// Element-wise sum, used to accumulate trials.
    pub fn accumulate(&mut self, other: &Self) {
        for (mine, theirs) in self.rows.iter_mut().zip(&other.rows) {
            for (a, b) in mine.iter_mut().zip(theirs) {
                *a += b;
            }
        }
    }

    /// Divide every entry by `trials`.
    #[must_use]
    pub fn averaged(&self, trials: usize) -> Self {
        let divisor = crate::numbers::count_to_f64(trials.max(1));
        Self {
            cutoff: self.cutoff,
            rows: self
                .rows
                .iter()
                .map(|row| row.iter().map(|v| v / divisor).collect())
                .collect(),
        }
    }
}
