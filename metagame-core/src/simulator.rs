//! Single-match simulation and the trial-scoped win tally.
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::archetype::ArchetypeId;
use crate::deck::{Deck, DeckId, Match, Outcome, RoundTag};
use crate::matchup::MatchupModel;
use crate::numbers::count_to_f64;

/// Archetype-versus-archetype win counts for one trial.
///
/// Each trial owns its tally; batches merge them afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinTally {
    archetypes: usize,
    wins: Vec<u64>,
}

impl WinTally {
    #[must_use]
    pub fn new(archetypes: usize) -> Self {
        Self {
            archetypes,
            wins: vec![0; archetypes * archetypes],
        }
    }

    pub fn record(&mut self, winner: ArchetypeId, loser: ArchetypeId) {
        let index = self.cell(winner, loser);
        self.wins[index] += 1;
    }

    /// Times `a` beat `b`.
    #[must_use]
    pub fn wins(&self, a: ArchetypeId, b: ArchetypeId) -> u64 {
        self.wins[self.cell(a, b)]
    }

    /// Matches played between `a` and `b` in either direction.
    #[must_use]
    pub fn games(&self, a: ArchetypeId, b: ArchetypeId) -> u64 {
        if a == b {
            self.wins(a, a)
        } else {
            self.wins(a, b) + self.wins(b, a)
        }
    }

    /// Observed rate at which `a` beat `b`, `None` when they never met.
    #[must_use]
    pub fn win_rate(&self, a: ArchetypeId, b: ArchetypeId) -> Option<f64> {
        let games = self.games(a, b);
        if games == 0 {
            return None;
        }
        if a == b {
            return Some(0.5);
        }
        let wins = usize::try_from(self.wins(a, b)).unwrap_or(usize::MAX);
        let games = usize::try_from(games).unwrap_or(usize::MAX);
        Some(count_to_f64(wins) / count_to_f64(games))
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.wins.iter().sum()
    }

    /// Fold another trial's counts into this one.
    pub fn merge(&mut self, other: &Self) {
        if self.wins.is_empty() {
            self.clone_from(other);
            return;
        }
        for (mine, theirs) in self.wins.iter_mut().zip(&other.wins) {
            *mine += theirs;
        }
    }

    const fn cell(&self, a: ArchetypeId, b: ArchetypeId) -> usize {
        a.index() * self.archetypes + b.index()
    }
}

/// Plays matches according to a shared matchup model.
#[derive(Debug, Clone, Copy)]
pub struct MatchSimulator<'a> {
    model: &'a MatchupModel,
}

impl<'a> MatchSimulator<'a> {
    #[must_use]
    pub const fn new(model: &'a MatchupModel) -> Self {
        Self { model }
    }

    /// Play `first` against `second`. The first deck wins when a uniform draw
    /// falls below its matchup probability; the winner gains three points and
    /// both decks record the match. Returns the winner's id.
    pub fn play<R: Rng + ?Sized>(
        &self,
        first: &mut Deck,
        second: &mut Deck,
        round: RoundTag,
        rng: &mut R,
        tally: &mut WinTally,
    ) -> DeckId {
        let p = self.model.get_matchup(first.variant, second.variant);
        let first_wins = rng.r#gen::<f64>() < p;
        let outcome = if first_wins {
            Outcome::Win
        } else {
            Outcome::Loss
        };
        let record = Match {
            deck: first.id,
            opponent: second.id,
            outcome,
            round,
        };
        first.record(record);
        second.record(record.mirrored());

        let (winner, loser) = if first_wins {
            (&*first, &*second)
        } else {
            (&*second, &*first)
        };
        tally.record(winner.variant.archetype, loser.variant.archetype);
        log::trace!("{round}: deck {} beat deck {} (p={p:.3})", winner.id, loser.id);
        winner.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archetype::Metagame;
    use crate::matchup::MatchupMatrix;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn lopsided() -> MatchupModel {
        let meta = Metagame::from_shares(&["Strong", "Weak"], &[0.5, 0.5]).expect("meta");
        let mut matrix = MatchupMatrix::for_metagame(&meta);
        matrix
            .set_by_name(&meta, ("Strong", ""), ("Weak", ""), 1.0)
            .expect("matchup");
        MatchupModel::new(meta, &matrix).expect("model")
    }

    #[test]
    fn certain_matchup_always_wins_and_records_both_sides() {
        let model = lopsided();
        let meta = model.metagame();
        let strong = meta.variant("Strong", "").expect("strong");
        let weak = meta.variant("Weak", "").expect("weak");
        let mut a = Deck::new(DeckId(1), weak);
        let mut b = Deck::new(DeckId(2), strong);
        let mut tally = WinTally::new(meta.len());
        let mut rng = SmallRng::seed_from_u64(1);
        let sim = MatchSimulator::new(&model);

        for round in 1..=5 {
            let winner = sim.play(&mut a, &mut b, RoundTag::Swiss(round), &mut rng, &mut tally);
            assert_eq!(winner, DeckId(2));
        }
        assert_eq!(a.points, 0);
        assert_eq!(b.points, 15);
        assert_eq!(a.matches.len(), 5);
        assert_eq!(b.matches[0].outcome, Outcome::Win);
        assert_eq!(a.matches[0].outcome, Outcome::Loss);
        assert_eq!(tally.wins(strong.archetype, weak.archetype), 5);
        assert_eq!(tally.win_rate(weak.archetype, strong.archetype), Some(0.0));
    }

    #[test]
    fn even_matchup_splits_roughly_evenly() {
        let meta = Metagame::from_shares(&["A", "B"], &[0.5, 0.5]).expect("meta");
        let model = MatchupModel::even(meta);
        let a_variant = model.metagame().variant("A", "").expect("A");
        let b_variant = model.metagame().variant("B", "").expect("B");
        let mut tally = WinTally::new(2);
        let mut rng = SmallRng::seed_from_u64(99);
        let sim = MatchSimulator::new(&model);
        for i in 0..2000 {
            let mut a = Deck::new(DeckId(i * 2), a_variant);
            let mut b = Deck::new(DeckId(i * 2 + 1), b_variant);
            sim.play(&mut a, &mut b, RoundTag::Swiss(1), &mut rng, &mut tally);
        }
        let rate = tally
            .win_rate(a_variant.archetype, b_variant.archetype)
            .expect("played");
        assert!((rate - 0.5).abs() < 0.05, "rate {rate}");
        assert_eq!(tally.total(), 2000);
    }

    #[test]
    fn tallies_merge() {
        let meta = Metagame::from_shares(&["A", "B"], &[0.5, 0.5]).expect("meta");
        let a = meta.archetype("A").expect("A");
        let b = meta.archetype("B").expect("B");
        let mut left = WinTally::new(2);
        left.record(a, b);
        let mut right = WinTally::new(2);
        right.record(b, a);
        right.record(a, b);
        let mut merged = WinTally::default();
        merged.merge(&left);
        merged.merge(&right);
        assert_eq!(merged.wins(a, b), 2);
        assert_eq!(merged.games(a, b), 3);
        assert_eq!(merged.win_rate(b, a), Some(1.0 / 3.0));
        assert_eq!(merged.win_rate(a, a), None);
    }
}
