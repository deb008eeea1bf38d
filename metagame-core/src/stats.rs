//! Per-archetype summaries of a finished trial.
use serde::Serialize;

use crate::archetype::{Metagame, Variant};
use crate::deck::{Deck, match_win_fraction};
use crate::numbers::count_to_f64;
use crate::tournament::TrialOutcome;

/// Results of one group of decks in one trial.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStats {
    pub label: String,
    pub decks: usize,
    pub wins: usize,
    pub losses: usize,
    pub draws: usize,
    /// Match-win fraction over all the group's matches; NaN with no matches.
    pub match_win: f64,
    /// Mean of `1 - place / players`; NaN for an empty group.
    pub percentile: f64,
    /// Decks that finished inside the top cut.
    pub top_cut: usize,
}

/// One row per archetype, subarchetypes combined.
#[must_use]
pub fn archetype_stats(outcome: &TrialOutcome, meta: &Metagame) -> Vec<GroupStats> {
    meta.archetype_ids()
        .map(|id| {
            summarize(
                meta.name(id).to_string(),
                outcome.decks.iter().filter(|d| d.variant.archetype == id),
                outcome,
            )
        })
        .collect()
}

/// One row per concrete (archetype, subarchetype) pair.
#[must_use]
pub fn variant_stats(outcome: &TrialOutcome, meta: &Metagame) -> Vec<GroupStats> {
    meta.variants()
        .map(|variant: Variant| {
            summarize(
                meta.label(variant),
                outcome.decks.iter().filter(|d| d.variant == variant),
                outcome,
            )
        })
        .collect()
}

fn summarize<'a>(label: String, decks: impl Iterator<Item = &'a Deck>, outcome: &TrialOutcome) -> GroupStats {
    let players = count_to_f64(outcome.players);
    let cut = outcome.top_cut;
    let mut stats = GroupStats {
        label,
        decks: 0,
        wins: 0,
        losses: 0,
        draws: 0,
        match_win: f64::NAN,
        percentile: f64::NAN,
        top_cut: 0,
    };
    let mut percentile_sum = 0.0;
    for deck in decks {
        stats.decks += 1;
        stats.wins += deck.wins();
        stats.losses += deck.losses();
        stats.draws += deck.draws();
        if deck.place > 0 {
            percentile_sum += 1.0 - f64::from(deck.place) / players;
            if deck.place <= cut {
                stats.top_cut += 1;
            }
        }
    }
    stats.match_win = match_win_fraction(stats.wins, stats.losses, stats.draws).unwrap_or(f64::NAN);
    if stats.decks > 0 {
        stats.percentile = percentile_sum / count_to_f64(stats.decks);
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TournamentConfig;
    use crate::field::Field;
    use crate::matchup::{MatchupMatrix, MatchupModel};
    use crate::tournament::TournamentRunner;

    #[test]
    fn dominant_archetype_wins_everything_it_plays_against_others() {
        let meta = Metagame::builder()
            .archetype("Strong", 4.0)
            .subarchetype("Weak", "x", 6.0)
            .subarchetype("Weak", "y", 6.0)
            .build()
            .expect("meta");
        let mut matrix = MatchupMatrix::for_metagame(&meta);
        for sub in ["x", "y"] {
            matrix
                .set_by_name(&meta, ("Strong", ""), ("Weak", sub), 1.0)
                .expect("matchup");
        }
        let model = MatchupModel::new(meta, &matrix).expect("model");
        let field = Field::from_weights(model.metagame());
        let outcome = TournamentRunner::new(&model, &field, TournamentConfig::default(), 5)
            .expect("runner")
            .run(None)
            .expect("run");
        let rows = archetype_stats(&outcome, model.metagame());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].label, "Strong");
        assert_eq!(rows[0].decks, 4);
        assert_eq!(rows[1].decks, 12);
        assert!(rows[0].match_win > rows[1].match_win);
        assert!(rows[0].percentile > rows[1].percentile);
        assert_eq!(rows[0].top_cut + rows[1].top_cut, 8);

        let by_variant = variant_stats(&outcome, model.metagame());
        assert_eq!(by_variant.len(), 3);
        assert_eq!(by_variant[1].label, "Weak (x)");
        assert_eq!(by_variant[1].decks + by_variant[2].decks, 12);
    }

    #[test]
    fn empty_group_reports_nan() {
        let meta = Metagame::from_shares(&["A", "B"], &[1.0, 0.0]).expect("meta");
        let model = MatchupModel::even(meta);
        let field = Field::exact(model.metagame(), 4).expect("field");
        let outcome = TournamentRunner::new(&model, &field, TournamentConfig::default(), 5)
            .expect("runner")
            .run(None)
            .expect("run");
        let rows = archetype_stats(&outcome, model.metagame());
        assert!(rows[1].match_win.is_nan());
        assert!(rows[1].percentile.is_nan());
        assert_eq!(rows[0].decks, 4);
    }
}
