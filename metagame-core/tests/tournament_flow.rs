use std::collections::HashSet;

use metagame_core::{
    Field, MatchupMatrix, MatchupModel, Metagame, PairingMode, RoundTag, TournamentConfig,
    TournamentFormat, TournamentRunner, TrialOutcome,
};

fn cyclic_model() -> MatchupModel {
    let meta = Metagame::from_shares(&["A", "B", "C"], &[0.3, 0.5, 0.2]).expect("meta");
    let matrix = MatchupMatrix::from_dense(
        &meta,
        &[
            vec![0.5, 0.6, 0.4],
            vec![0.4, 0.5, 0.6],
            vec![0.6, 0.4, 0.5],
        ],
    )
    .expect("matrix");
    MatchupModel::new(meta, &matrix).expect("model")
}

fn run(players: usize, config: TournamentConfig, seed: u64) -> TrialOutcome {
    let model = cyclic_model();
    let field = Field::exact(model.metagame(), players).expect("field");
    TournamentRunner::new(&model, &field, config, seed)
        .expect("runner")
        .run(None)
        .expect("trial")
}

fn swiss_only() -> TournamentConfig {
    TournamentConfig {
        top_cut: 0,
        ..TournamentConfig::default()
    }
}

fn swiss_opponents(outcome: &TrialOutcome) -> Vec<Vec<u32>> {
    outcome
        .decks
        .iter()
        .map(|deck| {
            deck.matches
                .iter()
                .filter(|m| matches!(m.round, RoundTag::Swiss(_)))
                .map(|m| m.opponent.0)
                .collect()
        })
        .collect()
}

#[test]
fn eight_players_play_three_rounds_of_four_matches() {
    let outcome = run(8, swiss_only(), 11);
    assert_eq!(outcome.players, 8);
    assert_eq!(outcome.swiss_rounds, 3);
    assert_eq!(outcome.top_cut, 0);
    assert_eq!(outcome.tally.total(), 12);
    for deck in &outcome.decks {
        assert_eq!(deck.matches.len(), 3, "deck {}", deck.id);
        assert!(deck.byes.is_empty());
        assert_eq!(deck.points, 3 * u32::try_from(deck.wins()).expect("small"));
    }
    let total_wins: usize = outcome.decks.iter().map(|d| d.wins()).sum();
    assert_eq!(total_wins, 12);
}

#[test]
fn odd_field_rotates_the_bye() {
    let outcome = run(7, swiss_only(), 3);
    assert_eq!(outcome.swiss_rounds, 3);
    assert_eq!(outcome.tally.total(), 9);
    let bye_holders: Vec<u32> = outcome
        .decks
        .iter()
        .filter(|d| !d.byes.is_empty())
        .map(|d| d.id.0)
        .collect();
    assert_eq!(bye_holders.len(), 3);
    for deck in &outcome.decks {
        assert_eq!(deck.rounds_played(), 3, "deck {}", deck.id);
        assert!(deck.byes.len() <= 1);
    }
}

#[test]
fn exact_pairing_never_repeats_a_swiss_opponent() {
    let config = TournamentConfig {
        top_cut: 0,
        pairing: PairingMode::Exact {
            fallback: false,
            budget: None,
        },
        ..TournamentConfig::default()
    };
    for seed in 0..8 {
        let outcome = run(8, config.clone(), seed);
        assert_eq!(outcome.fallback_rounds, 0);
        for opponents in swiss_opponents(&outcome) {
            let distinct: HashSet<u32> = opponents.iter().copied().collect();
            assert_eq!(distinct.len(), opponents.len(), "seed {seed}");
        }
    }
}

#[test]
fn same_seed_replays_identically() {
    let first = run(24, TournamentConfig::default(), 0xDEAD_BEEF);
    let second = run(24, TournamentConfig::default(), 0xDEAD_BEEF);
    assert_eq!(first.standings, second.standings);
    assert_eq!(first.tally, second.tally);
    assert_eq!(first.snapshots, second.snapshots);
}

#[test]
fn top_cut_after_swiss_adds_bracket_matches() {
    let outcome = run(32, TournamentConfig::default(), 5);
    assert_eq!(outcome.swiss_rounds, 5);
    assert_eq!(outcome.top_cut, 8);
    // 5 rounds of 16 plus a bracket of 4 + 2 + 1.
    assert_eq!(outcome.tally.total(), 5 * 16 + 7);
    let cut_players = outcome
        .decks
        .iter()
        .filter(|d| d.matches.iter().any(|m| matches!(m.round, RoundTag::TopCut(8))))
        .count();
    assert_eq!(cut_players, 8);
    let places: Vec<u32> = outcome
        .standings
        .iter()
        .map(|s| outcome.decks[usize::try_from(s.deck.0).expect("id")].place)
        .collect();
    assert_eq!(places, (1..=32).collect::<Vec<_>>());
}

#[test]
fn knockout_plays_in_the_excess_and_crowns_one_winner() {
    let config = TournamentConfig {
        format: TournamentFormat::Knockout,
        ..TournamentConfig::default()
    };
    let outcome = run(11, config, 17);
    assert_eq!(outcome.swiss_rounds, 4);
    assert_eq!(outcome.top_cut, 0);
    // Three play-in matches then a bracket of eight.
    assert_eq!(outcome.tally.total(), 3 + 7);
    let opening_byes = outcome
        .decks
        .iter()
        .filter(|d| d.byes.contains(&RoundTag::Knockout(1)))
        .count();
    assert_eq!(opening_byes, 5);
    let champion = &outcome.standings[0];
    assert_eq!(champion.points, 12);
    assert!(outcome.standings[1..].iter().all(|s| s.points < 12));
}

#[test]
fn cutoff_snapshots_cover_every_round() {
    let config = TournamentConfig {
        tracked_cutoffs: vec![4, 8],
        ..TournamentConfig::default()
    };
    let outcome = run(16, config, 99);
    assert_eq!(outcome.snapshots.len(), 2);
    for snap in &outcome.snapshots {
        assert_eq!(snap.rows.len(), 5);
        for row in &snap.rows {
            let total: f64 = row.iter().sum();
            assert!((total - 1.0).abs() < 1e-9, "cutoff {} row {row:?}", snap.cutoff);
        }
    }
}

#[test]
fn empty_field_is_a_trivial_trial() {
    let outcome = run(0, TournamentConfig::default(), 1);
    assert_eq!(outcome.players, 0);
    assert_eq!(outcome.tally.total(), 0);
    assert!(outcome.decks.is_empty());
}

#[test]
fn outcome_stream_draws_once_per_match() {
    let config = TournamentConfig {
        top_cut: 8,
        ..TournamentConfig::default()
    };
    let outcome = run(32, config, 21);
    assert_eq!(outcome.rng_draws.outcomes, outcome.tally.total());
    assert!(outcome.rng_draws.standings > 0);
    assert_eq!(outcome.rng_draws.field, 0);
}
