use metagame_core::{MatchupMatrix, MatchupModel, Metagame, Selector};
use proptest::prelude::*;

/// Archetypes with one to three weighted subarchetypes each, plus a sparse
/// set of declared matchups over the resulting variants.
fn model_strategy() -> impl Strategy<Value = MatchupModel> {
    proptest::collection::vec(proptest::collection::vec(0.0f64..5.0, 1..=3), 1..=4)
        .prop_flat_map(|archetypes| {
            let variants: usize = archetypes.iter().map(Vec::len).sum();
            (
                Just(archetypes),
                proptest::collection::vec(proptest::option::of(0.0f64..=1.0), variants * variants),
            )
        })
        .prop_map(|(archetypes, cells)| {
            let mut builder = Metagame::builder();
            for (a, subs) in archetypes.iter().enumerate() {
                for (s, weight) in subs.iter().enumerate() {
                    builder = builder.subarchetype(format!("arch{a}"), format!("sub{s}"), *weight);
                }
            }
            let meta = builder.build().expect("meta");
            let mut matrix = MatchupMatrix::for_metagame(&meta);
            let variants: Vec<_> = meta.variants().collect();
            for (cell, p) in cells.into_iter().enumerate() {
                if let Some(p) = p {
                    let from = variants[cell / variants.len()];
                    let to = variants[cell % variants.len()];
                    matrix.set(&meta, from, to, p).expect("probability");
                }
            }
            MatchupModel::new(meta, &matrix).expect("model")
        })
}

proptest! {
    #[test]
    fn matchups_are_complementary(model in model_strategy()) {
        let meta = model.metagame();
        let mut selectors: Vec<Selector> = meta.variants().map(Selector::from).collect();
        selectors.extend(meta.archetype_ids().map(Selector::from));
        for a in &selectors {
            for b in &selectors {
                let ab = model.get_matchup(*a, *b);
                let ba = model.get_matchup(*b, *a);
                prop_assert!((0.0..=1.0 + 1e-12).contains(&ab));
                prop_assert!((ab + ba - 1.0).abs() < 1e-9, "{a:?} vs {b:?}: {ab} + {ba}");
            }
        }
    }

    #[test]
    fn mirror_matchups_are_even(model in model_strategy()) {
        let meta = model.metagame();
        for variant in meta.variants() {
            prop_assert!((model.get_matchup(variant, variant) - 0.5).abs() < 1e-12);
        }
        for id in meta.archetype_ids() {
            prop_assert!((model.archetype_matchup(id, id) - 0.5).abs() < 1e-9);
        }
    }
}

#[test]
fn one_sided_declaration_is_completed() {
    let meta = Metagame::from_shares(&["A", "B"], &[1.0, 1.0]).expect("meta");
    let a = meta.variant("A", "").expect("A");
    let b = meta.variant("B", "").expect("B");
    let mut matrix = MatchupMatrix::for_metagame(&meta);
    matrix.set(&meta, a, b, 0.7).expect("set");
    let model = MatchupModel::new(meta, &matrix).expect("model");
    assert!((model.get_matchup(a, b) - 0.7).abs() < 1e-12);
    assert!((model.get_matchup(b, a) - 0.3).abs() < 1e-12);
}

#[test]
fn disagreeing_declarations_are_averaged() {
    let meta = Metagame::from_shares(&["A", "B"], &[1.0, 1.0]).expect("meta");
    let a = meta.variant("A", "").expect("A");
    let b = meta.variant("B", "").expect("B");
    let mut matrix = MatchupMatrix::for_metagame(&meta);
    matrix.set(&meta, a, b, 0.7).expect("ab");
    matrix.set(&meta, b, a, 0.5).expect("ba");
    let model = MatchupModel::new(meta, &matrix).expect("model");
    assert!((model.get_matchup(a, b) - 0.6).abs() < 1e-12);
}
