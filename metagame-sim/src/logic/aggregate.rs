use metagame_core::numbers::count_to_f64;
use metagame_core::{
    CutoffSnapshot, FieldProjector, GroupStats, MatchupModel, MatchupSummary, ProjectionView,
    WinTally, archetype_stats, variant_stats,
};
use serde::Serialize;

use super::batch::{BatchResult, TrialFailure};

/// Cross-trial summary for one archetype or variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupAggregate {
    pub label: String,
    pub mean_decks: f64,
    /// Mean of per-trial match-win fractions, over trials where it was defined.
    pub match_win: f64,
    pub match_win_std: f64,
    pub percentile: f64,
    pub percentile_std: f64,
    pub mean_top_cut: f64,
    /// Fraction of completed trials this group won outright.
    pub champion_rate: f64,
}

/// Win counts observed across the batch, archetype against archetype.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmpiricalMatchups {
    pub archetypes: Vec<String>,
    pub games: Vec<Vec<u64>>,
    /// `None` where two archetypes never met.
    pub win_rates: Vec<Vec<Option<f64>>>,
}

/// Everything the reports need about one batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub scenario: String,
    pub batch_seed: u64,
    pub trials: usize,
    pub completed: usize,
    pub players: usize,
    pub swiss_rounds: u32,
    pub top_cut: u32,
    pub fallback_rounds: u32,
    pub archetypes: Vec<GroupAggregate>,
    pub variants: Vec<GroupAggregate>,
    /// Top-X archetype fractions averaged over completed trials.
    pub snapshots: Vec<CutoffSnapshot>,
    pub empirical: EmpiricalMatchups,
    pub expected: MatchupSummary,
    pub projection: ProjectionView,
    pub failures: Vec<TrialFailure>,
}

#[derive(Debug, Clone, Default)]
struct RunningStats {
    count: u32,
    mean: f64,
    m2: f64,
}

impl RunningStats {
    fn add(&mut self, value: f64) {
        if value.is_nan() {
            return;
        }
        self.count += 1;
        let count = f64::from(self.count);
        let delta = value - self.mean;
        self.mean += delta / count;
        let delta2 = value - self.mean;
        self.m2 += delta * delta2;
    }

    const fn mean(&self) -> f64 {
        if self.count == 0 { f64::NAN } else { self.mean }
    }

    fn std_dev(&self) -> f64 {
        if self.count > 1 {
            (self.m2 / f64::from(self.count - 1)).sqrt()
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone)]
struct AggregateBuilder {
    label: String,
    decks: RunningStats,
    match_win: RunningStats,
    percentile: RunningStats,
    top_cut: RunningStats,
    champions: u32,
}

impl AggregateBuilder {
    fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            decks: RunningStats::default(),
            match_win: RunningStats::default(),
            percentile: RunningStats::default(),
            top_cut: RunningStats::default(),
            champions: 0,
        }
    }

    fn ingest(&mut self, stats: &GroupStats, champion: bool) {
        self.decks.add(count_to_f64(stats.decks));
        self.match_win.add(stats.match_win);
        self.percentile.add(stats.percentile);
        self.top_cut.add(count_to_f64(stats.top_cut));
        if champion {
            self.champions += 1;
        }
    }

    fn finish(self, completed: usize) -> GroupAggregate {
        let champion_rate = if completed == 0 {
            f64::NAN
        } else {
            f64::from(self.champions) / count_to_f64(completed)
        };
        GroupAggregate {
            label: self.label,
            mean_decks: self.decks.mean(),
            match_win: self.match_win.mean(),
            match_win_std: self.match_win.std_dev(),
            percentile: self.percentile.mean(),
            percentile_std: self.percentile.std_dev(),
            mean_top_cut: self.top_cut.mean(),
            champion_rate,
        }
    }
}

/// Fold a batch into per-archetype and per-variant aggregates.
#[must_use]
pub fn summarize_batch(
    scenario: &str,
    model: &MatchupModel,
    batch: &BatchResult,
    projector_rounds: u32,
) -> BatchSummary {
    let meta = model.metagame();
    let mut archetypes: Vec<AggregateBuilder> = meta
        .archetype_ids()
        .map(|id| AggregateBuilder::new(meta.name(id)))
        .collect();
    let mut variants: Vec<AggregateBuilder> = meta
        .variants()
        .map(|v| AggregateBuilder::new(&meta.label(v)))
        .collect();
    let mut tally = WinTally::new(meta.len());
    let mut snapshots: Vec<CutoffSnapshot> = Vec::new();
    let mut fallback_rounds = 0;

    for outcome in &batch.outcomes {
        let champion = outcome.standings.first().map(|s| s.variant);
        for ((builder, stats), id) in archetypes
            .iter_mut()
            .zip(archetype_stats(outcome, meta))
            .zip(meta.archetype_ids())
        {
            builder.ingest(&stats, champion.is_some_and(|v| v.archetype == id));
        }
        for ((builder, stats), variant) in variants
            .iter_mut()
            .zip(variant_stats(outcome, meta))
            .zip(meta.variants())
        {
            builder.ingest(&stats, champion == Some(variant));
        }
        tally.merge(&outcome.tally);
        if snapshots.is_empty() {
            snapshots.clone_from(&outcome.snapshots);
        } else {
            for (total, snap) in snapshots.iter_mut().zip(&outcome.snapshots) {
                total.accumulate(snap);
            }
        }
        fallback_rounds += outcome.fallback_rounds;
    }

    let completed = batch.outcomes.len();
    let first = batch.outcomes.first();
    BatchSummary {
        scenario: scenario.to_string(),
        batch_seed: batch.batch_seed,
        trials: batch.trials(),
        completed,
        players: first.map_or(0, |o| o.players),
        swiss_rounds: first.map_or(0, |o| o.swiss_rounds),
        top_cut: first.map_or(0, |o| o.top_cut),
        fallback_rounds,
        archetypes: archetypes.into_iter().map(|b| b.finish(completed)).collect(),
        variants: variants.into_iter().map(|b| b.finish(completed)).collect(),
        snapshots: snapshots.iter().map(|s| s.averaged(completed)).collect(),
        empirical: empirical_matchups(model, &tally),
        expected: MatchupSummary::from(model),
        projection: FieldProjector::from_model(model)
            .project(projector_rounds)
            .to_f64(),
        failures: batch.failures.clone(),
    }
}

fn empirical_matchups(model: &MatchupModel, tally: &WinTally) -> EmpiricalMatchups {
    let meta = model.metagame();
    let ids: Vec<_> = meta.archetype_ids().collect();
    EmpiricalMatchups {
        archetypes: ids.iter().map(|id| meta.name(*id).to_string()).collect(),
        games: ids
            .iter()
            .map(|a| ids.iter().map(|b| tally.games(*a, *b)).collect())
            .collect(),
        win_rates: ids
            .iter()
            .map(|a| ids.iter().map(|b| tally.win_rate(*a, *b)).collect())
            .collect(),
    }
}
