use anyhow::{Context, Result, ensure};
use metagame_core::numbers::floor_f64_to_usize;
use metagame_core::{
    ConfigError, Field, FieldMode, MatchupModel, MonteCarloConfig, RngBundle, TournamentConfig,
    TournamentRunner, TrialOutcome, trial_seed,
};
use rayon::prelude::*;
use serde::Serialize;
use std::sync::atomic::AtomicBool;

/// A trial that ended in an error; the rest of the batch still runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrialFailure {
    pub index: usize,
    pub seed: u64,
    pub error: String,
}

/// Raw output of one batch.
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub batch_seed: u64,
    pub outcomes: Vec<TrialOutcome>,
    pub failures: Vec<TrialFailure>,
}

impl BatchResult {
    #[must_use]
    pub fn trials(&self) -> usize {
        self.outcomes.len() + self.failures.len()
    }
}

/// Runs independent trials over one shared model.
#[derive(Debug, Clone, Copy)]
pub struct BatchRunner<'a> {
    model: &'a MatchupModel,
    tournament: &'a TournamentConfig,
    monte_carlo: &'a MonteCarloConfig,
}

impl<'a> BatchRunner<'a> {
    /// # Errors
    ///
    /// Fails when either configuration is invalid or the field would be empty.
    pub fn new(
        model: &'a MatchupModel,
        tournament: &'a TournamentConfig,
        monte_carlo: &'a MonteCarloConfig,
    ) -> Result<Self> {
        tournament
            .validate()
            .context("invalid tournament settings")?;
        monte_carlo
            .validate()
            .context("invalid monte carlo settings")?;
        let runner = Self {
            model,
            tournament,
            monte_carlo,
        };
        ensure!(runner.planned_players() > 0, ConfigError::EmptyField);
        Ok(runner)
    }

    /// Entrants per trial.
    #[must_use]
    pub fn planned_players(&self) -> usize {
        let meta = self.model.metagame();
        match self.monte_carlo.field {
            FieldMode::Counts => Field::from_weights(meta).len(),
            FieldMode::Exact | FieldMode::Sampled => self
                .monte_carlo
                .players
                .unwrap_or_else(|| floor_f64_to_usize(meta.total_weight())),
        }
    }

    /// Run every trial of the batch seeded by `batch_seed`.
    ///
    /// Trial `i` always uses `trial_seed(batch_seed, i)`, so results do not
    /// depend on whether trials run in parallel.
    pub fn run(&self, batch_seed: u64, cancel: Option<&AtomicBool>) -> BatchResult {
        let trials = self.monte_carlo.trials;
        log::info!(
            "batch {batch_seed:#x}: {trials} trials of {} players{}",
            self.planned_players(),
            if self.monte_carlo.parallel { " (parallel)" } else { "" }
        );
        let results: Vec<(usize, u64, Result<TrialOutcome>)> = if self.monte_carlo.parallel {
            (0..trials)
                .into_par_iter()
                .map(|index| self.trial(batch_seed, index, cancel))
                .collect()
        } else {
            (0..trials)
                .map(|index| self.trial(batch_seed, index, cancel))
                .collect()
        };

        let mut outcomes = Vec::with_capacity(trials);
        let mut failures = Vec::new();
        for (index, seed, result) in results {
            match result {
                Ok(outcome) => outcomes.push(outcome),
                Err(err) => {
                    log::warn!("trial {index} (seed {seed:#x}) failed: {err:#}");
                    failures.push(TrialFailure {
                        index,
                        seed,
                        error: format!("{err:#}"),
                    });
                }
            }
        }
        log::info!(
            "batch {batch_seed:#x}: {} completed, {} failed",
            outcomes.len(),
            failures.len()
        );
        BatchResult {
            batch_seed,
            outcomes,
            failures,
        }
    }

    fn trial(
        &self,
        batch_seed: u64,
        index: usize,
        cancel: Option<&AtomicBool>,
    ) -> (usize, u64, Result<TrialOutcome>) {
        let seed = trial_seed(batch_seed, u64::try_from(index).unwrap_or(u64::MAX));
        (index, seed, self.run_trial(seed, cancel))
    }

    fn run_trial(&self, seed: u64, cancel: Option<&AtomicBool>) -> Result<TrialOutcome> {
        let meta = self.model.metagame();
        let rng = RngBundle::from_seed(seed);
        let field = Field::build(
            meta,
            self.monte_carlo.field,
            self.monte_carlo.players,
            &mut *rng.field(),
        )?;
        let mut outcome = TournamentRunner::new(self.model, &field, self.tournament.clone(), seed)?
            .run(cancel)?;
        outcome.rng_draws.field = rng.draws().field;
        log::debug!(
            "trial seed {seed:#x}: {} random draws",
            outcome.rng_draws.total()
        );
        if outcome.fallback_rounds > 0 {
            log::debug!(
                "trial seed {seed:#x}: {} rounds paired heuristically",
                outcome.fallback_rounds
            );
        }
        Ok(outcome)
    }
}
