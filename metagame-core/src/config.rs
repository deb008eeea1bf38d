//! Tournament configuration and the configuration error taxonomy.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::field::FieldMode;

/// Errors raised when metagame or tournament configuration is unusable.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("a tournament needs at least one player")]
    EmptyField,
    #[error("swiss round override must be positive (got {value})")]
    RoundCount { value: u32 },
    #[error("top cut of {value} cannot be reduced to an elimination bracket")]
    TopCut { value: u32 },
    #[error("weight for {name} must be finite and non-negative (got {value})")]
    InvalidWeight { name: String, value: f64 },
    #[error("matchup {from} vs {to} must be a probability in [0, 1] (got {value})")]
    InvalidProbability { from: String, to: String, value: f64 },
    #[error("unknown archetype `{name}`")]
    UnknownArchetype { name: String },
    #[error("unknown subarchetype `{sub}` of `{archetype}`")]
    UnknownSubarchetype { archetype: String, sub: String },
    #[error("subarchetype `{sub}` of `{archetype}` declared twice")]
    DuplicateVariant { archetype: String, sub: String },
    #[error("{count} entries exceed the archetype handle range")]
    TooManyArchetypes { count: usize },
    #[error("{field} expected {expected} entries (got {actual})")]
    ShapeMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("{field} must be at least {min} (got {value})")]
    MinViolation {
        field: &'static str,
        min: u64,
        value: u64,
    },
}

/// How Swiss rounds are paired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum PairingMode {
    /// Greedy two-pass pairing; never fails.
    #[default]
    Heuristic,
    /// Backtracking search that forbids rematches.
    Exact {
        /// Fall back to heuristic pairing when no rematch-free pairing exists.
        #[serde(default = "PairingMode::default_fallback")]
        fallback: bool,
        /// Optional cap on search steps per round.
        #[serde(default)]
        budget: Option<u64>,
    },
}

impl PairingMode {
    const fn default_fallback() -> bool {
        true
    }
}

/// Overall event structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentFormat {
    /// Swiss rounds followed by a single-elimination top cut.
    #[default]
    Swiss,
    /// Single elimination over the whole field with play-in byes.
    Knockout,
}

/// Parameters for one simulated tournament.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentConfig {
    /// Override for the number of Swiss rounds; `ceil(log2 N)` when absent.
    #[serde(default)]
    pub swiss_rounds: Option<u32>,
    /// Requested top-cut size; zero disables the cut.
    #[serde(default = "TournamentConfig::default_top_cut")]
    pub top_cut: u32,
    #[serde(default)]
    pub pairing: PairingMode,
    #[serde(default)]
    pub format: TournamentFormat,
    /// Standings cutoffs whose archetype mix is recorded after each round.
    #[serde(default)]
    pub tracked_cutoffs: Vec<u32>,
}

impl TournamentConfig {
    const fn default_top_cut() -> u32 {
        8
    }

    /// Check the configuration against its documented bounds.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for a zero round override, a top cut of one, or a
    /// zero tracked cutoff.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(0) = self.swiss_rounds {
            return Err(ConfigError::RoundCount { value: 0 });
        }
        if self.top_cut == 1 {
            return Err(ConfigError::TopCut { value: 1 });
        }
        if self.tracked_cutoffs.contains(&0) {
            return Err(ConfigError::MinViolation {
                field: "tracked_cutoffs",
                min: 1,
                value: 0,
            });
        }
        Ok(())
    }

    /// Planned Swiss rounds for a field of `players`.
    #[must_use]
    pub fn planned_rounds(&self, players: usize) -> u32 {
        if players == 0 {
            return 0;
        }
        self.swiss_rounds
            .unwrap_or_else(|| crate::numbers::ceil_log2(players))
    }
}

impl Default for TournamentConfig {
    fn default() -> Self {
        Self {
            swiss_rounds: None,
            top_cut: Self::default_top_cut(),
            pairing: PairingMode::default(),
            format: TournamentFormat::default(),
            tracked_cutoffs: Vec::new(),
        }
    }
}

/// Parameters for a batch of independent trials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonteCarloConfig {
    #[serde(default = "MonteCarloConfig::default_trials")]
    pub trials: usize,
    #[serde(default)]
    pub field: FieldMode,
    /// Field size for `exact` and `sampled` fields; total weight when absent.
    #[serde(default)]
    pub players: Option<usize>,
    /// Elimination rounds covered by the analytical projection.
    #[serde(default = "MonteCarloConfig::default_projector_rounds")]
    pub projector_rounds: u32,
    #[serde(default)]
    pub parallel: bool,
}

impl MonteCarloConfig {
    const fn default_trials() -> usize {
        100
    }

    const fn default_projector_rounds() -> u32 {
        3
    }

    /// # Errors
    ///
    /// Returns `ConfigError` for a zero trial count or an explicit field of
    /// zero players.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trials == 0 {
            return Err(ConfigError::MinViolation {
                field: "trials",
                min: 1,
                value: 0,
            });
        }
        if self.players == Some(0) {
            return Err(ConfigError::EmptyField);
        }
        Ok(())
    }
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            trials: Self::default_trials(),
            field: FieldMode::default(),
            players: None,
            projector_rounds: Self::default_projector_rounds(),
            parallel: false,
        }
    }
}
