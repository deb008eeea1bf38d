//! Metagame Core
//!
//! Swiss tournament engine for studying how a competitive metagame filters
//! through an event. Archetype popularity and head-to-head matchups go in;
//! simulated standings, per-round top-X archetype mix, and an analytical
//! survivorship projection come out. No I/O or platform dependencies.

pub mod archetype;
pub mod config;
pub mod deck;
pub mod field;
pub mod matchup;
pub mod numbers;
pub mod pairing;
pub mod projector;
pub mod rng;
pub mod seed;
pub mod simulator;
pub mod stats;
pub mod tournament;

// Re-export commonly used types
pub use archetype::{
    ArchetypeId, Metagame, MetagameBuilder, NO_SUBARCHETYPE, PopularityTable, SubarchetypeId,
    Variant,
};
pub use config::{
    ConfigError, MonteCarloConfig, PairingMode, TournamentConfig, TournamentFormat,
};
pub use deck::{Deck, DeckId, Match, Outcome, RoundTag, match_win_fraction};
pub use field::{Field, FieldMode};
pub use matchup::{
    MatchupMatrix, MatchupModel, MatchupSummary, MatchupTable, Selector, UNKNOWN_MATCHUP,
};
pub use pairing::{ByeRegistry, HeuristicPairer, PairingError, PairingSearch, RoundPairing};
pub use projector::{FieldProjector, PRECISION, ProjectionTables, ProjectionView};
pub use rng::{CountingRng, RngBundle, StreamDraws};
pub use seed::{parse_seed, trial_seed};
pub use simulator::{MatchSimulator, WinTally};
pub use stats::{GroupStats, archetype_stats, variant_stats};
pub use tournament::{
    CutoffSnapshot, KnockoutLayout, Standing, TournamentError, TournamentPhase, TournamentRunner,
    TrialOutcome, effective_cut,
};
