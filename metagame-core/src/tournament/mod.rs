//! Round-by-round tournament state machine.
//!
//! A [`TournamentRunner`] owns every mutable piece of one trial: the decks,
//! the standings, the bye rotation, the random streams, and the win tally.
//! Each call to [`TournamentRunner::step`] plays exactly one round, so a
//! caller can stop between rounds but never in the middle of one.
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

use crate::config::{ConfigError, PairingMode, TournamentConfig, TournamentFormat};
use crate::deck::{Deck, DeckId, RoundTag};
use crate::field::Field;
use crate::matchup::MatchupModel;
use crate::numbers::u32_to_usize;
use crate::pairing::{ByeRegistry, HeuristicPairer, PairingError, PairingSearch, RoundPairing};
use crate::rng::{RngBundle, StreamDraws};
use crate::simulator::{MatchSimulator, WinTally};

pub mod bracket;
pub mod snapshot;
pub mod standings;

pub use bracket::{KnockoutLayout, effective_cut};
pub use snapshot::CutoffSnapshot;
pub use standings::{OPPONENT_FLOOR, Standing, opponent_win_fraction};

use standings::{assign_places, index, order_by_points, order_with_tiebreaks};

/// Errors that end a single trial.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TournamentError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{round}: {source}")]
    Pairing {
        round: RoundTag,
        #[source]
        source: PairingError,
    },
    #[error("tournament cancelled before {phase:?}")]
    Cancelled { phase: TournamentPhase },
}

/// The next piece of work the runner will do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "phase")]
pub enum TournamentPhase {
    /// Opening order not yet drawn.
    Init,
    /// A Swiss round before the last, paired without tiebreaks.
    Swiss { round: u32 },
    /// The last Swiss round, paired from tiebreak-aware standings.
    SwissFinal { round: u32 },
    /// One round of the top-cut bracket of the given size.
    TopCut { size: u32 },
    /// One round of a whole-field knockout.
    Knockout { round: u32 },
    Done,
}

/// Everything a finished trial produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialOutcome {
    pub seed: u64,
    pub players: usize,
    pub swiss_rounds: u32,
    /// Top-cut size actually played, zero when there was none.
    pub top_cut: u32,
    /// Final standings, best first.
    pub standings: Vec<Standing>,
    /// Decks indexed by id, with full match history.
    pub decks: Vec<Deck>,
    pub tally: WinTally,
    pub snapshots: Vec<CutoffSnapshot>,
    /// Exact-mode rounds that were paired heuristically instead.
    pub fallback_rounds: u32,
    #[serde(default)]
    pub rng_draws: StreamDraws,
}

/// Plays one tournament over a fixed field.
#[derive(Debug)]
pub struct TournamentRunner<'a> {
    model: &'a MatchupModel,
    config: TournamentConfig,
    seed: u64,
    rng: RngBundle,
    decks: Vec<Deck>,
    order: Vec<DeckId>,
    byes: ByeRegistry<DeckId>,
    tally: WinTally,
    phase: TournamentPhase,
    swiss_rounds: u32,
    cut: u32,
    knockout: KnockoutLayout,
    alive: usize,
    snapshots: Vec<CutoffSnapshot>,
    fallback_rounds: u32,
}

impl<'a> TournamentRunner<'a> {
    /// Prepare a tournament for `field` under `config`, seeded by `seed`.
    ///
    /// # Errors
    ///
    /// Returns `TournamentError::Config` when the configuration is invalid.
    pub fn new(
        model: &'a MatchupModel,
        field: &Field,
        config: TournamentConfig,
        seed: u64,
    ) -> Result<Self, TournamentError> {
        config.validate()?;
        let decks = field.decks();
        let players = decks.len();
        let knockout = KnockoutLayout::for_players(players);
        let (swiss_rounds, cut) = match config.format {
            TournamentFormat::Swiss => (
                config.planned_rounds(players),
                effective_cut(config.top_cut, players),
            ),
            TournamentFormat::Knockout => (knockout.rounds, 0),
        };
        let archetypes = model.metagame().len();
        let slots = u32_to_usize(swiss_rounds) + 1;
        let snapshots = config
            .tracked_cutoffs
            .iter()
            .map(|cutoff| CutoffSnapshot::new(*cutoff, slots, archetypes))
            .collect();
        log::debug!(
            "tournament seed {seed}: {players} players, {swiss_rounds} rounds, top {cut}"
        );
        Ok(Self {
            model,
            config,
            seed,
            rng: RngBundle::from_seed(seed),
            order: decks.iter().map(|d| d.id).collect(),
            decks,
            byes: ByeRegistry::new(),
            tally: WinTally::new(archetypes),
            phase: TournamentPhase::Init,
            swiss_rounds,
            cut,
            knockout,
            alive: knockout.bracket,
            snapshots,
            fallback_rounds: 0,
        })
    }

    #[must_use]
    pub const fn phase(&self) -> TournamentPhase {
        self.phase
    }

    #[must_use]
    pub const fn is_done(&self) -> bool {
        matches!(self.phase, TournamentPhase::Done)
    }

    #[must_use]
    pub const fn swiss_rounds(&self) -> u32 {
        self.swiss_rounds
    }

    #[must_use]
    pub const fn top_cut(&self) -> u32 {
        self.cut
    }

    #[must_use]
    pub fn decks(&self) -> &[Deck] {
        &self.decks
    }

    /// Current standings order, best first.
    #[must_use]
    pub fn order(&self) -> &[DeckId] {
        &self.order
    }

    /// Play the current phase and advance. Returns the new phase.
    ///
    /// # Errors
    ///
    /// Returns `TournamentError::Pairing` when exact pairing fails without a
    /// fallback.
    pub fn step(&mut self) -> Result<TournamentPhase, TournamentError> {
        self.phase = match self.phase {
            TournamentPhase::Init => self.open(),
            TournamentPhase::Swiss { round } => {
                self.play_swiss_round(round)?;
                let next = round + 1;
                if next == self.swiss_rounds {
                    order_with_tiebreaks(&mut self.order, &self.decks, &mut *self.rng.standings());
                } else {
                    order_by_points(&mut self.order, &self.decks, &mut *self.rng.standings());
                }
                assign_places(&self.order, &mut self.decks);
                self.snapshot(u32_to_usize(round));
                if next == self.swiss_rounds {
                    TournamentPhase::SwissFinal { round: next }
                } else {
                    TournamentPhase::Swiss { round: next }
                }
            }
            TournamentPhase::SwissFinal { round } => {
                self.play_swiss_round(round)?;
                order_with_tiebreaks(&mut self.order, &self.decks, &mut *self.rng.standings());
                assign_places(&self.order, &mut self.decks);
                self.after_swiss()
            }
            TournamentPhase::TopCut { size } => {
                self.play_cut_round(size);
                assign_places(&self.order, &mut self.decks);
                if size / 2 >= 2 {
                    TournamentPhase::TopCut { size: size / 2 }
                } else {
                    self.finish()
                }
            }
            TournamentPhase::Knockout { round } => {
                self.play_knockout_round(round);
                order_by_points(&mut self.order, &self.decks, &mut *self.rng.standings());
                assign_places(&self.order, &mut self.decks);
                if round >= self.swiss_rounds {
                    self.finish()
                } else {
                    self.snapshot(u32_to_usize(round));
                    TournamentPhase::Knockout { round: round + 1 }
                }
            }
            TournamentPhase::Done => TournamentPhase::Done,
        };
        Ok(self.phase)
    }

    /// Play to completion, checking `cancel` between rounds.
    ///
    /// # Errors
    ///
    /// Returns `TournamentError::Cancelled` when `cancel` is raised, or any
    /// error from [`TournamentRunner::step`].
    pub fn run(mut self, cancel: Option<&AtomicBool>) -> Result<TrialOutcome, TournamentError> {
        while !self.is_done() {
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                return Err(TournamentError::Cancelled { phase: self.phase });
            }
            self.step()?;
        }
        Ok(self.into_outcome())
    }

    /// Consume the runner and collect its results.
    #[must_use]
    pub fn into_outcome(self) -> TrialOutcome {
        TrialOutcome {
            rng_draws: self.rng.draws(),
            seed: self.seed,
            players: self.decks.len(),
            swiss_rounds: self.swiss_rounds,
            top_cut: self.cut,
            standings: standings::standings(&self.order, &self.decks),
            decks: self.decks,
            tally: self.tally,
            snapshots: self.snapshots,
            fallback_rounds: self.fallback_rounds,
        }
    }

    fn open(&mut self) -> TournamentPhase {
        order_by_points(&mut self.order, &self.decks, &mut *self.rng.standings());
        self.snapshot(0);
        match self.config.format {
            TournamentFormat::Knockout if self.swiss_rounds > 0 => TournamentPhase::Knockout { round: 1 },
            TournamentFormat::Knockout => self.finish(),
            TournamentFormat::Swiss => match self.swiss_rounds {
                0 => self.after_swiss(),
                1 => TournamentPhase::SwissFinal { round: 1 },
                _ => TournamentPhase::Swiss { round: 1 },
            },
        }
    }

    fn after_swiss(&mut self) -> TournamentPhase {
        if self.cut >= 2 {
            TournamentPhase::TopCut { size: self.cut }
        } else {
            self.finish()
        }
    }

    fn finish(&mut self) -> TournamentPhase {
        if self.swiss_rounds > 0 {
            self.snapshot(u32_to_usize(self.swiss_rounds));
        }
        assign_places(&self.order, &mut self.decks);
        TournamentPhase::Done
    }

    fn snapshot(&mut self, slot: usize) {
        for snap in &mut self.snapshots {
            snap.record(slot, &self.order, &self.decks);
        }
    }

    fn play_swiss_round(&mut self, round: u32) -> Result<(), TournamentError> {
        let tag = RoundTag::Swiss(round);
        let pairing = self.pair_round(tag)?;
        log::debug!(
            "{tag}: {} pairings, bye {:?}",
            pairing.pairs.len(),
            pairing.bye
        );
        if let Some(bye) = pairing.bye {
            self.decks[index(bye)].record_bye(tag);
        }
        for (a, b) in pairing.pairs {
            self.play(a, b, tag);
        }
        Ok(())
    }

    fn pair_round(&mut self, tag: RoundTag) -> Result<RoundPairing<DeckId>, TournamentError> {
        let decks = &self.decks;
        let played = |a: DeckId, b: DeckId| decks[index(a)].has_played(b);
        match self.config.pairing {
            PairingMode::Heuristic => Ok(HeuristicPairer.pair(&self.order, &mut self.byes, played)),
            PairingMode::Exact { fallback, budget } => {
                let bye = self.byes.award(&self.order);
                let rest: Vec<DeckId> = self
                    .order
                    .iter()
                    .copied()
                    .filter(|id| Some(*id) != bye)
                    .collect();
                match PairingSearch::with_budget(budget).search(&rest, played) {
                    Ok(pairs) => Ok(RoundPairing { pairs, bye }),
                    Err(source) if fallback => {
                        log::warn!("{tag}: {source}; falling back to heuristic pairing");
                        self.fallback_rounds += 1;
                        let mut no_byes = ByeRegistry::new();
                        let mut pairing = HeuristicPairer.pair(&rest, &mut no_byes, played);
                        pairing.bye = bye;
                        Ok(pairing)
                    }
                    Err(source) => Err(TournamentError::Pairing { round: tag, source }),
                }
            }
        }
    }

    /// Top `size` decks play seed `i` against seed `size - 1 - i`. Winners
    /// keep bracket order in the top half; losers fill the bottom half in
    /// seed order.
    fn play_cut_round(&mut self, size: u32) {
        let size = u32_to_usize(size).min(self.order.len());
        let tag = RoundTag::TopCut(crate::numbers::usize_to_u32(size));
        let bracket: Vec<DeckId> = self.order[..size].to_vec();
        let half = size / 2;
        let mut winners = Vec::with_capacity(half);
        let mut losers = Vec::with_capacity(half);
        for high in 0..half {
            let low = size - 1 - high;
            if self.play(bracket[high], bracket[low], tag) == bracket[high] {
                winners.push(high);
                losers.push(low);
            } else {
                winners.push(low);
                losers.push(high);
            }
        }
        losers.sort_unstable();
        for (slot, seed) in winners.into_iter().chain(losers).enumerate() {
            self.order[slot] = bracket[seed];
        }
    }

    fn play_knockout_round(&mut self, round: u32) {
        let tag = RoundTag::Knockout(round);
        if round == 1 && self.knockout.has_play_in() {
            let start = self.order.len() - self.knockout.play_in;
            for id in &self.order[..start] {
                self.decks[index(*id)].record_bye(tag);
            }
            let playing: Vec<DeckId> = self.order[start..].to_vec();
            for pair in playing.chunks_exact(2) {
                self.play(pair[0], pair[1], tag);
            }
            return;
        }
        let playing: Vec<DeckId> = self.order[..self.alive].to_vec();
        for pair in playing.chunks_exact(2) {
            self.play(pair[0], pair[1], tag);
        }
        self.alive /= 2;
    }

    fn play(&mut self, a: DeckId, b: DeckId, tag: RoundTag) -> DeckId {
        let (first, second) = pair_mut(&mut self.decks, index(a), index(b));
        MatchSimulator::new(self.model).play(
            first,
            second,
            tag,
            &mut *self.rng.outcomes(),
            &mut self.tally,
        )
    }
}

fn pair_mut<T>(items: &mut [T], a: usize, b: usize) -> (&mut T, &mut T) {
    if a < b {
        let (left, right) = items.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = items.split_at_mut(a);
        (&mut right[0], &mut left[b])
    }
}
