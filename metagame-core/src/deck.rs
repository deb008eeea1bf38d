//! Players, their decks, and the match records they accumulate.
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

use crate::archetype::Variant;
use crate::numbers::count_to_f64;

/// Points awarded for a match win or a bye.
pub const WIN_POINTS: u32 = 3;

/// Share of a win credited for a drawn match.
pub const DRAW_VALUE: f64 = 0.5;

/// Identifier of a deck within one tournament.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeckId(pub u32);

impl fmt::Display for DeckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where in the event a match was played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "stage", content = "value")]
pub enum RoundTag {
    /// Swiss round ordinal, starting at 1.
    Swiss(u32),
    /// Top-cut bracket size, e.g. 8 for quarterfinals.
    TopCut(u32),
    /// Knockout round ordinal, starting at 1.
    Knockout(u32),
}

impl fmt::Display for RoundTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Swiss(round) => write!(f, "swiss round {round}"),
            Self::TopCut(size) => write!(f, "top {size}"),
            Self::Knockout(round) => write!(f, "knockout round {round}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Win,
    Loss,
    Draw,
}

impl Outcome {
    #[must_use]
    pub const fn reversed(self) -> Self {
        match self {
            Self::Win => Self::Loss,
            Self::Loss => Self::Win,
            Self::Draw => Self::Draw,
        }
    }
}

/// One directional match record, seen from `deck`'s side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub deck: DeckId,
    pub opponent: DeckId,
    pub outcome: Outcome,
    pub round: RoundTag,
}

impl Match {
    /// The same match seen from the opponent's side.
    #[must_use]
    pub const fn mirrored(&self) -> Self {
        Self {
            deck: self.opponent,
            opponent: self.deck,
            outcome: self.outcome.reversed(),
            round: self.round,
        }
    }
}

/// A player and their deck for the duration of one tournament.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deck {
    pub id: DeckId,
    pub variant: Variant,
    pub points: u32,
    pub matches: Vec<Match>,
    /// Rounds in which this deck received a bye.
    pub byes: SmallVec<[RoundTag; 2]>,
    /// Current standing, 1-based; zero before the first ranking.
    pub place: u32,
}

impl Deck {
    #[must_use]
    pub fn new(id: DeckId, variant: Variant) -> Self {
        Self {
            id,
            variant,
            points: 0,
            matches: Vec::new(),
            byes: SmallVec::new(),
            place: 0,
        }
    }

    /// Whether this deck has already been paired against `other`.
    #[must_use]
    pub fn has_played(&self, other: DeckId) -> bool {
        self.matches.iter().any(|m| m.opponent == other)
    }

    pub(crate) fn record(&mut self, record: Match) {
        if matches!(record.outcome, Outcome::Win) {
            self.points += WIN_POINTS;
        }
        self.matches.push(record);
    }

    pub(crate) fn record_bye(&mut self, round: RoundTag) {
        self.points += WIN_POINTS;
        self.byes.push(round);
    }

    #[must_use]
    pub fn wins(&self) -> usize {
        self.count(Outcome::Win)
    }

    #[must_use]
    pub fn losses(&self) -> usize {
        self.count(Outcome::Loss)
    }

    #[must_use]
    pub fn draws(&self) -> usize {
        self.count(Outcome::Draw)
    }

    fn count(&self, outcome: Outcome) -> usize {
        self.matches.iter().filter(|m| m.outcome == outcome).count()
    }

    /// Rounds participated in, counting byes.
    #[must_use]
    pub fn rounds_played(&self) -> usize {
        self.matches.len() + self.byes.len()
    }

    /// Match-win fraction over played matches, `None` without matches.
    #[must_use]
    pub fn match_win_fraction(&self) -> Option<f64> {
        match_win_fraction(self.wins(), self.losses(), self.draws())
    }
}

/// Match-win fraction for a record, a draw counting as half a win.
#[must_use]
pub fn match_win_fraction(wins: usize, losses: usize, draws: usize) -> Option<f64> {
    let total = wins + losses + draws;
    if total == 0 {
        return None;
    }
    let won = count_to_f64(wins) + count_to_f64(draws) * DRAW_VALUE;
    Some(won / count_to_f64(total))
}
