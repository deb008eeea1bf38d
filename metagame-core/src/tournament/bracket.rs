//! Elimination bracket sizing.
use crate::numbers::{floor_log2, floor_pow2, u32_to_usize, usize_to_u32};

/// Top-cut size actually played: the largest power of two not exceeding
/// either the request or the field. Zero when no bracket fits.
#[must_use]
pub fn effective_cut(requested: u32, players: usize) -> u32 {
    let size = floor_pow2(u32_to_usize(requested).min(players));
    if size < 2 { 0 } else { usize_to_u32(size) }
}

/// Shape of a knockout event over the whole field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnockoutLayout {
    /// Power-of-two field after the play-in round.
    pub bracket: usize,
    /// Decks that must play in; zero when the field is already a power of two.
    pub play_in: usize,
    /// Total rounds including the play-in.
    pub rounds: u32,
}

impl KnockoutLayout {
    #[must_use]
    pub const fn for_players(players: usize) -> Self {
        let bracket = floor_pow2(players);
        let excess = players - bracket;
        let rounds = floor_log2(bracket) + if excess > 0 { 1 } else { 0 };
        Self {
            bracket,
            play_in: excess * 2,
            rounds,
        }
    }

    #[must_use]
    pub const fn has_play_in(&self) -> bool {
        self.play_in > 0
    }
}
