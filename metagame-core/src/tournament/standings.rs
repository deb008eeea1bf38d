//! Ordering decks into standings.
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::archetype::Variant;
use crate::deck::{Deck, DeckId};
use crate::numbers::{count_to_f64, usize_to_u32};

/// Floor applied to each opponent's match-win fraction in tiebreaks.
pub const OPPONENT_FLOOR: f64 = 1.0 / 3.0;

/// Final line of the standings for one deck.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    pub deck: DeckId,
    pub variant: Variant,
    /// 1-based final rank.
    pub rank: u32,
    pub points: u32,
    pub wins: u32,
    pub losses: u32,
    pub byes: u32,
    pub opponent_win_fraction: f64,
}

/// Points descending, random order within a point bracket.
pub(crate) fn order_by_points<R: Rng + ?Sized>(order: &mut [DeckId], decks: &[Deck], rng: &mut R) {
    order.shuffle(rng);
    order.sort_by(|a, b| points(decks, *b).cmp(&points(decks, *a)));
}

/// Points, then opponents' match-win fraction; exact ties stay random.
pub(crate) fn order_with_tiebreaks<R: Rng + ?Sized>(order: &mut [DeckId], decks: &[Deck], rng: &mut R) {
    let omw: Vec<f64> = decks
        .iter()
        .map(|deck| opponent_win_fraction(deck, decks))
        .collect();
    order.shuffle(rng);
    order.sort_by(|a, b| {
        points(decks, *b)
            .cmp(&points(decks, *a))
            .then_with(|| omw[index(*b)].total_cmp(&omw[index(*a)]))
    });
}

/// Mean of opponents' match-win fractions, each floored at one third.
/// Zero for a deck that has not played.
#[must_use]
pub fn opponent_win_fraction(deck: &Deck, decks: &[Deck]) -> f64 {
    if deck.matches.is_empty() {
        return 0.0;
    }
    let total: f64 = deck
        .matches
        .iter()
        .map(|m| {
            decks
                .get(index(m.opponent))
                .and_then(Deck::match_win_fraction)
                .unwrap_or(0.0)
                .max(OPPONENT_FLOOR)
        })
        .sum();
    total / count_to_f64(deck.matches.len())
}

pub(crate) fn assign_places(order: &[DeckId], decks: &mut [Deck]) {
    for (rank, id) in order.iter().enumerate() {
        decks[index(*id)].place = usize_to_u32(rank + 1);
    }
}

pub(crate) fn standings(order: &[DeckId], decks: &[Deck]) -> Vec<Standing> {
    order
        .iter()
        .map(|id| {
            let deck = &decks[index(*id)];
            Standing {
                deck: deck.id,
                variant: deck.variant,
                rank: deck.place,
                points: deck.points,
                wins: usize_to_u32(deck.wins()),
                losses: usize_to_u32(deck.losses()),
                byes: usize_to_u32(deck.byes.len()),
                opponent_win_fraction: opponent_win_fraction(deck, decks),
            }
        })
        .collect()
}

pub(crate) fn index(id: DeckId) -> usize {
    crate::numbers::u32_to_usize(id.0)
}

fn points(decks: &[Deck], id: DeckId) -> u32 {
    decks[index(id)].points
}
