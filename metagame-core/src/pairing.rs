//! Swiss pairing: exact backtracking search, greedy fallback, and byes.
use std::collections::HashSet;
use std::hash::Hash;
use thiserror::Error;

/// Errors raised by the exact pairing search.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PairingError {
    #[error("no rematch-free pairing exists for {players} players")]
    Infeasible { players: usize },
    #[error("pairing search gave up after {steps} steps")]
    BudgetExhausted { steps: u64 },
    #[error("cannot pair an odd field of {len} players; award the bye first")]
    OddField { len: usize },
}

/// Exact backtracking search for a pairing without rematches.
///
/// Players are paired in list order: the first unpaired player takes the
/// earliest compatible opponent, and later choices are revisited only when
/// the remainder cannot be completed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PairingSearch {
    budget: Option<u64>,
}

impl PairingSearch {
    #[must_use]
    pub const fn new() -> Self {
        Self { budget: None }
    }

    /// Cap the number of tentative pairings tried before giving up.
    #[must_use]
    pub const fn with_budget(budget: Option<u64>) -> Self {
        Self { budget }
    }

    /// Pair every player, never repeating a matchup for which
    /// `already_played` returns true.
    ///
    /// # Errors
    ///
    /// Returns `PairingError::OddField` for odd input,
    /// `PairingError::Infeasible` when every branch is exhausted, and
    /// `PairingError::BudgetExhausted` when the step budget runs out first.
    pub fn search<T, F>(&self, players: &[T], already_played: F) -> Result<Vec<(T, T)>, PairingError>
    where
        T: Copy,
        F: Fn(T, T) -> bool,
    {
        if players.len() % 2 != 0 {
            return Err(PairingError::OddField { len: players.len() });
        }
        let mut state = SearchState {
            players,
            already_played,
            paired: vec![false; players.len()],
            pairs: Vec::with_capacity(players.len() / 2),
            steps: 0,
            budget: self.budget,
        };
        if state.descend(0)? {
            Ok(state
                .pairs
                .iter()
                .map(|&(i, j)| (players[i], players[j]))
                .collect())
        } else {
            Err(PairingError::Infeasible {
                players: players.len(),
            })
        }
    }
}

struct SearchState<'a, T, F> {
    players: &'a [T],
    already_played: F,
    paired: Vec<bool>,
    pairs: Vec<(usize, usize)>,
    steps: u64,
    budget: Option<u64>,
}

impl<T, F> SearchState<'_, T, F>
where
    T: Copy,
    F: Fn(T, T) -> bool,
{
    fn descend(&mut self, from: usize) -> Result<bool, PairingError> {
        let n = self.players.len();
        let Some(i) = (from..n).find(|&i| !self.paired[i]) else {
            return Ok(true);
        };
        self.paired[i] = true;
        for j in (i + 1)..n {
            if self.paired[j] || (self.already_played)(self.players[i], self.players[j]) {
                continue;
            }
            self.tick()?;
            self.paired[j] = true;
            self.pairs.push((i, j));
            if self.descend(i + 1)? {
                return Ok(true);
            }
            self.pairs.pop();
            self.paired[j] = false;
        }
        self.paired[i] = false;
        Ok(false)
    }

    fn tick(&mut self) -> Result<(), PairingError> {
        self.steps = self.steps.saturating_add(1);
        match self.budget {
            Some(budget) if self.steps > budget => Err(PairingError::BudgetExhausted { steps: budget }),
            _ => Ok(()),
        }
    }
}

/// Tracks who has received a bye in the current rotation.
///
/// Once every player has had one the rotation starts over.
#[derive(Debug, Clone)]
pub struct ByeRegistry<T> {
    received: HashSet<T>,
    epoch: u32,
}

impl<T> Default for ByeRegistry<T> {
    fn default() -> Self {
        Self {
            received: HashSet::new(),
            epoch: 0,
        }
    }
}

impl<T: Copy + Eq + Hash> ByeRegistry<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Choose the bye for an odd field: the lowest-ranked player who has not
    /// had one this rotation. Returns `None` for an even field.
    pub fn award(&mut self, standings: &[T]) -> Option<T> {
        if standings.len() % 2 == 0 {
            return None;
        }
        let chosen = standings
            .iter()
            .rev()
            .copied()
            .find(|player| !self.received.contains(player))
            .or_else(|| {
                self.reset();
                standings.last().copied()
            })?;
        self.received.insert(chosen);
        if standings.iter().all(|player| self.received.contains(player)) {
            self.reset();
        }
        Some(chosen)
    }

    #[must_use]
    pub fn has_received(&self, player: T) -> bool {
        self.received.contains(&player)
    }

    /// Number of completed rotations.
    #[must_use]
    pub const fn epoch(&self) -> u32 {
        self.epoch
    }

    fn reset(&mut self) {
        self.received.clear();
        self.epoch = self.epoch.saturating_add(1);
    }
}

/// Pairings for one round plus the bye, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundPairing<T> {
    pub pairs: Vec<(T, T)>,
    pub bye: Option<T>,
}

/// Greedy top-down pairing that always produces a complete round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeuristicPairer;

impl HeuristicPairer {
    /// Pair `standings` (best first). Each player takes the first lower-ranked
    /// unpaired opponent they have not met; only when none exists is a rematch
    /// accepted with the first lower-ranked unpaired opponent.
    pub fn pair<T, F>(&self, standings: &[T], byes: &mut ByeRegistry<T>, already_played: F) -> RoundPairing<T>
    where
        T: Copy + Eq + Hash,
        F: Fn(T, T) -> bool,
    {
        let bye = byes.award(standings);
        let mut taken = vec![false; standings.len()];
        if let Some(bye) = bye
            && let Some(index) = standings.iter().rposition(|p| *p == bye)
        {
            taken[index] = true;
        }

        let mut pairs = Vec::with_capacity(standings.len() / 2);
        for i in 0..standings.len() {
            if taken[i] {
                continue;
            }
            let fresh = (i + 1..standings.len())
                .find(|&j| !taken[j] && !already_played(standings[i], standings[j]));
            let chosen = fresh.or_else(|| (i + 1..standings.len()).find(|&j| !taken[j]));
            if let Some(j) = chosen {
                taken[i] = true;
                taken[j] = true;
                pairs.push((standings[i], standings[j]));
            }
        }
        RoundPairing { pairs, bye }
    }
}
