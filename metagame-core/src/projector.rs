//! Analytical survivorship of archetypes through a single-elimination bracket.
//!
//! With `f` the field mix entering a round and `m` the matchup table:
//!
//! ```text
//! winp[i][d]  = sum over d2 of m(d, d2) * field[i][d2]
//! alive[i][d] = alive[i-1][d] * winp[i-1][d]        alive[0][d] = 1
//! field[i][d] = alive[i][d] * field[0][d] * 2^i
//! norm[i][d]  = field[i][d] / field[0][d]
//! ```
//!
//! All arithmetic is carried in decimal, rounded to [`PRECISION`]
//! significant digits after each operation.
use bigdecimal::BigDecimal;
use num_traits::{One, ToPrimitive, Zero};
use serde::Serialize;
use std::str::FromStr;

use crate::archetype::Variant;
use crate::config::ConfigError;
use crate::matchup::{MatchupModel, UNKNOWN_MATCHUP};
use crate::numbers::u32_to_usize;

/// Significant digits kept by every projector operation.
pub const PRECISION: u64 = 50;

/// Round-by-archetype tables produced by [`FieldProjector::project`].
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionTables {
    pub archetypes: Vec<String>,
    /// Share of the surviving field held by each archetype.
    pub field: Vec<Vec<BigDecimal>>,
    /// Fraction of each archetype's entrants still undefeated.
    pub alive: Vec<Vec<BigDecimal>>,
    /// Current share relative to the initial share; `None` for a zero start.
    pub norm: Vec<Vec<Option<BigDecimal>>>,
    /// Expected win probability against the field entering that round.
    pub winp: Vec<Vec<BigDecimal>>,
}

/// `f64` rendering of [`ProjectionTables`], NaN where a ratio is undefined.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectionView {
    pub archetypes: Vec<String>,
    pub field: Vec<Vec<f64>>,
    pub alive: Vec<Vec<f64>>,
    pub norm: Vec<Vec<f64>>,
    pub winp: Vec<Vec<f64>>,
}

impl ProjectionTables {
    /// Number of projected rounds, excluding round zero.
    #[must_use]
    pub fn rounds(&self) -> usize {
        self.field.len().saturating_sub(1)
    }

    /// Sum of `field[round]` over all archetypes.
    #[must_use]
    pub fn field_total(&self, round: usize) -> BigDecimal {
        self.field[round]
            .iter()
            .fold(BigDecimal::zero(), |acc, v| round_to_precision(acc + v))
    }

    #[must_use]
    pub fn to_f64(&self) -> ProjectionView {
        let table = |rows: &Vec<Vec<BigDecimal>>| -> Vec<Vec<f64>> {
            rows.iter()
                .map(|row| row.iter().map(decimal_to_f64).collect())
                .collect()
        };
        ProjectionView {
            archetypes: self.archetypes.clone(),
            field: table(&self.field),
            alive: table(&self.alive),
            norm: self
                .norm
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|v| v.as_ref().map_or(f64::NAN, decimal_to_f64))
                        .collect()
                })
                .collect(),
            winp: table(&self.winp),
        }
    }
}

/// Deterministic projector over archetype-level shares and matchups.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldProjector {
    archetypes: Vec<String>,
    shares: Vec<BigDecimal>,
    matchups: Vec<Vec<BigDecimal>>,
}

impl FieldProjector {
    /// Shares from metagame popularity, matchups from the model.
    ///
    /// Archetype matchups are aggregated over subarchetypes in decimal,
    /// weighting each subarchetype by its popularity within the archetype.
    #[must_use]
    pub fn from_model(model: &MatchupModel) -> Self {
        let meta = model.metagame();
        let archetypes: Vec<String> = meta
            .archetype_ids()
            .map(|id| meta.name(id).to_string())
            .collect();
        let weights: Vec<BigDecimal> = meta
            .archetype_ids()
            .map(|id| decimal_from_f64(meta.weight(id)))
            .collect();
        let subs: Vec<Vec<(Variant, BigDecimal)>> = meta
            .archetype_ids()
            .map(|id| {
                let (variants, weights): (Vec<Variant>, Vec<BigDecimal>) = meta
                    .subarchetypes(id)
                    .map(|v| (v, decimal_from_f64(meta.variant_weight(v))))
                    .unzip();
                variants.into_iter().zip(normalized(&weights)).collect()
            })
            .collect();
        let matchups = subs
            .iter()
            .map(|left| {
                subs.iter()
                    .map(|right| decimal_matchup(model, left, right))
                    .collect()
            })
            .collect();
        Self {
            archetypes,
            shares: normalized(&weights),
            matchups,
        }
    }

    /// Projector over explicit shares and an optional-entry matchup table;
    /// missing matchups count as even.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when shapes disagree or values are out of range.
    pub fn new<S: AsRef<str>>(
        archetypes: &[S],
        shares: &[f64],
        matchups: &[Vec<Option<f64>>],
    ) -> Result<Self, ConfigError> {
        let names: Vec<String> = archetypes.iter().map(|s| s.as_ref().to_string()).collect();
        let projector = Self {
            shares: Vec::new(),
            matchups: Vec::new(),
            archetypes: names,
        };
        projector.with_shares(shares)?.with_matchups(matchups)
    }

    /// Replace the initial field shares, used verbatim.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` on a length mismatch or a negative share.
    pub fn with_shares(mut self, shares: &[f64]) -> Result<Self, ConfigError> {
        check_len("shares", self.archetypes.len(), shares.len())?;
        for (name, share) in self.archetypes.iter().zip(shares) {
            if !share.is_finite() || *share < 0.0 {
                return Err(ConfigError::InvalidWeight {
                    name: name.clone(),
                    value: *share,
                });
            }
        }
        self.shares = shares.iter().copied().map(decimal_from_f64).collect();
        Ok(self)
    }

    /// Replace the matchup table; `None` entries count as even.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` on a shape mismatch or a value outside `[0, 1]`.
    pub fn with_matchups(mut self, matchups: &[Vec<Option<f64>>]) -> Result<Self, ConfigError> {
        let n = self.archetypes.len();
        check_len("matchups", n, matchups.len())?;
        let mut table = Vec::with_capacity(n);
        for (from, row) in self.archetypes.iter().zip(matchups) {
            check_len("matchups row", n, row.len())?;
            let mut decimals = Vec::with_capacity(n);
            for (to, p) in self.archetypes.iter().zip(row) {
                let p = p.unwrap_or(UNKNOWN_MATCHUP);
                if !p.is_finite() || !(0.0..=1.0).contains(&p) {
                    return Err(ConfigError::InvalidProbability {
                        from: from.clone(),
                        to: to.clone(),
                        value: p,
                    });
                }
                decimals.push(decimal_from_f64(p));
            }
            table.push(decimals);
        }
        self.matchups = table;
        Ok(self)
    }

    #[must_use]
    pub fn archetypes(&self) -> &[String] {
        &self.archetypes
    }

    /// Project `rounds` elimination rounds. Every table has `rounds + 1` rows.
    #[must_use]
    pub fn project(&self, rounds: u32) -> ProjectionTables {
        let n = self.archetypes.len();
        let rows = u32_to_usize(rounds) + 1;
        let mut field = Vec::with_capacity(rows);
        let mut alive = Vec::with_capacity(rows);
        let mut norm = Vec::with_capacity(rows);
        let mut winp = Vec::with_capacity(rows);

        field.push(self.shares.clone());
        alive.push(vec![BigDecimal::one(); n]);
        norm.push(self.shares.iter().map(|f0| ratio(f0, f0)).collect());
        winp.push(self.win_rates(&self.shares));

        let two = BigDecimal::from(2);
        let mut scale = BigDecimal::one();
        for round in 1..rows {
            scale = round_to_precision(&scale * &two);
            let previous_alive: &Vec<BigDecimal> = &alive[round - 1];
            let previous_winp: &Vec<BigDecimal> = &winp[round - 1];
            let next_alive: Vec<BigDecimal> = previous_alive
                .iter()
                .zip(previous_winp)
                .map(|(a, w)| round_to_precision(a * w))
                .collect();
            let next_field: Vec<BigDecimal> = next_alive
                .iter()
                .zip(&self.shares)
                .map(|(a, f0)| round_to_precision(round_to_precision(a * f0) * &scale))
                .collect();
            let next_norm = next_field
                .iter()
                .zip(&self.shares)
                .map(|(f, f0)| ratio(f, f0))
                .collect();
            winp.push(self.win_rates(&next_field));
            alive.push(next_alive);
            field.push(next_field);
            norm.push(next_norm);
        }

        ProjectionTables {
            archetypes: self.archetypes.clone(),
            field,
            alive,
            norm,
            winp,
        }
    }

    fn win_rates(&self, field: &[BigDecimal]) -> Vec<BigDecimal> {
        self.matchups
            .iter()
            .map(|row| {
                row.iter().zip(field).fold(BigDecimal::zero(), |acc, (m, f)| {
                    round_to_precision(acc + round_to_precision(m * f))
                })
            })
            .collect()
    }
}

/// Weights scaled to sum to one; uniform when they sum to zero.
fn normalized(weights: &[BigDecimal]) -> Vec<BigDecimal> {
    let total = weights
        .iter()
        .fold(BigDecimal::zero(), |acc, w| round_to_precision(acc + w));
    if total.is_zero() {
        let count = BigDecimal::from(u64::try_from(weights.len()).unwrap_or(u64::MAX));
        let uniform = round_to_precision(BigDecimal::one() / count);
        vec![uniform; weights.len()]
    } else {
        weights
            .iter()
            .map(|w| round_to_precision(w / &total))
            .collect()
    }
}

fn decimal_matchup(
    model: &MatchupModel,
    left: &[(Variant, BigDecimal)],
    right: &[(Variant, BigDecimal)],
) -> BigDecimal {
    let mut total = BigDecimal::zero();
    for (a, wa) in left {
        for (b, wb) in right {
            let p = decimal_from_f64(model.get_matchup(*a, *b));
            let weight = round_to_precision(wa * wb);
            total = round_to_precision(total + round_to_precision(weight * p));
        }
    }
    total
}

fn ratio(value: &BigDecimal, base: &BigDecimal) -> Option<BigDecimal> {
    if base.is_zero() {
        None
    } else {
        Some(round_to_precision(value / base))
    }
}

fn check_len(field: &'static str, expected: usize, actual: usize) -> Result<(), ConfigError> {
    if expected == actual {
        Ok(())
    } else {
        Err(ConfigError::ShapeMismatch {
            field,
            expected,
            actual,
        })
    }
}

fn round_to_precision(value: BigDecimal) -> BigDecimal {
    value.with_prec(PRECISION)
}

/// Decimal from the shortest round-tripping rendering of `value`, so `0.6`
/// becomes exactly `0.6`.
fn decimal_from_f64(value: f64) -> BigDecimal {
    BigDecimal::from_str(&value.to_string()).unwrap_or_else(|_| BigDecimal::zero())
}

fn decimal_to_f64(value: &BigDecimal) -> f64 {
    value.to_f64().unwrap_or(f64::NAN)
}
