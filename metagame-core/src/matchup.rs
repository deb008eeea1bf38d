//! Matchup probabilities between archetypes and their aggregation.
use serde::Serialize;
use std::collections::BTreeMap;

use crate::archetype::{ArchetypeId, Metagame, Variant};
use crate::config::ConfigError;
use crate::numbers::count_to_f64;

/// Nested `{archetype: {sub: {archetype: {sub: p}}}}` matchup data.
pub type MatchupTable = BTreeMap<String, BTreeMap<String, BTreeMap<String, BTreeMap<String, f64>>>>;

/// Probability used when neither direction of a matchup is known.
pub const UNKNOWN_MATCHUP: f64 = 0.5;

/// Raw directional matchup entries over concrete variants.
///
/// Entries may be missing; they are resolved by [`MatchupModel`].
#[derive(Debug, Clone, PartialEq)]
pub struct MatchupMatrix {
    variants: usize,
    cells: Vec<Option<f64>>,
}

impl MatchupMatrix {
    /// An empty matrix sized for the given metagame.
    #[must_use]
    pub fn for_metagame(meta: &Metagame) -> Self {
        let variants = meta.variant_count();
        Self {
            variants,
            cells: vec![None; variants * variants],
        }
    }

    /// Build from nested name-keyed data.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` on unknown names or invalid probabilities.
    pub fn from_table(meta: &Metagame, table: &MatchupTable) -> Result<Self, ConfigError> {
        let mut matrix = Self::for_metagame(meta);
        for (from_name, from_subs) in table {
            for (from_sub, targets) in from_subs {
                let from = meta.variant(from_name, from_sub)?;
                for (to_name, to_subs) in targets {
                    for (to_sub, p) in to_subs {
                        let to = meta.variant(to_name, to_sub)?;
                        matrix.set(meta, from, to, *p)?;
                    }
                }
            }
        }
        Ok(matrix)
    }

    /// Build from a dense archetype-level table, `rows[i][j]` = P(i beats j).
    ///
    /// Every subarchetype pair of two archetypes receives the same value.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when the table shape does not match the metagame
    /// or a value is not a probability.
    pub fn from_dense(meta: &Metagame, rows: &[Vec<f64>]) -> Result<Self, ConfigError> {
        if rows.len() != meta.len() {
            return Err(ConfigError::ShapeMismatch {
                field: "matchups",
                expected: meta.len(),
                actual: rows.len(),
            });
        }
        let mut matrix = Self::for_metagame(meta);
        for (a, row) in meta.archetype_ids().zip(rows) {
            if row.len() != meta.len() {
                return Err(ConfigError::ShapeMismatch {
                    field: "matchups row",
                    expected: meta.len(),
                    actual: row.len(),
                });
            }
            for (b, p) in meta.archetype_ids().zip(row) {
                for from in meta.subarchetypes(a) {
                    for to in meta.subarchetypes(b) {
                        matrix.set(meta, from, to, *p)?;
                    }
                }
            }
        }
        Ok(matrix)
    }

    /// Record P(`from` beats `to`).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidProbability` for values outside `[0, 1]`.
    pub fn set(&mut self, meta: &Metagame, from: Variant, to: Variant, p: f64) -> Result<(), ConfigError> {
        if !p.is_finite() || !(0.0..=1.0).contains(&p) {
            return Err(ConfigError::InvalidProbability {
                from: meta.label(from),
                to: meta.label(to),
                value: p,
            });
        }
        let index = self.cell(meta.variant_index(from), meta.variant_index(to));
        self.cells[index] = Some(p);
        Ok(())
    }

    /// Record `p` for `from` and `1 - p` for the reverse direction.
    ///
    /// # Errors
    ///
    /// See [`MatchupMatrix::set`].
    pub fn set_symmetric(&mut self, meta: &Metagame, from: Variant, to: Variant, p: f64) -> Result<(), ConfigError> {
        self.set(meta, from, to, p)?;
        self.set(meta, to, from, 1.0 - p)
    }

    /// Name-based variant of [`MatchupMatrix::set_symmetric`].
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` on unknown names or invalid probabilities.
    pub fn set_by_name(
        &mut self,
        meta: &Metagame,
        from: (&str, &str),
        to: (&str, &str),
        p: f64,
    ) -> Result<(), ConfigError> {
        let from = meta.variant(from.0, from.1)?;
        let to = meta.variant(to.0, to.1)?;
        self.set_symmetric(meta, from, to, p)
    }

    /// Raw entry as declared, if any.
    #[must_use]
    pub fn get(&self, meta: &Metagame, from: Variant, to: Variant) -> Option<f64> {
        self.cells[self.cell(meta.variant_index(from), meta.variant_index(to))]
    }

    const fn cell(&self, from: usize, to: usize) -> usize {
        from * self.variants + to
    }
}

/// One side of a matchup query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    /// A concrete subarchetype.
    Variant(Variant),
    /// Any subarchetype, weighted by popularity within the archetype.
    Archetype(ArchetypeId),
}

impl From<Variant> for Selector {
    fn from(value: Variant) -> Self {
        Self::Variant(value)
    }
}

impl From<ArchetypeId> for Selector {
    fn from(value: ArchetypeId) -> Self {
        Self::Archetype(value)
    }
}

/// Resolved, symmetric win probabilities for a fixed metagame.
///
/// Built once and shared read-only by every trial.
#[derive(Debug, Clone)]
pub struct MatchupModel {
    meta: Metagame,
    variant_table: Vec<f64>,
    archetype_table: Vec<f64>,
}

impl MatchupModel {
    /// Resolve a raw matrix against its metagame.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ShapeMismatch` when the matrix was sized for a
    /// different metagame.
    pub fn new(meta: Metagame, matrix: &MatchupMatrix) -> Result<Self, ConfigError> {
        let variants = meta.variant_count();
        if matrix.variants != variants {
            return Err(ConfigError::ShapeMismatch {
                field: "matchup matrix",
                expected: variants,
                actual: matrix.variants,
            });
        }
        let mut variant_table = vec![UNKNOWN_MATCHUP; variants * variants];
        for a in 0..variants {
            for b in 0..variants {
                let ab = matrix.cells[matrix.cell(a, b)];
                let ba = matrix.cells[matrix.cell(b, a)];
                variant_table[a * variants + b] = resolve(ab, ba);
            }
        }
        let mut model = Self {
            meta,
            variant_table,
            archetype_table: Vec::new(),
        };
        let archetypes = model.meta.len();
        let mut archetype_table = Vec::with_capacity(archetypes * archetypes);
        for a in model.meta.archetype_ids() {
            for b in model.meta.archetype_ids() {
                archetype_table.push(model.weighted(Selector::Archetype(a), Selector::Archetype(b)));
            }
        }
        model.archetype_table = archetype_table;
        Ok(model)
    }

    /// Model with every matchup unknown, so every probability is one half.
    #[must_use]
    pub fn even(meta: Metagame) -> Self {
        let variants = meta.variant_count();
        let archetypes = meta.len();
        Self {
            meta,
            variant_table: vec![UNKNOWN_MATCHUP; variants * variants],
            archetype_table: vec![UNKNOWN_MATCHUP; archetypes * archetypes],
        }
    }

    #[must_use]
    pub const fn metagame(&self) -> &Metagame {
        &self.meta
    }

    /// Probability that `a` beats `b`.
    ///
    /// Always satisfies `get_matchup(a, b) + get_matchup(b, a) == 1`.
    #[must_use]
    pub fn get_matchup(&self, a: impl Into<Selector>, b: impl Into<Selector>) -> f64 {
        match (a.into(), b.into()) {
            (Selector::Variant(a), Selector::Variant(b)) => self.concrete(a, b),
            (Selector::Archetype(a), Selector::Archetype(b)) => self.archetype_matchup(a, b),
            (a, b) => self.weighted(a, b),
        }
    }

    /// Archetype-level probability from the precomputed table.
    #[must_use]
    pub fn archetype_matchup(&self, a: ArchetypeId, b: ArchetypeId) -> f64 {
        self.archetype_table[a.index() * self.meta.len() + b.index()]
    }

    /// Dense archetype-level table, `rows[i][j]` = P(i beats j).
    #[must_use]
    pub fn archetype_table(&self) -> Vec<Vec<f64>> {
        let n = self.meta.len();
        self.archetype_table
            .chunks(n.max(1))
            .take(n)
            .map(<[f64]>::to_vec)
            .collect()
    }

    /// Probability that a deck drawn from `left` beats one drawn from `right`.
    ///
    /// Each member is weighted by its popularity within its own group; a group
    /// whose members all have zero weight is weighted uniformly. An empty
    /// group yields an even matchup.
    #[must_use]
    pub fn aggregate(&self, left: &[Selector], right: &[Selector]) -> f64 {
        if left.is_empty() || right.is_empty() {
            return UNKNOWN_MATCHUP;
        }
        let left = self.group_shares(left);
        let right = self.group_shares(right);
        left.iter()
            .flat_map(|(a, pa)| right.iter().map(move |(b, pb)| (*a, *b, pa * pb)))
            .map(|(a, b, w)| w * self.weighted(a, b))
            .sum()
    }

    fn group_shares(&self, group: &[Selector]) -> Vec<(Selector, f64)> {
        let weight = |selector: &Selector| match *selector {
            Selector::Variant(v) => self.meta.variant_weight(v),
            Selector::Archetype(id) => self.meta.weight(id),
        };
        let total: f64 = group.iter().map(weight).sum();
        if total > 0.0 {
            group.iter().map(|s| (*s, weight(s) / total)).collect()
        } else {
            let uniform = 1.0 / count_to_f64(group.len());
            group.iter().map(|s| (*s, uniform)).collect()
        }
    }

    fn concrete(&self, a: Variant, b: Variant) -> f64 {
        let n = self.meta.variant_count();
        self.variant_table[self.meta.variant_index(a) * n + self.meta.variant_index(b)]
    }

    fn expand(&self, selector: Selector) -> Vec<(Variant, f64)> {
        match selector {
            Selector::Variant(v) => vec![(v, 1.0)],
            Selector::Archetype(id) => self
                .meta
                .subarchetypes(id)
                .map(|v| (v, self.meta.sub_share(v)))
                .collect(),
        }
    }

    fn weighted(&self, a: Selector, b: Selector) -> f64 {
        let left = self.expand(a);
        let right = self.expand(b);
        left.iter()
            .flat_map(|(va, wa)| right.iter().map(move |(vb, wb)| (*va, *vb, wa * wb)))
            .map(|(va, vb, w)| w * self.concrete(va, vb))
            .sum()
    }
}

/// Summary of a model suitable for reports.
#[derive(Debug, Clone, Serialize)]
pub struct MatchupSummary {
    pub archetypes: Vec<String>,
    pub table: Vec<Vec<f64>>,
}

impl From<&MatchupModel> for MatchupSummary {
    fn from(model: &MatchupModel) -> Self {
        Self {
            archetypes: model
                .meta
                .archetype_ids()
                .map(|id| model.meta.name(id).to_string())
                .collect(),
            table: model.archetype_table(),
        }
    }
}

fn resolve(ab: Option<f64>, ba: Option<f64>) -> f64 {
    match (ab, ba) {
        (Some(ab), Some(ba)) => (ab + (1.0 - ba)) / 2.0,
        (Some(ab), None) => ab,
        (None, Some(ba)) => 1.0 - ba,
        (None, None) => UNKNOWN_MATCHUP,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abc() -> (Metagame, MatchupMatrix) {
        let meta = Metagame::builder()
            .archetype("A", 10.0)
            .subarchetype("C", "y", 8.0)
            .subarchetype("C", "x", 4.0)
            .archetype("B", 12.0)
            .build()
            .expect("metagame");
        let mut matrix = MatchupMatrix::for_metagame(&meta);
        matrix
            .set_by_name(&meta, ("A", ""), ("C", "y"), 0.55)
            .expect("A/Cy");
        matrix
            .set_by_name(&meta, ("A", ""), ("C", "x"), 0.3)
            .expect("A/Cx");
        matrix
            .set_by_name(&meta, ("A", ""), ("B", ""), 0.6)
            .expect("A/B");
        (meta, matrix)
    }

    #[test]
    fn missing_entries_default_to_even() {
        let (meta, matrix) = abc();
        let model = MatchupModel::new(meta, &matrix).expect("model");
        let meta = model.metagame();
        let b = meta.variant("B", "").expect("B");
        let cy = meta.variant("C", "y").expect("C/y");
        assert!((model.get_matchup(b, cy) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn asymmetric_entries_are_averaged() {
        let meta = Metagame::from_shares(&["A", "B"], &[0.5, 0.5]).expect("meta");
        let mut matrix = MatchupMatrix::for_metagame(&meta);
        let a = meta.variant("A", "").expect("A");
        let b = meta.variant("B", "").expect("B");
        matrix.set(&meta, a, b, 0.7).expect("a/b");
        matrix.set(&meta, b, a, 0.5).expect("b/a");
        let model = MatchupModel::new(meta, &matrix).expect("model");
        assert!((model.get_matchup(a, b) - 0.6).abs() < 1e-12);
        assert!((model.get_matchup(b, a) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn unspecified_sub_uses_popularity_weights() {
        let (meta, matrix) = abc();
        let model = MatchupModel::new(meta, &matrix).expect("model");
        let meta = model.metagame();
        let a = meta.variant("A", "").expect("A");
        let c = meta.archetype("C").expect("C");
        let expected = (8.0 / 12.0) * 0.55 + (4.0 / 12.0) * 0.3;
        assert!((model.get_matchup(a, c) - expected).abs() < 1e-12);
        assert!((model.get_matchup(c, a) - (1.0 - expected)).abs() < 1e-12);
        let a_id = meta.archetype("A").expect("A");
        assert!((model.get_matchup(a_id, c) - expected).abs() < 1e-12);
        assert!((model.archetype_table()[a_id.index()][c.index()] - expected).abs() < 1e-12);
    }

    #[test]
    fn group_matchups_weight_members_by_local_popularity() {
        let (meta, matrix) = abc();
        let model = MatchupModel::new(meta, &matrix).expect("model");
        let meta = model.metagame();
        let a = meta.archetype("A").expect("A");
        let b = meta.archetype("B").expect("B");
        let cx = meta.variant("C", "x").expect("Cx");
        let cy = meta.variant("C", "y").expect("Cy");

        let left = [Selector::Archetype(a), Selector::Archetype(b)];
        let right = [Selector::Variant(cx), Selector::Variant(cy)];
        // A and B weigh 10 and 12; Cx and Cy weigh 4 and 8.
        let expected = (10.0 / 22.0) * (4.0 / 12.0) * 0.3
            + (10.0 / 22.0) * (8.0 / 12.0) * 0.55
            + (12.0 / 22.0) * 0.5;
        let forward = model.aggregate(&left, &right);
        assert!((forward - expected).abs() < 1e-12);
        assert!((forward + model.aggregate(&right, &left) - 1.0).abs() < 1e-12);

        let single = model.aggregate(&[Selector::Archetype(a)], &[Selector::Archetype(b)]);
        assert!((single - model.get_matchup(a, b)).abs() < 1e-12);
        assert!((model.aggregate(&[], &right) - UNKNOWN_MATCHUP).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_invalid_probabilities_and_names() {
        let (meta, mut matrix) = abc();
        let a = meta.variant("A", "").expect("A");
        assert!(matches!(
            matrix.set(&meta, a, a, 1.5),
            Err(ConfigError::InvalidProbability { .. })
        ));
        assert!(matches!(
            matrix.set_by_name(&meta, ("A", ""), ("D", ""), 0.5),
            Err(ConfigError::UnknownArchetype { .. })
        ));
    }

    #[test]
    fn table_and_dense_constructors_resolve_names() {
        let meta = Metagame::from_shares(&["A", "B"], &[0.5, 0.5]).expect("meta");
        let dense = MatchupMatrix::from_dense(&meta, &[vec![0.5, 0.65], vec![0.35, 0.5]])
            .expect("dense");
        let mut table = MatchupTable::new();
        table
            .entry("A".into())
            .or_default()
            .entry(String::new())
            .or_default()
            .entry("B".into())
            .or_default()
            .insert(String::new(), 0.65);
        let sparse = MatchupMatrix::from_table(&meta, &table).expect("table");
        let dense_model = MatchupModel::new(meta.clone(), &dense).expect("dense model");
        let sparse_model = MatchupModel::new(meta.clone(), &sparse).expect("sparse model");
        let a = meta.archetype("A").expect("A");
        let b = meta.archetype("B").expect("B");
        assert!((dense_model.get_matchup(a, b) - sparse_model.get_matchup(a, b)).abs() < 1e-12);
        assert!(matches!(
            MatchupMatrix::from_dense(&meta, &[vec![0.5]]),
            Err(ConfigError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn model_rejects_matrix_from_other_metagame() {
        let (meta, _) = abc();
        let other = Metagame::from_shares(&["A"], &[1.0]).expect("other");
        let matrix = MatchupMatrix::for_metagame(&other);
        assert!(matches!(
            MatchupModel::new(meta, &matrix),
            Err(ConfigError::ShapeMismatch { .. })
        ));
    }
}
