//! Archetype registry with interned handles and popularity weights.
//!
//! Every archetype owns at least one subarchetype. An archetype declared
//! without subarchetypes receives the unnamed subarchetype `""`, which is how
//! "no subarchetype" is spelled throughout the engine.
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::config::ConfigError;
use crate::numbers::count_to_f64;

/// Name of the implicit subarchetype used when an archetype has no split.
pub const NO_SUBARCHETYPE: &str = "";

/// Popularity weights keyed by archetype then subarchetype name.
pub type PopularityTable = BTreeMap<String, BTreeMap<String, f64>>;

/// Interned archetype handle, an index into the owning [`Metagame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArchetypeId(u16);

impl ArchetypeId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Subarchetype handle, local to its archetype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubarchetypeId(u16);

impl SubarchetypeId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// A concrete (archetype, subarchetype) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Variant {
    pub archetype: ArchetypeId,
    pub sub: SubarchetypeId,
}

#[derive(Debug, Clone)]
struct ArchetypeEntry {
    name: String,
    weight: f64,
    first_variant: usize,
    sub_count: usize,
}

#[derive(Debug, Clone)]
struct VariantEntry {
    archetype: ArchetypeId,
    sub_name: String,
    weight: f64,
}

/// Immutable set of archetypes, subarchetypes, and their popularity.
#[derive(Debug, Clone, Default)]
pub struct Metagame {
    archetypes: Vec<ArchetypeEntry>,
    variants: Vec<VariantEntry>,
    by_name: HashMap<String, ArchetypeId>,
    total: f64,
}

/// Collects archetype declarations before interning them.
#[derive(Debug, Clone, Default)]
pub struct MetagameBuilder {
    entries: Vec<(String, Vec<(String, f64)>)>,
}

impl MetagameBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an archetype without subarchetypes.
    #[must_use]
    pub fn archetype(self, name: impl Into<String>, weight: f64) -> Self {
        self.subarchetype(name, NO_SUBARCHETYPE, weight)
    }

    /// Declare a subarchetype, creating its archetype on first mention.
    #[must_use]
    pub fn subarchetype(mut self, archetype: impl Into<String>, sub: impl Into<String>, weight: f64) -> Self {
        let archetype = archetype.into();
        let sub = sub.into();
        if let Some((_, subs)) = self.entries.iter_mut().find(|(name, _)| *name == archetype) {
            subs.push((sub, weight));
        } else {
            self.entries.push((archetype, vec![(sub, weight)]));
        }
        self
    }

    /// Intern the declared archetypes.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for negative or non-finite weights, duplicate
    /// subarchetypes, or more archetypes than a handle can address.
    pub fn build(self) -> Result<Metagame, ConfigError> {
        if self.entries.len() > usize::from(u16::MAX) {
            return Err(ConfigError::TooManyArchetypes {
                count: self.entries.len(),
            });
        }
        let mut meta = Metagame::default();
        for (index, (name, subs)) in self.entries.into_iter().enumerate() {
            if subs.len() > usize::from(u16::MAX) {
                return Err(ConfigError::TooManyArchetypes { count: subs.len() });
            }
            let id = ArchetypeId(u16::try_from(index).unwrap_or(u16::MAX));
            let first_variant = meta.variants.len();
            let mut weight = 0.0;
            for (sub_name, sub_weight) in subs {
                if !sub_weight.is_finite() || sub_weight < 0.0 {
                    return Err(ConfigError::InvalidWeight {
                        name: label_parts(&name, &sub_name),
                        value: sub_weight,
                    });
                }
                if meta.variants[first_variant..]
                    .iter()
                    .any(|entry| entry.sub_name == sub_name)
                {
                    return Err(ConfigError::DuplicateVariant {
                        archetype: name,
                        sub: sub_name,
                    });
                }
                weight += sub_weight;
                meta.variants.push(VariantEntry {
                    archetype: id,
                    sub_name,
                    weight: sub_weight,
                });
            }
            let sub_count = meta.variants.len() - first_variant;
            meta.total += weight;
            meta.by_name.insert(name.clone(), id);
            meta.archetypes.push(ArchetypeEntry {
                name,
                weight,
                first_variant,
                sub_count,
            });
        }
        Ok(meta)
    }
}

impl Metagame {
    #[must_use]
    pub fn builder() -> MetagameBuilder {
        MetagameBuilder::new()
    }

    /// Build from nested `{archetype: {sub: weight}}` popularity data.
    ///
    /// # Errors
    ///
    /// Propagates builder validation failures.
    pub fn from_table(table: &PopularityTable) -> Result<Self, ConfigError> {
        let mut builder = MetagameBuilder::new();
        for (name, subs) in table {
            if subs.is_empty() {
                builder = builder.archetype(name.clone(), 0.0);
            }
            for (sub, weight) in subs {
                builder = builder.subarchetype(name.clone(), sub.clone(), *weight);
            }
        }
        builder.build()
    }

    /// Build from parallel name/share lists without subarchetypes.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ShapeMismatch` when the lists differ in length.
    pub fn from_shares<S: AsRef<str>>(names: &[S], shares: &[f64]) -> Result<Self, ConfigError> {
        if names.len() != shares.len() {
            return Err(ConfigError::ShapeMismatch {
                field: "shares",
                expected: names.len(),
                actual: shares.len(),
            });
        }
        names
            .iter()
            .zip(shares)
            .fold(MetagameBuilder::new(), |builder, (name, share)| {
                builder.archetype(name.as_ref(), *share)
            })
            .build()
    }

    /// Number of archetypes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.archetypes.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.archetypes.is_empty()
    }

    /// Number of concrete (archetype, subarchetype) pairs.
    #[must_use]
    pub const fn variant_count(&self) -> usize {
        self.variants.len()
    }

    /// Sum of all weights as declared.
    #[must_use]
    pub const fn total_weight(&self) -> f64 {
        self.total
    }

    pub fn archetype_ids(&self) -> impl Iterator<Item = ArchetypeId> + '_ {
        self.archetypes
            .iter()
            .enumerate()
            .map(|(index, _)| ArchetypeId(u16::try_from(index).unwrap_or(u16::MAX)))
    }

    /// All concrete variants in interning order.
    pub fn variants(&self) -> impl Iterator<Item = Variant> + '_ {
        (0..self.variants.len()).map(|index| self.variant_at(index))
    }

    /// Concrete variants belonging to one archetype.
    pub fn subarchetypes(&self, id: ArchetypeId) -> impl Iterator<Item = Variant> + '_ {
        let entry = &self.archetypes[id.index()];
        (0..entry.sub_count).map(move |sub| Variant {
            archetype: id,
            sub: SubarchetypeId(u16::try_from(sub).unwrap_or(u16::MAX)),
        })
    }

    /// Look up an archetype by display name.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownArchetype` when the name was never declared.
    pub fn archetype(&self, name: &str) -> Result<ArchetypeId, ConfigError> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| ConfigError::UnknownArchetype {
                name: name.to_string(),
            })
    }

    /// Look up a concrete variant by archetype and subarchetype names.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when either name is unknown.
    pub fn variant(&self, archetype: &str, sub: &str) -> Result<Variant, ConfigError> {
        let id = self.archetype(archetype)?;
        self.subarchetypes(id)
            .find(|variant| self.sub_name(*variant) == sub)
            .ok_or_else(|| ConfigError::UnknownSubarchetype {
                archetype: archetype.to_string(),
                sub: sub.to_string(),
            })
    }

    #[must_use]
    pub fn name(&self, id: ArchetypeId) -> &str {
        &self.archetypes[id.index()].name
    }

    #[must_use]
    pub fn sub_name(&self, variant: Variant) -> &str {
        &self.variants[self.variant_index(variant)].sub_name
    }

    /// Human-readable label, `"Name"` or `"Name (sub)"`.
    #[must_use]
    pub fn label(&self, variant: Variant) -> String {
        label_parts(self.name(variant.archetype), self.sub_name(variant))
    }

    /// Dense index of a concrete variant, stable for the life of the metagame.
    #[must_use]
    pub fn variant_index(&self, variant: Variant) -> usize {
        self.archetypes[variant.archetype.index()].first_variant + variant.sub.index()
    }

    #[must_use]
    pub fn variant_at(&self, index: usize) -> Variant {
        let archetype = self.variants[index].archetype;
        let first = self.archetypes[archetype.index()].first_variant;
        Variant {
            archetype,
            sub: SubarchetypeId(u16::try_from(index - first).unwrap_or(u16::MAX)),
        }
    }

    #[must_use]
    pub fn weight(&self, id: ArchetypeId) -> f64 {
        self.archetypes[id.index()].weight
    }

    #[must_use]
    pub fn variant_weight(&self, variant: Variant) -> f64 {
        self.variants[self.variant_index(variant)].weight
    }

    /// Archetype share of the whole field, uniform when every weight is zero.
    #[must_use]
    pub fn share(&self, id: ArchetypeId) -> f64 {
        if self.total > 0.0 {
            self.weight(id) / self.total
        } else {
            1.0 / count_to_f64(self.archetypes.len())
        }
    }

    /// Subarchetype share within its own archetype.
    #[must_use]
    pub fn sub_share(&self, variant: Variant) -> f64 {
        let entry = &self.archetypes[variant.archetype.index()];
        if entry.weight > 0.0 {
            self.variant_weight(variant) / entry.weight
        } else {
            1.0 / count_to_f64(entry.sub_count)
        }
    }

    /// Variant share of the whole field.
    #[must_use]
    pub fn variant_share(&self, variant: Variant) -> f64 {
        self.share(variant.archetype) * self.sub_share(variant)
    }
}

fn label_parts(name: &str, sub: &str) -> String {
    if sub.is_empty() {
        name.to_string()
    } else {
        format!("{name} ({sub})")
    }
}

impl fmt::Display for ArchetypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
