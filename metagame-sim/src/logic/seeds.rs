use anyhow::{Result, bail};
use metagame_core::parse_seed;

/// Split a comma-separated CLI list, dropping blanks.
pub fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

/// Resolve CLI seed tokens into batch seeds.
///
/// Accepts decimal (negatives fold to their magnitude), `0x` hex, or any
/// other text, which is hashed. Duplicates are dropped in order.
pub fn resolve_seed_inputs(tokens: &[String]) -> Result<Vec<u64>> {
    let mut seeds = Vec::with_capacity(tokens.len());
    for token in tokens {
        let Some(seed) = parse_seed(token) else {
            continue;
        };
        if !seeds.contains(&seed) {
            seeds.push(seed);
        }
    }
    if seeds.is_empty() {
        bail!("no usable seeds in {tokens:?}");
    }
    Ok(seeds)
}

/// Parse a comma-separated list of positive cutoffs.
pub fn parse_cutoffs(s: &str) -> Result<Vec<u32>> {
    split_csv(s)
        .iter()
        .map(|token| match token.parse::<u32>() {
            Ok(value) if value > 0 => Ok(value),
            _ => bail!("cutoff `{token}` must be a positive integer"),
        })
        .collect()
}
