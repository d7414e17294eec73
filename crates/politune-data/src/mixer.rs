//! Weighted mixing of two preference pools
//!
//! A mix draws `floor(|right| * r)` examples without replacement from the
//! right pool and `floor(|left| * l)` from the left pool, concatenates them
//! and shuffles the result. All randomness comes from the caller's RNG, so a
//! fixed seed reproduces the same mix.

use crate::example::{ExampleError, PreferenceExample};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Errors that can occur while mixing pools
#[derive(Debug, Error, PartialEq)]
pub enum MixError {
    #[error("fraction {fraction} for the {pool} pool is outside [0, 1]")]
    OutOfRange { pool: &'static str, fraction: f64 },
    #[error("invalid example {index} in the {pool} pool: {source}")]
    InvalidExample {
        pool: &'static str,
        index: usize,
        source: ExampleError,
    },
    #[error("pools share {count} prompts; first: {first:?}")]
    Overlap { count: usize, first: String },
}

/// Independent sampling fractions for the right and left pools
///
/// The fractions need not sum to one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MixRatio {
    pub right: f64,
    pub left: f64,
}

impl MixRatio {
    pub fn new(right: f64, left: f64) -> Self {
        Self { right, left }
    }

    /// Number of examples the mix takes from each pool, `(right, left)`
    pub fn sample_sizes(
        &self,
        right_len: usize,
        left_len: usize,
    ) -> Result<(usize, usize), MixError> {
        Ok((
            sample_size("right", right_len, self.right)?,
            sample_size("left", left_len, self.left)?,
        ))
    }
}

/// How to treat prompts that appear in both pools
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisjointPolicy {
    /// Log the overlap and mix anyway
    #[default]
    Warn,
    /// Refuse to mix overlapping pools
    Enforce,
}

/// Options for [`mix_pools`]
#[derive(Debug, Clone, Copy, Default)]
pub struct MixOptions {
    pub disjoint: DisjointPolicy,
}

/// Number of elements a fraction selects from a pool of `len`
///
/// The fraction must lie in `[0, 1]`, whatever the pool size.
pub fn sample_size(pool: &'static str, len: usize, fraction: f64) -> Result<usize, MixError> {
    if !(0.0..=1.0).contains(&fraction) {
        return Err(MixError::OutOfRange { pool, fraction });
    }

    Ok(((len as f64 * fraction).floor() as usize).min(len))
}

/// Draw `floor(|pool| * fraction)` elements without replacement
pub fn sample_fraction<T: Clone, R: Rng + ?Sized>(
    pool_name: &'static str,
    pool: &[T],
    fraction: f64,
    rng: &mut R,
) -> Result<Vec<T>, MixError> {
    let amount = sample_size(pool_name, pool.len(), fraction)?;
    Ok(pool.choose_multiple(rng, amount).cloned().collect())
}

/// Shuffle in place with the caller's RNG
pub fn shuffle<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    items.shuffle(rng);
}

/// Sample both pools at `ratio`, concatenate and shuffle
///
/// The right sample is drawn first, then the left sample, then the
/// concatenation is shuffled, all from the same RNG stream.
pub fn mix<T: Clone, R: Rng + ?Sized>(
    right: &[T],
    left: &[T],
    ratio: MixRatio,
    rng: &mut R,
) -> Result<Vec<T>, MixError> {
    let mut mixed = sample_fraction("right", right, ratio.right, rng)?;
    let from_right = mixed.len();
    mixed.extend(sample_fraction("left", left, ratio.left, rng)?);

    tracing::debug!(
        from_right,
        from_left = mixed.len() - from_right,
        "sampled pools"
    );

    shuffle(&mut mixed, rng);
    Ok(mixed)
}

/// Prompts that appear in both pools, in right-pool order without repeats
pub fn find_overlap(right: &[PreferenceExample], left: &[PreferenceExample]) -> Vec<String> {
    let left_prompts: HashSet<&str> = left.iter().filter_map(|e| e.prompt()).collect();
    let mut seen = HashSet::new();

    right
        .iter()
        .filter_map(|e| e.prompt())
        .filter(|p| left_prompts.contains(p) && seen.insert(*p))
        .map(str::to_string)
        .collect()
}

/// Check that every example in `pool` keeps the shared-prompt layout
pub fn validate_pool(pool_name: &'static str, pool: &[PreferenceExample]) -> Result<(), MixError> {
    for (index, example) in pool.iter().enumerate() {
        example
            .validate()
            .map_err(|source| MixError::InvalidExample {
                pool: pool_name,
                index,
                source,
            })?;
    }
    Ok(())
}

/// Validate both pools, check disjointness according to `options`, then [`mix`]
pub fn mix_pools<R: Rng + ?Sized>(
    right: &[PreferenceExample],
    left: &[PreferenceExample],
    ratio: MixRatio,
    options: MixOptions,
    rng: &mut R,
) -> Result<Vec<PreferenceExample>, MixError> {
    validate_pool("right", right)?;
    validate_pool("left", left)?;

    let overlap = find_overlap(right, left);
    if let Some(first) = overlap.first() {
        match options.disjoint {
            DisjointPolicy::Warn => {
                tracing::warn!(
                    shared_prompts = overlap.len(),
                    first = %first,
                    "right and left pools share prompts"
                );
            }
            DisjointPolicy::Enforce => {
                return Err(MixError::Overlap {
                    count: overlap.len(),
                    first: first.clone(),
                });
            }
        }
    }

    mix(right, left, ratio, rng)
}
