//! Curation configuration
//!
//! Describes the two source pools and the list of mixes to build from them,
//! loaded from a JSON file.

use crate::io::{load_preference_examples, write_preference_examples};
use crate::mixer::{mix_pools, DisjointPolicy, MixOptions, MixRatio};
use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One mix to produce from the two pools
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MixPlan {
    /// Human-readable label used in logs
    pub name: String,
    /// Fraction of the right pool to sample
    pub right_fraction: f64,
    /// Fraction of the left pool to sample
    pub left_fraction: f64,
    /// Output JSON path
    pub output: PathBuf,
}

impl MixPlan {
    pub fn ratio(&self) -> MixRatio {
        MixRatio::new(self.right_fraction, self.left_fraction)
    }
}

/// Complete curation configuration loaded from file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurationConfig {
    /// Right-leaning preference examples (JSON array or JSONL)
    pub right: PathBuf,
    /// Left-leaning preference examples (JSON array or JSONL)
    pub left: PathBuf,
    /// Seed for every mix; each mix restarts from this seed
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Fail instead of warning when the pools share prompts
    #[serde(default)]
    pub require_disjoint: bool,
    /// Mixes to build
    pub mixes: Vec<MixPlan>,
}

fn default_seed() -> u64 {
    42
}

/// Summary of one produced mix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixOutcome {
    pub name: String,
    pub from_right: usize,
    pub from_left: usize,
    pub output: PathBuf,
}

impl MixOutcome {
    pub fn total(&self) -> usize {
        self.from_right + self.from_left
    }
}

impl CurationConfig {
    /// Load configuration from JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: CurationConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        Ok(config)
    }

    /// The three standard mixes (75/25, 25/75, 50/50) over `right` and `left`
    pub fn standard(right: PathBuf, left: PathBuf, output_dir: &Path) -> Self {
        let mixes = [(0.75, 0.25), (0.25, 0.75), (0.5, 0.5)]
            .into_iter()
            .map(|(r, l)| {
                let name = format!("right{}_left{}", percent(r), percent(l));
                MixPlan {
                    output: output_dir.join(format!("{}.json", name)),
                    name,
                    right_fraction: r,
                    left_fraction: l,
                }
            })
            .collect();

        Self {
            right,
            left,
            seed: default_seed(),
            require_disjoint: false,
            mixes,
        }
    }

    pub fn mix_options(&self) -> MixOptions {
        MixOptions {
            disjoint: if self.require_disjoint {
                DisjointPolicy::Enforce
            } else {
                DisjointPolicy::Warn
            },
        }
    }

    /// Load both pools once and write every configured mix
    ///
    /// Relative output paths are resolved against the working directory.
    pub fn run(&self) -> Result<Vec<MixOutcome>> {
        let right = load_preference_examples(&self.right)
            .with_context(|| format!("Failed to load right pool: {:?}", self.right))?;
        let left = load_preference_examples(&self.left)
            .with_context(|| format!("Failed to load left pool: {:?}", self.left))?;
        tracing::info!(right = right.len(), left = left.len(), "loaded pools");

        let mut outcomes = Vec::with_capacity(self.mixes.len());
        for plan in &self.mixes {
            let (from_right, from_left) = plan.ratio().sample_sizes(right.len(), left.len())?;

            let mut rng = StdRng::seed_from_u64(self.seed);
            let mixed = mix_pools(&right, &left, plan.ratio(), self.mix_options(), &mut rng)
                .with_context(|| format!("Failed to build mix {}", plan.name))?;
            write_preference_examples(&plan.output, &mixed)?;

            tracing::info!(
                mix = %plan.name,
                from_right,
                from_left,
                output = %plan.output.display(),
                "wrote mix"
            );
            outcomes.push(MixOutcome {
                name: plan.name.clone(),
                from_right,
                from_left,
                output: plan.output.clone(),
            });
        }

        Ok(outcomes)
    }
}

fn percent(fraction: f64) -> u32 {
    (fraction * 100.0).round() as u32
}
