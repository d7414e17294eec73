//! Recipe state, resume reconciliation and checkpoint requests

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// File name of the persisted recipe state inside the output directory
pub const RECIPE_STATE_FILE: &str = "recipe_state.json";

/// Progress needed to resume training at an epoch boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeState {
    pub seed: u64,
    pub epochs_run: usize,
    pub total_epochs: usize,
    pub max_steps_per_epoch: Option<usize>,
}

impl RecipeState {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).with_context(|| {
            format!(
                "Recipe state not found at {:?}. Are you sure the output directory holds an intermediate checkpoint?",
                path
            )
        })?;
        serde_json::from_str(&content)
            .with_context(|| format!("Recipe state {:?} is missing required keys", path))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write recipe state to {:?}", path))
    }

    /// Adopt a checkpoint's progress into the state built from config
    ///
    /// `epochs_run` always comes from the checkpoint. A different seed or
    /// `max_steps_per_epoch` takes the checkpoint value; a different
    /// `total_epochs` keeps the config value. Both cases are logged.
    pub fn reconcile(&mut self, checkpoint: &RecipeState) {
        self.epochs_run = checkpoint.epochs_run;

        if self.seed != checkpoint.seed {
            tracing::warn!(
                config = self.seed,
                checkpoint = checkpoint.seed,
                "Config value for seed does not match the checkpoint value, using the checkpoint value"
            );
            self.seed = checkpoint.seed;
        }

        if self.max_steps_per_epoch != checkpoint.max_steps_per_epoch {
            tracing::warn!(
                config = ?self.max_steps_per_epoch,
                checkpoint = ?checkpoint.max_steps_per_epoch,
                "Config value for max_steps_per_epoch does not match the checkpoint value, using the checkpoint value"
            );
            self.max_steps_per_epoch = checkpoint.max_steps_per_epoch;
        }

        if self.total_epochs != checkpoint.total_epochs {
            tracing::warn!(
                config = self.total_epochs,
                checkpoint = checkpoint.total_epochs,
                "Config value for total_epochs does not match the checkpoint value, using the config value"
            );
        }
    }
}

/// PEFT-style description of the trained adapters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterConfig {
    pub r: usize,
    pub lora_alpha: f32,
    pub target_modules: Vec<String>,
    pub peft_type: String,
}

/// Names of the modules that carry LoRA adapters
///
/// Attention projections as given, then `w1`, `w2`, `w3` for the MLP and
/// `output` for the final projection when enabled.
pub fn lora_module_names(
    attn_modules: &[String],
    apply_lora_to_mlp: bool,
    apply_lora_to_output: bool,
) -> Vec<String> {
    let mut names = attn_modules.to_vec();
    if apply_lora_to_mlp {
        names.extend(["w1", "w2", "w3"].map(String::from));
    }
    if apply_lora_to_output {
        names.push("output".to_string());
    }
    names
}

/// What the backend should persist at the end of an epoch
#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointRequest {
    pub epoch: usize,
    /// More epochs follow; optimizer state should be kept
    pub intermediate: bool,
    /// Skip merging adapters into the base weights
    pub adapter_only: bool,
    /// Present only for intermediate checkpoints
    pub recipe_state: Option<RecipeState>,
    pub adapter_config: AdapterConfig,
}
