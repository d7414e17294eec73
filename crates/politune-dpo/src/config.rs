//! Recipe configuration
//!
//! Hyperparameters for LoRA-DPO training with in-loop evaluation, loaded
//! from a JSON file.

use crate::loss::PreferenceLoss;
use crate::state::{lora_module_names, AdapterConfig, RecipeState};
use anyhow::{bail, Context, Result};
use politune_eval::hook::DEFAULT_EVAL_FREQ;
use politune_eval::GenerationParams;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Training precision requested from the backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dtype {
    #[default]
    Bf16,
    Fp32,
    /// Rejected by [`RecipeConfig::validate`]; the recipe has no gradient scaling
    Fp16,
}

/// LoRA adapter placement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoraSettings {
    /// Adapter rank
    pub rank: usize,
    /// Adapter scaling numerator
    pub alpha: f32,
    /// Attention projections that get adapters
    pub attn_modules: Vec<String>,
    #[serde(default)]
    pub apply_lora_to_mlp: bool,
    #[serde(default)]
    pub apply_lora_to_output: bool,
}

impl LoraSettings {
    pub fn adapter_config(&self) -> AdapterConfig {
        AdapterConfig {
            r: self.rank,
            lora_alpha: self.alpha,
            target_modules: lora_module_names(
                &self.attn_modules,
                self.apply_lora_to_mlp,
                self.apply_lora_to_output,
            ),
            peft_type: "LORA".to_string(),
        }
    }
}

/// In-loop evaluation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalSettings {
    /// Political-compass questions, one per line
    pub pc_questions_file: PathBuf,
    /// Batches between evaluations
    #[serde(default = "default_eval_freq")]
    pub eval_freq: usize,
    #[serde(default)]
    pub generation: GenerationParams,
}

fn default_eval_freq() -> usize {
    DEFAULT_EVAL_FREQ
}

/// Complete recipe configuration loaded from file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeConfig {
    /// Directory for CSVs, metrics and recipe state
    pub output_dir: PathBuf,
    /// Seed for data shuffling
    pub seed: u64,
    /// Number of epochs
    pub epochs: usize,
    /// Cap on optimizer steps per epoch (None = full epoch)
    pub max_steps_per_epoch: Option<usize>,
    /// Preference pairs per batch
    pub batch_size: usize,
    /// Batches per optimizer step
    pub gradient_accumulation_steps: usize,
    /// Optimizer steps between metric logs
    #[serde(default = "default_log_every_n_steps")]
    pub log_every_n_steps: usize,
    /// Reshuffle the data every epoch
    #[serde(default = "default_true")]
    pub shuffle: bool,
    /// Resume from the recipe state in `output_dir`
    #[serde(default)]
    pub resume_from_checkpoint: bool,
    /// Save adapters only, without merged weights
    #[serde(default)]
    pub save_adapter_weights_only: bool,
    #[serde(default)]
    pub dtype: Dtype,
    #[serde(default)]
    pub enable_activation_checkpointing: bool,
    #[serde(default)]
    pub enable_activation_offloading: bool,
    pub lora: LoraSettings,
    #[serde(default)]
    pub loss: PreferenceLoss,
    /// None disables in-loop evaluation
    pub eval: Option<EvalSettings>,
}

fn default_log_every_n_steps() -> usize {
    1
}

fn default_true() -> bool {
    true
}

impl RecipeConfig {
    /// Load configuration from JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: RecipeConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        Ok(config)
    }

    /// Create default configuration
    ///
    /// Matches the single-device Llama-3 8B LoRA-DPO setup: rank 8 / alpha
    /// 16 adapters on `q_proj` and `v_proj`, batch 4 with 8 accumulation
    /// steps, one epoch.
    #[allow(clippy::should_implement_trait)]
    pub fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./output"),
            seed: 0,
            epochs: 1,
            max_steps_per_epoch: Some(1000),
            batch_size: 4,
            gradient_accumulation_steps: 8,
            log_every_n_steps: 1,
            shuffle: true,
            resume_from_checkpoint: false,
            save_adapter_weights_only: false,
            dtype: Dtype::Bf16,
            enable_activation_checkpointing: true,
            enable_activation_offloading: false,
            lora: LoraSettings {
                rank: 8,
                alpha: 16.0,
                attn_modules: vec!["q_proj".to_string(), "v_proj".to_string()],
                apply_lora_to_mlp: false,
                apply_lora_to_output: false,
            },
            loss: PreferenceLoss::default(),
            eval: Some(EvalSettings {
                pc_questions_file: PathBuf::from("./pc_questions.txt"),
                eval_freq: DEFAULT_EVAL_FREQ,
                generation: GenerationParams::default(),
            }),
        }
    }

    /// Reject settings the recipe cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.dtype == Dtype::Fp16 {
            bail!("fp16 precision is not supported in this recipe. Please use fp32 or bf16.");
        }
        if self.enable_activation_offloading && !self.enable_activation_checkpointing {
            bail!(
                "enable_activation_offloading should only be True when enable_activation_checkpointing is True"
            );
        }
        if self.enable_activation_checkpointing && !self.enable_activation_offloading {
            tracing::info!(
                "Hint: enable_activation_checkpointing is True, but enable_activation_offloading isn't. \
                 Enabling activation offloading should reduce memory further."
            );
        }
        if self.batch_size == 0 {
            bail!("batch_size must be positive");
        }
        if self.gradient_accumulation_steps == 0 {
            bail!("gradient_accumulation_steps must be positive");
        }
        if self.log_every_n_steps == 0 {
            bail!("log_every_n_steps must be positive");
        }
        if let Some(eval) = &self.eval {
            if eval.eval_freq == 0 {
                bail!("eval_freq must be positive");
            }
        }
        self.loss.validate()?;
        Ok(())
    }

    /// Recipe state as described by this config, before any resume
    pub fn initial_state(&self) -> RecipeState {
        RecipeState {
            seed: self.seed,
            epochs_run: 0,
            total_epochs: self.epochs,
            max_steps_per_epoch: self.max_steps_per_epoch,
        }
    }
}
