//! LoRA direct preference optimisation for politune
//!
//! This crate sequences a LoRA-DPO fine-tuning run on top of an external
//! training backend ([`PreferencePolicy`]): batching, the preference loss,
//! gradient accumulation, metric logging, epoch checkpoints with resumable
//! recipe state, and the periodic evaluation hook from `politune-eval`.

pub mod batcher;
pub mod config;
pub mod loss;
pub mod metrics;
pub mod policy;
pub mod recipe;
pub mod state;

pub use config::RecipeConfig;
pub use loss::{LogProbGradients, LossError, LossOutput, PreferenceLoss};
pub use policy::{PolicyOutput, PreferencePolicy};
pub use recipe::{LoraDpoRecipe, TrainingSummary};
pub use state::{CheckpointRequest, RecipeState};
