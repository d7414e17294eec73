//! Seam to the training backend

use crate::loss::LogProbGradients;
use crate::state::CheckpointRequest;
use anyhow::Result;
use politune_data::PreferenceExample;
use politune_eval::TextGenerator;

/// Summed sequence log-probs for a batch of preference pairs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicyOutput {
    /// log π(chosen | prompt), one entry per pair
    pub chosen_log_probs: Vec<f32>,
    /// log π(rejected | prompt), one entry per pair
    pub rejected_log_probs: Vec<f32>,
    /// Mean logit over the chosen sequences (logged only)
    pub chosen_logits_mean: f32,
    /// Mean logit over the rejected sequences (logged only)
    pub rejected_logits_mean: f32,
    /// Tokens in the concatenated chosen + rejected batch
    pub num_tokens: usize,
}

/// A LoRA-adapted causal LM that can be trained on preference pairs
///
/// The backend owns tokenization, collation, autograd, the optimizer, the
/// learning-rate schedule and checkpoint I/O. The recipe only sequences
/// calls into it.
pub trait PreferencePolicy: TextGenerator {
    /// Forward pass with the adapters enabled, recording gradients
    fn forward(&mut self, batch: &[PreferenceExample]) -> Result<PolicyOutput>;

    /// Forward pass with the adapters disabled and no gradient tracking
    fn reference_forward(&mut self, batch: &[PreferenceExample]) -> Result<PolicyOutput>;

    /// Backpropagate the given log-prob gradients from the last `forward`
    fn backward(&mut self, gradients: &LogProbGradients) -> Result<()>;

    /// Apply accumulated gradients, clear them and advance the LR schedule
    fn optimizer_step(&mut self) -> Result<()>;

    /// Current learning rate
    fn learning_rate(&self) -> f32;

    /// Persist adapter (and optionally merged) weights for an epoch
    fn save_checkpoint(&mut self, request: &CheckpointRequest) -> Result<()>;
}
