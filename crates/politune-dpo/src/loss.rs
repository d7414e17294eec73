//! Preference losses
//!
//! For each pair the implicit reward margin is
//!
//! ```text
//! logits = (log π(y_c|x) - log π(y_r|x)) - (log π_ref(y_c|x) - log π_ref(y_r|x))
//! ```
//!
//! - DPO: `loss = -logσ(β·logits)·(1-s) - logσ(-β·logits)·s`
//! - RSO: `loss = relu(1 - γ·logits)`
//!
//! Autograd lives in the training backend, so alongside the losses this
//! module returns the gradient of the batch-mean loss with respect to the
//! policy log-probabilities. The reference log-probabilities are constants.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while computing a preference loss
#[derive(Debug, Error, PartialEq)]
pub enum LossError {
    #[error("{name} must be positive, got {value}")]
    NonPositiveScale { name: &'static str, value: f32 },
    #[error("label smoothing must be in [0, 0.5], got {0}")]
    LabelSmoothing(f32),
    #[error("log-prob length mismatch: expected {expected}, got {found}")]
    LengthMismatch { expected: usize, found: usize },
    #[error("cannot compute a loss over an empty batch")]
    EmptyBatch,
}

/// Preference objective and its hyperparameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PreferenceLoss {
    /// Direct Preference Optimization (sigmoid loss)
    Dpo {
        beta: f32,
        #[serde(default)]
        label_smoothing: f32,
    },
    /// Rejection-sampling optimisation (hinge loss)
    Rso { gamma: f32 },
}

impl Default for PreferenceLoss {
    fn default() -> Self {
        PreferenceLoss::Dpo {
            beta: 0.1,
            label_smoothing: 0.0,
        }
    }
}

/// Gradient of the mean loss with respect to the policy log-probs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogProbGradients {
    pub chosen: Vec<f32>,
    pub rejected: Vec<f32>,
}

impl LogProbGradients {
    /// Multiply every entry by `factor` (e.g. `1 / grad_accum`)
    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            chosen: self.chosen.iter().map(|g| g * factor).collect(),
            rejected: self.rejected.iter().map(|g| g * factor).collect(),
        }
    }
}

/// Per-example losses and rewards for one batch
#[derive(Debug, Clone, PartialEq)]
pub struct LossOutput {
    pub losses: Vec<f32>,
    pub chosen_rewards: Vec<f32>,
    pub rejected_rewards: Vec<f32>,
    pub gradients: LogProbGradients,
}

impl LossOutput {
    pub fn mean_loss(&self) -> f32 {
        mean(&self.losses)
    }

    pub fn mean_chosen_reward(&self) -> f32 {
        mean(&self.chosen_rewards)
    }

    pub fn mean_rejected_reward(&self) -> f32 {
        mean(&self.rejected_rewards)
    }

    /// Fraction of pairs whose chosen reward beats the rejected reward
    pub fn reward_accuracy(&self) -> f32 {
        let wins = self
            .chosen_rewards
            .iter()
            .zip(&self.rejected_rewards)
            .filter(|(c, r)| c > r)
            .count();
        wins as f32 / self.chosen_rewards.len().max(1) as f32
    }

    pub fn mean_reward_margin(&self) -> f32 {
        self.mean_chosen_reward() - self.mean_rejected_reward()
    }
}

/// Arithmetic mean; zero for an empty slice
pub fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f32>() / values.len() as f32
    }
}

fn softplus(x: f32) -> f32 {
    x.max(0.0) + (-x.abs()).exp().ln_1p()
}

fn sigmoid(x: f32) -> f32 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

impl PreferenceLoss {
    /// Reward scale (β for DPO, γ for RSO)
    pub fn scale(&self) -> f32 {
        match *self {
            PreferenceLoss::Dpo { beta, .. } => beta,
            PreferenceLoss::Rso { gamma } => gamma,
        }
    }

    pub fn validate(&self) -> Result<(), LossError> {
        match *self {
            PreferenceLoss::Dpo {
                beta,
                label_smoothing,
            } => {
                if beta.is_nan() || beta <= 0.0 {
                    return Err(LossError::NonPositiveScale {
                        name: "beta",
                        value: beta,
                    });
                }
                if !(0.0..=0.5).contains(&label_smoothing) {
                    return Err(LossError::LabelSmoothing(label_smoothing));
                }
            }
            PreferenceLoss::Rso { gamma } => {
                if gamma.is_nan() || gamma <= 0.0 {
                    return Err(LossError::NonPositiveScale {
                        name: "gamma",
                        value: gamma,
                    });
                }
            }
        }
        Ok(())
    }

    /// Compute losses, rewards and policy gradients for a batch
    pub fn compute(
        &self,
        policy_chosen: &[f32],
        policy_rejected: &[f32],
        reference_chosen: &[f32],
        reference_rejected: &[f32],
    ) -> Result<LossOutput, LossError> {
        self.validate()?;

        let n = policy_chosen.len();
        if n == 0 {
            return Err(LossError::EmptyBatch);
        }
        for other in [policy_rejected, reference_chosen, reference_rejected] {
            if other.len() != n {
                return Err(LossError::LengthMismatch {
                    expected: n,
                    found: other.len(),
                });
            }
        }

        let scale = self.scale();
        let inv_n = 1.0 / n as f32;

        let mut output = LossOutput {
            losses: Vec::with_capacity(n),
            chosen_rewards: Vec::with_capacity(n),
            rejected_rewards: Vec::with_capacity(n),
            gradients: LogProbGradients {
                chosen: Vec::with_capacity(n),
                rejected: Vec::with_capacity(n),
            },
        };

        for i in 0..n {
            let chosen_ratio = policy_chosen[i] - reference_chosen[i];
            let rejected_ratio = policy_rejected[i] - reference_rejected[i];
            let z = scale * (chosen_ratio - rejected_ratio);

            // dloss/dz for this pair
            let (loss, dz) = match *self {
                PreferenceLoss::Dpo {
                    label_smoothing: s,
                    ..
                } => (
                    softplus(-z) * (1.0 - s) + softplus(z) * s,
                    -(1.0 - s) * sigmoid(-z) + s * sigmoid(z),
                ),
                PreferenceLoss::Rso { .. } => {
                    if z < 1.0 {
                        (1.0 - z, -1.0)
                    } else {
                        (0.0, 0.0)
                    }
                }
            };

            output.losses.push(loss);
            output.chosen_rewards.push(scale * chosen_ratio);
            output.rejected_rewards.push(scale * rejected_ratio);
            output.gradients.chosen.push(dz * scale * inv_n);
            output.gradients.rejected.push(-dz * scale * inv_n);
        }

        Ok(output)
    }
}
