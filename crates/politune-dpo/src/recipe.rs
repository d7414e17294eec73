//! LoRA-DPO training loop with periodic evaluation

use crate::batcher::PreferenceBatcher;
use crate::config::RecipeConfig;
use crate::loss::mean;
use crate::metrics::{MetricsLogger, StepMetrics};
use crate::policy::PreferencePolicy;
use crate::state::{CheckpointRequest, RecipeState, RECIPE_STATE_FILE};
use anyhow::{Context, Result};
use politune_data::PreferenceExample;
use politune_eval::prompts::load_pc_questions;
use politune_eval::EvalHook;
use std::time::Instant;

/// Outcome of [`LoraDpoRecipe::train`]
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSummary {
    pub epochs_run: usize,
    pub global_step: usize,
    /// Accumulated loss of the last optimizer step
    pub last_loss: Option<f32>,
}

/// Single-device LoRA-DPO recipe
///
/// Checkpoints are only taken at epoch boundaries; work done in an
/// interrupted epoch is lost.
pub struct LoraDpoRecipe<P: PreferencePolicy> {
    config: RecipeConfig,
    policy: P,
    batcher: PreferenceBatcher,
    eval_hook: Option<EvalHook>,
    metrics: MetricsLogger,
    state: RecipeState,
    steps_per_epoch: usize,
    global_step: usize,
}

impl<P: PreferencePolicy> LoraDpoRecipe<P> {
    /// Build the recipe and the standard evaluation suites from `config`
    pub fn from_config(
        config: RecipeConfig,
        policy: P,
        examples: Vec<PreferenceExample>,
    ) -> Result<Self> {
        let eval_hook = match &config.eval {
            Some(eval) => {
                let questions = load_pc_questions(&eval.pc_questions_file)?;
                Some(EvalHook::standard(
                    &config.output_dir,
                    &questions,
                    eval.eval_freq,
                    eval.generation.clone(),
                )?)
            }
            None => None,
        };
        Self::new(config, policy, examples, eval_hook)
    }

    /// Build the recipe with an explicit (or no) evaluation hook
    pub fn new(
        config: RecipeConfig,
        policy: P,
        examples: Vec<PreferenceExample>,
        eval_hook: Option<EvalHook>,
    ) -> Result<Self> {
        config.validate()?;

        for (i, example) in examples.iter().enumerate() {
            example
                .validate()
                .with_context(|| format!("Invalid preference example at index {}", i))?;
        }

        std::fs::create_dir_all(&config.output_dir).with_context(|| {
            format!("Failed to create output directory: {:?}", config.output_dir)
        })?;

        let mut state = config.initial_state();
        if config.resume_from_checkpoint {
            let checkpoint = RecipeState::load(&config.output_dir.join(RECIPE_STATE_FILE))?;
            state.reconcile(&checkpoint);
            tracing::info!(epochs_run = state.epochs_run, "Resuming from recipe state");
        }

        let batcher = PreferenceBatcher::new(examples, config.batch_size, config.shuffle, state.seed);
        tracing::info!(
            examples = batcher.example_count(),
            batches = batcher.num_batches(),
            "Dataset and sampler are initialized"
        );

        let mut steps_per_epoch = batcher.num_batches() / config.gradient_accumulation_steps;
        if let Some(max_steps) = state.max_steps_per_epoch {
            steps_per_epoch = steps_per_epoch.min(max_steps);
        }
        let global_step = state.epochs_run * steps_per_epoch;

        let metrics = MetricsLogger::with_file(
            config.log_every_n_steps,
            &config.output_dir.join("metrics.jsonl"),
        )?;

        Ok(Self {
            config,
            policy,
            batcher,
            eval_hook,
            metrics,
            state,
            steps_per_epoch,
            global_step,
        })
    }

    /// Run the remaining epochs
    pub fn train(&mut self) -> Result<TrainingSummary> {
        let grad_accum = self.config.gradient_accumulation_steps;
        let mut last_loss = None;

        for curr_epoch in self.state.epochs_run..self.state.total_epochs {
            self.batcher.set_epoch(curr_epoch);

            let mut running_loss = 0.0f32;
            let mut num_tokens = 0usize;
            let mut t0 = Instant::now();

            for idx in 0..self.batcher.num_batches() {
                if self
                    .state
                    .max_steps_per_epoch
                    .is_some_and(|max| idx / grad_accum == max)
                {
                    break;
                }

                if let Some(hook) = self.eval_hook.as_mut() {
                    hook.maybe_run(&mut self.policy, curr_epoch, idx)?;
                }

                let Some(batch) = self.batcher.batch(idx) else {
                    break;
                };

                let policy_out = self
                    .policy
                    .forward(&batch)
                    .with_context(|| format!("Policy forward failed at batch {}", idx))?;
                num_tokens += policy_out.num_tokens;
                let reference_out = self
                    .policy
                    .reference_forward(&batch)
                    .with_context(|| format!("Reference forward failed at batch {}", idx))?;

                let loss = self.config.loss.compute(
                    &policy_out.chosen_log_probs,
                    &policy_out.rejected_log_probs,
                    &reference_out.chosen_log_probs,
                    &reference_out.rejected_log_probs,
                )?;

                let scale = 1.0 / grad_accum as f32;
                running_loss += loss.mean_loss() * scale;
                self.policy.backward(&loss.gradients.scaled(scale))?;

                if (idx + 1) % grad_accum == 0 {
                    self.policy.optimizer_step()?;
                    self.global_step += 1;
                    last_loss = Some(running_loss);

                    tracing::debug!(
                        "{}|{}|Loss: {}",
                        curr_epoch + 1,
                        self.global_step,
                        running_loss
                    );

                    let elapsed = t0.elapsed().as_secs_f32();
                    let metrics = StepMetrics {
                        step: self.global_step,
                        loss: running_loss,
                        lr: self.policy.learning_rate(),
                        tokens_per_second: if elapsed > 0.0 {
                            num_tokens as f32 / elapsed
                        } else {
                            0.0
                        },
                        rewards_chosen: loss.mean_chosen_reward(),
                        rewards_rejected: loss.mean_rejected_reward(),
                        rewards_accuracies: loss.reward_accuracy(),
                        rewards_margins: loss.mean_reward_margin(),
                        log_probs_chosen: mean(&policy_out.chosen_log_probs),
                        log_probs_rejected: mean(&policy_out.rejected_log_probs),
                        logits_chosen: policy_out.chosen_logits_mean,
                        logits_rejected: policy_out.rejected_logits_mean,
                    };
                    self.metrics.log_step(&metrics)?;

                    running_loss = 0.0;
                    num_tokens = 0;
                    t0 = Instant::now();
                }
            }

            self.state.epochs_run += 1;
            self.save_checkpoint(curr_epoch)?;
        }

        if let Some(hook) = &self.eval_hook {
            hook.summary().save(&self.config.output_dir)?;
        }

        Ok(TrainingSummary {
            epochs_run: self.state.epochs_run,
            global_step: self.global_step,
            last_loss,
        })
    }

    fn save_checkpoint(&mut self, epoch: usize) -> Result<()> {
        let intermediate = epoch + 1 < self.state.total_epochs;
        let recipe_state = intermediate.then(|| self.state.clone());

        if let Some(state) = &recipe_state {
            state.save(&self.config.output_dir.join(RECIPE_STATE_FILE))?;
        }

        let request = CheckpointRequest {
            epoch,
            intermediate,
            adapter_only: self.config.save_adapter_weights_only,
            recipe_state,
            adapter_config: self.config.lora.adapter_config(),
        };
        self.policy
            .save_checkpoint(&request)
            .with_context(|| format!("Failed to save checkpoint for epoch {}", epoch))?;

        tracing::info!(epoch, intermediate, "Saved checkpoint");
        Ok(())
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    pub fn state(&self) -> &RecipeState {
        &self.state
    }

    pub fn steps_per_epoch(&self) -> usize {
        self.steps_per_epoch
    }

    pub fn global_step(&self) -> usize {
        self.global_step
    }

    pub fn eval_hook(&self) -> Option<&EvalHook> {
        self.eval_hook.as_ref()
    }
}
