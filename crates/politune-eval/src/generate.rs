//! Text generation seam for evaluation

use crate::clean::OutputCleaner;
use anyhow::{Context, Result};
use politune_data::Message;
use serde::{Deserialize, Serialize};

/// Sampling settings for evaluation generations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Maximum tokens generated per prompt
    pub max_generated_tokens: usize,
    /// Sampling temperature
    pub temperature: f32,
    /// Top-k sampling cutoff
    pub top_k: usize,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_generated_tokens: 300,
            temperature: 0.3,
            top_k: 200,
        }
    }
}

/// A model that can answer chat prompts
///
/// Implemented by the training backend. `enter_eval_mode` and
/// `exit_eval_mode` bracket one evaluation pass, e.g. to switch off dropout
/// and set up a KV cache; `exit_eval_mode` must restore the previous mode.
pub trait TextGenerator {
    /// Generate the raw decoded continuation of `prompt`
    ///
    /// The returned text excludes the prompt but may still carry chat
    /// headers and end-of-turn tokens.
    fn generate(&mut self, prompt: &[Message], params: &GenerationParams) -> Result<String>;

    fn enter_eval_mode(&mut self) -> Result<()> {
        Ok(())
    }

    fn exit_eval_mode(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Answer every prompt in order, returning cleaned answers
///
/// The generator is returned to its previous mode even when a generation
/// fails; the generation error takes precedence over a restore error.
pub fn eval_instructions<G: TextGenerator + ?Sized>(
    generator: &mut G,
    prompts: &[Vec<Message>],
    params: &GenerationParams,
    split: &str,
) -> Result<Vec<String>> {
    let cleaner = OutputCleaner::new(split)?;
    generator
        .enter_eval_mode()
        .context("Failed to switch generator to eval mode")?;

    let answers = prompts
        .iter()
        .enumerate()
        .map(|(i, prompt)| {
            let raw = generator
                .generate(prompt, params)
                .with_context(|| format!("Generation failed for prompt {}", i))?;
            Ok(cleaner.clean(&raw))
        })
        .collect::<Result<Vec<_>>>();

    let restored = generator
        .exit_eval_mode()
        .context("Failed to restore generator mode");

    let answers = answers?;
    restored?;
    Ok(answers)
}
