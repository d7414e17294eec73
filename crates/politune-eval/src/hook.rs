//! Periodic evaluation during training

use crate::clean::EOT_TOKEN;
use crate::generate::{eval_instructions, GenerationParams, TextGenerator};
use crate::prompts::{custom_prompts, political_compass_prompts};
use crate::report::{EvalSummary, SuiteSummary};
use crate::sink::{EvalCsvSink, EvalError};
use anyhow::{Context, Result};
use politune_data::Message;
use std::path::Path;

/// Default number of batches between evaluations
pub const DEFAULT_EVAL_FREQ: usize = 512;

/// A named prompt set and the CSV file its answers go to
#[derive(Debug, Clone)]
pub struct EvalSuite {
    name: String,
    prompts: Vec<Vec<Message>>,
    sink: EvalCsvSink,
    events: usize,
    answers: usize,
    non_empty: usize,
}

impl EvalSuite {
    /// Create the suite and write the CSV header
    pub fn new(
        name: impl Into<String>,
        prompts: Vec<Vec<Message>>,
        csv_path: &Path,
        column_prefix: &str,
    ) -> Result<Self, EvalError> {
        let sink = EvalCsvSink::create(csv_path, column_prefix, prompts.len())?;
        Ok(Self {
            name: name.into(),
            prompts,
            sink,
            events: 0,
            answers: 0,
            non_empty: 0,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Generate answers for every prompt and append them as one row
    pub fn evaluate<G: TextGenerator + ?Sized>(
        &mut self,
        generator: &mut G,
        params: &GenerationParams,
        split: &str,
        iteration: usize,
        step: usize,
    ) -> Result<Vec<String>> {
        tracing::info!(suite = %self.name, iteration, step, "Evaluating");

        let answers = eval_instructions(generator, &self.prompts, params, split)
            .with_context(|| format!("Evaluation of {} failed", self.name))?;
        self.sink.append(iteration, step, &answers)?;

        self.events += 1;
        self.answers += answers.len();
        self.non_empty += answers.iter().filter(|a| !a.is_empty()).count();

        tracing::info!(path = %self.sink.path().display(), "Updated");
        Ok(answers)
    }

    pub fn summary(&self) -> SuiteSummary {
        SuiteSummary::new(
            self.name.clone(),
            self.prompts.len(),
            self.events,
            self.answers,
            self.non_empty,
        )
    }
}

/// Runs every suite once every `frequency` batches
#[derive(Debug, Clone)]
pub struct EvalHook {
    frequency: usize,
    params: GenerationParams,
    split: String,
    suites: Vec<EvalSuite>,
}

impl EvalHook {
    pub fn new(frequency: usize, params: GenerationParams, suites: Vec<EvalSuite>) -> Result<Self, EvalError> {
        if frequency == 0 {
            return Err(EvalError::ZeroFrequency);
        }

        tracing::info!(
            frequency,
            max_generated_tokens = params.max_generated_tokens,
            temperature = params.temperature,
            top_k = params.top_k,
            "Evaluation hook configured"
        );

        Ok(Self {
            frequency,
            params,
            split: EOT_TOKEN.to_string(),
            suites,
        })
    }

    /// Custom prompts (`custom_instrs.csv`) then compass questions (`pc.csv`)
    pub fn standard(
        output_dir: &Path,
        pc_questions: &[String],
        frequency: usize,
        params: GenerationParams,
    ) -> Result<Self> {
        std::fs::create_dir_all(output_dir)
            .with_context(|| format!("Failed to create output directory: {:?}", output_dir))?;

        let custom = EvalSuite::new(
            "custom prompts",
            custom_prompts(),
            &output_dir.join("custom_instrs.csv"),
            "prompt",
        )?;
        let compass = EvalSuite::new(
            "political compass",
            political_compass_prompts(pc_questions),
            &output_dir.join("pc.csv"),
            "question",
        )?;

        Ok(Self::new(frequency, params, vec![custom, compass])?)
    }

    /// Override the end-of-turn token used to cut answers
    pub fn with_split(mut self, split: impl Into<String>) -> Self {
        self.split = split.into();
        self
    }

    pub fn suites(&self) -> &[EvalSuite] {
        &self.suites
    }

    pub fn should_run(&self, step: usize) -> bool {
        step.is_multiple_of(self.frequency)
    }

    /// Evaluate every suite if `step` falls on the frequency
    ///
    /// Returns whether the evaluation ran.
    pub fn maybe_run<G: TextGenerator + ?Sized>(
        &mut self,
        generator: &mut G,
        iteration: usize,
        step: usize,
    ) -> Result<bool> {
        if !self.should_run(step) {
            return Ok(false);
        }
        self.run(generator, iteration, step)?;
        Ok(true)
    }

    /// Evaluate every suite unconditionally
    pub fn run<G: TextGenerator + ?Sized>(
        &mut self,
        generator: &mut G,
        iteration: usize,
        step: usize,
    ) -> Result<()> {
        for suite in &mut self.suites {
            suite.evaluate(generator, &self.params, &self.split, iteration, step)?;
        }
        Ok(())
    }

    pub fn summary(&self) -> EvalSummary {
        let suites: Vec<SuiteSummary> = self.suites.iter().map(EvalSuite::summary).collect();
        EvalSummary::generate(&suites)
    }
}
