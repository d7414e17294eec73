//! Training metrics logging for preference optimisation

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Metrics for a single optimizer step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepMetrics {
    pub step: usize,
    pub loss: f32,
    pub lr: f32,
    pub tokens_per_second: f32,
    #[serde(rename = "rewards/chosen")]
    pub rewards_chosen: f32,
    #[serde(rename = "rewards/rejected")]
    pub rewards_rejected: f32,
    #[serde(rename = "rewards/accuracies")]
    pub rewards_accuracies: f32,
    #[serde(rename = "rewards/margins")]
    pub rewards_margins: f32,
    #[serde(rename = "log_probs/chosen")]
    pub log_probs_chosen: f32,
    #[serde(rename = "log_probs/rejected")]
    pub log_probs_rejected: f32,
    #[serde(rename = "logits/chosen")]
    pub logits_chosen: f32,
    #[serde(rename = "logits/rejected")]
    pub logits_rejected: f32,
}

/// Metrics logger for training
///
/// Every `log_interval` steps the metrics go to `tracing` and, as one JSON
/// object per line, to the metrics file.
pub struct MetricsLogger {
    log_interval: usize,
    path: PathBuf,
}

impl MetricsLogger {
    /// Create a logger appending to `path` (truncated first)
    pub fn with_file(log_interval: usize, path: &Path) -> Result<Self> {
        File::create(path).with_context(|| format!("Failed to create metrics file: {:?}", path))?;
        Ok(Self {
            log_interval: log_interval.max(1),
            path: path.to_path_buf(),
        })
    }

    pub fn should_log(&self, step: usize) -> bool {
        step.is_multiple_of(self.log_interval)
    }

    /// Log metrics if `metrics.step` falls on the interval
    pub fn log_step(&self, metrics: &StepMetrics) -> Result<()> {
        if !self.should_log(metrics.step) {
            return Ok(());
        }

        tracing::info!(
            step = metrics.step,
            loss = metrics.loss,
            lr = metrics.lr,
            tokens_per_second = metrics.tokens_per_second,
            reward_accuracy = metrics.rewards_accuracies,
            reward_margin = metrics.rewards_margins,
            "train step"
        );

        let file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open metrics file: {:?}", self.path))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, metrics)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}
