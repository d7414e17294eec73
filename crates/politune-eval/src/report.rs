//! Summary of the evaluations run during training

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Totals for one evaluation suite
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteSummary {
    /// Suite name (e.g., "political compass")
    pub suite_name: String,
    /// Prompts asked per evaluation event
    pub num_prompts: usize,
    /// Number of evaluation events
    pub events: usize,
    /// Answers recorded across all events
    pub answers: usize,
    /// Answers that were non-empty after cleaning
    pub non_empty: usize,
    /// non_empty / answers
    pub answer_rate: f32,
}

impl SuiteSummary {
    pub fn new(
        suite_name: String,
        num_prompts: usize,
        events: usize,
        answers: usize,
        non_empty: usize,
    ) -> Self {
        let answer_rate = if answers > 0 {
            non_empty as f32 / answers as f32
        } else {
            0.0
        };

        Self {
            suite_name,
            num_prompts,
            events,
            answers,
            non_empty,
            answer_rate,
        }
    }
}

/// End-of-run evaluation summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalSummary {
    pub suites: Vec<SuiteSummary>,
    /// Total evaluation events across suites
    pub total_events: usize,
    /// Timestamp of the summary
    pub timestamp: String,
}

impl EvalSummary {
    pub fn generate(suites: &[SuiteSummary]) -> Self {
        Self {
            suites: suites.to_vec(),
            total_events: suites.iter().map(|s| s.events).sum(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Format summary as markdown
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();
        md.push_str("# Evaluation Summary\n\n");
        md.push_str(&format!("**Timestamp**: {}\n\n", self.timestamp));
        md.push_str(&format!("**Evaluation events**: {}\n\n", self.total_events));
        md.push_str("| Suite | Prompts | Events | Answers | Non-empty |\n");
        md.push_str("|-------|---------|--------|---------|-----------|\n");

        for suite in &self.suites {
            md.push_str(&format!(
                "| {} | {} | {} | {} | {:.2}% |\n",
                suite.suite_name,
                suite.num_prompts,
                suite.events,
                suite.answers,
                suite.answer_rate * 100.0
            ));
        }

        md
    }

    /// Write `eval_summary.json` and `eval_summary.md` into `output_dir`
    pub fn save(&self, output_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(output_dir)
            .with_context(|| format!("Failed to create output directory: {:?}", output_dir))?;

        let json_path = output_dir.join("eval_summary.json");
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&json_path, json)
            .with_context(|| format!("Failed to write {:?}", json_path))?;

        let md_path = output_dir.join("eval_summary.md");
        std::fs::write(&md_path, self.to_markdown())
            .with_context(|| format!("Failed to write {:?}", md_path))?;

        Ok(())
    }
}
