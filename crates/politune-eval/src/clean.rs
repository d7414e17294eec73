//! Cleanup of raw generated text

use anyhow::{Context, Result};
use regex::Regex;

/// Llama-3 end-of-turn token
pub const EOT_TOKEN: &str = "<|eot_id|>";

const HEADER_PATTERN: &str = r"<\|start_header_id\|>.*?<\|end_header_id\|>";

/// Extracts the first assistant answer from decoded generation output
///
/// Leading `split` tokens are dropped, chat headers removed, and the text up
/// to the next `split` is returned trimmed. An empty `split` only removes
/// headers and trims.
#[derive(Debug, Clone)]
pub struct OutputCleaner {
    header: Regex,
    split: String,
}

impl OutputCleaner {
    pub fn new(split: impl Into<String>) -> Result<Self> {
        let header =
            Regex::new(HEADER_PATTERN).context("Failed to compile chat header regex")?;
        Ok(Self {
            header,
            split: split.into(),
        })
    }

    pub fn clean(&self, output: &str) -> String {
        let output = self.strip_leading(output);
        let without_headers = self.header.replace_all(output, "");
        let output = self.strip_leading(&without_headers);

        let answer = if self.split.is_empty() {
            output
        } else {
            output.split(self.split.as_str()).next().unwrap_or_default()
        };
        answer.trim().to_string()
    }

    fn strip_leading<'a>(&self, mut text: &'a str) -> &'a str {
        if self.split.is_empty() {
            return text;
        }
        while let Some(rest) = text.strip_prefix(self.split.as_str()) {
            text = rest;
        }
        text
    }
}

/// One-off cleanup with a fresh [`OutputCleaner`]
pub fn clean_output(output: &str, split: &str) -> Result<String> {
    Ok(OutputCleaner::new(split)?.clean(output))
}
