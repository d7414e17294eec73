//! Loading and writing preference datasets
//!
//! Files ending in `.jsonl` are read line by line (blank lines skipped);
//! anything else is parsed as a single JSON array.

use crate::example::{PreferenceExample, RawPreferenceRecord};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::fs;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Load preference examples from a JSON array or JSONL file
///
/// Every example must pass [`PreferenceExample::validate`]; the first
/// offending example is reported by its index in the file.
pub fn load_preference_examples(path: &Path) -> Result<Vec<PreferenceExample>> {
    let examples: Vec<PreferenceExample> = load_records(path)?;
    for (index, example) in examples.iter().enumerate() {
        example
            .validate()
            .with_context(|| format!("Invalid preference example at index {} in {:?}", index, path))?;
    }
    tracing::debug!(path = %path.display(), count = examples.len(), "loaded preference examples");
    Ok(examples)
}

/// Load raw `{instruction|prompt, chosen, rejected}` records
pub fn load_raw_records(path: &Path) -> Result<Vec<RawPreferenceRecord>> {
    let records: Vec<RawPreferenceRecord> = load_records(path)?;
    tracing::debug!(path = %path.display(), count = records.len(), "loaded raw records");
    Ok(records)
}

/// Write preference examples as a compact JSON array
///
/// Parent directories are created when missing. The output is a pure
/// function of `examples`, so equal inputs give byte-identical files.
pub fn write_preference_examples(path: &Path, examples: &[PreferenceExample]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {:?}", parent))?;
    }

    let file =
        fs::File::create(path).with_context(|| format!("Failed to create file: {:?}", path))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, examples)
        .with_context(|| format!("Failed to serialize examples to {:?}", path))?;
    writer
        .flush()
        .with_context(|| format!("Failed to flush {:?}", path))?;

    tracing::debug!(path = %path.display(), count = examples.len(), "wrote preference examples");
    Ok(())
}

fn load_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if is_jsonl(path) {
        load_jsonl(path)
    } else {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read data file: {:?}", path))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse JSON array in {:?}", path))
    }
}

fn load_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file =
        fs::File::open(path).with_context(|| format!("Failed to open file: {:?}", path))?;
    let reader = BufReader::new(file);

    let mut records = Vec::new();
    for (line_num, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read line")?;
        if line.trim().is_empty() {
            continue;
        }

        let record = serde_json::from_str(&line).with_context(|| {
            format!("Failed to parse record at line {} in {:?}", line_num + 1, path)
        })?;
        records.push(record);
    }

    Ok(records)
}

fn is_jsonl(path: &Path) -> bool {
    path.extension().and_then(|s| s.to_str()) == Some("jsonl")
}
