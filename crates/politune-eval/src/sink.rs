//! CSV sink for evaluation answers
//!
//! Each file starts with `iteration, step, {prefix}_0 … {prefix}_{k-1}` and
//! receives one row per evaluation event.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised by the evaluation sink
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("expected {expected} answers, got {found}")]
    AnswerCount { expected: usize, found: usize },
    #[error("evaluation frequency must be positive")]
    ZeroFrequency,
    #[error("failed to write {path:?}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("failed to open {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Append-only CSV file of evaluation answers
#[derive(Debug, Clone)]
pub struct EvalCsvSink {
    path: PathBuf,
    num_answers: usize,
}

impl EvalCsvSink {
    /// Create (or truncate) `path` and write the header row
    pub fn create(path: impl Into<PathBuf>, prefix: &str, num_answers: usize) -> Result<Self, EvalError> {
        let path = path.into();
        let file = File::create(&path).map_err(|source| EvalError::Io {
            path: path.clone(),
            source,
        })?;

        let mut header = vec!["iteration".to_string(), "step".to_string()];
        header.extend((0..num_answers).map(|i| format!("{}_{}", prefix, i)));

        let sink = Self { path, num_answers };
        sink.write_record(file, &header)?;
        Ok(sink)
    }

    /// Append one `[iteration, step, answers…]` row and flush it
    pub fn append(&self, iteration: usize, step: usize, answers: &[String]) -> Result<(), EvalError> {
        if answers.len() != self.num_answers {
            return Err(EvalError::AnswerCount {
                expected: self.num_answers,
                found: answers.len(),
            });
        }

        let file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|source| EvalError::Io {
                path: self.path.clone(),
                source,
            })?;

        let mut row = Vec::with_capacity(answers.len() + 2);
        row.push(iteration.to_string());
        row.push(step.to_string());
        row.extend(answers.iter().cloned());

        self.write_record(file, &row)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_record(&self, file: File, record: &[String]) -> Result<(), EvalError> {
        let csv_err = |source| EvalError::Csv {
            path: self.path.clone(),
            source,
        };

        let mut writer = csv::WriterBuilder::new().from_writer(file);
        writer.write_record(record).map_err(csv_err)?;
        writer.flush().map_err(|source| EvalError::Io {
            path: self.path.clone(),
            source,
        })
    }
}
