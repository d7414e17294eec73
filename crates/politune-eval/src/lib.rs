//! Qualitative evaluation for politune preference training
//!
//! This crate provides the evaluation hook run during training:
//! - political-compass and custom prompt sets
//! - instruction formatting and generation-output cleaning
//! - the [`TextGenerator`] seam to the model
//! - CSV sinks with one row per evaluation event
//! - a periodic [`EvalHook`] and an end-of-run summary report

pub mod clean;
pub mod generate;
pub mod hook;
pub mod prompts;
pub mod report;
pub mod sink;

pub use generate::{eval_instructions, GenerationParams, TextGenerator};
pub use hook::{EvalHook, EvalSuite};
pub use sink::{EvalCsvSink, EvalError};
