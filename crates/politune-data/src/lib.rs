//! Preference data curation for politune
//!
//! This crate provides the data side of preference fine-tuning:
//! - the chosen/rejected message-pair schema ([`PreferenceExample`])
//! - conversion from raw `{instruction, chosen, rejected}` records
//! - JSON / JSONL loading and writing
//! - weighted, seeded mixing of two preference pools

pub mod config;
pub mod example;
pub mod io;
pub mod mixer;

pub use example::{ExampleError, Message, PreferenceExample, RawPreferenceRecord, Role};
pub use mixer::{DisjointPolicy, MixError, MixOptions, MixRatio};
