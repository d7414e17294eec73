//! Preference-data curation tool
//!
//! # Usage
//!
//! ```bash
//! # Reshape raw {prompt, chosen, rejected} records into message pairs
//! politune-curate convert --input raw-left.json --output politune-left.json
//!
//! # Build one weighted mix
//! politune-curate mix \
//!   --right politune-right.json --left politune-left.json \
//!   --right-fraction 0.75 --left-fraction 0.25 \
//!   --seed 42 --output right75_left25.json
//!
//! # Build every mix listed in a config file
//! politune-curate mix-all --config curation.json
//!
//! # Build the three standard mixes (75/25, 25/75, 50/50)
//! politune-curate mix-all \
//!   --right politune-right.json --left politune-left.json --output-dir mixes
//!
//! # List prompts present in both pools
//! politune-curate overlap --right politune-right.json --left politune-left.json
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use politune_data::config::{CurationConfig, MixPlan};
use politune_data::example::convert_records;
use politune_data::io::{load_preference_examples, load_raw_records, write_preference_examples};
use politune_data::mixer::find_overlap;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Preference-data curation for politune
#[derive(Parser, Debug)]
#[command(name = "politune-curate")]
#[command(about = "Convert and mix chosen/rejected preference datasets", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert raw records into chosen/rejected message pairs
    Convert {
        /// Raw records (JSON array or JSONL)
        #[arg(long, value_name = "PATH")]
        input: PathBuf,

        /// Output JSON file
        #[arg(long, value_name = "PATH")]
        output: PathBuf,
    },

    /// Sample and shuffle one weighted mix of two pools
    Mix {
        /// Right pool of preference examples
        #[arg(long, value_name = "PATH")]
        right: PathBuf,

        /// Left pool of preference examples
        #[arg(long, value_name = "PATH")]
        left: PathBuf,

        /// Fraction of the right pool to keep
        #[arg(long)]
        right_fraction: f64,

        /// Fraction of the left pool to keep
        #[arg(long)]
        left_fraction: f64,

        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Output JSON file
        #[arg(long, value_name = "PATH")]
        output: PathBuf,

        /// Fail when the pools share prompts
        #[arg(long)]
        require_disjoint: bool,
    },

    /// Build every mix listed in a curation config, or the standard mixes
    MixAll {
        /// Curation config (JSON)
        #[arg(long, value_name = "PATH", conflicts_with_all = ["right", "left", "output_dir"])]
        config: Option<PathBuf>,

        /// Right pool for the standard mixes
        #[arg(long, value_name = "PATH", required_unless_present = "config")]
        right: Option<PathBuf>,

        /// Left pool for the standard mixes
        #[arg(long, value_name = "PATH", required_unless_present = "config")]
        left: Option<PathBuf>,

        /// Directory for the standard mixes
        #[arg(long, value_name = "DIR", required_unless_present = "config")]
        output_dir: Option<PathBuf>,

        /// Seed for the standard mixes
        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Report prompts present in both pools
    Overlap {
        #[arg(long, value_name = "PATH")]
        right: PathBuf,

        #[arg(long, value_name = "PATH")]
        left: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if cli.verbose {
            "politune_data=debug,politune_curate=debug"
        } else {
            "politune_data=info,politune_curate=info"
        })
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    match cli.command {
        Command::Convert { input, output } => {
            let records = load_raw_records(&input)
                .with_context(|| format!("Failed to load raw records from {:?}", input))?;
            let examples = convert_records(records);
            write_preference_examples(&output, &examples)?;
            println!("Converted {} records to {:?}", examples.len(), output);
        }
        Command::Mix {
            right,
            left,
            right_fraction,
            left_fraction,
            seed,
            output,
            require_disjoint,
        } => {
            let config = CurationConfig {
                right,
                left,
                seed,
                require_disjoint,
                mixes: vec![MixPlan {
                    name: "mix".to_string(),
                    right_fraction,
                    left_fraction,
                    output,
                }],
            };
            for outcome in config.run()? {
                println!(
                    "{}: {} right + {} left = {} examples -> {:?}",
                    outcome.name,
                    outcome.from_right,
                    outcome.from_left,
                    outcome.total(),
                    outcome.output
                );
            }
        }
        Command::MixAll {
            config,
            right,
            left,
            output_dir,
            seed,
        } => {
            let config = match (config, right, left, output_dir) {
                (Some(path), _, _, _) => CurationConfig::from_file(&path)?,
                (None, Some(right), Some(left), Some(output_dir)) => {
                    let mut config = CurationConfig::standard(right, left, &output_dir);
                    config.seed = seed;
                    config
                }
                _ => bail!("mix-all needs --config, or all of --right, --left and --output-dir"),
            };
            for outcome in config.run()? {
                println!(
                    "{}: {} right + {} left = {} examples -> {:?}",
                    outcome.name,
                    outcome.from_right,
                    outcome.from_left,
                    outcome.total(),
                    outcome.output
                );
            }
        }
        Command::Overlap { right, left } => {
            let right = load_preference_examples(&right)?;
            let left = load_preference_examples(&left)?;
            let shared = find_overlap(&right, &left);
            for prompt in &shared {
                println!("{}", prompt);
            }
            println!("{} shared prompts", shared.len());
        }
    }

    Ok(())
}
