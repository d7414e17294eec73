//! End-to-end tests for the politune-curate binary

use anyhow::Result;
use politune_data::io::{load_preference_examples, write_preference_examples};
use politune_data::PreferenceExample;
use std::process::Command;

fn pool(prefix: &str, n: usize) -> Vec<PreferenceExample> {
    (0..n)
        .map(|i| PreferenceExample::new(format!("{} prompt {}", prefix, i), "yes", "no"))
        .collect()
}

fn curate() -> Command {
    Command::new(env!("CARGO_BIN_EXE_politune-curate"))
}

#[test]
fn test_mix_all_builds_standard_mixes_without_config() -> Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let right = temp_dir.path().join("right.json");
    let left = temp_dir.path().join("left.json");
    write_preference_examples(&right, &pool("right", 20))?;
    write_preference_examples(&left, &pool("left", 12))?;
    let output_dir = temp_dir.path().join("mixes");

    let status = curate()
        .arg("mix-all")
        .arg("--right")
        .arg(&right)
        .arg("--left")
        .arg(&left)
        .arg("--output-dir")
        .arg(&output_dir)
        .status()?;
    assert!(status.success());

    assert_eq!(load_preference_examples(&output_dir.join("right75_left25.json"))?.len(), 15 + 3);
    assert_eq!(load_preference_examples(&output_dir.join("right25_left75.json"))?.len(), 5 + 9);
    assert_eq!(load_preference_examples(&output_dir.join("right50_left50.json"))?.len(), 10 + 6);
    Ok(())
}

#[test]
fn test_mix_all_requires_config_or_pools() -> Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let right = temp_dir.path().join("right.json");
    write_preference_examples(&right, &pool("right", 4))?;

    let status = curate().arg("mix-all").arg("--right").arg(&right).status()?;
    assert!(!status.success());
    Ok(())
}
