//! Unit tests for recipe state and adapter naming

use anyhow::Result;
use politune_dpo::state::lora_module_names;
use politune_dpo::RecipeState;

fn config_state() -> RecipeState {
    RecipeState {
        seed: 1,
        epochs_run: 0,
        total_epochs: 3,
        max_steps_per_epoch: Some(100),
    }
}

#[test]
fn test_reconcile_prefers_checkpoint_progress() {
    let mut state = config_state();
    let checkpoint = RecipeState {
        seed: 2,
        epochs_run: 1,
        total_epochs: 2,
        max_steps_per_epoch: Some(50),
    };

    state.reconcile(&checkpoint);

    assert_eq!(state.epochs_run, 1);
    assert_eq!(state.seed, 2);
    assert_eq!(state.max_steps_per_epoch, Some(50));
    assert_eq!(state.total_epochs, 3);
}

#[test]
fn test_save_and_load() -> Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let path = temp_dir.path().join("recipe_state.json");

    config_state().save(&path)?;
    assert_eq!(RecipeState::load(&path)?, config_state());
    Ok(())
}

#[test]
fn test_load_missing_or_incomplete() -> Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let path = temp_dir.path().join("recipe_state.json");
    assert!(RecipeState::load(&path).is_err());

    std::fs::write(&path, r#"{"seed": 1, "epochs_run": 1}"#)?;
    let err = RecipeState::load(&path).unwrap_err();
    assert!(format!("{:#}", err).contains("missing required keys"));
    Ok(())
}

#[test]
fn test_lora_module_names() {
    let attn = vec!["q_proj".to_string(), "v_proj".to_string()];

    assert_eq!(lora_module_names(&attn, false, false), vec!["q_proj", "v_proj"]);
    assert_eq!(
        lora_module_names(&attn, true, true),
        vec!["q_proj", "v_proj", "w1", "w2", "w3", "output"]
    );
}
