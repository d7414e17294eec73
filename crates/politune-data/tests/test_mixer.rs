//! Tests for weighted pool mixing

use anyhow::Result;
use politune_data::config::CurationConfig;
use politune_data::io::{load_preference_examples, write_preference_examples};
use politune_data::mixer::{find_overlap, mix, mix_pools, sample_fraction, shuffle};
use politune_data::{
    DisjointPolicy, ExampleError, Message, MixError, MixOptions, MixRatio, PreferenceExample,
};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;
use std::fs;

fn pool(prefix: &str, n: usize) -> Vec<PreferenceExample> {
    (0..n)
        .map(|i| {
            PreferenceExample::new(
                format!("{} prompt {}", prefix, i),
                format!("{} chosen {}", prefix, i),
                format!("{} rejected {}", prefix, i),
            )
        })
        .collect()
}

fn sorted_prompts(examples: &[PreferenceExample]) -> Vec<String> {
    let mut prompts: Vec<String> = examples
        .iter()
        .map(|e| e.prompt().unwrap_or_default().to_string())
        .collect();
    prompts.sort();
    prompts
}

#[test]
fn test_standard_mix_sizes() {
    let right = pool("right", 2825);
    let left = pool("left", 2356);

    for ((r, l), expected_right, expected_left) in [
        ((0.75, 0.25), 2118, 589),
        ((0.25, 0.75), 706, 1767),
        ((0.5, 0.5), 1412, 1178),
    ] {
        let ratio = MixRatio::new(r, l);
        assert_eq!(
            ratio.sample_sizes(right.len(), left.len()),
            Ok((expected_right, expected_left))
        );

        let mut rng = StdRng::seed_from_u64(42);
        let mixed = mix(&right, &left, ratio, &mut rng).unwrap();
        assert_eq!(mixed.len(), expected_right + expected_left);

        let from_right = mixed
            .iter()
            .filter(|e| e.prompt().is_some_and(|p| p.starts_with("right")))
            .count();
        assert_eq!(from_right, expected_right);
    }
}

#[test]
fn test_mix_draws_without_replacement() {
    let right = pool("right", 100);
    let left = pool("left", 80);
    let mut rng = StdRng::seed_from_u64(7);

    let mixed = mix(&right, &left, MixRatio::new(1.0, 1.0), &mut rng).unwrap();

    let unique: HashSet<&PreferenceExample> = mixed.iter().collect();
    assert_eq!(unique.len(), 180);
    assert_eq!(sorted_prompts(&mixed), {
        let mut all = right.clone();
        all.extend(left.clone());
        sorted_prompts(&all)
    });
}

#[test]
fn test_zero_fraction_is_allowed() {
    let right = pool("right", 10);
    let left = pool("left", 10);
    let mut rng = StdRng::seed_from_u64(0);

    let mixed = mix(&right, &left, MixRatio::new(0.0, 0.05), &mut rng).unwrap();
    assert!(mixed.is_empty());
}

#[test]
fn test_out_of_range_fraction() {
    let right = pool("right", 10);
    let mut rng = StdRng::seed_from_u64(0);

    assert_eq!(
        sample_fraction("right", &right, 1.5, &mut rng),
        Err(MixError::OutOfRange {
            pool: "right",
            fraction: 1.5
        })
    );
    assert!(matches!(
        sample_fraction("right", &right, -0.1, &mut rng),
        Err(MixError::OutOfRange { pool: "right", .. })
    ));
    assert!(matches!(
        sample_fraction("right", &right, f64::NAN, &mut rng),
        Err(MixError::OutOfRange { .. })
    ));
    assert_eq!(sample_fraction("right", &right, 1.0, &mut rng).map(|s| s.len()), Ok(10));
}

#[test]
fn test_fraction_above_one_fails_even_when_floor_fits() {
    let right = pool("right", 10);
    let mut rng = StdRng::seed_from_u64(0);

    // floor(10 * 1.05) fits the pool; the fraction is still rejected
    assert_eq!(
        sample_fraction("right", &right, 1.05, &mut rng),
        Err(MixError::OutOfRange {
            pool: "right",
            fraction: 1.05
        })
    );

    let empty: Vec<PreferenceExample> = Vec::new();
    assert_eq!(
        mix(&empty, &right, MixRatio::new(f64::INFINITY, 0.0), &mut rng),
        Err(MixError::OutOfRange {
            pool: "right",
            fraction: f64::INFINITY
        })
    );
}

#[test]
fn test_mix_is_deterministic_for_seed() {
    let right = pool("right", 50);
    let left = pool("left", 40);
    let ratio = MixRatio::new(0.5, 0.5);

    let first = mix(&right, &left, ratio, &mut StdRng::seed_from_u64(3)).unwrap();
    let second = mix(&right, &left, ratio, &mut StdRng::seed_from_u64(3)).unwrap();
    let other = mix(&right, &left, ratio, &mut StdRng::seed_from_u64(4)).unwrap();

    assert_eq!(first, second);
    assert_ne!(first, other);
}

#[test]
fn test_written_mix_is_byte_identical() -> Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let right_path = temp_dir.path().join("right.json");
    let left_path = temp_dir.path().join("left.json");
    write_preference_examples(&right_path, &pool("right", 40))?;
    write_preference_examples(&left_path, &pool("left", 30))?;

    let mut config = CurationConfig::standard(right_path, left_path, &temp_dir.path().join("a"));
    let first = config.run()?;
    for plan in &mut config.mixes {
        let name = plan.output.file_name().unwrap().to_owned();
        plan.output = temp_dir.path().join("b").join(name);
    }
    let second = config.run()?;

    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.total(), b.total());
        assert_eq!(fs::read(&a.output)?, fs::read(&b.output)?);
    }

    assert_eq!(first[0].from_right, 30);
    assert_eq!(first[0].from_left, 7);
    assert_eq!(load_preference_examples(&first[0].output)?.len(), 37);
    Ok(())
}

#[test]
fn test_find_overlap() {
    let right = pool("right", 5);
    let mut left = pool("left", 5);
    left.push(right[2].clone());
    left.push(right[2].clone());
    left.push(right[4].clone());

    let shared = find_overlap(&right, &left);

    assert_eq!(shared, vec!["right prompt 2".to_string(), "right prompt 4".to_string()]);
    assert!(find_overlap(&right, &pool("left", 5)).is_empty());
}

#[test]
fn test_mix_pools_disjoint_policy() {
    let right = pool("right", 5);
    let mut left = pool("left", 5);
    left.push(right[0].clone());
    let ratio = MixRatio::new(1.0, 1.0);

    let warned = mix_pools(&right, &left, ratio, MixOptions::default(), &mut StdRng::seed_from_u64(1));
    assert_eq!(warned.map(|m| m.len()), Ok(11));

    let enforced = mix_pools(
        &right,
        &left,
        ratio,
        MixOptions {
            disjoint: DisjointPolicy::Enforce,
        },
        &mut StdRng::seed_from_u64(1),
    );
    assert_eq!(
        enforced,
        Err(MixError::Overlap {
            count: 1,
            first: "right prompt 0".to_string()
        })
    );
}

#[test]
fn test_mix_pools_rejects_malformed_examples() {
    let mut right = pool("right", 4);
    right[2].chosen.clear();
    let left = pool("left", 4);

    let result = mix_pools(
        &right,
        &left,
        MixRatio::new(0.5, 0.5),
        MixOptions::default(),
        &mut StdRng::seed_from_u64(1),
    );
    assert_eq!(
        result,
        Err(MixError::InvalidExample {
            pool: "right",
            index: 2,
            source: ExampleError::WrongLength {
                side: "chosen",
                found: 0
            },
        })
    );

    let mut left = pool("left", 4);
    left[1].rejected[0] = Message::user("a different prompt");
    let result = mix_pools(
        &pool("right", 4),
        &left,
        MixRatio::new(0.5, 0.5),
        MixOptions::default(),
        &mut StdRng::seed_from_u64(1),
    );
    assert!(matches!(
        result,
        Err(MixError::InvalidExample {
            pool: "left",
            index: 1,
            source: ExampleError::PromptMismatch,
        })
    ));
}

#[test]
fn test_curation_fails_before_writing_malformed_pool() -> Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let right_path = temp_dir.path().join("right.json");
    let left_path = temp_dir.path().join("left.json");

    let mut right = pool("right", 3);
    right[1].chosen.clear();
    write_preference_examples(&right_path, &right)?;
    write_preference_examples(&left_path, &pool("left", 3))?;

    let output_dir = temp_dir.path().join("mixes");
    let config = CurationConfig::standard(right_path, left_path, &output_dir);
    let err = config.run().unwrap_err();

    assert!(format!("{:#}", err).contains("index 1"));
    assert!(!output_dir.join("right50_left50.json").exists());
    Ok(())
}

#[test]
fn test_overlap_ignores_examples_without_user_prompt() {
    let mut right = pool("right", 2);
    right[0].chosen[0] = Message::assistant("right prompt 0");
    let left = vec![PreferenceExample::new("right prompt 0", "a", "b")];

    assert!(find_overlap(&right, &left).is_empty());
}

proptest! {
    #[test]
    fn test_mix_length_and_membership(
        right_len in 0usize..60,
        left_len in 0usize..60,
        fr in 0.0f64..=1.0,
        fl in 0.0f64..=1.0,
        seed in any::<u64>(),
    ) {
        let right = pool("right", right_len);
        let left = pool("left", left_len);
        let mut rng = StdRng::seed_from_u64(seed);

        let mixed = mix(&right, &left, MixRatio::new(fr, fl), &mut rng).unwrap();

        let expected = (right_len as f64 * fr).floor() as usize + (left_len as f64 * fl).floor() as usize;
        prop_assert_eq!(mixed.len(), expected);

        let members: HashSet<&PreferenceExample> = right.iter().chain(left.iter()).collect();
        prop_assert!(mixed.iter().all(|e| members.contains(e)));
    }

    #[test]
    fn test_shuffle_preserves_multiset(n in 0usize..80, seed in any::<u64>()) {
        let original = pool("p", n);
        let mut shuffled = original.clone();
        shuffle(&mut shuffled, &mut StdRng::seed_from_u64(seed));

        prop_assert_eq!(sorted_prompts(&shuffled), sorted_prompts(&original));
    }
}
