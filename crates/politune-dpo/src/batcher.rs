//! Batching of preference pairs
//!
//! Examples stay in memory; each epoch gets its own seeded permutation so a
//! run can be resumed at an epoch boundary and see the same order.

use politune_data::PreferenceExample;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Fixed-size batches over an in-memory preference dataset
///
/// The last partial batch of an epoch is dropped.
pub struct PreferenceBatcher {
    examples: Vec<PreferenceExample>,
    batch_size: usize,
    shuffle: bool,
    seed: u64,
    order: Vec<usize>,
}

impl PreferenceBatcher {
    /// Create a new PreferenceBatcher
    ///
    /// # Arguments
    /// * `examples` - Preference pairs to iterate over
    /// * `batch_size` - Pairs per batch (must be positive)
    /// * `shuffle` - Reshuffle at every epoch
    /// * `seed` - Base seed; epoch `e` uses `seed + e`
    pub fn new(examples: Vec<PreferenceExample>, batch_size: usize, shuffle: bool, seed: u64) -> Self {
        let order = (0..examples.len()).collect();
        let mut batcher = Self {
            examples,
            batch_size: batch_size.max(1),
            shuffle,
            seed,
            order,
        };
        batcher.set_epoch(0);
        batcher
    }

    /// Reorder the data for `epoch`
    pub fn set_epoch(&mut self, epoch: usize) {
        self.order = (0..self.examples.len()).collect();
        if self.shuffle {
            let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(epoch as u64));
            self.order.shuffle(&mut rng);
        }
    }

    /// Number of full batches per epoch
    pub fn num_batches(&self) -> usize {
        self.examples.len() / self.batch_size
    }

    /// The `idx`-th batch of the current epoch
    ///
    /// Returns None past the last full batch.
    pub fn batch(&self, idx: usize) -> Option<Vec<PreferenceExample>> {
        if idx >= self.num_batches() {
            return None;
        }
        let start = idx * self.batch_size;
        Some(
            self.order[start..start + self.batch_size]
                .iter()
                .map(|&i| self.examples[i].clone())
                .collect(),
        )
    }

    /// Get number of examples loaded
    pub fn example_count(&self) -> usize {
        self.examples.len()
    }
}
