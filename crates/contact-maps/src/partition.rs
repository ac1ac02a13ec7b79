//! Train/validation partitioning.
//!
//! The split is always 80/20 by count: the first `floor(0.8 * N)` rows (after
//! an optional permutation) train the model and the remainder validate it.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::dataset::ContactMapDataset;
use crate::error::DataError;

/// Fraction of samples assigned to the training set.
pub const TRAIN_FRACTION: f64 = 0.8;

/// Result of partitioning a dataset.
#[derive(Debug, Clone)]
pub struct Split {
    pub train: ContactMapDataset,
    pub validation: ContactMapDataset,
    /// Source-dataset row of every training sample, in training order.
    pub train_indices: Vec<usize>,
    /// Source-dataset row of every validation sample, in validation order.
    pub validation_indices: Vec<usize>,
}

impl Split {
    /// Total number of samples across both subsets.
    pub fn len(&self) -> usize {
        self.train.len() + self.validation.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Number of training samples for a dataset of `n` samples.
///
/// Fails when `n < 2`, since no non-empty validation set could be produced.
pub fn split_index(n: usize) -> Result<usize, DataError> {
    if n < 2 {
        return Err(DataError::InvalidDataset(format!(
            "need at least 2 samples to split into train and validation, got {n}"
        )));
    }
    Ok((TRAIN_FRACTION * n as f64).floor() as usize)
}

/// Split `dataset` 80/20, permuting rows first when `shuffle` is set.
pub fn partition(
    dataset: &ContactMapDataset,
    shuffle: bool,
    rng: &mut impl Rng,
) -> Result<Split, DataError> {
    let n = dataset.len();
    let k = split_index(n)?;

    let mut order: Vec<usize> = (0..n).collect();
    if shuffle {
        order.shuffle(rng);
    }
    let validation_indices = order.split_off(k);
    let train_indices = order;

    Ok(Split {
        train: dataset.select(&train_indices),
        validation: dataset.select(&validation_indices),
        train_indices,
        validation_indices,
    })
}

/// Configurable front-end to [`partition`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DatasetPartitioner {
    shuffle: bool,
    seed: Option<u64>,
}

impl DatasetPartitioner {
    /// Unshuffled, order-preserving partitioner.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Seed for the permutation. Without one, shuffles draw from OS entropy.
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn partition(&self, dataset: &ContactMapDataset) -> Result<Split, DataError> {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let split = partition(dataset, self.shuffle, &mut rng)?;
        tracing::info!(
            train = split.train.len(),
            validation = split.validation.len(),
            shuffled = self.shuffle,
            "Partitioned dataset"
        );
        Ok(split)
    }
}
