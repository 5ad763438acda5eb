//! Deterministic train/test splitting and stratified fold assignment.

use fd_types::{DataError, FdResult, Label, LabeledDataset};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Result of a seeded train/test split.
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub train: LabeledDataset,
    pub test: LabeledDataset,
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
}

/// Shuffle rows with `seed` and hold out `ceil(test_ratio * n)` of them.
///
/// The same dataset, ratio and seed always produce the same partition.
pub fn train_test_split(
    dataset: &LabeledDataset,
    test_ratio: f64,
    seed: u64,
) -> FdResult<TrainTestSplit> {
    let n = dataset.len();
    if n == 0 {
        return Err(DataError::Empty {
            message: "cannot split an empty dataset".to_string(),
        }
        .into());
    }

    let n_test = (test_ratio * n as f64).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(DataError::InsufficientData {
            message: format!(
                "{} rows cannot be split with test ratio {} into non-empty train and test subsets",
                n, test_ratio
            ),
        }
        .into());
    }

    let mut permutation: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    permutation.shuffle(&mut rng);

    let test_indices = permutation[..n_test].to_vec();
    let train_indices = permutation[n_test..].to_vec();

    tracing::debug!(
        train = train_indices.len(),
        test = test_indices.len(),
        seed,
        "Split dataset"
    );

    Ok(TrainTestSplit {
        train: dataset.select(&train_indices),
        test: dataset.select(&test_indices),
        train_indices,
        test_indices,
    })
}

/// One cross-validation fold, as row indices into the dataset it was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub train: Vec<usize>,
    pub validation: Vec<usize>,
}

/// Stratified k-fold assignment without shuffling.
///
/// Rows of each class are dealt to folds round-robin in dataset order, so every
/// fold receives `floor` or `ceil` of `count / k` rows of each class.
#[derive(Debug, Clone, Copy)]
pub struct StratifiedKFold {
    n_splits: usize,
}

impl StratifiedKFold {
    pub fn new(n_splits: usize) -> Self {
        Self { n_splits }
    }

    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    pub fn split(&self, labels: &[Label]) -> FdResult<Vec<Fold>> {
        if self.n_splits < 2 {
            return Err(DataError::InsufficientData {
                message: format!("need at least 2 folds, got {}", self.n_splits),
            }
            .into());
        }

        let mut counts = [0usize; 2];
        for label in labels {
            counts[label.index()] += 1;
        }
        for label in Label::ALL {
            let count = counts[label.index()];
            if count < self.n_splits {
                return Err(DataError::InsufficientData {
                    message: format!(
                        "class '{}' has {} training rows, fewer than the {} cross-validation folds",
                        label, count, self.n_splits
                    ),
                }
                .into());
            }
        }

        let mut assignment = vec![0usize; labels.len()];
        let mut seen = [0usize; 2];
        for (row, label) in labels.iter().enumerate() {
            let slot = &mut seen[label.index()];
            assignment[row] = *slot % self.n_splits;
            *slot += 1;
        }

        let folds = (0..self.n_splits)
            .map(|fold| {
                let (validation, train): (Vec<usize>, Vec<usize>) =
                    (0..labels.len()).partition(|&row| assignment[row] == fold);
                Fold { train, validation }
            })
            .collect();

        Ok(folds)
    }
}
