use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

/// Row indices assigned to training and holdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub train: Vec<usize>,
    pub holdout: Vec<usize>,
}

/// Seeded random train/holdout assignment of `n` rows.
///
/// The holdout receives `ceil(test_fraction * n)` rows: the first indices of
/// a ChaCha8 shuffle. Identical `n`, fraction and seed always yield the same
/// partition.
pub fn train_holdout_split(n: usize, test_fraction: f64, seed: u64) -> Partition {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut rng);

    let holdout_size = ((test_fraction * n as f64).ceil() as usize).min(n);
    let train = indices.split_off(holdout_size);

    Partition {
        train,
        holdout: indices,
    }
}
