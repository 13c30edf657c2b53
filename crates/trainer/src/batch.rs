use babi::Vectorized;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Seeded generator when `seed` is set, otherwise one seeded from the OS.
pub fn rng_from(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Randomly partitions the rows of `data` into (train, validation).
///
/// `ceil(test_fraction * rows)` rows go to validation. The same seed always
/// gives the same partition.
pub fn split(data: &Vectorized, test_fraction: f64, seed: Option<u64>) -> (Vectorized, Vectorized) {
    let total = data.len();
    let n_val = ((total as f64) * test_fraction).ceil() as usize;
    let n_val = n_val.min(total);

    let mut indices: Vec<usize> = (0..total).collect();
    indices.shuffle(&mut rng_from(seed));
    let (val, train) = indices.split_at(n_val);

    log::debug!("Dataset split: {} training, {} validation", train.len(), val.len());
    (data.select(train), data.select(val))
}

/// Full batches over `n` rows as `(start, end)` pairs. Trailing rows that
/// cannot fill a whole batch are left out.
pub fn make_batches(n: usize, batch_size: usize) -> Vec<(usize, usize)> {
    if batch_size == 0 {
        return Vec::new();
    }
    (0..n / batch_size)
        .map(|i| (i * batch_size, (i + 1) * batch_size))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use babi::{vectorize, Example, Vocab};

    fn data(rows: usize) -> Vectorized {
        let examples: Vec<Example> = (0..rows)
            .map(|i| Example {
                story: vec![vec![format!("w{}", i)]],
                query: vec!["q".to_string()],
                answer: vec![format!("w{}", i)],
            })
            .collect();
        let vocab = Vocab::build(&examples);
        vectorize(&examples, &vocab, 1, 1).unwrap()
    }

    #[test]
    fn test_make_batches_drops_short_tail() {
        assert_eq!(make_batches(100, 32), vec![(0, 32), (32, 64), (64, 96)]);
        assert_eq!(make_batches(96, 32).len(), 3);
        assert!(make_batches(31, 32).is_empty());
        assert!(make_batches(10, 0).is_empty());
    }

    #[test]
    fn test_split_sizes_and_coverage() {
        let all = data(25);
        let (train, val) = split(&all, 0.1, Some(1));
        assert_eq!(val.len(), 3);
        assert_eq!(train.len(), 22);

        let mut labels: Vec<i64> = train.labels();
        labels.extend(val.labels());
        labels.sort();
        let mut expected = all.labels();
        expected.sort();
        assert_eq!(labels, expected);
    }

    #[test]
    fn test_split_is_reproducible_with_seed() {
        let all = data(40);
        let (train_a, val_a) = split(&all, 0.1, Some(42));
        let (train_b, val_b) = split(&all, 0.1, Some(42));
        assert_eq!(train_a, train_b);
        assert_eq!(val_a, val_b);
    }

    #[test]
    fn test_split_without_validation() {
        let all = data(5);
        let (train, val) = split(&all, 0.0, None);
        assert_eq!(train.len(), 5);
        assert!(val.is_empty());
    }
}
