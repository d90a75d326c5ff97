//! Property-based tests for splitting and scoring using proptest.

use proptest::prelude::*;

use foldwise_core::score::{Accuracy, BrierScore, LogLoss};
use foldwise_core::split::test_size;
use foldwise_core::{Dataset, Fold, Probabilities, Scorer, SplitPolicy, Splitter};

fn cyclic(n: usize, n_classes: usize) -> Dataset {
    let rows = (0..n).map(|i| vec![i as f64]).collect();
    let labels = (0..n).map(|i| i % n_classes).collect();
    let classes = (0..n_classes).map(|c| format!("c{c}")).collect();
    Dataset::new(classes, rows, labels).unwrap()
}

/// Rows whose class sizes are skewed: class `c` gets weight `c + 1`.
fn skewed(n: usize, n_classes: usize) -> Dataset {
    let total: usize = (1..=n_classes).sum();
    let mut labels = Vec::with_capacity(n);
    for i in 0..n {
        let slot = i % total;
        let mut acc = 0;
        let class = (0..n_classes)
            .find(|&c| {
                acc += c + 1;
                slot < acc
            })
            .unwrap_or(n_classes - 1);
        labels.push(class);
    }
    let rows = (0..n).map(|i| vec![i as f64]).collect();
    let classes = (0..n_classes).map(|c| format!("c{c}")).collect();
    Dataset::new(classes, rows, labels).unwrap()
}

/// Every class count in every subset is within 1 of its proportional share.
fn assert_tracks_class_fractions(data: &Dataset, folds: &[Fold]) -> Result<(), TestCaseError> {
    let counts = data.class_counts();
    for fold in folds {
        for subset in [&fold.train, &fold.test] {
            let mut per_class = vec![0usize; data.n_classes()];
            for &i in subset.iter() {
                per_class[data.label(i)] += 1;
            }
            for (class, &got) in per_class.iter().enumerate() {
                let expected = counts[class] as f64 / data.len() as f64 * subset.len() as f64;
                prop_assert!(
                    (got as f64 - expected).abs() < 1.0,
                    "fold {} class {} has {} rows, expected {:.3}", fold.index, class, got, expected
                );
            }
        }
    }
    Ok(())
}

// --- k-fold partition properties ---

proptest! {
    #[test]
    fn k_fold_test_sets_partition_the_rows(
        n in 40usize..200,
        k in 2usize..10,
        n_classes in 1usize..4,
        stratify in any::<bool>(),
        seed in any::<u64>(),
    ) {
        let data = cyclic(n, n_classes);
        let folds = Splitter::k_fold(k).stratified(stratify).split(&data, seed).unwrap();
        prop_assert_eq!(folds.len(), k);

        let mut seen = vec![0usize; n];
        for fold in &folds {
            for &i in &fold.test {
                seen[i] += 1;
            }
            let mut all: Vec<usize> = fold.train.iter().chain(&fold.test).copied().collect();
            all.sort_unstable();
            prop_assert_eq!(all, (0..n).collect::<Vec<_>>());
        }
        prop_assert!(seen.iter().all(|&count| count == 1));

        let sizes: Vec<usize> = folds.iter().map(|f| f.test.len()).collect();
        let (min, max) = (sizes.iter().min().unwrap(), sizes.iter().max().unwrap());
        prop_assert!(max - min <= 1);
    }

    #[test]
    fn stratified_k_fold_tracks_class_fractions(
        n in 60usize..240,
        k in 2usize..6,
        n_classes in 2usize..5,
        seed in any::<u64>(),
    ) {
        let data = skewed(n, n_classes);
        let folds = Splitter::k_fold(k).stratified(true).split(&data, seed).unwrap();
        assert_tracks_class_fractions(&data, &folds)?;
    }

    #[test]
    fn stratified_holdout_and_shuffle_split_track_class_fractions(
        n in 60usize..240,
        frac in 0.05f64..0.95,
        n_splits in 1usize..4,
        n_classes in 2usize..5,
        seed in any::<u64>(),
    ) {
        let data = skewed(n, n_classes);
        prop_assume!(test_size(n, frac).is_ok());
        for policy in [
            SplitPolicy::Holdout { test_fraction: frac },
            SplitPolicy::ShuffleSplit { n_splits, test_fraction: frac },
        ] {
            let folds = Splitter::new(policy).stratified(true).split(&data, seed).unwrap();
            assert_tracks_class_fractions(&data, &folds)?;
        }
    }

    #[test]
    fn holdout_and_shuffle_split_sizes(
        n in 20usize..300,
        frac in 0.05f64..0.95,
        n_splits in 1usize..5,
        stratify in any::<bool>(),
        seed in any::<u64>(),
    ) {
        let data = cyclic(n, 2);
        let Ok(n_test) = test_size(n, frac) else {
            return Ok(());
        };
        prop_assume!(!stratify || (n_test >= 2 && n - n_test >= 2));
        let splitter = Splitter::new(SplitPolicy::ShuffleSplit { n_splits, test_fraction: frac })
            .stratified(stratify);
        let folds = splitter.split(&data, seed).unwrap();
        prop_assert_eq!(folds.len(), n_splits);
        for fold in &folds {
            prop_assert_eq!(fold.test.len(), n_test);
            prop_assert_eq!(fold.train.len() + fold.test.len(), n);
            prop_assert!(fold.test.iter().all(|i| fold.train.binary_search(i).is_err()));
        }
    }

    #[test]
    fn same_seed_same_folds(n in 10usize..80, seed in any::<u64>()) {
        let data = cyclic(n, 2);
        let splitter = Splitter::new(SplitPolicy::RepeatedKFold { n_folds: 2, n_repeats: 3 });
        prop_assert_eq!(splitter.split(&data, seed).unwrap(), splitter.split(&data, seed).unwrap());
    }
}

// --- scorer properties ---

fn probability_rows(width: usize, n: usize) -> impl Strategy<Value = Vec<Vec<f64>>> {
    prop::collection::vec(prop::collection::vec(0.01f64..1.0, width), n).prop_map(|rows| {
        rows.into_iter()
            .map(|row| {
                let sum: f64 = row.iter().sum();
                row.into_iter().map(|p| p / sum).collect()
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn uniform_log_loss_is_ln_of_class_count(n_classes in 2usize..10, n in 1usize..50) {
        let labels: Vec<usize> = (0..n).map(|i| i % n_classes).collect();
        let uniform = Probabilities::uniform((0..n_classes).collect(), n).unwrap();
        let loss = LogLoss::default().score(&labels, &uniform).unwrap();
        prop_assert!((loss - (n_classes as f64).ln()).abs() < 1e-9);
    }

    #[test]
    fn scores_stay_in_range(
        (labels, rows) in (2usize..5).prop_flat_map(|width| {
            (1usize..30).prop_flat_map(move |n| {
                (prop::collection::vec(0..width, n), probability_rows(width, n))
            })
        }),
    ) {
        let width = rows[0].len();
        let predicted = Probabilities::new((0..width).collect(), rows).unwrap();
        let eps = 1e-15;
        let loss = LogLoss { eps }.score(&labels, &predicted).unwrap();
        prop_assert!(loss >= 0.0);
        prop_assert!(loss <= -eps.ln() + 1e-9);

        let accuracy = Accuracy.score(&labels, &predicted).unwrap();
        prop_assert!((0.0..=1.0).contains(&accuracy));

        let brier = BrierScore.score(&labels, &predicted).unwrap();
        prop_assert!((0.0..=2.0).contains(&brier));
    }

    #[test]
    fn confident_log_loss_shrinks_with_eps(exp in 2i32..14) {
        let eps = 10f64.powi(-exp);
        let labels = vec![0, 1, 1, 0];
        let rows = labels
            .iter()
            .map(|&y| if y == 0 { vec![1.0, 0.0] } else { vec![0.0, 1.0] })
            .collect();
        let predicted = Probabilities::new(vec![0, 1], rows).unwrap();
        let loss = LogLoss { eps }.score(&labels, &predicted).unwrap();
        prop_assert!(loss <= 1.01 * eps);
    }
}
