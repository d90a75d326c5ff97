//! Train/test splitting: holdout, k-fold, repeated k-fold and shuffle-split,
//! each optionally stratified by class.

mod allocate;

use crate::data::Dataset;
use crate::error::MlError;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// How a dataset is cut into folds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SplitPolicy {
    /// One shuffled train/test cut. `n_test = ceil(test_fraction * N)`,
    /// computed so that float error in the product does not round up a
    /// whole extra row (0.07 of 100 rows gives 7, not 8).
    Holdout { test_fraction: f64 },
    /// `n_folds` disjoint test folds covering every row once.
    KFold {
        n_folds: usize,
        #[serde(default = "default_shuffle")]
        shuffle: bool,
    },
    /// `n_repeats` independently shuffled k-fold partitions.
    RepeatedKFold { n_folds: usize, n_repeats: usize },
    /// `n_splits` independent holdout draws; test sets may overlap.
    ShuffleSplit { n_splits: usize, test_fraction: f64 },
}

fn default_shuffle() -> bool {
    true
}

impl Default for SplitPolicy {
    fn default() -> Self {
        SplitPolicy::KFold {
            n_folds: 5,
            shuffle: true,
        }
    }
}

/// One train/test pair. Both index lists are sorted ascending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fold {
    pub index: usize,
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// A split policy plus the stratification switch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Splitter {
    pub policy: SplitPolicy,
    #[serde(default)]
    pub stratify: bool,
}

impl Default for Splitter {
    fn default() -> Self {
        Self {
            policy: SplitPolicy::default(),
            stratify: true,
        }
    }
}

impl Splitter {
    pub fn new(policy: SplitPolicy) -> Self {
        Self {
            policy,
            stratify: false,
        }
    }

    pub fn holdout(test_fraction: f64) -> Self {
        Self::new(SplitPolicy::Holdout { test_fraction })
    }

    pub fn k_fold(n_folds: usize) -> Self {
        Self::new(SplitPolicy::KFold {
            n_folds,
            shuffle: true,
        })
    }

    pub fn shuffle_split(n_splits: usize, test_fraction: f64) -> Self {
        Self::new(SplitPolicy::ShuffleSplit {
            n_splits,
            test_fraction,
        })
    }

    pub fn stratified(mut self, stratify: bool) -> Self {
        self.stratify = stratify;
        self
    }

    /// Number of folds `split` will return.
    pub fn n_splits(&self) -> usize {
        match self.policy {
            SplitPolicy::Holdout { .. } => 1,
            SplitPolicy::KFold { n_folds, .. } => n_folds,
            SplitPolicy::RepeatedKFold { n_folds, n_repeats } => n_folds.saturating_mul(n_repeats),
            SplitPolicy::ShuffleSplit { n_splits, .. } => n_splits,
        }
    }

    /// Produce the folds for `data`. The same seed always yields the same folds.
    pub fn split(&self, data: &Dataset, seed: u64) -> Result<Vec<Fold>, MlError> {
        let n = data.len();
        let mut rng = StdRng::seed_from_u64(seed);
        let folds = match self.policy {
            SplitPolicy::Holdout { test_fraction } => {
                let n_test = test_size(n, test_fraction)?;
                vec![self.holdout_fold(data, n_test, 0, &mut rng)?]
            }
            SplitPolicy::KFold { n_folds, shuffle } => {
                self.k_fold_folds(data, n_folds, shuffle, 0, &mut rng)?
            }
            SplitPolicy::RepeatedKFold { n_folds, n_repeats } => {
                if n_repeats == 0 {
                    return Err(MlError::InvalidFoldCount {
                        requested: 0,
                        n_samples: n,
                    });
                }
                let mut folds = Vec::new();
                for _ in 0..n_repeats {
                    let offset = folds.len();
                    folds.extend(self.k_fold_folds(data, n_folds, true, offset, &mut rng)?);
                }
                folds
            }
            SplitPolicy::ShuffleSplit {
                n_splits,
                test_fraction,
            } => {
                if n_splits == 0 {
                    return Err(MlError::InvalidFoldCount {
                        requested: 0,
                        n_samples: n,
                    });
                }
                let n_test = test_size(n, test_fraction)?;
                (0..n_splits)
                    .map(|i| self.holdout_fold(data, n_test, i, &mut rng))
                    .collect::<Result<Vec<_>, _>>()?
            }
        };
        tracing::debug!(
            policy = ?self.policy,
            stratify = self.stratify,
            seed,
            folds = folds.len(),
            "Split dataset"
        );
        Ok(folds)
    }

    fn holdout_fold(
        &self,
        data: &Dataset,
        n_test: usize,
        index: usize,
        rng: &mut StdRng,
    ) -> Result<Fold, MlError> {
        let n = data.len();
        let mut test = Vec::with_capacity(n_test);
        let mut train = Vec::with_capacity(n - n_test);

        if self.stratify {
            let members = class_groups(data, 2)?;
            let counts: Vec<usize> = members.iter().map(Vec::len).collect();
            let table = allocate::allocate(&counts, &[n - n_test, n_test]);
            for (mut rows, shares) in members.into_iter().zip(table) {
                rows.shuffle(rng);
                test.extend_from_slice(&rows[..shares[1]]);
                train.extend_from_slice(&rows[shares[1]..]);
            }
        } else {
            let mut rows: Vec<usize> = (0..n).collect();
            rows.shuffle(rng);
            test.extend_from_slice(&rows[..n_test]);
            train.extend_from_slice(&rows[n_test..]);
        }

        train.sort_unstable();
        test.sort_unstable();
        Ok(Fold { index, train, test })
    }

    fn k_fold_folds(
        &self,
        data: &Dataset,
        n_folds: usize,
        shuffle: bool,
        offset: usize,
        rng: &mut StdRng,
    ) -> Result<Vec<Fold>, MlError> {
        let n = data.len();
        if n_folds < 2 || n_folds > n {
            return Err(MlError::InvalidFoldCount {
                requested: n_folds,
                n_samples: n,
            });
        }
        let sizes = fold_sizes(n, n_folds);
        let mut groups: Vec<Vec<usize>> = sizes.iter().map(|&s| Vec::with_capacity(s)).collect();

        if self.stratify {
            let members = class_groups(data, n_folds)?;
            let counts: Vec<usize> = members.iter().map(Vec::len).collect();
            let table = allocate::allocate(&counts, &sizes);
            for (mut rows, shares) in members.into_iter().zip(table) {
                if shuffle {
                    rows.shuffle(rng);
                }
                let mut start = 0;
                for (group, share) in groups.iter_mut().zip(shares) {
                    group.extend_from_slice(&rows[start..start + share]);
                    start += share;
                }
            }
        } else {
            let mut rows: Vec<usize> = (0..n).collect();
            if shuffle {
                rows.shuffle(rng);
            }
            let mut start = 0;
            for (group, size) in groups.iter_mut().zip(&sizes) {
                group.extend_from_slice(&rows[start..start + size]);
                start += size;
            }
        }

        Ok(folds_from_groups(groups, offset))
    }
}

/// Relative slack removed before rounding a test-set size up.
const ROUNDING_SLACK: f64 = 1e-9;

/// Test-set size for a holdout fraction, rounding the test side up.
pub fn test_size(n_samples: usize, test_fraction: f64) -> Result<usize, MlError> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(MlError::split_ratio(format!(
            "test fraction {test_fraction} is outside (0, 1)"
        )));
    }
    let exact = test_fraction * n_samples as f64;
    let n_test = (exact - exact * ROUNDING_SLACK).ceil() as usize;
    if n_test == 0 || n_test >= n_samples {
        return Err(MlError::split_ratio(format!(
            "test fraction {test_fraction} leaves an empty subset for {n_samples} samples"
        )));
    }
    Ok(n_test)
}

/// Fold sizes for `n` rows over `k` folds; the first `n % k` folds get one more.
fn fold_sizes(n: usize, k: usize) -> Vec<usize> {
    let base = n / k;
    let remainder = n % k;
    (0..k)
        .map(|i| if i < remainder { base + 1 } else { base })
        .collect()
}

/// Row indices of every present class, after checking each class can be
/// spread over `groups` subsets.
fn class_groups(data: &Dataset, groups: usize) -> Result<Vec<Vec<usize>>, MlError> {
    let members: Vec<Vec<usize>> = data
        .class_members()
        .into_iter()
        .filter(|rows| !rows.is_empty())
        .collect();
    for rows in &members {
        if rows.len() < groups {
            return Err(MlError::InsufficientClassCount {
                class: data.class_name(data.label(rows[0])).to_string(),
                count: rows.len(),
                required: groups,
            });
        }
    }
    Ok(members)
}

fn folds_from_groups(groups: Vec<Vec<usize>>, offset: usize) -> Vec<Fold> {
    (0..groups.len())
        .map(|f| {
            let mut test = groups[f].clone();
            test.sort_unstable();
            let mut train: Vec<usize> = groups
                .iter()
                .enumerate()
                .filter(|(g, _)| *g != f)
                .flat_map(|(_, rows)| rows.iter().copied())
                .collect();
            train.sort_unstable();
            Fold {
                index: offset + f,
                train,
                test,
            }
        })
        .collect()
}
