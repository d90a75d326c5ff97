//! k-nearest-neighbours classification.

use super::{FitError, FitOptions, FitOutcome, FittedModel, ModelFamily, check_width, class_columns};
use crate::data::Dataset;
use crate::error::MlError;
use crate::score::Probabilities;
use crate::select::Candidate;

pub const PARAM_NEIGHBORS: &str = "n_neighbors";

const DEFAULT_NEIGHBORS: f64 = 5.0;

/// Predicts the class frequencies among the `n_neighbors` closest training
/// rows (Euclidean distance, ties broken by training row order).
#[derive(Debug, Clone, Copy, Default)]
pub struct KNearestNeighbors;

impl ModelFamily for KNearestNeighbors {
    fn name(&self) -> &str {
        "k_nearest_neighbors"
    }

    fn param_names(&self) -> &[&str] {
        &[PARAM_NEIGHBORS]
    }

    fn fit(
        &self,
        candidate: &Candidate,
        train: &Dataset,
        _options: &FitOptions,
    ) -> Result<FitOutcome, FitError> {
        let k = candidate.get(PARAM_NEIGHBORS).unwrap_or(DEFAULT_NEIGHBORS);
        if k.fract() != 0.0 || k < 1.0 {
            return Err(FitError::new(format!(
                "n_neighbors must be a positive integer, got {k}"
            )));
        }
        let k = k as usize;
        if k > train.len() {
            return Err(FitError::new(format!(
                "n_neighbors = {k} exceeds {} training rows",
                train.len()
            )));
        }
        let (classes, lookup) = class_columns(train);
        Ok(FitOutcome {
            model: Box::new(NeighborsModel {
                k,
                classes,
                lookup,
                train: train.clone(),
            }),
            converged: true,
            iterations: 1,
        })
    }
}

struct NeighborsModel {
    k: usize,
    classes: Vec<usize>,
    lookup: Vec<Option<usize>>,
    train: Dataset,
}

impl FittedModel for NeighborsModel {
    fn classes(&self) -> &[usize] {
        &self.classes
    }

    fn predict_proba(&self, data: &Dataset) -> Result<Probabilities, MlError> {
        check_width(self.train.n_features(), data)?;
        let mut distances: Vec<(f64, usize)> = Vec::with_capacity(self.train.len());
        let rows = data
            .rows()
            .map(|query| {
                distances.clear();
                distances.extend(self.train.rows().enumerate().map(|(i, row)| {
                    let d2 = row.iter().zip(query).map(|(a, b)| (a - b).powi(2)).sum();
                    (d2, i)
                }));
                distances.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

                let mut probs = vec![0.0; self.classes.len()];
                for &(_, i) in &distances[..self.k] {
                    if let Some(col) = self.lookup[self.train.label(i)] {
                        probs[col] += 1.0;
                    }
                }
                for p in &mut probs {
                    *p /= self.k as f64;
                }
                probs
            })
            .collect();
        Probabilities::new(self.classes.clone(), rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line() -> Dataset {
        Dataset::new(
            vec!["left".into(), "right".into()],
            vec![vec![0.0], vec![1.0], vec![2.0], vec![10.0], vec![11.0]],
            vec![0, 0, 0, 1, 1],
        )
        .unwrap()
    }

    fn fit(k: f64) -> Result<FitOutcome, FitError> {
        KNearestNeighbors.fit(
            &Candidate::new().with(PARAM_NEIGHBORS, k),
            &line(),
            &FitOptions::default(),
        )
    }

    #[test]
    fn test_neighbor_vote_probabilities() {
        let outcome = fit(3.0).unwrap();
        assert!(outcome.converged);
        let query = Dataset::new(
            vec!["left".into(), "right".into()],
            vec![vec![0.5], vec![10.5], vec![6.0]],
            vec![0, 1, 0],
        )
        .unwrap();
        let predicted = outcome.model.predict_proba(&query).unwrap();
        assert_eq!(predicted.row(0), &[1.0, 0.0]);
        let right = predicted.row(1);
        assert!((right[1] - 2.0 / 3.0).abs() < 1e-12);
        // rows 1 and 4 are both 5 away from 6.0; the earlier row takes the last slot
        let middle = predicted.row(2);
        assert!((middle[0] - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_neighbor_counts() {
        assert!(fit(0.0).is_err());
        assert!(fit(2.5).is_err());
        assert!(fit(6.0).is_err());
        assert!(fit(5.0).is_ok());
    }
}
