//! Multinomial logistic regression fitted by full-batch gradient descent.

use super::{FitError, FitOptions, FitOutcome, FittedModel, ModelFamily, check_width, class_columns};
use crate::data::Dataset;
use crate::error::MlError;
use crate::score::Probabilities;
use crate::select::Candidate;

/// Inverse L2 regularization strength; larger means weaker regularization.
pub const PARAM_C: &str = "C";

const DEFAULT_C: f64 = 1.0;

/// Softmax regression minimizing `mean cross-entropy + |W|² / (2·C·n)`.
///
/// The step size is `1 / L` with `L` an upper bound on the gradient's
/// Lipschitz constant, so each step decreases the objective. A fit stops
/// once the largest absolute gradient entry drops below `tol`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogisticRegression;

impl ModelFamily for LogisticRegression {
    fn name(&self) -> &str {
        "logistic_regression"
    }

    fn param_names(&self) -> &[&str] {
        &[PARAM_C]
    }

    fn fit(
        &self,
        candidate: &Candidate,
        train: &Dataset,
        options: &FitOptions,
    ) -> Result<FitOutcome, FitError> {
        let c = candidate.get(PARAM_C).unwrap_or(DEFAULT_C);
        if c.is_nan() || c <= 0.0 {
            return Err(FitError::new(format!("C must be positive, got {c}")));
        }
        let (classes, lookup) = class_columns(train);
        if classes.len() < 2 {
            return Err(FitError::new("training data contains a single class"));
        }

        let n = train.len() as f64;
        let d = train.n_features();
        let k = classes.len();
        let stride = d + 1;
        let reg = 1.0 / (c * n);
        let mean_sq_norm = train
            .rows()
            .map(|row| row.iter().map(|x| x * x).sum::<f64>() + 1.0)
            .sum::<f64>()
            / n;
        let step = 1.0 / (0.5 * mean_sq_norm + reg);

        let mut weights = vec![0.0; k * stride];
        let mut grad = vec![0.0; k * stride];
        let mut probs = vec![0.0; k];

        for iteration in 0..options.max_iter {
            grad.fill(0.0);
            let mut loss = 0.0;
            for (i, row) in train.rows().enumerate() {
                softmax(&weights, row, &mut probs);
                // every training label is present by construction
                let truth = lookup[train.label(i)].unwrap_or(0);
                loss -= probs[truth].max(f64::MIN_POSITIVE).ln();
                for (j, &p) in probs.iter().enumerate() {
                    let err = if j == truth { p - 1.0 } else { p };
                    let g = &mut grad[j * stride..(j + 1) * stride];
                    for (gf, x) in g.iter_mut().zip(row) {
                        *gf += err * x;
                    }
                    g[d] += err;
                }
            }

            let mut penalty = 0.0;
            for j in 0..k {
                for f in 0..stride {
                    let idx = j * stride + f;
                    grad[idx] /= n;
                    if f < d {
                        grad[idx] += reg * weights[idx];
                        penalty += weights[idx] * weights[idx];
                    }
                }
            }
            let objective = loss / n + 0.5 * reg * penalty;
            if !objective.is_finite() {
                return Err(FitError::new(format!(
                    "objective diverged at iteration {iteration}"
                )));
            }

            let max_grad = grad.iter().fold(0.0f64, |m, g| m.max(g.abs()));
            if max_grad < options.tol {
                return Ok(FitOutcome {
                    model: Box::new(LogisticModel {
                        classes,
                        n_features: d,
                        weights,
                    }),
                    converged: true,
                    iterations: iteration,
                });
            }

            for (w, g) in weights.iter_mut().zip(&grad) {
                *w -= step * g;
            }
        }

        Ok(FitOutcome {
            model: Box::new(LogisticModel {
                classes,
                n_features: d,
                weights,
            }),
            converged: false,
            iterations: options.max_iter,
        })
    }
}

/// Writes the softmax of `W · [x, 1]` into `out`.
fn softmax(weights: &[f64], row: &[f64], out: &mut [f64]) {
    let stride = row.len() + 1;
    for (j, z) in out.iter_mut().enumerate() {
        let w = &weights[j * stride..(j + 1) * stride];
        *z = w[..row.len()].iter().zip(row).map(|(a, b)| a * b).sum::<f64>() + w[row.len()];
    }
    let max = out.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut sum = 0.0;
    for z in out.iter_mut() {
        *z = (*z - max).exp();
        sum += *z;
    }
    for z in out.iter_mut() {
        *z /= sum;
    }
}

struct LogisticModel {
    classes: Vec<usize>,
    n_features: usize,
    weights: Vec<f64>,
}

impl FittedModel for LogisticModel {
    fn classes(&self) -> &[usize] {
        &self.classes
    }

    fn predict_proba(&self, data: &Dataset) -> Result<Probabilities, MlError> {
        check_width(self.n_features, data)?;
        let rows = data
            .rows()
            .map(|row| {
                let mut probs = vec![0.0; self.classes.len()];
                softmax(&self.weights, row, &mut probs);
                probs
            })
            .collect();
        Probabilities::new(self.classes.clone(), rows)
    }
}
