//! Nested cross-validation: grid search inside every outer training partition.

use super::report::{Diagnostic, FoldStatus, NestedReport, OuterFold, ScoreSummary};
use super::search::GridSearch;
use crate::data::Dataset;
use crate::error::MlError;
use crate::seed::{INNER, OUTER, SeedManager};
use crate::split::{Fold, Splitter};
use chrono::Utc;
use tracing::{info, warn};

/// Generalization estimate for the whole selection procedure.
///
/// Each outer fold runs `inner` on its training rows only, refits the chosen
/// candidate on those rows and scores it once on the outer test rows. Outer
/// and inner splitters draw from separate seeds derived from the run seed.
#[derive(Clone)]
pub struct NestedSearch {
    pub inner: GridSearch,
    pub outer: Splitter,
}

impl NestedSearch {
    pub fn new(inner: GridSearch, outer: Splitter) -> Self {
        Self { inner, outer }
    }

    pub fn run(&self, data: &Dataset, seed: u64) -> Result<NestedReport, MlError> {
        // surface grid problems before any fitting
        self.inner.candidates()?;

        let seeds = SeedManager::new(seed);
        let outer_seed = seeds.seed_for(OUTER, 0);
        let folds = self.outer.split(data, outer_seed)?;
        info!(
            model = self.inner.model.name(),
            outer_folds = folds.len(),
            inner_folds = self.inner.splitter.n_splits(),
            "Starting nested search"
        );

        let mut outer_folds = Vec::with_capacity(folds.len());
        let mut diagnostics = Vec::new();
        for fold in &folds {
            let inner_seed = seeds.seed_for(INNER, fold.index as u64);
            let outer = self.run_outer_fold(data, fold, inner_seed, &mut diagnostics)?;
            outer_folds.push(outer);
        }

        let scores: Vec<Option<f64>> = outer_folds.iter().map(|f| f.score).collect();
        let summary = ScoreSummary::from_scores(&scores).ok_or_else(|| {
            MlError::no_feasible_candidate(format!(
                "every one of the {} outer folds failed",
                folds.len()
            ))
        })?;
        let inner_best: Vec<Option<f64>> =
            outer_folds.iter().map(|f| f.inner_best_score).collect();
        let mean_inner_best = ScoreSummary::from_scores(&inner_best).map(|s| s.mean);
        info!(
            score = summary.mean,
            std = summary.std,
            failed = summary.n_failed,
            "Nested search finished"
        );

        Ok(NestedReport {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            model: self.inner.model.name().to_string(),
            metric: self.inner.scorer.name().to_string(),
            direction: self.inner.scorer.direction(),
            seed,
            outer_seed,
            outer_folds,
            summary,
            mean_inner_best,
            diagnostics,
            folds,
        })
    }

    /// Inner search, refit and outer scoring for one outer fold. Failures
    /// that leave the fold unscored are recorded in the returned record.
    fn run_outer_fold(
        &self,
        data: &Dataset,
        fold: &Fold,
        inner_seed: u64,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<OuterFold, MlError> {
        let train = data.subset(&fold.train)?;
        let test = data.subset(&fold.test)?;
        let mut record = OuterFold {
            fold: fold.index,
            n_train: train.len(),
            n_test: test.len(),
            chosen: None,
            inner_best_score: None,
            score: None,
            status: FoldStatus::Ok,
            inner_seed,
            inner_folds: Vec::new(),
            inner_diagnostics: Vec::new(),
        };

        let inner = match self.inner.run(&train, inner_seed) {
            Ok(report) => report,
            Err(MlError::NoFeasibleCandidate(reason)) => {
                warn!(fold = fold.index, %reason, "No feasible inner candidate");
                record.status = FoldStatus::Failed { reason };
                return Ok(record);
            }
            Err(err) => return Err(err),
        };
        record.inner_folds = inner
            .folds
            .iter()
            .map(|f| Fold {
                index: f.index,
                train: f.train.iter().map(|&i| fold.train[i]).collect(),
                test: f.test.iter().map(|&i| fold.train[i]).collect(),
            })
            .collect();
        record.chosen = Some(inner.best.clone());
        record.inner_best_score = Some(inner.best_score);
        record.inner_diagnostics = inner.diagnostics;

        let options = &self.inner.fit_options;
        let outcome = match self.inner.model.fit(&inner.best, &train, options) {
            Ok(outcome) => outcome,
            Err(err) => {
                let diagnostic = Diagnostic::FitFailed {
                    candidate: inner.best,
                    fold: fold.index,
                    reason: err.reason.clone(),
                };
                warn!("outer {diagnostic}");
                diagnostics.push(diagnostic);
                record.status = FoldStatus::Failed { reason: err.reason };
                return Ok(record);
            }
        };
        if !outcome.converged {
            let diagnostic = Diagnostic::ConvergenceWarning {
                candidate: inner.best,
                fold: fold.index,
                iterations: outcome.iterations,
                max_iter: options.max_iter,
            };
            warn!("outer {diagnostic}");
            diagnostics.push(diagnostic);
            record.status = FoldStatus::NotConverged {
                iterations: outcome.iterations,
            };
        }

        let predicted = outcome.model.predict_proba(&test)?;
        let score = self.inner.scorer.score(test.labels(), &predicted)?;
        info!(
            fold = fold.index,
            chosen = %record.chosen.as_ref().map(ToString::to_string).unwrap_or_default(),
            inner_best = inner.best_score,
            score,
            "Outer fold scored"
        );
        record.score = Some(score);
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::KNearestNeighbors;
    use crate::score::Accuracy;
    use crate::select::ParamGrid;
    use std::sync::Arc;

    fn three_clusters() -> Dataset {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..24 {
            let jitter = (i % 6) as f64 * 0.2;
            for (class, centre) in [(0, -3.0), (1, 0.0), (2, 3.0)] {
                rows.push(vec![centre + jitter, jitter - 0.5]);
                labels.push(class);
            }
        }
        Dataset::new(vec!["x".into(), "y".into(), "z".into()], rows, labels).unwrap()
    }

    fn nested() -> NestedSearch {
        let inner = GridSearch::new(
            Arc::new(KNearestNeighbors),
            Arc::new(Accuracy),
            ParamGrid::new().param("n_neighbors", [1.0, 5.0]),
            Splitter::k_fold(3).stratified(true),
        )
        .with_workers(2);
        NestedSearch::new(inner, Splitter::k_fold(4).stratified(true))
    }

    #[test]
    fn test_inner_folds_live_inside_outer_train() {
        let data = three_clusters();
        let report = nested().run(&data, 21).unwrap();
        assert_eq!(report.outer_folds.len(), 4);
        for (outer, fold) in report.outer_folds.iter().zip(&report.folds) {
            assert_eq!(outer.n_train + outer.n_test, data.len());
            assert_eq!(outer.inner_folds.len(), 3);
            for inner in &outer.inner_folds {
                assert!(inner.test.iter().all(|i| fold.train.contains(i)));
                assert!(inner.test.iter().all(|i| !fold.test.contains(i)));
            }
            assert!(outer.chosen.is_some());
            assert!(outer.score.is_some());
        }
        assert!(report.summary.mean > 0.9);
        assert_ne!(report.outer_seed, report.outer_folds[0].inner_seed);
    }

    #[test]
    fn test_same_seed_same_outcome() {
        let data = three_clusters();
        let a = nested().run(&data, 8).unwrap();
        let b = nested().run(&data, 8).unwrap();
        assert_eq!(a.outer_folds, b.outer_folds);
        assert_eq!(a.summary, b.summary);
    }

    #[test]
    fn test_every_outer_fold_failing_is_infeasible() {
        let mut search = nested();
        search.inner.grid = ParamGrid::new().param("n_neighbors", [1000.0]);
        let err = search.run(&three_clusters(), 1).unwrap_err();
        assert!(matches!(err, MlError::NoFeasibleCandidate(_)));
    }
}
