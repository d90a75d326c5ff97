//! Fit-and-score over a (candidate × fold) task grid.

use super::Candidate;
use super::report::{CandidateScore, Diagnostic, FoldScore, FoldStatus, ScoreSummary};
use crate::data::Dataset;
use crate::error::MlError;
use crate::model::{FitOptions, ModelFamily};
use crate::pool::run_indexed;
use crate::score::{Direction, Scorer};
use crate::split::Fold;
use std::sync::Arc;
use tracing::{debug, warn};

/// Train and test rows of one fold, materialized once and shared read-only.
#[derive(Debug)]
pub(crate) struct FoldData {
    pub index: usize,
    pub train: Dataset,
    pub test: Dataset,
}

pub(crate) fn materialize(data: &Dataset, folds: &[Fold]) -> Result<Vec<Arc<FoldData>>, MlError> {
    folds
        .iter()
        .map(|fold| {
            Ok(Arc::new(FoldData {
                index: fold.index,
                train: data.subset(&fold.train)?,
                test: data.subset(&fold.test)?,
            }))
        })
        .collect()
}

/// What a single fit/score task produced.
#[derive(Debug)]
enum TaskResult {
    Scored {
        score: f64,
        converged: bool,
        iterations: usize,
    },
    FitFailed {
        reason: String,
    },
}

pub(crate) struct Evaluation {
    pub candidates: Vec<CandidateScore>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Fit every candidate on every fold and score it on the fold's test rows.
///
/// Fit failures become fold diagnostics. Any other error aborts; when several
/// tasks fail that way, the one earliest in (candidate, fold) order wins.
pub(crate) fn evaluate_grid(
    family: &dyn ModelFamily,
    scorer: &dyn Scorer,
    candidates: &[Candidate],
    folds: &[Arc<FoldData>],
    options: &FitOptions,
    workers: usize,
) -> Result<Evaluation, MlError> {
    let tasks: Vec<(usize, Arc<FoldData>)> = (0..candidates.len())
        .flat_map(|c| folds.iter().map(move |f| (c, Arc::clone(f))))
        .collect();

    let results = run_indexed(tasks, workers, |(c, fold)| {
        evaluate_task(family, scorer, &candidates[c], &fold, options)
    });

    let mut results = results.into_iter();
    let mut scored = Vec::with_capacity(candidates.len());
    let mut diagnostics = Vec::new();
    for candidate in candidates {
        let mut fold_scores = Vec::with_capacity(folds.len());
        for fold in folds {
            let result = results
                .next()
                .ok_or_else(|| MlError::invalid_input("evaluation returned too few results"))??;
            let (score, status) = match result {
                TaskResult::Scored {
                    score,
                    converged: true,
                    ..
                } => (Some(score), FoldStatus::Ok),
                TaskResult::Scored {
                    score, iterations, ..
                } => {
                    let diagnostic = Diagnostic::ConvergenceWarning {
                        candidate: candidate.clone(),
                        fold: fold.index,
                        iterations,
                        max_iter: options.max_iter,
                    };
                    warn!("{diagnostic}");
                    diagnostics.push(diagnostic);
                    (Some(score), FoldStatus::NotConverged { iterations })
                }
                TaskResult::FitFailed { reason } => {
                    let diagnostic = Diagnostic::FitFailed {
                        candidate: candidate.clone(),
                        fold: fold.index,
                        reason: reason.clone(),
                    };
                    warn!("{diagnostic}");
                    diagnostics.push(diagnostic);
                    (None, FoldStatus::Failed { reason })
                }
            };
            fold_scores.push(FoldScore {
                fold: fold.index,
                score,
                status,
                n_train: fold.train.len(),
                n_test: fold.test.len(),
            });
        }
        let scores: Vec<Option<f64>> = fold_scores.iter().map(|f| f.score).collect();
        scored.push(CandidateScore {
            candidate: candidate.clone(),
            summary: ScoreSummary::from_scores(&scores),
            folds: fold_scores,
        });
    }

    Ok(Evaluation {
        candidates: scored,
        diagnostics,
    })
}

fn evaluate_task(
    family: &dyn ModelFamily,
    scorer: &dyn Scorer,
    candidate: &Candidate,
    fold: &FoldData,
    options: &FitOptions,
) -> Result<TaskResult, MlError> {
    let outcome = match family.fit(candidate, &fold.train, options) {
        Ok(outcome) => outcome,
        Err(err) => {
            return Ok(TaskResult::FitFailed { reason: err.reason });
        }
    };
    let predicted = outcome.model.predict_proba(&fold.test)?;
    let score = scorer.score(fold.test.labels(), &predicted)?;
    debug!(
        candidate = %candidate,
        fold = fold.index,
        score,
        converged = outcome.converged,
        "Scored fold"
    );
    Ok(TaskResult::Scored {
        score,
        converged: outcome.converged,
        iterations: outcome.iterations,
    })
}

/// Index and summary of the best feasible candidate; ties go to the earlier one.
pub(crate) fn select_best(
    candidates: &[CandidateScore],
    direction: Direction,
) -> Option<(usize, ScoreSummary)> {
    let mut best: Option<(usize, ScoreSummary)> = None;
    for (i, candidate) in candidates.iter().enumerate() {
        let Some(summary) = candidate.summary else {
            continue;
        };
        match best {
            Some((_, incumbent)) if !direction.is_better(summary.mean, incumbent.mean) => {}
            _ => best = Some((i, summary)),
        }
    }
    best
}
