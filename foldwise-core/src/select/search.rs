//! Flat grid search and single-candidate cross-validation.

use super::evaluate::{evaluate_grid, materialize, select_best};
use super::report::{CrossValidationReport, SearchReport};
use super::{Candidate, ParamGrid};
use crate::data::Dataset;
use crate::error::MlError;
use crate::model::{FitOptions, FitOutcome, ModelFamily};
use crate::pool::default_workers;
use crate::score::Scorer;
use crate::split::Splitter;
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

/// Exhaustive search over a parameter grid, scored by cross-validation.
#[derive(Clone)]
pub struct GridSearch {
    pub model: Arc<dyn ModelFamily>,
    pub scorer: Arc<dyn Scorer>,
    pub grid: ParamGrid,
    pub splitter: Splitter,
    pub fit_options: FitOptions,
    pub workers: usize,
}

impl GridSearch {
    pub fn new(
        model: Arc<dyn ModelFamily>,
        scorer: Arc<dyn Scorer>,
        grid: ParamGrid,
        splitter: Splitter,
    ) -> Self {
        Self {
            model,
            scorer,
            grid,
            splitter,
            fit_options: FitOptions::default(),
            workers: default_workers(),
        }
    }

    pub fn with_fit_options(mut self, fit_options: FitOptions) -> Self {
        self.fit_options = fit_options;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Expand the grid, rejecting empty grids and unknown parameter names.
    pub(crate) fn candidates(&self) -> Result<Vec<Candidate>, MlError> {
        let known = self.model.param_names();
        if let Some(unknown) = self.grid.names().find(|n| !known.contains(n)) {
            return Err(MlError::invalid_input(format!(
                "'{}' does not accept parameter '{unknown}' (expected one of: {})",
                self.model.name(),
                known.join(", ")
            )));
        }
        let candidates = self.grid.candidates();
        if candidates.is_empty() {
            return Err(MlError::invalid_input("parameter grid is empty"));
        }
        Ok(candidates)
    }

    /// Score every candidate on the folds drawn with `seed` and pick the best.
    pub fn run(&self, data: &Dataset, seed: u64) -> Result<SearchReport, MlError> {
        let candidates = self.candidates()?;
        let folds = self.splitter.split(data, seed)?;
        let fold_data = materialize(data, &folds)?;
        info!(
            model = self.model.name(),
            metric = self.scorer.name(),
            candidates = candidates.len(),
            folds = folds.len(),
            "Starting grid search"
        );

        let evaluation = evaluate_grid(
            self.model.as_ref(),
            self.scorer.as_ref(),
            &candidates,
            &fold_data,
            &self.fit_options,
            self.workers,
        )?;
        let direction = self.scorer.direction();
        let (best, summary) = select_best(&evaluation.candidates, direction).ok_or_else(|| {
            MlError::no_feasible_candidate(format!(
                "all {} candidates failed on every fold",
                candidates.len()
            ))
        })?;
        let winner = &evaluation.candidates[best];
        info!(
            best = %winner.candidate,
            score = summary.mean,
            std = summary.std,
            diagnostics = evaluation.diagnostics.len(),
            "Grid search finished"
        );

        Ok(SearchReport {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            model: self.model.name().to_string(),
            metric: self.scorer.name().to_string(),
            direction,
            seed,
            best: winner.candidate.clone(),
            best_score: summary.mean,
            best_std: summary.std,
            n_splits: folds.len(),
            candidates: evaluation.candidates,
            diagnostics: evaluation.diagnostics,
            folds,
        })
    }

    /// Fit the winning candidate of `report` on all of `data`.
    pub fn refit_best(&self, data: &Dataset, report: &SearchReport) -> Result<FitOutcome, MlError> {
        let outcome = self.model.fit(&report.best, data, &self.fit_options)?;
        if !outcome.converged {
            tracing::warn!(
                candidate = %report.best,
                iterations = outcome.iterations,
                "Final refit did not converge"
            );
        }
        Ok(outcome)
    }
}

/// Score one candidate across the folds drawn with `seed`, without selection.
///
/// Fails with `NoFeasibleCandidate` if the candidate fails on every fold.
#[allow(clippy::too_many_arguments)]
pub fn cross_validate(
    model: &dyn ModelFamily,
    candidate: &Candidate,
    data: &Dataset,
    splitter: &Splitter,
    scorer: &dyn Scorer,
    options: &FitOptions,
    seed: u64,
    workers: usize,
) -> Result<CrossValidationReport, MlError> {
    let known = model.param_names();
    if let Some(unknown) = candidate.names().find(|n| !known.contains(n)) {
        return Err(MlError::invalid_input(format!(
            "'{}' does not accept parameter '{unknown}'",
            model.name()
        )));
    }
    let folds = splitter.split(data, seed)?;
    let fold_data = materialize(data, &folds)?;
    let mut evaluation = evaluate_grid(
        model,
        scorer,
        std::slice::from_ref(candidate),
        &fold_data,
        options,
        workers,
    )?;
    let result = evaluation
        .candidates
        .pop()
        .ok_or_else(|| MlError::invalid_input("cross-validation produced no result"))?;
    let Some(summary) = result.summary else {
        return Err(MlError::no_feasible_candidate(format!(
            "candidate {candidate} failed on all {} folds",
            folds.len()
        )));
    };
    info!(
        model = model.name(),
        candidate = %candidate,
        score = summary.mean,
        std = summary.std,
        "Cross-validation finished"
    );

    Ok(CrossValidationReport {
        id: uuid::Uuid::new_v4().to_string(),
        created_at: Utc::now(),
        model: model.name().to_string(),
        metric: scorer.name().to_string(),
        direction: scorer.direction(),
        seed,
        result,
        diagnostics: evaluation.diagnostics,
    })
}
