//! Result records produced by cross-validation and model selection.

use super::Candidate;
use crate::score::Direction;
use crate::split::Fold;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Mean and population standard deviation over the scored folds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub mean: f64,
    pub std: f64,
    pub n_scored: usize,
    pub n_failed: usize,
}

impl ScoreSummary {
    /// `None` entries are failed folds. Returns `None` when nothing scored.
    pub fn from_scores(scores: &[Option<f64>]) -> Option<Self> {
        let scored: Vec<f64> = scores.iter().flatten().copied().collect();
        if scored.is_empty() {
            return None;
        }
        let n = scored.len() as f64;
        let mean = scored.iter().sum::<f64>() / n;
        let variance = scored.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
        Some(Self {
            mean,
            std: variance.sqrt(),
            n_scored: scored.len(),
            n_failed: scores.len() - scored.len(),
        })
    }
}

/// How a single fold's fit ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FoldStatus {
    Ok,
    NotConverged { iterations: usize },
    Failed { reason: String },
}

impl FoldStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, FoldStatus::Failed { .. })
    }
}

/// Score of one candidate on one fold. `score` is `None` when the fit failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldScore {
    pub fold: usize,
    pub score: Option<f64>,
    #[serde(flatten)]
    pub status: FoldStatus,
    pub n_train: usize,
    pub n_test: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub candidate: Candidate,
    pub folds: Vec<FoldScore>,
    /// `None` when every fold failed.
    pub summary: Option<ScoreSummary>,
}

impl CandidateScore {
    pub fn is_feasible(&self) -> bool {
        self.summary.is_some()
    }
}

/// Something worth telling the user that did not abort the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    ConvergenceWarning {
        candidate: Candidate,
        fold: usize,
        iterations: usize,
        max_iter: usize,
    },
    FitFailed {
        candidate: Candidate,
        fold: usize,
        reason: String,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::ConvergenceWarning {
                candidate,
                fold,
                iterations,
                max_iter,
            } => write!(
                f,
                "[{candidate}] fold {fold}: not converged after {iterations}/{max_iter} iterations"
            ),
            Diagnostic::FitFailed {
                candidate,
                fold,
                reason,
            } => write!(f, "[{candidate}] fold {fold}: fit failed: {reason}"),
        }
    }
}

/// Outcome of scoring a single candidate across folds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossValidationReport {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub model: String,
    pub metric: String,
    pub direction: Direction,
    pub seed: u64,
    pub result: CandidateScore,
    pub diagnostics: Vec<Diagnostic>,
}

/// Outcome of a flat grid search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchReport {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub model: String,
    pub metric: String,
    pub direction: Direction,
    pub seed: u64,
    pub best: Candidate,
    pub best_score: f64,
    pub best_std: f64,
    /// Every candidate in grid order, infeasible ones included.
    pub candidates: Vec<CandidateScore>,
    pub n_splits: usize,
    pub diagnostics: Vec<Diagnostic>,
    /// Folds the candidates were scored on, in the searched dataset's index space.
    #[serde(skip)]
    pub folds: Vec<Fold>,
}

impl SearchReport {
    /// Feasible candidates best first; ties keep grid order.
    pub fn ranked(&self) -> Vec<&CandidateScore> {
        let mut ranked: Vec<&CandidateScore> =
            self.candidates.iter().filter(|c| c.is_feasible()).collect();
        let key = |c: &CandidateScore| c.summary.map(|s| s.mean).unwrap_or(f64::NAN);
        ranked.sort_by(|a, b| match self.direction {
            Direction::Minimize => key(a).total_cmp(&key(b)),
            Direction::Maximize => key(b).total_cmp(&key(a)),
        });
        ranked
    }
}

/// One outer fold of a nested search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OuterFold {
    pub fold: usize,
    pub n_train: usize,
    pub n_test: usize,
    /// Winner of the inner search; `None` when no inner candidate was
    /// feasible. Kept when the refit on the outer train fails.
    pub chosen: Option<Candidate>,
    pub inner_best_score: Option<f64>,
    /// Outer test score of the refitted model; `None` on failure.
    pub score: Option<f64>,
    #[serde(flatten)]
    pub status: FoldStatus,
    pub inner_seed: u64,
    /// Inner folds mapped back to the full dataset's index space.
    #[serde(skip)]
    pub inner_folds: Vec<Fold>,
    pub inner_diagnostics: Vec<Diagnostic>,
}

/// Outcome of nested cross-validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NestedReport {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub model: String,
    pub metric: String,
    pub direction: Direction,
    pub seed: u64,
    pub outer_seed: u64,
    pub outer_folds: Vec<OuterFold>,
    /// Summary of outer test scores; the generalization estimate.
    pub summary: ScoreSummary,
    /// Mean of the inner best scores, for gauging selection optimism.
    pub mean_inner_best: Option<f64>,
    pub diagnostics: Vec<Diagnostic>,
    #[serde(skip)]
    pub folds: Vec<Fold>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(c: f64, mean: Option<f64>) -> CandidateScore {
        CandidateScore {
            candidate: Candidate::new().with("C", c),
            folds: Vec::new(),
            summary: mean.map(|mean| ScoreSummary {
                mean,
                std: 0.0,
                n_scored: 1,
                n_failed: 0,
            }),
        }
    }

    #[test]
    fn test_summary_skips_failed_folds() {
        let summary = ScoreSummary::from_scores(&[Some(1.0), None, Some(3.0)]).unwrap();
        assert_eq!(summary.mean, 2.0);
        assert_eq!(summary.std, 1.0);
        assert_eq!(summary.n_scored, 2);
        assert_eq!(summary.n_failed, 1);
        assert!(ScoreSummary::from_scores(&[None, None]).is_none());
        assert!(ScoreSummary::from_scores(&[]).is_none());
    }

    #[test]
    fn test_ranked_respects_direction_and_feasibility() {
        let mut report = SearchReport {
            id: "r".into(),
            created_at: Utc::now(),
            model: "m".into(),
            metric: "log_loss".into(),
            direction: Direction::Minimize,
            seed: 0,
            best: Candidate::new().with("C", 2.0),
            best_score: 0.1,
            best_std: 0.0,
            candidates: vec![
                candidate(1.0, Some(0.5)),
                candidate(2.0, Some(0.1)),
                candidate(3.0, None),
                candidate(4.0, Some(0.5)),
            ],
            n_splits: 1,
            diagnostics: Vec::new(),
            folds: Vec::new(),
        };
        let order: Vec<f64> = report
            .ranked()
            .iter()
            .filter_map(|c| c.candidate.get("C"))
            .collect();
        assert_eq!(order, vec![2.0, 1.0, 4.0]);

        report.direction = Direction::Maximize;
        let order: Vec<f64> = report
            .ranked()
            .iter()
            .filter_map(|c| c.candidate.get("C"))
            .collect();
        assert_eq!(order, vec![1.0, 4.0, 2.0]);
    }

    #[test]
    fn test_fold_status_serializes_inline() {
        let fold = FoldScore {
            fold: 0,
            score: None,
            status: FoldStatus::Failed {
                reason: "boom".into(),
            },
            n_train: 8,
            n_test: 2,
        };
        let json = serde_json::to_value(&fold).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["reason"], "boom");
        assert!(json["score"].is_null());
    }

    #[test]
    fn test_diagnostic_display() {
        let diag = Diagnostic::ConvergenceWarning {
            candidate: Candidate::new().with("C", 1.0),
            fold: 2,
            iterations: 10,
            max_iter: 10,
        };
        assert_eq!(
            diag.to_string(),
            "[C=1] fold 2: not converged after 10/10 iterations"
        );
    }
}
