//! Plain-text rendering of fold layouts and evaluation reports.

use foldwise_core::select::{
    CrossValidationReport, Diagnostic, FoldStatus, NestedReport, SearchReport,
};
use foldwise_core::{Dataset, Fold};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write;

/// Sizes and class make-up of one fold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoldSummary {
    pub fold: usize,
    pub n_train: usize,
    pub n_test: usize,
    pub train_classes: BTreeMap<String, usize>,
    pub test_classes: BTreeMap<String, usize>,
}

pub fn fold_summaries(data: &Dataset, folds: &[Fold]) -> Vec<FoldSummary> {
    let count = |indices: &[usize]| {
        let mut counts = BTreeMap::new();
        for &i in indices {
            *counts
                .entry(data.class_name(data.label(i)).to_string())
                .or_insert(0) += 1;
        }
        counts
    };
    folds
        .iter()
        .map(|fold| FoldSummary {
            fold: fold.index,
            n_train: fold.train.len(),
            n_test: fold.test.len(),
            train_classes: count(&fold.train),
            test_classes: count(&fold.test),
        })
        .collect()
}

fn class_counts(counts: &BTreeMap<String, usize>) -> String {
    counts
        .iter()
        .map(|(class, n)| format!("{class}={n}"))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn split(data: &Dataset, summaries: &[FoldSummary]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} rows, {} features, {} classes",
        data.len(),
        data.n_features(),
        data.n_classes()
    );
    let _ = writeln!(out, "{:>4}  {:>6}  {:>6}  test classes", "fold", "train", "test");
    for s in summaries {
        let _ = writeln!(
            out,
            "{:>4}  {:>6}  {:>6}  {}",
            s.fold,
            s.n_train,
            s.n_test,
            class_counts(&s.test_classes)
        );
    }
    out
}

fn score(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.4}"))
}

fn status(status: &FoldStatus) -> String {
    match status {
        FoldStatus::Ok => "ok".to_string(),
        FoldStatus::NotConverged { iterations } => format!("not converged ({iterations} it)"),
        FoldStatus::Failed { reason } => format!("failed: {reason}"),
    }
}

fn diagnostics(out: &mut String, diagnostics: &[Diagnostic]) {
    if diagnostics.is_empty() {
        return;
    }
    let _ = writeln!(out, "\nDiagnostics ({}):", diagnostics.len());
    for d in diagnostics {
        let _ = writeln!(out, "  {d}");
    }
}

pub fn cross_validation(report: &CrossValidationReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Cross-validation of {} [{}] with {} (seed {})",
        report.model, report.result.candidate, report.metric, report.seed
    );
    let _ = writeln!(out, "{:>4}  {:>6}  {:>6}  {:>10}  status", "fold", "train", "test", "score");
    for f in &report.result.folds {
        let _ = writeln!(
            out,
            "{:>4}  {:>6}  {:>6}  {:>10}  {}",
            f.fold,
            f.n_train,
            f.n_test,
            score(f.score),
            status(&f.status)
        );
    }
    if let Some(s) = report.result.summary {
        let _ = writeln!(out, "\nMean {}: {:.4} ± {:.4}", report.metric, s.mean, s.std);
    }
    diagnostics(&mut out, &report.diagnostics);
    out
}

pub fn search(report: &SearchReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Grid search of {} over {} candidates, {} folds, {} (seed {})",
        report.model,
        report.candidates.len(),
        report.n_splits,
        report.metric,
        report.seed
    );
    let _ = writeln!(out, "{:>4}  {:>10}  {:>8}  {:>6}  candidate", "rank", "mean", "std", "failed");
    for (rank, c) in report.ranked().iter().enumerate() {
        if let Some(s) = c.summary {
            let _ = writeln!(
                out,
                "{:>4}  {:>10.4}  {:>8.4}  {:>6}  {}",
                rank + 1,
                s.mean,
                s.std,
                s.n_failed,
                c.candidate
            );
        }
    }
    for c in report.candidates.iter().filter(|c| !c.is_feasible()) {
        let _ = writeln!(out, "{:>4}  {:>10}  {:>8}  {:>6}  {}", "-", "-", "-", c.folds.len(), c.candidate);
    }
    let _ = writeln!(
        out,
        "\nBest: {} ({} {:.4} ± {:.4})",
        report.best, report.metric, report.best_score, report.best_std
    );
    diagnostics(&mut out, &report.diagnostics);
    out
}

pub fn nested(report: &NestedReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Nested cross-validation of {} with {}, {} outer folds (seed {})",
        report.model,
        report.metric,
        report.outer_folds.len(),
        report.seed
    );
    let _ = writeln!(
        out,
        "{:>4}  {:>10}  {:>10}  {:<24}  status",
        "fold", "inner best", "outer", "chosen"
    );
    for f in &report.outer_folds {
        let chosen = f
            .chosen
            .as_ref()
            .map_or_else(|| "-".to_string(), ToString::to_string);
        let _ = writeln!(
            out,
            "{:>4}  {:>10}  {:>10}  {:<24}  {}",
            f.fold,
            score(f.inner_best_score),
            score(f.score),
            chosen,
            status(&f.status)
        );
    }
    let _ = writeln!(
        out,
        "\nGeneralization estimate ({}): {:.4} ± {:.4} over {} scored folds",
        report.metric, report.summary.mean, report.summary.std, report.summary.n_scored
    );
    if let Some(inner) = report.mean_inner_best {
        let _ = writeln!(out, "Mean inner best: {inner:.4}");
    }
    let all: Vec<Diagnostic> = report
        .outer_folds
        .iter()
        .flat_map(|f| f.inner_diagnostics.iter())
        .chain(&report.diagnostics)
        .cloned()
        .collect();
    diagnostics(&mut out, &all);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use foldwise_core::select::{CandidateScore, FoldScore, ScoreSummary};
    use foldwise_core::{Candidate, Direction, Splitter};
    use pretty_assertions::assert_eq;

    fn data() -> Dataset {
        Dataset::new(
            vec!["a".into(), "b".into()],
            (0..8).map(|i| vec![i as f64]).collect(),
            vec![0, 0, 0, 0, 1, 1, 1, 1],
        )
        .unwrap()
    }

    #[test]
    fn test_fold_summaries_count_classes() {
        let data = data();
        let folds = Splitter::k_fold(2).stratified(true).split(&data, 1).unwrap();
        let summaries = fold_summaries(&data, &folds);
        assert_eq!(summaries.len(), 2);
        for s in &summaries {
            assert_eq!(s.n_test, 4);
            assert_eq!(s.test_classes.get("a"), Some(&2));
            assert_eq!(s.train_classes.get("b"), Some(&2));
        }
        let text = split(&data, &summaries);
        assert!(text.starts_with("8 rows, 1 features, 2 classes\n"));
        assert!(text.contains("a=2 b=2"));
    }

    #[test]
    fn test_search_lists_infeasible_candidates_last() {
        let feasible = CandidateScore {
            candidate: Candidate::new().with("C", 1.0),
            folds: Vec::new(),
            summary: Some(ScoreSummary {
                mean: 0.25,
                std: 0.05,
                n_scored: 2,
                n_failed: 0,
            }),
        };
        let failed = CandidateScore {
            candidate: Candidate::new().with("C", -1.0),
            folds: vec![FoldScore {
                fold: 0,
                score: None,
                status: FoldStatus::Failed {
                    reason: "C must be positive".into(),
                },
                n_train: 4,
                n_test: 4,
            }],
            summary: None,
        };
        let report = SearchReport {
            id: "id".into(),
            created_at: chrono::DateTime::UNIX_EPOCH,
            model: "logistic_regression".into(),
            metric: "log_loss".into(),
            direction: Direction::Minimize,
            seed: 3,
            best: feasible.candidate.clone(),
            best_score: 0.25,
            best_std: 0.05,
            candidates: vec![failed, feasible],
            n_splits: 1,
            diagnostics: vec![Diagnostic::FitFailed {
                candidate: Candidate::new().with("C", -1.0),
                fold: 0,
                reason: "C must be positive".into(),
            }],
            folds: Vec::new(),
        };
        let text = search(&report);
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[2].trim_start().starts_with("1"));
        assert!(lines[2].ends_with("C=1"));
        assert!(lines[3].ends_with("C=-1"));
        assert!(text.contains("Best: C=1 (log_loss 0.2500 ± 0.0500)"));
        assert!(text.contains("fit failed: C must be positive"));
    }
}
