//! Model selection: grid search, nested cross-validation and the failure
//! policy that keeps one bad fit from sinking a whole run.

mod evaluate;
pub mod grid;
pub mod nested;
pub mod report;
pub mod search;

pub use grid::{Candidate, ParamGrid};
pub use nested::NestedSearch;
pub use report::{
    CandidateScore, CrossValidationReport, Diagnostic, FoldScore, FoldStatus, NestedReport,
    OuterFold, ScoreSummary, SearchReport,
};
pub use search::{GridSearch, cross_validate};
