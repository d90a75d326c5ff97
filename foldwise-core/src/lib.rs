//! # foldwise-core: splitting, scoring and model selection
//!
//! The pieces of an honest model evaluation:
//!
//! - [`split`] cuts a [`Dataset`] into train/test folds (holdout, k-fold,
//!   repeated k-fold, shuffle-split), optionally stratified by class.
//! - [`score`] turns true labels and predicted class probabilities into a
//!   number; log-loss is the default metric.
//! - [`select`] runs flat grid search and nested cross-validation over any
//!   [`ModelFamily`], recording non-converged and failed fits as diagnostics
//!   instead of aborting.
//!
//! ```no_run
//! use foldwise_core::{HarnessConfig, DataSourceType};
//!
//! # fn main() -> Result<(), foldwise_core::MlError> {
//! let data = DataSourceType::from_path("iris.json").load()?;
//! let config = HarnessConfig::default();
//! let report = config.nested_search().run(&data, config.seed)?;
//! println!("{:.4} ± {:.4}", report.summary.mean, report.summary.std);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod model;
pub mod pool;
pub mod score;
pub mod seed;
pub mod select;
pub mod split;

pub use config::{HarnessConfig, load_config};
pub use data::{DataSourceType, Dataset, DatasetFile};
pub use error::MlError;
pub use model::{
    FitError, FitOptions, FitOutcome, FittedModel, KNearestNeighbors, LogisticRegression,
    ModelFamily, ModelKind,
};
pub use score::{Direction, MetricKind, Probabilities, Scorer};
pub use seed::SeedManager;
pub use select::{
    Candidate, GridSearch, NestedReport, NestedSearch, ParamGrid, SearchReport, cross_validate,
};
pub use split::{Fold, SplitPolicy, Splitter};
