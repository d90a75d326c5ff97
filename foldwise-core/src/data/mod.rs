//! Labeled datasets and the sources they are read from.

pub mod dataset;
pub mod source;

pub use dataset::Dataset;
pub use source::{DataSourceType, DatasetFile};
