//! Dataset sources: labeled tables read from JSON or CSV files.

use crate::data::dataset::Dataset;
use crate::error::MlError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Where a dataset is read from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DataSourceType {
    /// A JSON document shaped like [`DatasetFile`].
    Json { path: PathBuf },
    /// A CSV file with a header row; every column except the label column
    /// must be numeric.
    Csv {
        path: PathBuf,
        #[serde(default = "default_delimiter")]
        delimiter: char,
        /// Label column name; the last column when unset.
        #[serde(default)]
        label_column: Option<String>,
    },
}

fn default_delimiter() -> char {
    ','
}

impl DataSourceType {
    /// Pick a source type from a file extension (`.csv`, anything else is JSON).
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
        if is_csv {
            Self::Csv {
                path,
                delimiter: default_delimiter(),
                label_column: None,
            }
        } else {
            Self::Json { path }
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Json { path } | Self::Csv { path, .. } => path,
        }
    }

    /// Read and validate the dataset.
    pub fn load(&self) -> Result<Dataset, MlError> {
        let content = std::fs::read_to_string(self.path())?;
        let data = match self {
            Self::Json { .. } => parse_json(&content)?,
            Self::Csv {
                delimiter,
                label_column,
                ..
            } => parse_csv(&content, *delimiter, label_column.as_deref())?,
        };
        tracing::debug!(
            path = %self.path().display(),
            rows = data.len(),
            features = data.n_features(),
            classes = data.n_classes(),
            "Loaded dataset"
        );
        Ok(data)
    }
}

/// On-disk JSON layout of a dataset. Labels are class names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetFile {
    /// Class ordering; inferred (sorted, deduplicated) from `labels` when empty.
    #[serde(default)]
    pub classes: Vec<String>,
    pub features: Vec<Vec<f64>>,
    pub labels: Vec<String>,
}

impl DatasetFile {
    pub fn into_dataset(self) -> Result<Dataset, MlError> {
        if self.features.len() != self.labels.len() {
            return Err(MlError::dataset(format!(
                "{} feature rows but {} labels",
                self.features.len(),
                self.labels.len()
            )));
        }
        let (classes, labels) = encode_labels(self.classes, &self.labels)?;
        Dataset::new(classes, self.features, labels)
    }

    pub fn from_dataset(data: &Dataset) -> Self {
        Self {
            classes: data.classes().to_vec(),
            features: data.rows().map(<[f64]>::to_vec).collect(),
            labels: data
                .labels()
                .iter()
                .map(|&l| data.class_name(l).to_string())
                .collect(),
        }
    }
}

pub fn parse_json(content: &str) -> Result<Dataset, MlError> {
    let file: DatasetFile = serde_json::from_str(content)?;
    file.into_dataset()
}

pub fn parse_csv(
    content: &str,
    delimiter: char,
    label_column: Option<&str>,
) -> Result<Dataset, MlError> {
    let mut lines = content.lines().filter(|l| !l.trim().is_empty());
    let columns: Vec<String> = lines
        .next()
        .ok_or_else(|| MlError::dataset("Empty CSV file"))?
        .split(delimiter)
        .map(|s| s.trim().trim_matches('"').to_string())
        .collect();
    if columns.len() < 2 {
        return Err(MlError::dataset(
            "CSV needs at least one feature column and a label column",
        ));
    }
    let label_idx = match label_column {
        Some(name) => columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| MlError::dataset(format!("label column '{name}' not found")))?,
        None => columns.len() - 1,
    };

    let mut features = Vec::new();
    let mut names = Vec::new();
    for (line_no, line) in lines.enumerate() {
        let cells: Vec<&str> = line
            .split(delimiter)
            .map(|s| s.trim().trim_matches('"'))
            .collect();
        if cells.len() != columns.len() {
            return Err(MlError::dataset(format!(
                "CSV row {} has {} cells, expected {}",
                line_no + 1,
                cells.len(),
                columns.len()
            )));
        }
        let mut row = Vec::with_capacity(columns.len() - 1);
        for (i, cell) in cells.iter().enumerate() {
            if i == label_idx {
                names.push(cell.to_string());
                continue;
            }
            let value = cell.parse::<f64>().map_err(|_| {
                MlError::dataset(format!(
                    "CSV row {} column '{}': '{cell}' is not a number",
                    line_no + 1,
                    columns[i]
                ))
            })?;
            row.push(value);
        }
        features.push(row);
    }

    let (classes, labels) = encode_labels(Vec::new(), &names)?;
    Dataset::new(classes, features, labels)
}

fn encode_labels(
    classes: Vec<String>,
    names: &[String],
) -> Result<(Vec<String>, Vec<usize>), MlError> {
    let classes = if classes.is_empty() {
        names
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    } else {
        classes
    };
    let labels = names
        .iter()
        .map(|name| {
            classes
                .iter()
                .position(|c| c == name)
                .ok_or_else(|| MlError::dataset(format!("label '{name}' is not a declared class")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok((classes, labels))
}
