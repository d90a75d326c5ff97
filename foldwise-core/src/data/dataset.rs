//! In-memory labeled dataset.

use crate::error::MlError;
use serde::{Deserialize, Serialize};

/// An immutable, row-major labeled dataset.
///
/// Labels are indices into the ordered `classes` list. Every row has exactly
/// `n_features` values and every value is finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    classes: Vec<String>,
    n_features: usize,
    features: Vec<f64>,
    labels: Vec<usize>,
}

impl Dataset {
    /// Build a dataset from one feature vector per example.
    pub fn new(
        classes: Vec<String>,
        rows: Vec<Vec<f64>>,
        labels: Vec<usize>,
    ) -> Result<Self, MlError> {
        let n_features = rows.first().map(Vec::len).unwrap_or(0);
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != n_features) {
            return Err(MlError::dataset(format!(
                "row {i} has {} features, expected {n_features}",
                row.len()
            )));
        }
        let features = rows.into_iter().flatten().collect();
        Self::from_flat(classes, n_features, features, labels)
    }

    /// Build a dataset from a row-major feature buffer.
    pub fn from_flat(
        classes: Vec<String>,
        n_features: usize,
        features: Vec<f64>,
        labels: Vec<usize>,
    ) -> Result<Self, MlError> {
        if labels.is_empty() {
            return Err(MlError::dataset("dataset has no rows"));
        }
        if n_features == 0 {
            return Err(MlError::dataset("dataset has no features"));
        }
        if classes.is_empty() {
            return Err(MlError::dataset("dataset has no classes"));
        }
        if features.len() != labels.len() * n_features {
            return Err(MlError::dataset(format!(
                "feature buffer holds {} values, expected {} rows x {n_features} features",
                features.len(),
                labels.len()
            )));
        }
        if let Some(pos) = features.iter().position(|v| !v.is_finite()) {
            return Err(MlError::dataset(format!(
                "non-finite feature value in row {}",
                pos / n_features
            )));
        }
        if let Some((i, &label)) = labels.iter().enumerate().find(|(_, l)| **l >= classes.len()) {
            return Err(MlError::dataset(format!(
                "row {i} has label {label} but only {} classes are defined",
                classes.len()
            )));
        }
        Ok(Self {
            classes,
            n_features,
            features,
            labels,
        })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Name of a class index, or `"?"` for an index outside the class list.
    pub fn class_name(&self, class: usize) -> &str {
        self.classes.get(class).map(String::as_str).unwrap_or("?")
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    pub fn label(&self, index: usize) -> usize {
        self.labels[index]
    }

    pub fn row(&self, index: usize) -> &[f64] {
        let start = index * self.n_features;
        &self.features[start..start + self.n_features]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.features.chunks_exact(self.n_features)
    }

    /// Number of examples per class, indexed like `classes()`.
    pub fn class_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.classes.len()];
        for &label in &self.labels {
            counts[label] += 1;
        }
        counts
    }

    /// Row indices per class, in row order.
    pub fn class_members(&self) -> Vec<Vec<usize>> {
        let mut members = vec![Vec::new(); self.classes.len()];
        for (i, &label) in self.labels.iter().enumerate() {
            members[label].push(i);
        }
        members
    }

    /// Classes that occur at least once, ascending.
    pub fn present_classes(&self) -> Vec<usize> {
        self.class_counts()
            .iter()
            .enumerate()
            .filter(|(_, count)| **count > 0)
            .map(|(class, _)| class)
            .collect()
    }

    /// Owned copy of the selected rows, in the given order.
    ///
    /// The class list is kept whole so labels stay comparable with the
    /// parent dataset.
    pub fn subset(&self, indices: &[usize]) -> Result<Dataset, MlError> {
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.len()) {
            return Err(MlError::invalid_input(format!(
                "row index {bad} out of range for {} rows",
                self.len()
            )));
        }
        let mut features = Vec::with_capacity(indices.len() * self.n_features);
        let mut labels = Vec::with_capacity(indices.len());
        for &i in indices {
            features.extend_from_slice(self.row(i));
            labels.push(self.labels[i]);
        }
        Dataset::from_flat(self.classes.clone(), self.n_features, features, labels)
    }
}
