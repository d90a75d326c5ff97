//! Hyperparameter candidates and the grids that expand into them.

use crate::error::MlError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// An immutable assignment of values to named hyperparameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Candidate {
    params: BTreeMap<String, f64>,
}

impl Candidate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.params.insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.params.get(name).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.params.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Parse `name=value[,name=value...]`.
    pub fn parse(text: &str) -> Result<Self, MlError> {
        let mut candidate = Candidate::new();
        for part in text.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (name, value) = part
                .split_once('=')
                .ok_or_else(|| MlError::invalid_input(format!("expected name=value, got '{part}'")))?;
            let value = value.trim().parse::<f64>().map_err(|_| {
                MlError::invalid_input(format!("'{value}' is not a number in '{part}'"))
            })?;
            candidate = candidate.with(name.trim(), value);
        }
        Ok(candidate)
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.params.is_empty() {
            return f.write_str("(defaults)");
        }
        let parts: Vec<String> = self.iter().map(|(k, v)| format!("{k}={v}")).collect();
        f.write_str(&parts.join(", "))
    }
}

/// Named value lists; expands to their cartesian product.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamGrid {
    params: Vec<(String, Vec<f64>)>,
}

impl ParamGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a parameter's candidate values.
    pub fn param(mut self, name: impl Into<String>, values: impl IntoIterator<Item = f64>) -> Self {
        let name = name.into();
        let values: Vec<f64> = values.into_iter().collect();
        match self.params.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = values,
            None => self.params.push((name, values)),
        }
        self
    }

    /// Parse `name=v1,v2,...`.
    pub fn parse_param(self, text: &str) -> Result<Self, MlError> {
        let (name, values) = text
            .split_once('=')
            .ok_or_else(|| MlError::invalid_input(format!("expected name=v1,v2,..., got '{text}'")))?;
        let values = values
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| {
                v.parse::<f64>()
                    .map_err(|_| MlError::invalid_input(format!("'{v}' is not a number in '{text}'")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.param(name.trim(), values))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.params.iter().map(|(n, v)| (n.as_str(), v.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of candidates the grid expands to.
    pub fn len(&self) -> usize {
        if self.params.is_empty() {
            return 0;
        }
        self.params.iter().map(|(_, v)| v.len()).product()
    }

    /// Cartesian product; the first parameter varies slowest.
    pub fn candidates(&self) -> Vec<Candidate> {
        if self.params.is_empty() {
            return Vec::new();
        }
        let mut configs = vec![Candidate::new()];
        for (name, values) in &self.params {
            let mut expanded = Vec::with_capacity(configs.len() * values.len());
            for config in &configs {
                for &value in values {
                    expanded.push(config.clone().with(name.clone(), value));
                }
            }
            configs = expanded;
        }
        configs
    }
}

impl From<BTreeMap<String, Vec<f64>>> for ParamGrid {
    fn from(map: BTreeMap<String, Vec<f64>>) -> Self {
        map.into_iter()
            .fold(ParamGrid::new(), |grid, (name, values)| grid.param(name, values))
    }
}
