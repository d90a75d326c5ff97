//! Configuration system for foldwise.
//!
//! Uses `figment` for layered configuration: defaults -> config file -> environment -> overrides.
//! Configuration is loaded from `~/.config/foldwise/config.toml` and/or `.foldwise/config.toml`
//! in the workspace directory.

use crate::error::MlError;
use crate::model::{FitOptions, ModelKind};
use crate::pool::default_workers;
use crate::score::MetricKind;
use crate::select::{GridSearch, NestedSearch, ParamGrid};
use crate::split::{SplitPolicy, Splitter};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Settings shared by every foldwise run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Run seed; every fold assignment derives from it.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Worker threads for fold evaluation (defaults to available parallelism).
    #[serde(default)]
    pub workers: Option<usize>,
    #[serde(default)]
    pub metric: MetricKind,
    #[serde(default)]
    pub model: ModelKind,
    /// Splitter for cross-validation and flat search (the inner splitter when nested).
    #[serde(default)]
    pub split: Splitter,
    /// Outer splitter for nested search.
    #[serde(default = "default_outer")]
    pub outer: Splitter,
    #[serde(default)]
    pub fit: FitOptions,
    /// Parameter grid; empty means the model's default grid.
    #[serde(default)]
    pub grid: BTreeMap<String, Vec<f64>>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            workers: None,
            metric: MetricKind::default(),
            model: ModelKind::default(),
            split: Splitter::default(),
            outer: default_outer(),
            fit: FitOptions::default(),
            grid: BTreeMap::new(),
        }
    }
}

fn default_seed() -> u64 {
    42
}

fn default_outer() -> Splitter {
    Splitter::new(SplitPolicy::KFold {
        n_folds: 5,
        shuffle: true,
    })
    .stratified(true)
}

impl HarnessConfig {
    /// Reject settings that no run could use.
    pub fn validate(&self) -> Result<(), MlError> {
        if self.workers == Some(0) {
            return Err(MlError::config("workers must be at least 1"));
        }
        if self.fit.max_iter == 0 {
            return Err(MlError::config("fit.max_iter must be at least 1"));
        }
        if self.fit.tol.is_nan() || self.fit.tol <= 0.0 {
            return Err(MlError::config(format!(
                "fit.tol must be positive, got {}",
                self.fit.tol
            )));
        }
        for (name, splitter) in [("split", &self.split), ("outer", &self.outer)] {
            if splitter.n_splits() == 0 {
                return Err(MlError::config(format!("{name} produces no folds")));
            }
        }
        let family = self.model.family();
        if let Some(unknown) = self
            .grid
            .keys()
            .find(|k| !family.param_names().contains(&k.as_str()))
        {
            return Err(MlError::config(format!(
                "grid parameter '{unknown}' is not understood by {}",
                self.model
            )));
        }
        if let Some((name, _)) = self.grid.iter().find(|(_, values)| values.is_empty()) {
            return Err(MlError::config(format!("grid parameter '{name}' has no values")));
        }
        Ok(())
    }

    pub fn workers(&self) -> usize {
        self.workers.unwrap_or_else(default_workers)
    }

    pub fn param_grid(&self) -> ParamGrid {
        if self.grid.is_empty() {
            self.model.default_grid()
        } else {
            ParamGrid::from(self.grid.clone())
        }
    }

    pub fn grid_search(&self) -> GridSearch {
        GridSearch::new(
            self.model.family(),
            Arc::from(self.metric.scorer()),
            self.param_grid(),
            self.split.clone(),
        )
        .with_fit_options(self.fit)
        .with_workers(self.workers())
    }

    pub fn nested_search(&self) -> NestedSearch {
        NestedSearch::new(self.grid_search(), self.outer.clone())
    }
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (passed as argument)
/// 2. Environment variables (prefixed with `FOLDWISE_`)
/// 3. Workspace-local config (`.foldwise/config.toml`)
/// 4. User config (`~/.config/foldwise/config.toml`)
/// 5. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&HarnessConfig>,
) -> Result<HarnessConfig, MlError> {
    let mut figment = Figment::from(Serialized::defaults(HarnessConfig::default()));

    if let Some(user_config) = user_config_path() {
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = workspace_config_path(ws);
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // FOLDWISE_SEED, FOLDWISE_FIT__MAX_ITER, FOLDWISE_SPLIT__POLICY__N_FOLDS, ...
    figment = figment.merge(Env::prefixed("FOLDWISE_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    let config: HarnessConfig = figment
        .extract()
        .map_err(|e| MlError::config(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "foldwise", "foldwise")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

pub fn workspace_config_path(workspace: &Path) -> PathBuf {
    workspace.join(".foldwise").join("config.toml")
}

/// Check whether a user-level or workspace-level config file exists.
pub fn config_exists(workspace: Option<&Path>) -> bool {
    if user_config_path().is_some_and(|p| p.exists()) {
        return true;
    }
    workspace.is_some_and(|ws| workspace_config_path(ws).exists())
}

/// Write `config` to the workspace config file, creating `.foldwise/`.
pub fn write_workspace_config(workspace: &Path, config: &HarnessConfig) -> Result<PathBuf, MlError> {
    let path = workspace_config_path(workspace);
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let toml_str = toml::to_string_pretty(config).map_err(|e| MlError::config(e.to_string()))?;
    std::fs::write(&path, toml_str)?;
    Ok(path)
}
