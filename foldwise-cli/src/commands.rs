//! CLI subcommand handlers.

use crate::render;
use crate::{Commands, ConfigAction, RunArgs};
use anyhow::Context;
use foldwise_core::config::{load_config, workspace_config_path, write_workspace_config};
use foldwise_core::{
    Candidate, DataSourceType, Dataset, HarnessConfig, ParamGrid, SplitPolicy, cross_validate,
};
use serde::Serialize;
use std::path::Path;

/// Handle a CLI subcommand.
pub async fn handle_command(command: Commands, workspace: &Path) -> anyhow::Result<()> {
    match command {
        Commands::Split { run } => handle_split(run, workspace).await,
        Commands::Cv { run, candidate } => handle_cv(run, candidate, workspace).await,
        Commands::Search { run } => handle_search(run, workspace).await,
        Commands::Nested { run, outer_folds } => handle_nested(run, outer_folds, workspace).await,
        Commands::Config { action } => handle_config(action, workspace).await,
    }
}

impl RunArgs {
    /// Layer the command-line flags over the loaded configuration.
    fn apply(&self, config: &mut HarnessConfig) -> anyhow::Result<()> {
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(model) = self.model {
            if model != config.model {
                // a configured grid names the old model's parameters
                config.grid.clear();
            }
            config.model = model;
        }
        if let Some(metric) = self.metric {
            config.metric = metric;
        }
        if let Some(n_folds) = self.folds {
            config.split.policy = SplitPolicy::KFold {
                n_folds,
                shuffle: true,
            };
        }
        if let Some(test_fraction) = self.holdout {
            config.split.policy = SplitPolicy::Holdout { test_fraction };
        }
        if self.no_stratify {
            config.split.stratify = false;
            config.outer.stratify = false;
        }
        if let Some(max_iter) = self.max_iter {
            config.fit.max_iter = max_iter;
        }
        if let Some(workers) = self.workers {
            config.workers = Some(workers);
        }
        if !self.params.is_empty() {
            let grid = self
                .params
                .iter()
                .try_fold(ParamGrid::new(), |grid, entry| grid.parse_param(entry))?;
            config.grid = grid
                .iter()
                .map(|(name, values)| (name.to_string(), values.to_vec()))
                .collect();
        }
        config.validate()?;
        Ok(())
    }

    fn source(&self) -> DataSourceType {
        match DataSourceType::from_path(&self.data) {
            DataSourceType::Csv {
                path, delimiter, ..
            } => DataSourceType::Csv {
                path,
                delimiter,
                label_column: self.label_column.clone(),
            },
            json => json,
        }
    }
}

/// Resolve configuration and read the dataset named by `run`.
async fn prepare(run: &RunArgs, workspace: &Path) -> anyhow::Result<(HarnessConfig, Dataset)> {
    let mut config =
        load_config(Some(workspace), None).map_err(|e| anyhow::anyhow!("Failed to load config: {e}"))?;
    run.apply(&mut config)?;

    let source = run.source();
    let path = source.path().display().to_string();
    let data = tokio::task::spawn_blocking(move || source.load())
        .await?
        .with_context(|| format!("Failed to load dataset {path}"))?;
    Ok((config, data))
}

fn emit<T: Serialize>(json: bool, report: &T, text: impl FnOnce(&T) -> String) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print!("{}", text(report));
    }
    Ok(())
}

async fn handle_split(run: RunArgs, workspace: &Path) -> anyhow::Result<()> {
    let (config, data) = prepare(&run, workspace).await?;
    let folds = config.split.split(&data, config.seed)?;
    let summaries = render::fold_summaries(&data, &folds);
    emit(run.json, &summaries, |s| render::split(&data, s))
}

async fn handle_cv(
    run: RunArgs,
    candidate: Option<String>,
    workspace: &Path,
) -> anyhow::Result<()> {
    let (config, data) = prepare(&run, workspace).await?;
    let candidate = match candidate {
        Some(entry) => Candidate::parse(&entry)?,
        None => Candidate::new(),
    };

    let report = tokio::task::spawn_blocking(move || {
        let family = config.model.family();
        let scorer = config.metric.scorer();
        cross_validate(
            family.as_ref(),
            &candidate,
            &data,
            &config.split,
            scorer.as_ref(),
            &config.fit,
            config.seed,
            config.workers(),
        )
    })
    .await??;
    emit(run.json, &report, render::cross_validation)
}

async fn handle_search(run: RunArgs, workspace: &Path) -> anyhow::Result<()> {
    let (config, data) = prepare(&run, workspace).await?;
    let search = config.grid_search();
    let seed = config.seed;
    let report = tokio::task::spawn_blocking(move || search.run(&data, seed)).await??;
    emit(run.json, &report, render::search)
}

async fn handle_nested(
    run: RunArgs,
    outer_folds: Option<usize>,
    workspace: &Path,
) -> anyhow::Result<()> {
    let (mut config, data) = prepare(&run, workspace).await?;
    if let Some(n_folds) = outer_folds {
        config.outer.policy = SplitPolicy::KFold {
            n_folds,
            shuffle: true,
        };
        config.validate()?;
    }
    let nested = config.nested_search();
    let seed = config.seed;
    let report = tokio::task::spawn_blocking(move || nested.run(&data, seed)).await??;
    emit(run.json, &report, render::nested)
}

async fn handle_config(action: ConfigAction, workspace: &Path) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_path = workspace_config_path(workspace);
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }
            let config_path = write_workspace_config(workspace, &HarnessConfig::default())?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            let config = load_config(Some(workspace), None)
                .map_err(|e| anyhow::anyhow!("Failed to load config: {e}"))?;
            let toml_str = toml::to_string_pretty(&config)?;
            println!("{toml_str}");
            Ok(())
        }
    }
}
