//! foldwise CLI: cross-validation, grid search and nested model selection
//! from the terminal.

mod commands;
mod render;

use clap::Parser;
use foldwise_core::{MetricKind, ModelKind};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// foldwise: honest model evaluation for classifiers
#[derive(Parser, Debug)]
#[command(name = "foldwise", version, about, long_about = None)]
struct Cli {
    /// Workspace directory (holds .foldwise/config.toml)
    #[arg(short, long, default_value = ".", global = true)]
    workspace: PathBuf,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Show how a dataset would be split into folds
    Split {
        #[command(flatten)]
        run: RunArgs,
    },
    /// Cross-validate a single candidate
    Cv {
        #[command(flatten)]
        run: RunArgs,
        /// Hyperparameters as name=value pairs, e.g. "C=1"
        #[arg(short, long)]
        candidate: Option<String>,
    },
    /// Grid search with cross-validation
    Search {
        #[command(flatten)]
        run: RunArgs,
    },
    /// Nested cross-validation around the grid search
    Nested {
        #[command(flatten)]
        run: RunArgs,
        /// Number of outer folds
        #[arg(long)]
        outer_folds: Option<usize>,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Write a default .foldwise/config.toml into the workspace
    Init,
    /// Print the effective configuration
    Show,
}

/// Options shared by every evaluation subcommand. Each one overrides the
/// corresponding configuration value when given.
#[derive(clap::Args, Debug, Clone, Default)]
struct RunArgs {
    /// Dataset file (.json, or .csv with a header row)
    #[arg(short, long)]
    data: PathBuf,

    /// Label column for CSV input (defaults to the last column)
    #[arg(long)]
    label_column: Option<String>,

    /// Run seed
    #[arg(long)]
    seed: Option<u64>,

    /// Number of k-fold folds
    #[arg(short = 'k', long, conflicts_with = "holdout")]
    folds: Option<usize>,

    /// Use a single holdout split with this test fraction
    #[arg(long)]
    holdout: Option<f64>,

    /// Disable class stratification
    #[arg(long)]
    no_stratify: bool,

    /// Metric: log_loss, accuracy, brier
    #[arg(long)]
    metric: Option<MetricKind>,

    /// Model: logistic_regression, k_nearest_neighbors
    #[arg(short, long)]
    model: Option<ModelKind>,

    /// Iteration budget per fit
    #[arg(long)]
    max_iter: Option<usize>,

    /// Worker threads for fold evaluation
    #[arg(long)]
    workers: Option<usize>,

    /// Grid parameter as name=v1,v2,... (repeatable)
    #[arg(short = 'p', long = "param")]
    params: Vec<String>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("dev", "foldwise", "foldwise")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "foldwise.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    commands::handle_command(cli.command, &workspace).await
}
