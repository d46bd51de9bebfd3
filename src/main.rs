use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use depscope_io::{ArtifactWriter, EVALUATION_PATH, PREDICTIONS_PATH, TableReader};
use depscope_prep::profile::DEFAULT_TOP_VALUES;
use depscope_prep::{DatasetProfile, MissingStrategy, profile};
use depscope_rf::{EvaluationResult, RankedFeature};
use depscope_session::{ArtifactStore, PersistOutcome, Prediction, RunSettings, Session};

#[derive(Parser)]
#[command(name = "depscope")]
#[command(about = "Student-depression survey analysis: clean, encode, train, and evaluate a Random Forest")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for the split and the forest (overrides the settings file)
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

/// Overrides applied on top of the settings file.
#[derive(Args, Debug, Clone)]
struct PipelineArgs {
    /// Missing-value strategy: "drop", "mean", "median", or "zero"
    #[arg(long)]
    missing: Option<String>,

    /// Remove exact duplicate rows
    #[arg(long)]
    remove_duplicates: bool,

    /// Map domain columns and label-encode categorical columns
    #[arg(long)]
    encode_categorical: bool,

    /// Target column name
    #[arg(long)]
    target: Option<String>,

    /// Comma-separated feature columns (default: every non-target, non-id column)
    #[arg(long, value_delimiter = ',')]
    features: Option<Vec<String>>,

    /// Fraction of rows held out for testing
    #[arg(long)]
    test_fraction: Option<f64>,

    /// Number of trees in the Random Forest
    #[arg(long)]
    n_trees: Option<usize>,

    /// Maximum tree depth
    #[arg(long)]
    max_depth: Option<usize>,

    /// Grow trees until leaves are pure (ignores --max-depth)
    #[arg(long)]
    unlimited_depth: bool,

    /// Minimum samples required to split a node
    #[arg(long)]
    min_samples_split: Option<usize>,
}

#[derive(Subcommand)]
enum Command {
    /// Print shape, missing values, statistics, and correlations as JSON
    Profile {
        /// Path to the input CSV file
        #[arg(long)]
        data: PathBuf,

        /// Target column for class counts and correlations
        #[arg(long, default_value = depscope_prep::config::DEFAULT_TARGET)]
        target: String,

        /// Most frequent values listed per categorical column
        #[arg(long, default_value_t = DEFAULT_TOP_VALUES)]
        top: usize,
    },

    /// Load, preprocess, train, and evaluate
    Run {
        /// Path to the input CSV file
        #[arg(long)]
        data: PathBuf,

        /// JSON settings file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Artifact root (overrides the settings file)
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Do not write the processed table or model archive
        #[arg(long)]
        no_persist: bool,

        /// CSV of new rows to score with the trained model
        #[arg(long)]
        score: Option<PathBuf>,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct RunOutput {
    source: String,
    rows_before: usize,
    rows_after: usize,
    encoded_columns: Vec<String>,
    n_train: usize,
    n_test: usize,
    n_features: usize,
    n_trees: usize,
    train_accuracy: f64,
    test_accuracy: f64,
    weighted_f1: f64,
    top_features: Vec<RankedFeature>,
    artifacts: Vec<PersistOutcome>,
    n_scored: Option<usize>,
}

#[derive(Serialize)]
struct ScoreOutput<'a> {
    source: String,
    predictions: &'a [Prediction],
}

fn apply_overrides(settings: &mut RunSettings, args: &PipelineArgs, seed: Option<u64>) -> Result<()> {
    if let Some(name) = &args.missing {
        let strategy: MissingStrategy = name.parse()?;
        settings.preprocess = settings.preprocess.clone().with_missing(Some(strategy));
    }
    if args.remove_duplicates {
        settings.preprocess = settings.preprocess.clone().with_remove_duplicates(true);
    }
    if args.encode_categorical {
        settings.preprocess = settings.preprocess.clone().with_encode_categorical(true);
    }
    if let Some(target) = &args.target {
        settings.preprocess = settings.preprocess.clone().with_target_column(target.clone());
        settings.split.target = Some(target.clone());
    }
    if let Some(features) = &args.features {
        settings.split.features = Some(features.clone());
    }
    if let Some(fraction) = args.test_fraction {
        settings.split.test_fraction = fraction;
    }
    if let Some(n_trees) = args.n_trees {
        settings.forest.n_trees = n_trees;
    }
    if args.unlimited_depth {
        settings.forest.max_depth = None;
    } else if let Some(depth) = args.max_depth {
        settings.forest.max_depth = Some(depth);
    }
    if let Some(min) = args.min_samples_split {
        settings.forest.min_samples_split = min;
    }
    if let Some(seed) = seed {
        settings.split.seed = seed;
        settings.forest.seed = seed;
    }
    Ok(())
}

fn top_features(result: &EvaluationResult, n: usize) -> Vec<RankedFeature> {
    result.ranked_importances.iter().take(n).cloned().collect()
}

fn read_table(reader: &TableReader, path: &Path, what: &str) -> Result<depscope_io::Table> {
    reader
        .read_path(path)
        .with_context(|| format!("failed to read {what} CSV {}", path.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Profile { data, target, top } => {
            let table = read_table(&TableReader::new(), &data, "input")?;
            let summary: DatasetProfile = profile(&table, &target, top);
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Command::Run {
            data,
            config,
            output_dir,
            no_persist,
            score,
            pipeline,
        } => {
            // 1. Settings: file, then flag overrides
            let mut settings = match &config {
                Some(path) => RunSettings::from_path(path)?,
                None => RunSettings::default(),
            };
            apply_overrides(&mut settings, &pipeline, cli.seed)?;
            if let Some(dir) = output_dir {
                settings.artifacts.root = dir;
            }
            if no_persist {
                settings.artifacts.persist = false;
            }
            let request = settings
                .train_request()
                .context("invalid split or forest settings")?;

            // 2. Session
            let mut session = Session::new();
            if settings.artifacts.persist {
                session = session.with_artifacts(ArtifactStore::new(&settings.artifacts.root));
            }
            let reader = settings.table_reader();
            session
                .load_path(&data, &reader)
                .with_context(|| format!("failed to read input CSV {}", data.display()))?;

            // 3. Pipeline stages
            let report = session
                .preprocess(&settings.preprocess)
                .context("preprocessing failed")?
                .clone();
            let (n_trees, n_features) = {
                let trained = session.train(&request).context("training failed")?;
                (trained.forest.n_trees(), trained.forest.n_features())
            };
            let result = session.evaluate().context("evaluation failed")?.clone();

            // 4. Results
            let writer = ArtifactWriter::new(&settings.artifacts.root)?;
            writer
                .write_json(EVALUATION_PATH, &result)
                .context("failed to write evaluation report")?;

            let n_scored = match &score {
                Some(path) => {
                    let table = read_table(&reader, path, "scoring")?;
                    let predictions = session.score(&table).context("scoring failed")?;
                    writer
                        .write_json(
                            PREDICTIONS_PATH,
                            &ScoreOutput {
                                source: path.display().to_string(),
                                predictions: &predictions,
                            },
                        )
                        .context("failed to write predictions")?;
                    Some(predictions.len())
                }
                None => None,
            };

            let artifacts: Vec<PersistOutcome> = session
                .preprocessed()
                .and_then(|p| p.persisted.clone())
                .into_iter()
                .chain(session.trained().and_then(|t| t.persisted.clone()))
                .collect();

            let output = RunOutput {
                source: data.display().to_string(),
                rows_before: report.rows_before,
                rows_after: report.rows_after,
                encoded_columns: report.encoded_columns,
                n_train: result.n_train,
                n_test: result.n_test,
                n_features,
                n_trees,
                train_accuracy: result.train_accuracy,
                test_accuracy: result.test_accuracy,
                weighted_f1: result.weighted_avg.f1,
                top_features: top_features(&result, 5),
                artifacts,
                n_scored,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
