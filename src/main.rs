use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use rsf_forest::{
    CrossValidation, EvaluationResult, Holdout, LeafSmoothing, OobMode, PatternForestConfig, SplitCriterion,
};
use rsf_io::{Dataset, Delimiter, ExperimentName, MultivariateReader, ResultWriter, UcrReader};

#[derive(Parser)]
#[command(name = "rsf")]
#[command(about = "Random shapelet forests for time series classification")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for reproducibility
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

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

/// Forest and dataset parameters shared by every subcommand.
#[derive(Args, Debug, Clone)]
struct ForestArgs {
    /// Number of trees in the forest
    #[arg(short = 'n', long = "no-trees", default_value_t = 100)]
    n_trees: usize,

    /// Lower shapelet length, as a fraction of the series length (<= 0 disables)
    #[arg(short = 'l', long, default_value_t = 0.025, allow_negative_numbers = true)]
    lower: f64,

    /// Upper shapelet length, as a fraction of the series length (<= 0 disables)
    #[arg(short = 'u', long, default_value_t = 1.0, allow_negative_numbers = true)]
    upper: f64,

    /// Number of candidate shapelets sampled per node
    #[arg(short = 'r', long = "sample", default_value_t = 100)]
    pattern_count: usize,

    /// Maximum tree depth (unlimited if not set)
    #[arg(long)]
    max_depth: Option<usize>,

    /// Minimum number of examples a node needs to be split
    #[arg(long, default_value_t = 2)]
    min_samples_split: usize,

    /// Split impurity: "gini" or "entropy"
    #[arg(long, default_value = "gini")]
    criterion: String,

    /// Apply Laplace smoothing to leaf distributions
    #[arg(long, default_value_t = false)]
    laplace: bool,

    /// Report out-of-bag accuracy
    #[arg(long, default_value_t = false)]
    oob: bool,

    /// Stop starting new trees after this many seconds
    #[arg(long)]
    time_budget: Option<f64>,

    /// Read each dataset path as a directory with one file per dimension
    #[arg(long, default_value_t = false)]
    multivariate: bool,

    /// Column separator: "whitespace", "comma", or "tab"
    #[arg(long, default_value = "whitespace")]
    delimiter: String,
}

/// Where and what to write besides the stdout summary.
#[derive(Args, Debug, Clone)]
struct OutputArgs {
    /// Experiment name for output files (must match [a-zA-Z0-9_-]+)
    #[arg(long)]
    experiment: Option<String>,

    /// Output directory for result files
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Also write the shapelets of a forest trained on all training data
    #[arg(long, default_value_t = false, requires = "experiment")]
    shapelets: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Train on one dataset and evaluate on another
    Holdout {
        /// Training dataset (file, or directory with --multivariate)
        train: PathBuf,

        /// Test dataset (file, or directory with --multivariate)
        test: PathBuf,

        #[command(flatten)]
        forest: ForestArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Evaluate with stratified k-fold cross-validation
    CrossValidate {
        /// Dataset (file, or directory with --multivariate)
        data: PathBuf,

        /// Number of cross-validation folds
        #[arg(long, default_value_t = 10)]
        folds: usize,

        #[command(flatten)]
        forest: ForestArgs,

        #[command(flatten)]
        output: OutputArgs,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct EvaluationOutput<'a> {
    experiment: Option<&'a str>,
    validation: &'static str,
    parameters: &'a PatternForestConfig,
    n_train: usize,
    n_test: usize,
    n_classes: usize,
    n_folds: usize,
    mean_measures: BTreeMap<String, f64>,
    std_accuracy: f64,
    mean_fit_time_ms: f64,
    mean_predict_time_ms: f64,
}

fn parse_criterion(s: &str) -> Result<SplitCriterion> {
    match s {
        "gini" => Ok(SplitCriterion::Gini),
        "entropy" => Ok(SplitCriterion::Entropy),
        other => anyhow::bail!("unknown criterion: {other} (expected gini or entropy)"),
    }
}

fn parse_delimiter(s: &str) -> Result<Delimiter> {
    match s {
        "whitespace" => Ok(Delimiter::Whitespace),
        "comma" => Ok(Delimiter::Comma),
        "tab" => Ok(Delimiter::Tab),
        other => anyhow::bail!("unknown delimiter: {other} (expected whitespace, comma, or tab)"),
    }
}

fn build_config(args: &ForestArgs, seed: u64) -> Result<PatternForestConfig> {
    let time_budget = args
        .time_budget
        .map(Duration::try_from_secs_f64)
        .transpose()
        .context("invalid time budget")?;

    let config = PatternForestConfig::new(args.n_trees)?
        .with_pattern_count(args.pattern_count)
        .with_length_fractions(args.lower, args.upper)
        .with_max_depth(args.max_depth)
        .with_min_samples_split(args.min_samples_split)
        .with_criterion(parse_criterion(&args.criterion)?)
        .with_smoothing(if args.laplace {
            LeafSmoothing::Laplace
        } else {
            LeafSmoothing::None
        })
        .with_oob_mode(if args.oob { OobMode::Enabled } else { OobMode::Disabled })
        .with_time_budget(time_budget)
        .with_seed(seed);
    Ok(config)
}

fn read_dataset(path: &Path, args: &ForestArgs) -> Result<Dataset> {
    let delimiter = parse_delimiter(&args.delimiter)?;
    let dataset = if args.multivariate {
        MultivariateReader::new(path).with_delimiter(delimiter).read()
    } else {
        UcrReader::new(path).with_delimiter(delimiter).read()
    };
    dataset.with_context(|| format!("failed to read dataset {}", path.display()))
}

/// Write the requested JSON artifacts for a finished evaluation.
fn write_artifacts(
    output: &OutputArgs,
    config: &PatternForestConfig,
    train: &Dataset,
    result: &EvaluationResult,
) -> Result<()> {
    let Some(experiment) = &output.experiment else {
        return Ok(());
    };
    let writer = ResultWriter::new(&output.output_dir, ExperimentName::new(experiment.clone())?)?;
    writer.write_evaluation(config, train.classes(), result)?;

    if output.shapelets {
        let forest = config
            .fit(train.examples(), train.labels())
            .context("training the shapelet report forest failed")?
            .into_forest();
        let names = train
            .examples()
            .first()
            .map(|e| e.names().to_vec())
            .unwrap_or_default();
        writer.write_shapelets(&forest, &names)?;
    }
    Ok(())
}

fn print_summary(output: &EvaluationOutput<'_>) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(output)?);
    Ok(())
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

    // Configure Rayon thread pool
    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Holdout {
            train,
            test,
            forest,
            output,
        } => {
            let config = build_config(&forest, cli.seed)?;

            // 1. Read both splits; the test set reuses the training classes
            let train_set = read_dataset(&train, &forest)?;
            let test_set = read_dataset(&test, &forest)?
                .with_classes(train_set.classes())
                .context("test set has a label the training set lacks")?;

            // 2. Evaluate
            let result = Holdout::new(test_set.examples(), test_set.labels())
                .evaluate(&config, train_set.examples(), train_set.labels())
                .context("holdout evaluation failed")?;
            info!(
                accuracy = ?result.mean_measures().get("accuracy"),
                "holdout complete"
            );

            // 3. Artifacts and summary
            write_artifacts(&output, &config, &train_set, &result)?;
            print_summary(&EvaluationOutput {
                experiment: output.experiment.as_deref(),
                validation: "holdout",
                parameters: &config,
                n_train: train_set.n_examples(),
                n_test: test_set.n_examples(),
                n_classes: train_set.classes().len(),
                n_folds: result.folds().len(),
                mean_measures: result.mean_measures(),
                std_accuracy: result.std_accuracy(),
                mean_fit_time_ms: result.mean_fit_time_ms(),
                mean_predict_time_ms: result.mean_predict_time_ms(),
            })?;
        }

        Command::CrossValidate {
            data,
            folds,
            forest,
            output,
        } => {
            let config = build_config(&forest, cli.seed)?;

            // 1. Read dataset
            let dataset = read_dataset(&data, &forest)?;

            // 2. Cross-validate
            let result = CrossValidation::new(folds)?
                .with_seed(cli.seed)
                .evaluate(&config, dataset.examples(), dataset.labels())
                .context("cross-validation failed")?;
            info!(
                std_accuracy = result.std_accuracy(),
                n_folds = folds,
                "cross-validation complete"
            );

            // 3. Artifacts and summary
            write_artifacts(&output, &config, &dataset, &result)?;
            let n_test: usize = result.folds().iter().map(|f| f.n_test).sum();
            print_summary(&EvaluationOutput {
                experiment: output.experiment.as_deref(),
                validation: "cross-validation",
                parameters: &config,
                n_train: dataset.n_examples(),
                n_test,
                n_classes: dataset.classes().len(),
                n_folds: result.folds().len(),
                mean_measures: result.mean_measures(),
                std_accuracy: result.std_accuracy(),
                mean_fit_time_ms: result.mean_fit_time_ms(),
                mean_predict_time_ms: result.mean_predict_time_ms(),
            })?;
        }
    }

    Ok(())
}
