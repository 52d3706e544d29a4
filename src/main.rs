use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, info};

use lendscore_eval::{
    Algorithm, Candidate, CandidateReport, ClassWeights, Classifier, ClassifierAdapter,
    CrossValidator, FoldStrategy, best_by_false_positive_rate, compare, penalty_sweep,
};
use lendscore_io::{
    DEFAULT_LABEL_COLUMN, EvaluationRecord, ExperimentName, LoanDataset, LoanReader, ReportWriter,
};
use lendscore_linear::LogisticRegressionConfig;
use lendscore_rf::RandomForestConfig;

#[derive(Parser)]
#[command(name = "lendscore")]
#[command(about = "Cross-validated evaluation of loan default classifiers under class weighting")]
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

/// Input table and fold layout.
#[derive(Args, Debug, Clone)]
struct DataArgs {
    /// Path to the input CSV file
    #[arg(long)]
    data: PathBuf,

    /// Name of the 0/1 label column (1 = paid on time)
    #[arg(long, default_value = DEFAULT_LABEL_COLUMN)]
    label_column: String,

    /// Number of cross-validation folds
    #[arg(long, default_value_t = 5)]
    folds: usize,

    /// Shuffle within each class and deal rows round-robin instead of
    /// using contiguous blocks
    #[arg(long, default_value_t = false)]
    stratified: bool,
}

/// Hyperparameters for both algorithms.
#[derive(Args, Debug, Clone)]
struct ModelArgs {
    /// Number of trees in the random forest
    #[arg(long, default_value_t = 100)]
    n_trees: usize,

    /// Maximum tree depth (unlimited if not set)
    #[arg(long)]
    max_depth: Option<usize>,

    /// Gradient-descent iterations for logistic regression
    #[arg(long, default_value_t = 1000)]
    max_iter: usize,

    /// Gradient-descent step size for logistic regression
    #[arg(long, default_value_t = 0.1)]
    learning_rate: f64,

    /// L2 penalty on logistic regression coefficients
    #[arg(long, default_value_t = 1e-3)]
    l2_penalty: f64,
}

/// Optional report file.
#[derive(Args, Debug, Clone)]
struct OutputArgs {
    /// Experiment name for output files (must match [a-zA-Z0-9_-]+);
    /// no report file is written without it
    #[arg(long)]
    experiment: Option<String>,

    /// Output directory for result files
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Cross-validate one classifier and report its confusion rates
    Evaluate {
        #[command(flatten)]
        data: DataArgs,

        /// Algorithm: "logistic" or "forest"
        #[arg(long, default_value = "logistic")]
        algorithm: String,

        /// Class weights: "uniform", "balanced", or "W0:W1"
        #[arg(long, default_value = "uniform")]
        class_weight: String,

        #[command(flatten)]
        model: ModelArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Compare logistic regression and random forest, each unweighted and balanced
    Compare {
        #[command(flatten)]
        data: DataArgs,

        /// Minimum true-positive rate for the lowest-fpr pick
        #[arg(long, default_value_t = 0.5)]
        min_tpr: f64,

        #[command(flatten)]
        model: ModelArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Sweep the label-0 penalty and report how the rates respond
    Sweep {
        #[command(flatten)]
        data: DataArgs,

        /// Algorithm: "logistic" or "forest"
        #[arg(long, default_value = "logistic")]
        algorithm: String,

        /// Comma-separated label-0 weights (label 1 stays at 1.0)
        #[arg(long, value_delimiter = ',', default_value = "1,2,5,10")]
        penalties: Vec<f64>,

        /// Minimum true-positive rate for the lowest-fpr pick
        #[arg(long, default_value_t = 0.5)]
        min_tpr: f64,

        #[command(flatten)]
        model: ModelArgs,

        #[command(flatten)]
        output: OutputArgs,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct EvaluateOutput {
    experiment: Option<String>,
    n_features: usize,
    evaluation: EvaluationRecord,
}

#[derive(Serialize)]
struct CompareOutput {
    experiment: Option<String>,
    n_rows: usize,
    best: Option<String>,
    candidates: Vec<EvaluationRecord>,
}

#[derive(Serialize)]
struct SweepOutput {
    experiment: Option<String>,
    algorithm: String,
    best: Option<String>,
    points: Vec<SweepPointOutput>,
}

#[derive(Serialize)]
struct SweepPointOutput {
    negative_weight: f64,
    true_positive_rate: Option<f64>,
    false_positive_rate: Option<f64>,
}

fn parse_algorithm(s: &str, model: &ModelArgs, seed: u64) -> Result<Algorithm> {
    match s {
        "logistic" => Ok(Algorithm::Logistic(logistic_config(model))),
        "forest" => Ok(Algorithm::Forest(forest_config(model, seed)?)),
        other => anyhow::bail!("unknown algorithm: {other} (expected logistic or forest)"),
    }
}

fn logistic_config(model: &ModelArgs) -> LogisticRegressionConfig {
    LogisticRegressionConfig::new()
        .with_max_iter(model.max_iter)
        .with_learning_rate(model.learning_rate)
        .with_l2_penalty(model.l2_penalty)
}

fn forest_config(model: &ModelArgs, seed: u64) -> Result<RandomForestConfig> {
    Ok(RandomForestConfig::new(model.n_trees)?
        .with_max_depth(model.max_depth)
        .with_seed(seed))
}

fn parse_class_weights(s: &str) -> Result<ClassWeights> {
    match s {
        "uniform" => Ok(ClassWeights::Uniform),
        "balanced" => Ok(ClassWeights::Balanced),
        other => {
            let Some((negative, positive)) = other.split_once(':') else {
                anyhow::bail!(
                    "unknown class weights: {other} (expected uniform, balanced, or W0:W1)"
                );
            };
            let negative: f64 = negative
                .trim()
                .parse()
                .with_context(|| format!("invalid label-0 weight in {other}"))?;
            let positive: f64 = positive
                .trim()
                .parse()
                .with_context(|| format!("invalid label-1 weight in {other}"))?;
            Ok(ClassWeights::custom(negative, positive)?)
        }
    }
}

fn build_validator(data: &DataArgs, seed: u64) -> Result<CrossValidator> {
    let strategy = if data.stratified {
        FoldStrategy::Stratified { seed }
    } else {
        FoldStrategy::Contiguous
    };
    Ok(CrossValidator::new(data.folds)?.with_strategy(strategy))
}

fn load_dataset(data: &DataArgs) -> Result<LoanDataset> {
    LoanReader::new(&data.data)
        .with_label_column(data.label_column.as_str())
        .read()
        .context("failed to read input CSV")
}

fn report_writer(output: &OutputArgs) -> Result<Option<ReportWriter>> {
    output
        .experiment
        .as_ref()
        .map(|name| -> Result<ReportWriter> {
            let experiment = ExperimentName::new(name.clone())?;
            Ok(ReportWriter::new(&output.output_dir, experiment)?)
        })
        .transpose()
}

fn to_record(report: &CandidateReport) -> EvaluationRecord {
    let cm = report.result.confusion;
    EvaluationRecord {
        label: report.label.clone(),
        algorithm: report.algorithm.clone(),
        class_weights: report.class_weights.to_string(),
        n_rows: report.result.n_rows,
        n_folds: report.result.n_folds,
        true_positive: cm.true_positive,
        false_positive: cm.false_positive,
        true_negative: cm.true_negative,
        false_negative: cm.false_negative,
        true_positive_rate: EvaluationRecord::defined(cm.true_positive_rate()),
        false_positive_rate: EvaluationRecord::defined(cm.false_positive_rate()),
        precision: EvaluationRecord::defined(cm.precision()),
        accuracy: EvaluationRecord::defined(cm.accuracy()),
        mean_accuracy: report.result.mean_accuracy,
        std_accuracy: report.result.std_accuracy,
        fold_accuracies: report.result.fold_accuracies.clone(),
    }
}

/// Cross-validate one candidate and flatten the outcome into a report record.
fn evaluate_candidate(
    candidate: Candidate,
    validator: &CrossValidator,
    features: &[Vec<f64>],
    labels: &[usize],
) -> Result<EvaluationRecord> {
    let adapter = ClassifierAdapter::new(candidate.algorithm.clone())
        .with_class_weights(candidate.class_weights);
    let result = validator
        .evaluate(&adapter, features, labels)
        .context("cross-validation failed")?;
    debug!("confusion counts:\n{}", result.confusion);

    let report = CandidateReport {
        algorithm: candidate.algorithm.name(),
        label: candidate.label,
        class_weights: candidate.class_weights,
        result,
    };
    Ok(to_record(&report))
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
        Command::Evaluate {
            data,
            algorithm,
            class_weight,
            model,
            output,
        } => {
            let algorithm = parse_algorithm(&algorithm, &model, cli.seed)?;
            let class_weights = parse_class_weights(&class_weight)?;
            let validator = build_validator(&data, cli.seed)?;
            let writer = report_writer(&output)?;

            // 1. Read dataset
            let dataset = load_dataset(&data)?;

            // 2. Cross-validate
            let candidate = Candidate::new(algorithm, class_weights);
            let record =
                evaluate_candidate(candidate, &validator, dataset.features(), dataset.labels())?;

            // 3. Write report
            if let Some(writer) = &writer {
                writer.write_evaluation(&record)?;
            }

            // 4. Print summary
            let output = EvaluateOutput {
                experiment: output.experiment,
                n_features: dataset.n_features(),
                evaluation: record,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Compare {
            data,
            min_tpr,
            model,
            output,
        } => {
            let validator = build_validator(&data, cli.seed)?;
            let writer = report_writer(&output)?;
            let dataset = load_dataset(&data)?;

            let logistic = Algorithm::Logistic(logistic_config(&model));
            let forest = Algorithm::Forest(forest_config(&model, cli.seed)?);
            let candidates = vec![
                Candidate::new(logistic.clone(), ClassWeights::Uniform),
                Candidate::new(logistic, ClassWeights::Balanced),
                Candidate::new(forest.clone(), ClassWeights::Uniform),
                Candidate::new(forest, ClassWeights::Balanced),
            ];

            let reports = compare(&candidates, &validator, dataset.features(), dataset.labels())
                .context("comparison failed")?;
            let best = best_by_false_positive_rate(&reports, min_tpr).map(|r| r.label.clone());
            info!(best = ?best, min_tpr, "comparison complete");

            let records: Vec<EvaluationRecord> = reports.iter().map(to_record).collect();
            if let Some(writer) = &writer {
                writer.write_comparison(&records, best.as_deref())?;
            }

            let output = CompareOutput {
                experiment: output.experiment,
                n_rows: dataset.n_rows(),
                best,
                candidates: records,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Sweep {
            data,
            algorithm,
            penalties,
            min_tpr,
            model,
            output,
        } => {
            let algorithm = parse_algorithm(&algorithm, &model, cli.seed)?;
            let validator = build_validator(&data, cli.seed)?;
            let writer = report_writer(&output)?;
            let dataset = load_dataset(&data)?;

            let reports = penalty_sweep(
                &algorithm,
                &penalties,
                &validator,
                dataset.features(),
                dataset.labels(),
            )
            .context("penalty sweep failed")?;
            let best = best_by_false_positive_rate(&reports, min_tpr).map(|r| r.label.clone());

            let points: Vec<(f64, EvaluationRecord)> = penalties
                .iter()
                .copied()
                .zip(reports.iter().map(to_record))
                .collect();
            let algorithm_name = algorithm.name();
            info!(algorithm = %algorithm_name, n_points = points.len(), "sweep complete");

            if let Some(writer) = &writer {
                writer.write_sweep(&algorithm_name, &points)?;
            }

            let output = SweepOutput {
                experiment: output.experiment,
                algorithm: algorithm_name,
                best,
                points: points
                    .iter()
                    .map(|(negative_weight, record)| SweepPointOutput {
                        negative_weight: *negative_weight,
                        true_positive_rate: record.true_positive_rate,
                        false_positive_rate: record.false_positive_rate,
                    })
                    .collect(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
