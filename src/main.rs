use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing::info;

use inflowqc::input::{InputOptions, read_batch};
use inflowqc::report::metrics::evaluate;
use inflowqc::report::{ReportInput, ReportMode, write_reports};
use inflowqc::{
    ConfigError, EngineError, EnsembleEngine, EnsembleProfile, FeatureBatch, ModelNames,
    Prediction, logging,
};

#[derive(Debug, Parser)]
#[command(
    name = "inflowqc",
    version,
    about = "Quantile-ensemble patient inflow intervals from feature batches"
)]
struct Cli {
    /// Log filter used when RUST_LOG is unset.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Score a batch file and write intervals.
    Predict(RunArgs),
    /// Score a batch file that carries observed targets and add accuracy metrics.
    Evaluate(RunArgs),
}

#[derive(Debug, Clone, Args)]
struct RunArgs {
    #[arg(long)]
    input: PathBuf,
    /// Directory holding the model files.
    #[arg(long)]
    models: PathBuf,
    #[arg(long)]
    out: PathBuf,
    /// JSON ensemble profile; absent fields keep their defaults.
    #[arg(long)]
    profile: Option<PathBuf>,
    #[arg(long)]
    blend_weight: Option<f64>,
    #[arg(long)]
    epsilon: Option<f64>,
    #[arg(long, default_value = "date")]
    key_column: String,
    #[arg(long, default_value = "admissions")]
    target_column: String,
    /// Split the input into consecutive batches of this many rows.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    batch_size: Option<u64>,
    #[arg(long, value_enum, default_value_t = ReportMode::Basic)]
    mode: ReportMode,
}

fn main() {
    let cli = Cli::parse();
    logging::init(&cli.log_level);
    if let Err(err) = run(&cli) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), EngineError> {
    let (args, command) = match &cli.command {
        Command::Predict(args) => (args, "predict"),
        Command::Evaluate(args) => (args, "evaluate"),
    };

    let profile = build_profile(args)?;
    let engine = EnsembleEngine::load(&args.models, &ModelNames::default(), profile)?;

    let opts = InputOptions {
        key_column: args.key_column.clone(),
        target_column: args.target_column.clone(),
    };
    let input = read_batch(&args.input, &opts)?;
    let targets = if command == "evaluate" {
        Some(input.require_targets(&opts.target_column)?)
    } else {
        None
    };

    let batches = split_batches(&input.batch, args.batch_size);
    info!(rows = input.batch.len(), batches = batches.len(), "scoring");
    let prediction = Prediction::concat(engine.predict_many(&batches)?);
    let metrics = targets.and_then(|t| evaluate(&prediction.rows, t));

    let report = ReportInput {
        command,
        input_path: &args.input,
        key_column: &args.key_column,
        n_batches: batches.len(),
        missing_features: &input.missing_features,
        engine: &engine,
        prediction: &prediction,
        metrics: metrics.as_ref(),
    };
    write_reports(&report, &args.out, args.mode)?;
    Ok(())
}

fn build_profile(args: &RunArgs) -> Result<EnsembleProfile, ConfigError> {
    let mut profile = match &args.profile {
        Some(path) => EnsembleProfile::from_json_path(path)?,
        None => EnsembleProfile::default_v1(),
    };
    if let Some(w) = args.blend_weight {
        profile.blend_weight = w;
    }
    if let Some(eps) = args.epsilon {
        profile.epsilon = eps;
    }
    profile.validate()?;
    Ok(profile)
}

fn split_batches(batch: &FeatureBatch, batch_size: Option<u64>) -> Vec<FeatureBatch> {
    match batch_size {
        Some(size) => batch.chunks(usize::try_from(size).unwrap_or(usize::MAX)),
        None => vec![batch.clone()],
    }
}

#[cfg(test)]
#[path = "../tests/src_inline/main_inline.rs"]
mod tests;
