//! Runs predictions against an artifact directory without starting a server.
//!
//! Reads one JSON record from `--input` (or stdin) and prints one line per
//! model, e.g. `model1 Views: 275,000`.

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde_json::Value;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use engagement_server::prediction::{
    LoadOptions, ModelId, ModelRegistry, PredictionDispatcher, PredictionError,
};

#[derive(Parser, Debug)]
struct CliArgs {
    /// Directory holding the model, scaler and encoder artifacts.
    pub artifacts_dir: PathBuf,

    /// Model to run. All four are run when omitted.
    #[clap(long)]
    pub model: Option<String>,

    /// JSON file with the raw video metrics. Reads stdin when omitted.
    #[clap(long)]
    pub input: Option<PathBuf>,

    /// Use model2_bin_edges.json for model2's bins.
    #[clap(long)]
    pub fitted_bins: bool,
}

fn read_input(path: Option<&PathBuf>) -> Result<Value> {
    let text = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file: {:?}", path))?,
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read stdin")?;
            text
        }
    };
    serde_json::from_str(&text).context("Input is not valid JSON")
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let options = LoadOptions {
        fitted_bins: cli_args.fitted_bins,
    };
    let registry = ModelRegistry::load(&cli_args.artifacts_dir, &options).with_context(|| {
        format!(
            "Failed to load artifacts from {:?}",
            cli_args.artifacts_dir
        )
    })?;
    let dispatcher = PredictionDispatcher::new(Arc::new(registry));
    let payload = read_input(cli_args.input.as_ref())?;

    let models: Vec<String> = match cli_args.model {
        Some(model) => vec![model],
        None => ModelId::ALL.iter().map(|id| id.to_string()).collect(),
    };

    let mut failures = 0;
    for model in &models {
        match dispatcher.predict_json(Some(model), &payload) {
            Ok(prediction) => println!("{} {}", model, prediction),
            Err(err @ PredictionError::InvalidModel(_)) => bail!("{}", err),
            Err(err) => {
                eprintln!("{} error: {}", model, err);
                failures += 1;
            }
        }
    }
    if failures > 0 {
        bail!("{} of {} predictions failed", failures, models.len());
    }
    Ok(())
}
