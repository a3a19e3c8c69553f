use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use engagement_server::config::{self, AppConfig, FileConfig};
use engagement_server::prediction::{ModelRegistry, PredictionDispatcher};
use engagement_server::server::{metrics, run_server, RequestsLoggingLevel, ServerConfig};

fn parse_path(s: &str) -> Result<PathBuf, String> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(format!("Error resolving path '{}': {}", s, msg));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir().map_err(|e| format!("Failed to get current dir: {}", e))?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory holding the model, scaler and encoder artifacts.
    /// Can also be specified in config file.
    #[clap(long, value_parser = parse_path)]
    pub artifacts_dir: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// Address both servers bind to.
    #[clap(long)]
    pub bind_address: Option<String>,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Bin model2's view count and video age against model2_bin_edges.json
    /// instead of the constant bin.
    #[clap(long)]
    pub model2_fitted_bins: bool,
}

impl From<&CliArgs> for config::CliConfig {
    fn from(args: &CliArgs) -> Self {
        config::CliConfig {
            artifacts_dir: args.artifacts_dir.clone(),
            port: args.port,
            metrics_port: args.metrics_port,
            bind_address: args.bind_address.clone(),
            logging_level: args.logging_level.clone(),
            model2_fitted_bins: args.model2_fitted_bins,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let cli_config = config::CliConfig::from(&cli_args);
    let app_config = AppConfig::resolve(&cli_config, file_config)?;

    info!("Loading artifacts from {:?}...", app_config.artifacts_dir);
    let registry = ModelRegistry::load(&app_config.artifacts_dir, &app_config.load_options())
        .with_context(|| {
            format!(
                "Failed to load artifacts from {:?}",
                app_config.artifacts_dir
            )
        })?;
    if app_config.model2_fitted_bins {
        info!("model2 uses fitted bin edges");
    }

    info!("Initializing metrics...");
    metrics::init_metrics();
    let normalizers = registry
        .entries()
        .filter(|entry| entry.normalizer().is_some())
        .count();
    metrics::init_artifact_metrics(
        registry.entries().count(),
        normalizers,
        registry.region_encoder().category_count()
            + registry.sentiment_encoder().category_count(),
    );

    let dispatcher = Arc::new(PredictionDispatcher::new(Arc::new(registry)));

    info!("Ready to serve at port {}!", app_config.port);
    info!("Metrics available at port {}!", app_config.metrics_port);

    tokio::select! {
        result = run_server(dispatcher, ServerConfig::from(&app_config)) => {
            info!("HTTP server stopped: {:?}", result);
            result
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
            Ok(())
        }
    }
}
