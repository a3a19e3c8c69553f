mod file_config;

pub use file_config::FileConfig;

use crate::prediction::LoadOptions;
use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";

/// CLI arguments that take part in config resolution.
/// Every field here can be overridden by the TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub artifacts_dir: Option<PathBuf>,
    pub port: u16,
    pub metrics_port: u16,
    pub bind_address: Option<String>,
    pub logging_level: RequestsLoggingLevel,
    pub model2_fitted_bins: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub artifacts_dir: PathBuf,
    pub port: u16,
    pub metrics_port: u16,
    pub bind_address: String,
    pub logging_level: RequestsLoggingLevel,
    pub model2_fitted_bins: bool,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let artifacts_dir = file
            .artifacts_dir
            .map(PathBuf::from)
            .or_else(|| cli.artifacts_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "artifacts_dir must be specified via --artifacts-dir or in config file"
                )
            })?;

        if !artifacts_dir.exists() {
            bail!("Artifacts directory does not exist: {:?}", artifacts_dir);
        }
        if !artifacts_dir.is_dir() {
            bail!("artifacts_dir is not a directory: {:?}", artifacts_dir);
        }

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);
        if port != 0 && port == metrics_port {
            bail!("port and metrics_port must differ, both are {}", port);
        }

        let bind_address = file
            .bind_address
            .or_else(|| cli.bind_address.clone())
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let model2_fitted_bins = file.model2_fitted_bins.unwrap_or(cli.model2_fitted_bins);

        Ok(Self {
            artifacts_dir,
            port,
            metrics_port,
            bind_address,
            logging_level,
            model2_fitted_bins,
        })
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            fitted_bins: self.model2_fitted_bins,
        }
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
