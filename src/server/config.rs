use super::RequestsLoggingLevel;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub requests_logging_level: RequestsLoggingLevel,
    pub bind_address: String,
    pub port: u16,
    pub metrics_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            requests_logging_level: RequestsLoggingLevel::Path,
            bind_address: crate::config::DEFAULT_BIND_ADDRESS.to_owned(),
            port: 3001,
            metrics_port: 9091,
        }
    }
}

impl From<&crate::config::AppConfig> for ServerConfig {
    fn from(config: &crate::config::AppConfig) -> Self {
        ServerConfig {
            requests_logging_level: config.logging_level.clone(),
            bind_address: config.bind_address.clone(),
            port: config.port,
            metrics_port: config.metrics_port,
        }
    }
}
