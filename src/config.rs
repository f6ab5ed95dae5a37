use config::ConfigError;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub labels: LabelConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LabelConfig {
    /// Base URL the printed labels point at. An `app.` host prefix is
    /// stripped when building public viewer links.
    pub public_base_url: String,
    pub qr_service_url: String,
    #[serde(default = "default_qr_timeout_secs")]
    pub qr_timeout_secs: u64,
}

fn default_qr_timeout_secs() -> u64 {
    10
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://stagepack.db".to_string());

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::Message("SERVER_PORT is not a valid port".to_string()))?;

        let public_base_url = env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("http://{}:{}", server_host, server_port));

        let qr_service_url = env::var("QR_SERVICE_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:9100/qr".to_string());

        let qr_timeout_secs = env::var("QR_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(default_qr_timeout_secs);

        Ok(Config {
            database: DatabaseConfig { url: database_url },
            server: ServerConfig {
                host: server_host,
                port: server_port,
            },
            labels: LabelConfig {
                public_base_url,
                qr_service_url,
                qr_timeout_secs,
            },
        })
    }
}
