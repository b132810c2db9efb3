use anyhow::Result;
use dotenvy::dotenv;
use secrecy::Secret;
use serde::Deserialize;
use std::env;

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    pub server: ServerConfig,
    pub analytics: AnalyticsConfig,
    pub user_id_field: String,
    pub service_name: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Clone, Debug)]
pub struct AnalyticsConfig {
    /// Segment write key. Absence does not stop the process; it makes the
    /// webhook reject every call until the key is deployed.
    pub write_key: Option<Secret<String>>,
    pub api_base_url: String,
    pub flush_interval_ms: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let host = env::var("RELAY_SERVICE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("RELAY_SERVICE_PORT")
            .unwrap_or_else(|_| "4004".to_string())
            .parse()?;

        let write_key = env::var("SEGMENT_WRITE_API_KEY").ok().map(Secret::new);
        let api_base_url = env::var("SEGMENT_API_BASE_URL")
            .unwrap_or_else(|_| "https://api.segment.io/v1".to_string());
        let flush_interval_ms = env::var("SEGMENT_FLUSH_INTERVAL_MS")
            .unwrap_or_else(|_| "2000".to_string())
            .parse()?;

        let user_id_field = env::var("USER_ID_FIELD").unwrap_or_else(|_| "user_id".to_string());

        Ok(Self {
            server: ServerConfig { host, port },
            analytics: AnalyticsConfig {
                write_key,
                api_base_url,
                flush_interval_ms,
            },
            user_id_field,
            service_name: "relay-service".to_string(),
        })
    }
}
