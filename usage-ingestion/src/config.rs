use serde::Deserialize;
use std::fs;

use crate::ingest::UnresolvedMeterPolicy;

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub uri: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind_addr: String,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IngestionConfig {
    #[serde(default)]
    pub unresolved_meter_policy: UnresolvedMeterPolicy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub http: HttpConfig,
    #[serde(default)]
    pub ingestion: IngestionConfig,
    pub metrics: Option<MetricsConfig>,
}

impl AppConfig {
    /// Load from `USAGE_INGESTION_CONFIG` (default `usage-ingestion.toml`).
    /// `DATABASE_URL` overrides `database.uri` when set.
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let path = env::var("USAGE_INGESTION_CONFIG").unwrap_or_else(|_| "usage-ingestion.toml".to_string());
        let contents = fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("failed to read config '{path}': {e}"))?;
        let mut cfg = Self::from_toml_str(&contents)?;

        if let Ok(uri) = env::var("DATABASE_URL") {
            cfg.database.uri = uri;
        }
        Ok(cfg)
    }

    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents)?;
        Ok(cfg)
    }
}
