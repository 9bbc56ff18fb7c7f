use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use std::{path::PathBuf, time::Duration};

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Remote scoring service endpoint
    pub scoring_api_url: String,

    /// Bearer credential for the scoring service
    #[serde(deserialize_with = "deserialize_secret")]
    pub scoring_api_key: SecretString,

    /// Upper bound on a single scoring call, in seconds
    #[serde(default = "default_scoring_timeout_secs")]
    pub scoring_timeout_secs: u64,

    /// Optional JSON file that replaces the built-in catalog
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

fn default_scoring_timeout_secs() -> u64 {
    10
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    pub fn scoring_timeout(&self) -> Duration {
        Duration::from_secs(self.scoring_timeout_secs)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
