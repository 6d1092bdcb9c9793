use chrono::TimeDelta;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),
    #[error("{key} has invalid value '{value}'")]
    Invalid { key: &'static str, value: String },
}

/// Startup configuration, read once from the environment
#[derive(Debug, Clone)]
pub struct WizardConfig {
    pub port: u16,
    pub portal_api_url: String,
    pub portal_api_token: Option<String>,
    pub pinata_api_url: String,
    pub pinata_api_key: String,
    pub pinata_secret_key: String,
    pub ledger_rpc_url: String,
    pub contract_address: String,
    pub document_shared_key: String,
    pub celebration: TimeDelta,
    pub receipt_poll_interval: Duration,
}

impl WizardConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |key: &'static str| lookup(key).ok_or(ConfigError::Missing(key));
        let or_default = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Ok(Self {
            port: parse(&lookup, "PORT", 3000)?,
            portal_api_url: or_default("PORTAL_API_URL", "http://localhost:5008"),
            portal_api_token: lookup("PORTAL_API_TOKEN"),
            pinata_api_url: or_default(
                "PINATA_API_URL",
                "https://api.pinata.cloud/pinning/pinFileToIPFS",
            ),
            pinata_api_key: required("PINATA_API_KEY")?,
            pinata_secret_key: required("PINATA_SECRET_KEY")?,
            ledger_rpc_url: or_default("LEDGER_RPC_URL", "http://localhost:8545"),
            contract_address: required("CONTRACT_ADDRESS")?,
            document_shared_key: or_default("DOCUMENT_SHARED_KEY", "some-encryption-key"),
            celebration: celebration_window(&lookup)?,
            receipt_poll_interval: Duration::from_millis(parse(&lookup, "RECEIPT_POLL_MS", 1000)?),
        })
    }
}

fn celebration_window(lookup: &impl Fn(&str) -> Option<String>) -> Result<TimeDelta, ConfigError> {
    const KEY: &str = "CELEBRATION_SECONDS";
    let seconds: i64 = parse(lookup, KEY, 5)?;
    if seconds < 0 {
        return Err(ConfigError::Invalid {
            key: KEY,
            value: seconds.to_string(),
        });
    }
    TimeDelta::try_seconds(seconds).ok_or_else(|| ConfigError::Invalid {
        key: KEY,
        value: seconds.to_string(),
    })
}

fn parse<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}
