use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),
    #[error("{key} has invalid value '{value}'")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub port: u16,
    /// Postgres is used when set; records are kept in memory otherwise
    pub database_url: Option<String>,
    pub api_tokens: HashSet<String>,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = match lookup("PORT") {
            None => 5008,
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::Invalid { key: "PORT", value })?,
        };

        let api_tokens: HashSet<String> = lookup("API_TOKENS")
            .ok_or(ConfigError::Missing("API_TOKENS"))?
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .collect();
        if api_tokens.is_empty() {
            return Err(ConfigError::Missing("API_TOKENS"));
        }

        Ok(Self {
            port,
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            api_tokens,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_tokens_and_defaults_port() {
        let config = ApiConfig::from_lookup(|key: &str| match key {
            "API_TOKENS" => Some(" alpha, beta ,,".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.port, 5008);
        assert!(config.database_url.is_none());
        assert_eq!(config.api_tokens.len(), 2);
        assert!(config.api_tokens.contains("beta"));
    }

    #[test]
    fn tokens_are_required() {
        let err = ApiConfig::from_lookup(|key: &str| match key {
            "API_TOKENS" => Some(" , ".to_string()),
            _ => None,
        })
        .unwrap_err();
        assert_eq!(err, ConfigError::Missing("API_TOKENS"));
    }

    #[test]
    fn rejects_bad_port() {
        let err = ApiConfig::from_lookup(|key: &str| match key {
            "API_TOKENS" => Some("t".to_string()),
            "PORT" => Some("eighty".to_string()),
            _ => None,
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "PORT", .. }));
    }
}
