use crate::error::{AppError, Result};
use std::env;
use std::ops::RangeInclusive;

const DEFAULT_SECRET_KEY: &str = "your-secret-key";

/// One year
pub const MAX_TOKEN_TTL_MINUTES: i64 = 525_600;
/// Ten years
pub const MAX_IMPORT_DAYS: i64 = 3_650;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub host: String,
    pub port: u16,
    pub secret_key: String,
    pub token_ttl_minutes: i64,
    pub broker: Option<BrokerConfig>,
    pub broker_import_days: i64,
}

/// Kite Connect application credentials
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub api_key: String,
    pub api_secret: String,
}

impl Config {
    /// Load configuration from the process environment (and `.env` if present)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_path = lookup("TRADEVERSE_DB_PATH")
            .unwrap_or_else(|| "./data/tradeverse.db".to_string());

        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());

        let port = lookup("PORT")
            .unwrap_or_else(|| "8000".to_string())
            .parse::<u16>()
            .map_err(|_| AppError::Config("Invalid PORT".to_string()))?;

        let secret_key = lookup("SECRET_KEY").unwrap_or_else(|| DEFAULT_SECRET_KEY.to_string());

        let token_ttl_minutes =
            bounded_int(&lookup, "ACCESS_TOKEN_EXPIRE_MINUTES", 30, 1..=MAX_TOKEN_TTL_MINUTES)?;

        let broker_import_days = bounded_int(&lookup, "BROKER_IMPORT_DAYS", 30, 0..=MAX_IMPORT_DAYS)?;

        // Both halves are required; a lone key or secret leaves the integration off
        let broker = match (lookup("ZERODHA_API_KEY"), lookup("ZERODHA_API_SECRET")) {
            (Some(api_key), Some(api_secret)) if !api_key.is_empty() && !api_secret.is_empty() => {
                Some(BrokerConfig { api_key, api_secret })
            }
            _ => None,
        };

        Ok(Self {
            database_path,
            host,
            port,
            secret_key,
            token_ttl_minutes,
            broker,
            broker_import_days,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn uses_default_secret(&self) -> bool {
        self.secret_key == DEFAULT_SECRET_KEY
    }
}

fn bounded_int<F>(lookup: &F, key: &str, default: i64, range: RangeInclusive<i64>) -> Result<i64>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    let value = raw
        .trim()
        .parse::<i64>()
        .map_err(|_| AppError::Config(format!("Invalid {}", key)))?;
    if !range.contains(&value) {
        return Err(AppError::Config(format!(
            "{} must be between {} and {}",
            key,
            range.start(),
            range.end()
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.port, 8000);
        assert_eq!(config.token_ttl_minutes, 30);
        assert_eq!(config.broker_import_days, 30);
        assert!(config.broker.is_none());
        assert!(config.uses_default_secret());
        assert_eq!(config.bind_addr(), "0.0.0.0:8000");
    }

    #[test]
    fn test_broker_requires_key_and_secret() {
        let config = Config::from_lookup(lookup_from(&[("ZERODHA_API_KEY", "abc")])).unwrap();
        assert!(config.broker.is_none());

        let config = Config::from_lookup(lookup_from(&[
            ("ZERODHA_API_KEY", "abc"),
            ("ZERODHA_API_SECRET", "xyz"),
        ]))
        .unwrap();
        let broker = config.broker.unwrap();
        assert_eq!(broker.api_key, "abc");
        assert_eq!(broker.api_secret, "xyz");
    }

    #[test]
    fn test_invalid_port_is_config_error() {
        let result = Config::from_lookup(lookup_from(&[("PORT", "not-a-port")]));
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_out_of_range_durations_are_config_errors() {
        for ttl in ["9223372036854775807", "0", "-30", "525601"] {
            let result = Config::from_lookup(lookup_from(&[("ACCESS_TOKEN_EXPIRE_MINUTES", ttl)]));
            assert!(matches!(result, Err(AppError::Config(_))), "ttl {} accepted", ttl);
        }
        for days in ["-1", "3651", "10000000000"] {
            let result = Config::from_lookup(lookup_from(&[("BROKER_IMPORT_DAYS", days)]));
            assert!(matches!(result, Err(AppError::Config(_))), "days {} accepted", days);
        }

        let config = Config::from_lookup(lookup_from(&[
            ("ACCESS_TOKEN_EXPIRE_MINUTES", "525600"),
            ("BROKER_IMPORT_DAYS", "0"),
        ]))
        .unwrap();
        assert_eq!(config.token_ttl_minutes, MAX_TOKEN_TTL_MINUTES);
        assert_eq!(config.broker_import_days, 0);
    }
}
