//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// HTTP service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Port the HTTP server listens on.
    pub port: u16,
    /// libSQL database file.
    pub db_path: PathBuf,
    /// Billing page that plan-selection receipts link to.
    pub checkout_url: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            db_path: PathBuf::from("./data/wa-onboarding.db"),
            checkout_url: "https://billing.example.com/checkout".to_string(),
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup. Unset variables keep their
    /// defaults; set but malformed ones are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let port = match lookup("WA_ONBOARDING_PORT") {
            Some(v) => parse_value("WA_ONBOARDING_PORT", &v)?,
            None => defaults.port,
        };
        let db_path = lookup("WA_ONBOARDING_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path);
        let checkout_url = match lookup("WA_ONBOARDING_CHECKOUT_URL") {
            Some(v) => {
                reqwest::Url::parse(&v).map_err(|e| ConfigError::InvalidValue {
                    key: "WA_ONBOARDING_CHECKOUT_URL".to_string(),
                    message: e.to_string(),
                })?;
                v
            }
            None => defaults.checkout_url,
        };
        Ok(Self {
            port,
            db_path,
            checkout_url,
        })
    }
}

/// Settings for the onboarding client: the remote session API and the
/// locally persisted session.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Service base URL, e.g. `http://localhost:8080`.
    pub base_url: String,
    pub timeout: Duration,
    /// Locally persisted sessions older than this are discarded. `None`
    /// keeps them forever.
    pub session_ttl: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout: Duration::from_secs(10),
            session_ttl: Some(Duration::from_secs(168 * 3600)), // 7 days
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let base_url = lookup("WA_ONBOARDING_API_URL").unwrap_or(defaults.base_url);
        let timeout = match lookup("WA_ONBOARDING_API_TIMEOUT_SECS") {
            Some(v) => Duration::from_secs(parse_value("WA_ONBOARDING_API_TIMEOUT_SECS", &v)?),
            None => defaults.timeout,
        };
        let session_ttl = match lookup("WA_ONBOARDING_SESSION_TTL_HOURS") {
            Some(v) => {
                let hours: u64 = parse_value("WA_ONBOARDING_SESSION_TTL_HOURS", &v)?;
                (hours > 0).then(|| Duration::from_secs(hours * 3600))
            }
            None => defaults.session_ttl,
        };
        Ok(Self {
            base_url,
            timeout,
            session_ttl,
        })
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("'{raw}': {e}"),
    })
}
