use crate::infrastructure::security::{DEFAULT_TOKEN_TTL_SECS, MAX_TOKEN_TTL_SECS};
use anyhow::{Context, Result, bail};
use std::str::FromStr;
use tracing::warn;

const DEV_JWT_SECRET: &str = "change-me-for-production";
const DEFAULT_DATABASE_PATH: &str = "expenses.db";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub token_ttl_secs: i64,
    pub database_path: String,
    pub cors_allowed_origin: Option<String>,
    pub json_logs: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so it can be tested
    /// without touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = match lookup("JWT_SECRET") {
            Some(secret) if !secret.is_empty() => secret,
            _ => {
                warn!("JWT_SECRET not set; using the development secret");
                DEV_JWT_SECRET.to_string()
            }
        };

        let token_ttl_secs = parse_or(&lookup, "TOKEN_TTL_SECS", DEFAULT_TOKEN_TTL_SECS)?;
        if !(1..=MAX_TOKEN_TTL_SECS).contains(&token_ttl_secs) {
            bail!("TOKEN_TTL_SECS must be between 1 and {MAX_TOKEN_TTL_SECS}, got {token_ttl_secs}");
        }

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parse_or(&lookup, "PORT", 8080)?,
            jwt_secret,
            token_ttl_secs,
            database_path: lookup("EXPENSE_DB")
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string()),
            cors_allowed_origin: lookup("CORS_ALLOWED_ORIGIN").filter(|v| !v.is_empty()),
            json_logs: lookup("LOG_FORMAT").is_some_and(|v| v == "json"),
        })
    }

    pub fn bind_addr(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        None => Ok(default),
    }
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
        let config = AppConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.jwt_secret, DEV_JWT_SECRET);
        assert_eq!(config.token_ttl_secs, DEFAULT_TOKEN_TTL_SECS);
        assert_eq!(config.database_path, DEFAULT_DATABASE_PATH);
        assert!(config.cors_allowed_origin.is_none());
        assert!(!config.json_logs);
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("HOST", "0.0.0.0"),
            ("PORT", "9000"),
            ("JWT_SECRET", "s3cret"),
            ("TOKEN_TTL_SECS", "120"),
            ("EXPENSE_DB", "/var/lib/expenses/data.db"),
            ("CORS_ALLOWED_ORIGIN", "http://localhost:3000"),
            ("LOG_FORMAT", "json"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr(), ("0.0.0.0".to_string(), 9000));
        assert_eq!(config.jwt_secret, "s3cret");
        assert_eq!(config.token_ttl_secs, 120);
        assert_eq!(config.database_path, "/var/lib/expenses/data.db");
        assert_eq!(
            config.cors_allowed_origin.as_deref(),
            Some("http://localhost:3000")
        );
        assert!(config.json_logs);
    }

    #[test]
    fn test_invalid_port_is_an_error() {
        let err = AppConfig::from_lookup(lookup_from(&[("PORT", "eighty")])).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn test_token_ttl_must_be_positive_and_bounded() {
        for ttl in ["0", "-60", "9223372036854775807"] {
            let err = AppConfig::from_lookup(lookup_from(&[("TOKEN_TTL_SECS", ttl)])).unwrap_err();
            assert!(err.to_string().contains("TOKEN_TTL_SECS"), "{ttl}: {err}");
        }

        let config = AppConfig::from_lookup(lookup_from(&[(
            "TOKEN_TTL_SECS",
            &MAX_TOKEN_TTL_SECS.to_string(),
        )]))
        .unwrap();
        assert_eq!(config.token_ttl_secs, MAX_TOKEN_TTL_SECS);
    }
}
