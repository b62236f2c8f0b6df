use std::env;

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url = database_url_from(&var)?;
        let jwt_secret = var("JWT_SECRET").context("JWT_SECRET is not set")?;
        let host = var("APP_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = var("APP_PORT")
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let jwt_ttl_hours = var("JWT_TTL_HOURS")
            .and_then(|h| h.parse::<i64>().ok())
            .filter(|h| *h > 0)
            .unwrap_or(24);
        Ok(Self {
            port,
            database_url,
            host,
            jwt_secret,
            jwt_ttl_hours,
        })
    }
}

/// `DATABASE_URL` alone, for the maintenance binaries that never sign tokens.
pub fn database_url() -> anyhow::Result<String> {
    database_url_from(|key| env::var(key).ok())
}

fn database_url_from(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<String> {
    var("DATABASE_URL").context("DATABASE_URL is not set")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn database_url_does_not_need_the_jwt_secret() {
        let only_db = vars(&[("DATABASE_URL", "postgres://localhost/lemon")]);
        assert_eq!(
            database_url_from(&only_db).unwrap(),
            "postgres://localhost/lemon"
        );
        assert!(AppConfig::from_vars(&only_db).is_err());
    }

    #[test]
    fn server_config_fills_defaults() {
        let config = AppConfig::from_vars(vars(&[
            ("DATABASE_URL", "postgres://localhost/lemon"),
            ("JWT_SECRET", "s3cret"),
            ("APP_PORT", "not-a-port"),
            ("JWT_TTL_HOURS", "0"),
        ]))
        .unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 3000);
        assert_eq!(config.jwt_ttl_hours, 24);
        assert_eq!(config.jwt_secret, "s3cret");
    }

    #[test]
    fn missing_database_url_is_reported() {
        let err = database_url_from(vars(&[])).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }
}
