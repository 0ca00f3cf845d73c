use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

/// Allowed browser origin for CORS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigin {
    Any,
    Exact(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub store_timeout: Duration,
    pub cors_origin: CorsOrigin,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let port = var("STEEPLE_PORT", "8080")
            .parse()
            .context("STEEPLE_PORT must be a port number")?;
        let timeout_secs: u64 = var("STEEPLE_STORE_TIMEOUT_SECS", "10")
            .parse()
            .context("STEEPLE_STORE_TIMEOUT_SECS must be a whole number of seconds")?;
        if timeout_secs == 0 {
            anyhow::bail!("STEEPLE_STORE_TIMEOUT_SECS must be at least 1");
        }

        let cors_origin = match var("STEEPLE_CORS_ORIGIN", "http://localhost:5173").trim() {
            "*" => CorsOrigin::Any,
            origin => CorsOrigin::Exact(origin.to_string()),
        };

        Ok(Self {
            db_path: var("STEEPLE_DB_PATH", "steeple.db").into(),
            host: var("STEEPLE_HOST", "0.0.0.0"),
            port,
            store_timeout: Duration::from_secs(timeout_secs),
            cors_origin,
        })
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", self.host, self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.db_path, PathBuf::from("steeple.db"));
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.store_timeout, Duration::from_secs(10));
        assert_eq!(cfg.cors_origin, CorsOrigin::Exact("http://localhost:5173".into()));
        assert_eq!(cfg.bind_addr().unwrap().to_string(), "0.0.0.0:8080");
    }

    #[test]
    fn overrides() {
        let cfg = config(&[
            ("STEEPLE_PORT", "9000"),
            ("STEEPLE_HOST", "127.0.0.1"),
            ("STEEPLE_STORE_TIMEOUT_SECS", "3"),
            ("STEEPLE_CORS_ORIGIN", "*"),
        ])
        .unwrap();
        assert_eq!(cfg.bind_addr().unwrap().to_string(), "127.0.0.1:9000");
        assert_eq!(cfg.store_timeout, Duration::from_secs(3));
        assert_eq!(cfg.cors_origin, CorsOrigin::Any);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(config(&[("STEEPLE_PORT", "http")]).is_err());
        assert!(config(&[("STEEPLE_STORE_TIMEOUT_SECS", "0")]).is_err());
    }
}
