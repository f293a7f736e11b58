use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use tracing::warn;

const DEFAULT_JWT_SECRET: &str = "dev-secret-change-me";

pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
}

impl ServerConfig {
    /// Read `WEAVE_*` variables from the process environment (after `.env`
    /// has been loaded).
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.into());

        let jwt_secret = var("WEAVE_JWT_SECRET", DEFAULT_JWT_SECRET);
        if jwt_secret == DEFAULT_JWT_SECRET {
            warn!("WEAVE_JWT_SECRET not set; using the development secret");
        }

        let port = var("WEAVE_PORT", "3000")
            .parse()
            .context("WEAVE_PORT must be a port number")?;
        let ttl_hours: i64 = var("WEAVE_TOKEN_TTL_HOURS", "720")
            .parse()
            .context("WEAVE_TOKEN_TTL_HOURS must be a whole number of hours")?;

        Ok(Self {
            host: var("WEAVE_HOST", "0.0.0.0"),
            port,
            db_path: PathBuf::from(var("WEAVE_DB_PATH", "weave.db")),
            jwt_secret,
            token_ttl: chrono::Duration::hours(ttl_hours),
        })
    }

    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}
