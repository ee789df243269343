//! Process configuration, read from the environment (and `.env` if present).

use anyhow::{anyhow, Context, Result};

const DEFAULT_PORT: u16 = 3001;
const DEFAULT_MAX_CONNECTIONS: u32 = 16;
const DEFAULT_RUST_LOG: &str = "chatrelay=info,tower_http=info";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub database_max_connections: u32,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_source(|key| dotenv::var(key).ok())
    }

    pub fn from_source(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_url = var("DATABASE_URL").ok_or_else(|| anyhow!("DATABASE_URL is required"))?;

        let port = match var("PORT") {
            Some(port) => port.parse().with_context(|| format!("PORT must be a port number, got {port:?}"))?,
            None => DEFAULT_PORT,
        };

        let database_max_connections = match var("DATABASE_MAX_CONNECTIONS") {
            Some(n) => n
                .parse()
                .with_context(|| format!("DATABASE_MAX_CONNECTIONS must be a positive integer, got {n:?}"))?,
            None => DEFAULT_MAX_CONNECTIONS,
        };
        if database_max_connections == 0 {
            return Err(anyhow!("DATABASE_MAX_CONNECTIONS must be at least 1"));
        }

        Ok(Self {
            database_url,
            port,
            database_max_connections,
            rust_log: var("RUST_LOG").unwrap_or_else(|| DEFAULT_RUST_LOG.to_owned()),
        })
    }
}
