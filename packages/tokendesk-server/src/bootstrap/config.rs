use anyhow::{Context, Result, bail};
use std::net::SocketAddr;
use tracing::warn;

const DEFAULT_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_DB_URL: &str = "sqlite://tokendesk.db?mode=rwc";
const DEFAULT_JWT_SECRET: &str = "tokendesk_default_jwt_secret_change_in_production";
const DEFAULT_SESSION_HOURS: i64 = 12;
const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Clone)]
pub(crate) struct AppConfig {
    pub(crate) addr: SocketAddr,
    pub(crate) db_url: String,
    pub(crate) jwt_secret: String,
    pub(crate) session_hours: i64,
}

impl AppConfig {
    pub(crate) fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let addr_text = lookup("TOKENDESK_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let addr: SocketAddr = addr_text
            .parse()
            .with_context(|| format!("invalid TOKENDESK_ADDR: {addr_text}"))?;

        let db_url = lookup("TOKENDESK_DB_URL").unwrap_or_else(|| DEFAULT_DB_URL.to_string());

        let jwt_secret = lookup("TOKENDESK_JWT_SECRET").unwrap_or_else(|| {
            warn!("Using default JWT secret. Please set TOKENDESK_JWT_SECRET environment variable in production!");
            DEFAULT_JWT_SECRET.to_string()
        });
        if jwt_secret.len() < MIN_SECRET_LEN {
            bail!("TOKENDESK_JWT_SECRET must be at least {MIN_SECRET_LEN} characters long");
        }

        let session_hours = match lookup("TOKENDESK_SESSION_HOURS") {
            Some(text) => text
                .parse::<i64>()
                .ok()
                .filter(|hours| *hours > 0)
                .with_context(|| format!("invalid TOKENDESK_SESSION_HOURS: {text}"))?,
            None => DEFAULT_SESSION_HOURS,
        };

        Ok(Self {
            addr,
            db_url,
            jwt_secret,
            session_hours,
        })
    }
}
