//! Configuration loaded from environment variables.

use std::env;
use std::net::SocketAddr;

/// Admin web server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address.
    pub addr: SocketAddr,
    /// SQLite database URL.
    pub database_url: String,
    /// Delivery-provider webhook endpoint; absent means dry-run sends.
    pub mail_webhook_url: Option<String>,
    /// Recipient for admin notifications and aging reports.
    pub admin_email: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `ADMIN_ADDR` | Server bind address | `127.0.0.1:8788` |
    /// | `SQLITE_PATH` | SQLite database URL | `sqlite:renovo.db?mode=rwc` |
    /// | `MAIL_WEBHOOK_URL` | Delivery provider endpoint | (optional, dry-run if unset) |
    /// | `ADMIN_EMAIL` | Admin notification recipient | (required) |
    pub fn from_env() -> Result<Self, ConfigError> {
        let addr = env::var("ADMIN_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8788".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidAddr)?;

        let database_url = env::var("SQLITE_PATH")
            .unwrap_or_else(|_| "sqlite:renovo.db?mode=rwc".to_string());

        let mail_webhook_url = env::var("MAIL_WEBHOOK_URL").ok();

        let admin_email = env::var("ADMIN_EMAIL").map_err(|_| ConfigError::MissingAdminEmail)?;

        Ok(Self {
            addr,
            database_url,
            mail_webhook_url,
            admin_email,
        })
    }
}

/// Configuration errors. Fatal at process start.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid ADMIN_ADDR format")]
    InvalidAddr,

    #[error("ADMIN_EMAIL environment variable is required")]
    MissingAdminEmail,
}
