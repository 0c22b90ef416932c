//! Service configuration loaded from `FEEDBACK_*` environment variables

use anyhow::Result;
use config::{Config, Environment};
use serde::Deserialize;

/// Where users, feedback and sessions are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// PostgreSQL for records, Redis for sessions
    Postgres,
    /// Everything in process memory, lost on restart
    Memory,
}

/// Feedback service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Address the HTTP server binds to
    pub bind_address: String,
    /// Name of the cookie carrying the session token
    pub session_cookie: String,
    /// Session lifetime in seconds; sessions last until logout when unset
    pub session_ttl_seconds: Option<u64>,
    pub storage: StorageBackend,
}

impl AppConfig {
    /// Load the configuration from the environment
    ///
    /// # Environment Variables
    /// - `FEEDBACK_BIND_ADDRESS`: listen address (default: "0.0.0.0:3000")
    /// - `FEEDBACK_SESSION_COOKIE`: session cookie name (default: "feedback_session")
    /// - `FEEDBACK_SESSION_TTL_SECONDS`: optional session lifetime
    /// - `FEEDBACK_STORAGE`: "postgres" (default) or "memory"
    pub fn from_env() -> Result<Self> {
        let settings = Config::builder()
            .set_default("bind_address", "0.0.0.0:3000")?
            .set_default("session_cookie", "feedback_session")?
            .set_default("storage", "postgres")?
            .add_source(Environment::with_prefix("FEEDBACK").try_parsing(true))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
