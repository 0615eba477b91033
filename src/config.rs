//! Service configuration parsed from environment variables.

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

/// Where feedback documents live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Postgres,
    Memory,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown FEEDBACK_BACKEND: {0}")]
    UnknownBackend(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    pub backend: BackendKind,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
}

impl ServerConfig {
    /// Build typed config from environment variables.
    ///
    /// Optional:
    /// - `DATABASE_URL`: Postgres connection string
    /// - `PORT`: default 5000
    /// - `FEEDBACK_BACKEND`: `postgres` (default) or `memory`
    /// - `DB_MAX_CONNECTIONS`: default 5
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownBackend`] for an unrecognized backend.
    pub fn from_env() -> Result<Self, ConfigError> {
        let backend = parse_backend(std::env::var("FEEDBACK_BACKEND").ok().as_deref())?;
        let database_url = std::env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty());

        Ok(Self {
            port: env_parse("PORT", DEFAULT_PORT),
            backend,
            database_url,
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS),
        })
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

fn parse_backend(raw: Option<&str>) -> Result<BackendKind, ConfigError> {
    match raw.unwrap_or("postgres") {
        "postgres" => Ok(BackendKind::Postgres),
        "memory" => Ok(BackendKind::Memory),
        other => Err(ConfigError::UnknownBackend(other.to_owned())),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
