//! # Core Configuration Module
//!
//! Provides configuration management for the catalog service.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance holding the settings the persistence layer needs: where the store
//! lives, how large the connection pool may grow, how long idle connections
//! are kept, and the deadline applied to every repository statement. The
//! builder validates eagerly so that a misconfigured process fails at start-up
//! rather than on its first query.
//!
//! ## Usage
//!
//! ```
//! use core_runtime::config::CoreConfig;
//! use std::time::Duration;
//!
//! let config = CoreConfig::builder()
//!     .database_url("sqlite://catalog.db")
//!     .max_connections(25)
//!     .max_idle_time(Duration::from_secs(15 * 60))
//!     .build()
//!     .expect("valid config");
//!
//! assert_eq!(config.query_timeout, Duration::from_secs(3));
//! ```
//!
//! ## Environment
//!
//! [`CoreConfig::from_env`] reads the same settings from `CATALOG_*`
//! environment variables, falling back to the builder defaults.

use crate::error::{Error, Result};
use crate::logging::redact_dsn;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default maximum number of pooled connections.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 25;
/// Default maximum idle time for a pooled connection.
pub const DEFAULT_MAX_IDLE_TIME: Duration = Duration::from_secs(15 * 60);
/// Default maximum lifetime for a pooled connection.
pub const DEFAULT_MAX_LIFETIME: Duration = Duration::from_secs(30 * 60);
/// Default time to wait for a free connection.
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);
/// Deadline applied to each repository call.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(3);

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl FromStr for Environment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "staging" => Ok(Self::Staging),
            "production" | "prod" => Ok(Self::Production),
            other => Err(Error::Config(format!(
                "Unknown environment '{}' (expected development|staging|production)",
                other
            ))),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Development => "development",
            Self::Staging => "staging",
            Self::Production => "production",
        };
        f.write_str(name)
    }
}

/// Core configuration for the catalog service.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone, PartialEq, Eq)]
pub struct CoreConfig {
    /// Store connection string (e.g. `sqlite://catalog.db`)
    pub database_url: String,

    /// Deployment environment
    pub environment: Environment,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections kept open
    pub min_connections: u32,

    /// Idle connections older than this are closed
    pub max_idle_time: Duration,

    /// Connections older than this are recycled
    pub max_lifetime: Duration,

    /// Maximum time to wait for a connection from the pool
    pub acquire_timeout: Duration,

    /// Deadline for every repository call
    pub query_timeout: Duration,
}

impl fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreConfig")
            .field("database_url", &redact_dsn(&self.database_url))
            .field("environment", &self.environment)
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .field("max_idle_time", &self.max_idle_time)
            .field("max_lifetime", &self.max_lifetime)
            .field("acquire_timeout", &self.acquire_timeout)
            .field("query_timeout", &self.query_timeout)
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Build a configuration from `CATALOG_*` environment variables.
    ///
    /// | Variable | Setting |
    /// |----------|---------|
    /// | `CATALOG_DB_DSN` | `database_url` (required) |
    /// | `CATALOG_ENV` | `environment` |
    /// | `CATALOG_DB_MAX_OPEN_CONNS` | `max_connections` |
    /// | `CATALOG_DB_MAX_IDLE_TIME_SECS` | `max_idle_time` |
    /// | `CATALOG_QUERY_TIMEOUT_MS` | `query_timeout` |
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = CoreConfig::builder();

        if let Some(url) = lookup("CATALOG_DB_DSN") {
            builder = builder.database_url(url);
        }
        if let Some(env) = lookup("CATALOG_ENV") {
            builder = builder.environment(env.parse()?);
        }
        if let Some(max) = lookup("CATALOG_DB_MAX_OPEN_CONNS") {
            builder = builder.max_connections(parse_number("CATALOG_DB_MAX_OPEN_CONNS", &max)?);
        }
        if let Some(secs) = lookup("CATALOG_DB_MAX_IDLE_TIME_SECS") {
            let secs = parse_number("CATALOG_DB_MAX_IDLE_TIME_SECS", &secs)?;
            builder = builder.max_idle_time(Duration::from_secs(secs));
        }
        if let Some(ms) = lookup("CATALOG_QUERY_TIMEOUT_MS") {
            let ms = parse_number("CATALOG_QUERY_TIMEOUT_MS", &ms)?;
            builder = builder.query_timeout(Duration::from_millis(ms));
        }

        builder.build()
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.database_url.trim().is_empty() {
            return Err(Error::Config("Database URL cannot be empty".to_string()));
        }

        if self.max_connections == 0 {
            return Err(Error::Config(
                "Maximum connections must be greater than 0".to_string(),
            ));
        }

        if self.min_connections > self.max_connections {
            return Err(Error::Config(format!(
                "Minimum connections ({}) exceeds maximum connections ({})",
                self.min_connections, self.max_connections
            )));
        }

        if self.query_timeout.is_zero() {
            return Err(Error::Config(
                "Query timeout must be greater than 0".to_string(),
            ));
        }

        if self.acquire_timeout.is_zero() {
            return Err(Error::Config(
                "Acquire timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{} must be a non-negative integer, got '{}'", key, value)))
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Debug, Default)]
pub struct CoreConfigBuilder {
    database_url: Option<String>,
    environment: Option<Environment>,
    max_connections: Option<u32>,
    min_connections: Option<u32>,
    max_idle_time: Option<Duration>,
    max_lifetime: Option<Duration>,
    acquire_timeout: Option<Duration>,
    query_timeout: Option<Duration>,
}

impl CoreConfigBuilder {
    /// Sets the store connection string.
    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    /// Sets the deployment environment.
    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Sets the maximum pool size.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = Some(max);
        self
    }

    /// Sets the number of connections kept open while idle.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = Some(min);
        self
    }

    /// Sets how long an idle connection may live.
    pub fn max_idle_time(mut self, idle: Duration) -> Self {
        self.max_idle_time = Some(idle);
        self
    }

    /// Sets the maximum connection lifetime.
    pub fn max_lifetime(mut self, lifetime: Duration) -> Self {
        self.max_lifetime = Some(lifetime);
        self
    }

    /// Sets the pool acquire timeout.
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = Some(timeout);
        self
    }

    /// Sets the per-call statement deadline.
    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }

    /// Builds the final configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the database URL is missing or any value
    /// fails [`CoreConfig::validate`].
    pub fn build(self) -> Result<CoreConfig> {
        let database_url = self.database_url.ok_or_else(|| {
            Error::Config(
                "Database URL is required. Set it with `database_url()` or CATALOG_DB_DSN."
                    .to_string(),
            )
        })?;

        let config = CoreConfig {
            database_url,
            environment: self.environment.unwrap_or_default(),
            max_connections: self.max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS),
            min_connections: self.min_connections.unwrap_or(1),
            max_idle_time: self.max_idle_time.unwrap_or(DEFAULT_MAX_IDLE_TIME),
            max_lifetime: self.max_lifetime.unwrap_or(DEFAULT_MAX_LIFETIME),
            acquire_timeout: self.acquire_timeout.unwrap_or(DEFAULT_ACQUIRE_TIMEOUT),
            query_timeout: self.query_timeout.unwrap_or(DEFAULT_QUERY_TIMEOUT),
        };

        config.validate()?;
        Ok(config)
    }
}
