//! Configuration system for the roster service.
//!
//! Supports a TOML file with sections for the HTTP server, the database
//! gateway, query limits and error reporting. Every field has a default so an
//! empty file (or no file at all) yields a usable configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DotacionError, Result};

/// Hard ceiling on rows returned by any query, export or report.
pub const MAX_ROWS: u64 = 50_000;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DotacionConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub query: QueryConfig,
    pub schema_cache: SchemaCacheConfig,
    pub errors: ErrorConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to bind (default: 0.0.0.0:3000).
    pub bind: String,
}

/// Which gateway implementation to open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Mysql,
    Duckdb,
    Postgres,
}

/// Database gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub backend: BackendKind,
    /// Connection URL, or a file path for DuckDB. `DATABASE_URL` overrides it.
    pub url: Option<String>,
    /// Maximum pool size (default: 16).
    pub pool_size: usize,
    /// Schema used for PostgreSQL introspection (default: public).
    pub schema: String,
    /// Maximum concurrent DuckDB executions (default: 16).
    pub max_concurrency: usize,
}

/// Query execution configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Maximum rows to return; values above [`MAX_ROWS`] are clamped.
    pub max_rows: u64,
    /// Emit generated SQL and bound parameters at debug level.
    pub log_queries: bool,
}

/// Schema cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SchemaCacheConfig {
    /// Cache TTL in seconds (default: 3600).
    pub ttl_secs: u64,
    /// Maximum cached schemas (default: 64).
    pub max_size: usize,
}

/// Error reporting configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ErrorConfig {
    /// Include internal error detail in 5xx responses (development only).
    pub verbose: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".to_string(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            url: None,
            pool_size: 16,
            schema: "public".to_string(),
            max_concurrency: 16,
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_rows: MAX_ROWS,
            log_queries: false,
        }
    }
}

impl Default for SchemaCacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 3600,
            max_size: 64,
        }
    }
}

impl QueryConfig {
    /// Row cap actually applied: `max_rows` bounded by [`MAX_ROWS`], with 0 meaning the ceiling.
    pub fn effective_max_rows(&self) -> u64 {
        match self.max_rows {
            0 => MAX_ROWS,
            n => n.min(MAX_ROWS),
        }
    }
}

impl DotacionConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| DotacionError::Config(format!("failed to read config file: {e}")))?;
        Self::from_toml(&contents)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| DotacionError::Config(format!("failed to parse config: {e}")))
    }

    /// Load from default locations (env var, cwd, user config dir, or defaults).
    ///
    /// Search order:
    /// 1. `DOTACION_CONFIG` environment variable
    /// 2. `./dotacion.toml` (current directory)
    /// 3. `~/.config/dotacion/config.toml` (user config dir)
    /// 4. Built-in defaults
    ///
    /// `DATABASE_URL` is applied on top of whichever source won.
    pub fn load_default() -> Self {
        let mut cfg = Self::load_file_or_default();
        cfg.apply_env();
        cfg
    }

    fn load_file_or_default() -> Self {
        if let Ok(path) = std::env::var("DOTACION_CONFIG") {
            match Self::from_file(&path) {
                Ok(cfg) => {
                    tracing::info!(path = %path, "loaded config from DOTACION_CONFIG");
                    return cfg;
                }
                Err(e) => tracing::warn!(path = %path, error = %e, "ignoring DOTACION_CONFIG"),
            }
        }

        if let Ok(cfg) = Self::from_file("dotacion.toml") {
            tracing::info!("loaded config from ./dotacion.toml");
            return cfg;
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("dotacion").join("config.toml");
            if let Ok(cfg) = Self::from_file(&user_config) {
                tracing::info!(path = %user_config.display(), "loaded config from user config dir");
                return cfg;
            }
        }

        tracing::debug!("no config file found, using defaults");
        Self::default()
    }

    /// Overlay environment variables onto the loaded configuration.
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            if !url.trim().is_empty() {
                self.database.url = Some(url);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = DotacionConfig::default();
        assert_eq!(cfg.server.bind, "0.0.0.0:3000");
        assert_eq!(cfg.database.backend, BackendKind::Mysql);
        assert_eq!(cfg.database.pool_size, 16);
        assert_eq!(cfg.query.max_rows, MAX_ROWS);
        assert!(!cfg.query.log_queries);
        assert!(!cfg.errors.verbose);
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
[server]
bind = "127.0.0.1:8080"

[database]
backend = "duckdb"
url = "/tmp/roster.duckdb"
max_concurrency = 4

[query]
max_rows = 1000
log_queries = true
"#;
        let cfg = DotacionConfig::from_toml(toml).unwrap();
        assert_eq!(cfg.server.bind, "127.0.0.1:8080");
        assert_eq!(cfg.database.backend, BackendKind::Duckdb);
        assert_eq!(cfg.database.url.as_deref(), Some("/tmp/roster.duckdb"));
        assert_eq!(cfg.database.max_concurrency, 4);
        // untouched fields keep their defaults
        assert_eq!(cfg.database.pool_size, 16);
        assert_eq!(cfg.query.max_rows, 1000);
        assert!(cfg.query.log_queries);
        assert_eq!(cfg.schema_cache.ttl_secs, 3600);
    }

    #[test]
    fn test_effective_max_rows_is_clamped() {
        let mut query = QueryConfig::default();
        assert_eq!(query.effective_max_rows(), 50_000);

        query.max_rows = 200;
        assert_eq!(query.effective_max_rows(), 200);

        query.max_rows = 1_000_000;
        assert_eq!(query.effective_max_rows(), 50_000);

        query.max_rows = 0;
        assert_eq!(query.effective_max_rows(), 50_000);
    }

    #[test]
    fn test_rejects_unknown_backend() {
        let err = DotacionConfig::from_toml("[database]\nbackend = \"oracle\"\n").unwrap_err();
        assert!(matches!(err, DotacionError::Config(_)));
    }
}
