//! Database backend implementations.
//!
//! Each backend is implemented in its own file and gated behind a feature flag.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::{BackendKind, DatabaseConfig};
use crate::dialect::Dialect;
use crate::error::{DotacionError, Result};
use crate::executor::QueryResult;
use crate::schema_cache::TableSchema;

/// Unified interface for all database backends.
///
/// `execute_sql` receives SQL rendered for [`BackendConnection::dialect`] and
/// the values bound to its placeholders, in order. Backends stop reading once
/// `max_rows` rows have been fetched and never buffer more than that.
#[async_trait]
pub trait BackendConnection: Send + Sync {
    fn dialect(&self) -> &(dyn Dialect + Send + Sync);
    async fn fetch_schema(&self, table: &str) -> Result<TableSchema>;
    async fn execute_sql(
        &self,
        sql: &str,
        params: &[Value],
        max_rows: usize,
    ) -> Result<QueryResult>;
    /// Base tables visible in the connected schema.
    async fn list_tables(&self) -> Result<Vec<String>>;
    /// Name of the connected database or schema, for diagnostics.
    fn database_name(&self) -> Option<String> {
        None
    }
    async fn ping(&self) -> Result<()> {
        self.execute_sql("SELECT 1", &[], 1).await.map(|_| ())
    }
}

/// Open the backend selected in configuration.
pub async fn connect(config: &DatabaseConfig) -> Result<Arc<dyn BackendConnection>> {
    let url = config
        .url
        .as_deref()
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| DotacionError::Config("database url is not configured".to_string()))?;

    tracing::info!(backend = ?config.backend, "connecting database backend");
    match config.backend {
        #[cfg(feature = "mysql")]
        BackendKind::Mysql => Ok(Arc::new(MySqlConnection::new(url, config.pool_size)?)),
        #[cfg(feature = "duckdb")]
        BackendKind::Duckdb => {
            Ok(Arc::new(DuckDbConnection::new(url).with_max_concurrency(config.max_concurrency)))
        }
        #[cfg(feature = "postgres")]
        BackendKind::Postgres => Ok(Arc::new(PostgresConnection::new(
            url,
            &config.schema,
            config.pool_size,
        )?)),
        #[allow(unreachable_patterns)]
        other => Err(DotacionError::Config(format!(
            "backend {other:?} is not compiled in; enable its cargo feature"
        ))),
    }
}

#[cfg(feature = "duckdb")]
mod duckdb;
#[cfg(feature = "duckdb")]
pub use duckdb::DuckDbConnection;

#[cfg(feature = "mysql")]
mod mysql;
#[cfg(feature = "mysql")]
pub use mysql::MySqlConnection;

#[cfg(feature = "postgres")]
mod postgres;
#[cfg(feature = "postgres")]
pub use postgres::PostgresConnection;
