//! DuckDB backend implementation.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use duckdb::types::Value as DuckValue;
use serde_json::Value;
use tokio::sync::{Mutex, Semaphore, SemaphorePermit};

use crate::dialect::DuckDbDialect;
use crate::error::{DotacionError, Result};
use crate::executor::{duck_value_to_cell, ColumnMeta, QueryResult};
use crate::schema_cache::{ColumnSchema, TableSchema};

use super::BackendConnection;

/// DuckDB connection implementing the unified backend trait.
#[derive(Clone)]
pub struct DuckDbConnection {
    database_path: PathBuf,
    dialect: DuckDbDialect,
    limiter: Arc<Semaphore>,
    pool: Arc<Mutex<Vec<duckdb::Connection>>>,
}

impl DuckDbConnection {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        tracing::info!(path = %path.display(), max_concurrency = 16, "creating DuckDB connection");
        Self {
            database_path: path,
            dialect: DuckDbDialect,
            limiter: Arc::new(Semaphore::new(16)),
            pool: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Configure maximum concurrent executions; callers can tune based on hardware.
    pub fn with_max_concurrency(mut self, max_in_flight: usize) -> Self {
        tracing::debug!(max_concurrency = max_in_flight, "configuring DuckDB concurrency");
        self.limiter = Arc::new(Semaphore::new(max_in_flight.max(1)));
        self
    }

    async fn acquire_slot(&self) -> Result<SemaphorePermit<'_>> {
        let available = self.limiter.available_permits();
        if available == 0 {
            tracing::debug!("all DuckDB slots in use, waiting for permit");
        }
        self.limiter
            .acquire()
            .await
            .map_err(|e| DotacionError::Execution(format!("limiter closed: {e}")))
    }

    async fn checkout_connection(&self) -> Result<duckdb::Connection> {
        let mut guard = self.pool.lock().await;
        if let Some(conn) = guard.pop() {
            let pool_size = guard.len();
            drop(guard);
            tracing::trace!(pool_remaining = pool_size, "reusing pooled DuckDB connection");
            return Ok(conn);
        }
        drop(guard);
        tracing::debug!(path = %self.database_path.display(), "opening new DuckDB connection");
        duckdb::Connection::open(self.database_path.clone())
            .map_err(|e| DotacionError::Execution(format!("open duckdb: {e}")))
    }

    async fn checkin_connection(&self, conn: duckdb::Connection) {
        self.pool.lock().await.push(conn);
    }

    /// Run `work` on a pooled connection off the async runtime.
    async fn with_connection<T, F>(&self, work: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&duckdb::Connection) -> Result<T> + Send + 'static,
    {
        let _permit = self.acquire_slot().await?;
        let conn = self.checkout_connection().await?;
        let (result, conn) = tokio::task::spawn_blocking(move || {
            let result = work(&conn);
            (result, conn)
        })
        .await
        .map_err(|e| DotacionError::Execution(format!("task join error: {e}")))?;
        self.checkin_connection(conn).await;
        result
    }
}

fn json_to_duck(value: &Value) -> DuckValue {
    match value {
        Value::Null => DuckValue::Null,
        Value::Bool(b) => DuckValue::Boolean(*b),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => DuckValue::BigInt(i),
            (None, Some(f)) => DuckValue::Double(f),
            (None, None) => DuckValue::Text(n.to_string()),
        },
        Value::String(s) => DuckValue::Text(s.clone()),
        nested => DuckValue::Text(nested.to_string()),
    }
}

fn run_query(
    conn: &duckdb::Connection,
    sql: &str,
    params: Vec<DuckValue>,
    max_rows: usize,
) -> Result<QueryResult> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows_iter = stmt.query(duckdb::params_from_iter(params))?;
    let stmt_ref = rows_iter
        .as_ref()
        .ok_or_else(|| DotacionError::Execution("statement missing".to_string()))?;
    let mut columns = Vec::new();
    for idx in 0..stmt_ref.column_count() {
        let name = stmt_ref
            .column_name(idx)
            .map_err(|e| DotacionError::Execution(e.to_string()))?;
        columns.push(ColumnMeta::new(name.as_str()));
    }
    let mut rows = Vec::new();
    while rows.len() < max_rows {
        let Some(row) = rows_iter.next()? else {
            break;
        };
        let mut cells = Vec::with_capacity(columns.len());
        for idx in 0..columns.len() {
            cells.push(duck_value_to_cell(row.get_ref(idx)?.to_owned()));
        }
        rows.push(cells);
    }
    Ok(QueryResult { columns, rows })
}

#[async_trait]
impl BackendConnection for DuckDbConnection {
    fn dialect(&self) -> &(dyn crate::dialect::Dialect + Send + Sync) {
        &self.dialect
    }

    fn database_name(&self) -> Option<String> {
        Some(self.database_path.display().to_string())
    }

    async fn fetch_schema(&self, table: &str) -> Result<TableSchema> {
        let table = table.to_string();
        self.with_connection(move |conn| {
            let start = Instant::now();
            let mut stmt = conn.prepare(
                "SELECT column_name, data_type, is_nullable \
                 FROM information_schema.columns \
                 WHERE table_name = ? \
                 ORDER BY ordinal_position",
            )?;
            let mut rows = stmt.query([table.as_str()])?;
            let mut columns = Vec::new();
            while let Some(row) = rows.next()? {
                let name: String = row.get(0)?;
                let data_type: String = row.get(1)?;
                let is_nullable: String = row.get(2)?;
                columns.push(ColumnSchema {
                    name,
                    data_type,
                    nullable: is_nullable == "YES",
                });
            }
            tracing::debug!(
                table = table.as_str(),
                columns = columns.len(),
                ms = start.elapsed().as_millis(),
                "duckdb fetch_schema"
            );
            Ok(TableSchema { columns })
        })
        .await
    }

    async fn execute_sql(
        &self,
        sql: &str,
        params: &[Value],
        max_rows: usize,
    ) -> Result<QueryResult> {
        let sql = sql.to_string();
        let params: Vec<DuckValue> = params.iter().map(json_to_duck).collect();
        self.with_connection(move |conn| {
            let start = Instant::now();
            let result = run_query(conn, &sql, params, max_rows)?;
            tracing::debug!(
                rows = result.rows.len(),
                columns = result.columns.len(),
                ms = start.elapsed().as_millis(),
                "duckdb execute_sql"
            );
            Ok(result)
        })
        .await
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT table_name FROM information_schema.tables \
                 WHERE table_type = 'BASE TABLE' \
                 ORDER BY table_name",
            )?;
            let mut rows = stmt.query([])?;
            let mut tables = Vec::new();
            while let Some(row) = rows.next()? {
                tables.push(row.get::<_, String>(0)?);
            }
            Ok(tables)
        })
        .await
    }
}
