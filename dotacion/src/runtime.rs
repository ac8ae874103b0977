//! Request pipeline shared by the HTTP surface and the CLI.
//!
//! [`QueryService`] ties the immutable registries to one pooled backend:
//! descriptions are validated and built, executed with bound parameters,
//! capped, and serialized. Nothing here holds per-request state beyond the
//! introspected schema cache.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::backends::{self, BackendConnection};
use crate::catalog::{ColumnInfo, TableCatalog, TableInfo, DOTACION_TABLE};
use crate::config::{DotacionConfig, QueryConfig};
use crate::error::{DotacionError, Result};
use crate::executor::{CellValue, QueryResult};
use crate::export::{self, ExportFile, ExportFormat, Record};
use crate::query::{ColumnRef, Condition, QueryDescription, TableRef};
use crate::query_builder::{BuiltQuery, SqlBuilder};
use crate::reports::{ReportRegistry, ReportTemplate};
use crate::schema_cache::{SchemaCache, TableSchema};

const QUERY_EXPORT_BASE: &str = "consulta";
const QUERY_EXPORT_SHEET: &str = "Consulta";
const REPORT_SHEET: &str = "Datos";

/// Rows of an ad-hoc query plus the SQL shown back to the user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryOutcome {
    pub sql: String,
    pub rows: Vec<Record>,
    pub row_count: usize,
}

/// One block of the report catalog.
#[derive(Debug, Clone, Serialize)]
pub struct ReportBlockListing {
    pub id: &'static str,
    pub label: &'static str,
    pub descargas: Vec<ReportTemplate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthReport {
    pub database: Option<String>,
    pub table_accessible: bool,
}

pub struct QueryService {
    catalog: &'static TableCatalog,
    reports: &'static ReportRegistry,
    backend: Arc<dyn BackendConnection>,
    schema_cache: Mutex<SchemaCache>,
    query: QueryConfig,
}

impl QueryService {
    pub fn new(backend: Arc<dyn BackendConnection>, config: &DotacionConfig) -> Self {
        Self {
            catalog: TableCatalog::roster(),
            reports: ReportRegistry::roster(),
            backend,
            schema_cache: Mutex::new(SchemaCache::with_config(&config.schema_cache)),
            query: config.query.clone(),
        }
    }

    /// Open the configured backend and wrap it in a service.
    pub async fn connect(config: &DotacionConfig) -> Result<Self> {
        let backend = backends::connect(&config.database).await?;
        Ok(Self::new(backend, config))
    }

    pub fn catalog(&self) -> &'static TableCatalog {
        self.catalog
    }

    pub fn reports(&self) -> &'static ReportRegistry {
        self.reports
    }

    pub fn backend(&self) -> &Arc<dyn BackendConnection> {
        &self.backend
    }

    pub fn max_rows(&self) -> u64 {
        self.query.effective_max_rows()
    }

    /// Build a description for the connected backend without executing it.
    pub fn build(&self, query: &QueryDescription) -> Result<BuiltQuery> {
        let built = SqlBuilder::new(self.catalog).build_with_dialect(
            query,
            self.max_rows(),
            self.backend.dialect(),
        )?;
        Ok(built)
    }

    pub async fn run_query(&self, query: &QueryDescription) -> Result<QueryOutcome> {
        let built = self.build(query)?;
        let result = self.execute(&built.sql, &built.params).await?;
        let rows = export::to_flat_records(&result);
        Ok(QueryOutcome {
            sql: built.display_sql(self.backend.dialect()),
            row_count: rows.len(),
            rows,
        })
    }

    pub async fn export_query(
        &self,
        query: &QueryDescription,
        format: ExportFormat,
    ) -> Result<ExportFile> {
        let built = self.build(query)?;
        let result = self.execute(&built.sql, &built.params).await?;
        export::render(&result, format, QUERY_EXPORT_BASE, QUERY_EXPORT_SHEET, Utc::now())
    }

    /// Run a predefined report and serialize it as a download.
    ///
    /// `raw_params` are the untyped query-string values; unknown keys are ignored.
    pub async fn run_report(
        &self,
        slug: &str,
        raw_params: &HashMap<String, String>,
        distinct: Option<bool>,
        format: ExportFormat,
    ) -> Result<ExportFile> {
        let template = self
            .reports
            .lookup(slug)
            .ok_or_else(|| DotacionError::NotFound(format!("report '{slug}' does not exist")))?;
        let params = template.resolve_params(raw_params)?;
        let sql = template.render_sql(self.catalog, &params, distinct, self.backend.dialect())?;
        tracing::info!(report = slug, format = format.extension(), "running report");
        let result = self.execute(&sql, &[]).await?;
        export::render(&result, format, template.slug, REPORT_SHEET, Utc::now())
    }

    /// Report catalog grouped by block, in declaration order.
    pub fn report_catalog(&self) -> Vec<ReportBlockListing> {
        self.reports
            .blocks()
            .into_iter()
            .map(|block| ReportBlockListing {
                id: block.as_str(),
                label: block.label(),
                descargas: self.reports.by_block(block).into_iter().cloned().collect(),
            })
            .collect()
    }

    pub fn tables(&self) -> &'static [TableInfo] {
        self.catalog.tables()
    }

    /// Column metadata for a whitelisted table.
    ///
    /// Declared columns win; tables without a declared list are introspected
    /// and cached.
    pub async fn columns(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        if !self.catalog.contains_table(table) {
            return Err(DotacionError::Forbidden(format!("table '{table}' is not allowed")));
        }
        if let Some(columns) = self.catalog.static_columns(table).filter(|c| !c.is_empty()) {
            return Ok(columns.to_vec());
        }

        let columns = self.table_schema(table).await?.column_infos();
        if columns.is_empty() {
            tracing::warn!(table = table, "no columns found for whitelisted table");
            return Err(DotacionError::NotFound(format!(
                "table '{table}' not found or has no columns"
            )));
        }
        Ok(columns)
    }

    async fn table_schema(&self, table: &str) -> Result<TableSchema> {
        let cached = self.schema_cache.lock().await.get(table).cloned();
        if let Some(schema) = cached {
            tracing::trace!(table = table, "schema cache hit");
            return Ok(schema);
        }

        let schema = self.backend.fetch_schema(table).await?;
        if !schema.columns.is_empty() {
            self.schema_cache
                .lock()
                .await
                .insert(table.to_string(), schema.clone());
        }
        Ok(schema)
    }

    /// Distinct, non-empty ministry names in ascending order.
    pub async fn ministries(&self) -> Result<Vec<String>> {
        let ministerio = ColumnRef::new(DOTACION_TABLE, "MINISTERIO");
        let query = QueryDescription::new(TableRef::new(DOTACION_TABLE))
            .select(ministerio.clone())
            .filter(Condition::compare(
                ministerio.clone(),
                "!=",
                Value::String(String::new()),
            ))
            .order(ministerio, "ASC")
            .distinct(true);

        let built = self.build(&query)?;
        let result = self.execute(&built.sql, &built.params).await?;
        Ok(result
            .rows
            .into_iter()
            .filter_map(|row| match row.into_iter().next() {
                Some(CellValue::Text(name)) if !name.trim().is_empty() => Some(name),
                _ => None,
            })
            .collect())
    }

    /// Every base table in the connected schema, whitelisted or not.
    pub async fn available_tables(&self) -> Result<Vec<String>> {
        self.backend.list_tables().await
    }

    pub fn database_name(&self) -> Option<String> {
        self.backend.database_name()
    }

    /// Probe the connection, then check the roster table is readable.
    pub async fn health(&self) -> Result<HealthReport> {
        self.backend.ping().await?;

        let probe = QueryDescription::new(TableRef::new(DOTACION_TABLE))
            .select(ColumnRef::new(DOTACION_TABLE, "AYN"))
            .limit(1);
        let built = self.build(&probe)?;
        let probed = self.backend.execute_sql(&built.sql, &built.params, 1).await;
        let table_accessible = match probed {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    table = DOTACION_TABLE,
                    "roster table is not accessible"
                );
                false
            }
        };

        Ok(HealthReport {
            database: self.backend.database_name(),
            table_accessible,
        })
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        if self.query.log_queries {
            tracing::debug!(sql = %sql, params = ?params, "executing query");
        }
        let start = Instant::now();
        let cap = usize::try_from(self.max_rows()).unwrap_or(usize::MAX);
        // one row past the cap tells us the result was cut short
        let mut result = self
            .backend
            .execute_sql(sql, params, cap.saturating_add(1))
            .await?;
        if result.truncate(cap) {
            tracing::warn!(cap, "result exceeded the row cap and was truncated");
        }
        tracing::info!(
            rows = result.row_count(),
            columns = result.columns.len(),
            ms = start.elapsed().as_millis(),
            "query executed"
        );
        Ok(result)
    }
}
