use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::catalog::{ColumnInfo, TableInfo};
use crate::error::ValidationError;
use crate::export::{ExportFile, ExportFormat};
use crate::query::QueryDescription;
use crate::runtime::{QueryOutcome, ReportBlockListing};

use super::errors::ApiError;
use super::AppState;

type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Deserialize)]
pub struct FormatParams {
    format: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ColumnsParams {
    tabla: Option<String>,
}

fn parse_body(
    state: &AppState,
    body: std::result::Result<Json<QueryDescription>, JsonRejection>,
) -> ApiResult<QueryDescription> {
    body.map(|Json(query)| query).map_err(|rejection| {
        state.error(ValidationError::InvalidRequest(rejection.body_text()).into())
    })
}

fn attachment(file: ExportFile) -> Response {
    let disposition = file.content_disposition();
    (
        [
            (header::CONTENT_TYPE, file.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.bytes,
    )
        .into_response()
}

/// POST /api/query/execute - Run a visual-builder query and return its rows
pub async fn execute_query(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<QueryDescription>, JsonRejection>,
) -> ApiResult<Json<QueryOutcome>> {
    let query = parse_body(&state, body)?;
    let outcome = state
        .service
        .run_query(&query)
        .await
        .map_err(|e| state.error(e))?;
    Ok(Json(outcome))
}

/// POST /api/query/export?format=csv|xlsx - Same query, as a file download
pub async fn export_query(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FormatParams>,
    body: std::result::Result<Json<QueryDescription>, JsonRejection>,
) -> ApiResult<Response> {
    let query = parse_body(&state, body)?;
    let format = ExportFormat::from_query(params.format.as_deref());
    let file = state
        .service
        .export_query(&query, format)
        .await
        .map_err(|e| state.error(e))?;
    Ok(attachment(file))
}

/// GET /api/descargas - Report catalog grouped by block
pub async fn list_reports(State(state): State<Arc<AppState>>) -> Json<Vec<ReportBlockListing>> {
    Json(state.service.report_catalog())
}

/// GET /api/descargas/{slug}?format=&distinct=&<params> - Run a predefined report
pub async fn run_report(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    Query(mut params): Query<HashMap<String, String>>,
) -> ApiResult<Response> {
    let format = ExportFormat::from_query(params.remove("format").as_deref());
    let distinct = params
        .remove("distinct")
        .map(|value| value.eq_ignore_ascii_case("true"));
    let file = state
        .service
        .run_report(&slug, &params, distinct, format)
        .await
        .map_err(|e| state.error(e))?;
    Ok(attachment(file))
}

/// GET /api/meta/tablas
pub async fn tables(State(state): State<Arc<AppState>>) -> Json<&'static [TableInfo]> {
    Json(state.service.tables())
}

/// GET /api/meta/columnas?tabla=
pub async fn columns(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ColumnsParams>,
) -> ApiResult<Json<Vec<ColumnInfo>>> {
    let table = params
        .tabla
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            state.error(
                ValidationError::InvalidRequest("parameter 'tabla' is required".to_string())
                    .into(),
            )
        })?;
    let columns = state
        .service
        .columns(&table)
        .await
        .map_err(|e| state.error(e))?;
    Ok(Json(columns))
}

/// GET /api/meta/ministerios
pub async fn ministries(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let ministerios = state
        .service
        .ministries()
        .await
        .map_err(|e| state.error(e))?;
    Ok(Json(json!({ "ministerios": ministerios })))
}

/// GET /api/meta/tablas-disponibles - Every base table, for diagnosing naming issues
pub async fn available_tables(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let names = state
        .service
        .available_tables()
        .await
        .map_err(|e| state.error(e))?;
    let tables: Vec<Value> = names
        .iter()
        .map(|name| json!({ "name": name, "label": name }))
        .collect();
    Ok(Json(json!({
        "count": tables.len(),
        "tables": tables,
        "database": state.service.database_name().unwrap_or_else(|| "connected".to_string()),
    })))
}

/// GET /api/health
pub async fn health(State(state): State<Arc<AppState>>) -> Response {
    let timestamp = Utc::now().to_rfc3339();
    match state.service.health().await {
        Ok(report) => Json(json!({
            "status": "ok",
            "message": "application and database are reachable",
            "database": "connected",
            "databaseName": report.database,
            "tableAccessible": report.table_accessible,
            "timestamp": timestamp,
        }))
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "health check failed");
            let detail = state.verbose.then(|| e.to_string());
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": "error",
                    "message": "database connection failed",
                    "database": "disconnected",
                    "error": detail,
                    "timestamp": timestamp,
                })),
            )
                .into_response()
        }
    }
}
