use thiserror::Error;

pub type Result<T> = std::result::Result<T, DotacionError>;

#[derive(Debug, Error)]
pub enum DotacionError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("config error: {0}")]
    Config(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("execution error: {0}")]
    Execution(String),
    #[error("export error: {0}")]
    Export(String),
    #[cfg(feature = "duckdb")]
    #[error("duckdb error: {0}")]
    DuckDb(#[from] duckdb::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DotacionError {
    /// True when the caller, not the service, is at fault.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            DotacionError::Validation(_) | DotacionError::NotFound(_) | DotacionError::Forbidden(_)
        )
    }
}

/// Rejections raised while checking a query or report request.
///
/// Every variant is produced before any SQL text reaches a database.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("table not allowed: {0}")]
    TableNotAllowed(String),
    #[error("invalid column name: {0}")]
    InvalidColumnName(String),
    #[error("column {column} not allowed on table {table}")]
    ColumnNotAllowed { table: String, column: String },
    #[error("invalid table alias: {0}")]
    InvalidAlias(String),
    #[error("at least one column must be selected")]
    EmptySelect,
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),
    #[error("unsupported operator: {0}")]
    UnsupportedOperator(String),
    #[error("BETWEEN requires exactly two values")]
    InvalidBetween,
    #[error("IN requires at least one value")]
    InvalidIn,
    #[error("invalid sort direction: {0}")]
    InvalidDirection(String),
    #[error("missing required parameter: {0}")]
    MissingParameter(String),
    #[error("invalid value for parameter {name}: {value}")]
    InvalidParameter { name: String, value: String },
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}
