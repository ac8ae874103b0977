pub mod backends;
pub mod catalog;
pub mod config;
pub mod dialect;
pub mod error;
pub mod executor;
pub mod export;
pub mod query;
pub mod query_builder;
pub mod reports;
pub mod runtime;
pub mod schema_cache;
pub mod sql_ast;
pub mod validation;
pub mod web;

pub use backends::BackendConnection;
pub use catalog::{ColumnInfo, ColumnType, TableCatalog, TableInfo};
pub use config::DotacionConfig;
pub use error::{DotacionError, Result, ValidationError};
pub use executor::{CellValue, ColumnMeta, QueryResult};
pub use export::{ExportFile, ExportFormat};
pub use query::{ColumnRef, Condition, QueryDescription, TableRef};
pub use query_builder::{BuiltQuery, SqlBuilder};
pub use reports::{ReportRegistry, ReportTemplate};
pub use runtime::QueryService;
pub use schema_cache::TableSchema;
pub use validation::Validator;
