//! SQL dialect abstractions for different database backends.
//!
//! MySQL is always available since it is the dialect of the production
//! roster database. The others are gated behind their backend feature.

use serde_json::Value;

use crate::sql_ast::Function;

/// Dialects render identifiers and primitive expression pieces.
/// Expression tree walking lives in [`crate::sql_ast::SqlRenderer`]; the
/// dialect only maps logical constructs to SQL fragments.
pub trait Dialect {
    fn name(&self) -> &'static str;
    fn quote_ident(&self, ident: &str) -> String;
    fn placeholder(&self, _idx: usize) -> String {
        "?".to_string()
    }
    fn render_function(&self, func: &Function, args: Vec<String>) -> String;
    fn render_string_literal(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }
    fn render_literal(&self, value: &Value) -> String {
        match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::String(s) => self.render_string_literal(s),
            Value::Array(items) => {
                let rendered: Vec<String> = items.iter().map(|v| self.render_literal(v)).collect();
                rendered.join(", ")
            }
            Value::Object(_) => self.render_string_literal(&value.to_string()),
        }
    }
}

mod mysql;
pub use mysql::MySqlDialect;

#[cfg(feature = "duckdb")]
mod duckdb;
#[cfg(feature = "duckdb")]
pub use duckdb::DuckDbDialect;

#[cfg(feature = "postgres")]
mod postgres;
#[cfg(feature = "postgres")]
pub use postgres::PostgresDialect;
