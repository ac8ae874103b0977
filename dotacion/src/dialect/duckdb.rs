//! DuckDB dialect implementation.

use crate::sql_ast::Function;

use super::Dialect;

#[derive(Debug, Default, Clone, Copy)]
pub struct DuckDbDialect;

impl Dialect for DuckDbDialect {
    fn name(&self) -> &'static str {
        "duckdb"
    }

    fn quote_ident(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    fn render_function(&self, func: &Function, args: Vec<String>) -> String {
        match func {
            // date_sub counts complete years; date_diff would count boundaries
            Function::YearsSince => match args.as_slice() {
                [expr] => format!("date_sub('year', {expr}, current_date)"),
                _ => "NULL".to_string(),
            },
            Function::CurrentDate => "current_date".to_string(),
        }
    }
}
