//! PostgreSQL dialect implementation.

use crate::sql_ast::Function;

use super::Dialect;

#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresDialect;

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn quote_ident(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    fn placeholder(&self, idx: usize) -> String {
        format!("${}", idx + 1) // PostgreSQL uses $1, $2, ...
    }

    fn render_function(&self, func: &Function, args: Vec<String>) -> String {
        match func {
            // age() handles the birthday-not-yet-reached case; the cast keeps
            // bound comparison parameters integer-typed
            Function::YearsSince => match args.as_slice() {
                [expr] => format!("CAST(date_part('year', age(current_date, {expr})) AS INTEGER)"),
                _ => "NULL".to_string(),
            },
            Function::CurrentDate => "current_date".to_string(),
        }
    }
}
