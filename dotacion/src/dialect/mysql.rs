//! MySQL dialect implementation.

use crate::sql_ast::Function;

use super::Dialect;

#[derive(Debug, Default, Clone, Copy)]
pub struct MySqlDialect;

impl Dialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_ident(&self, ident: &str) -> String {
        format!("`{}`", ident.replace('`', "``"))
    }

    // MySQL treats backslash as an escape inside string literals.
    fn render_string_literal(&self, value: &str) -> String {
        format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
    }

    fn render_function(&self, func: &Function, args: Vec<String>) -> String {
        match func {
            Function::YearsSince => match args.as_slice() {
                [expr] => format!("TIMESTAMPDIFF(YEAR, {expr}, CURDATE())"),
                _ => "NULL".to_string(),
            },
            Function::CurrentDate => "CURDATE()".to_string(),
        }
    }
}
