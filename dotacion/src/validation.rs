//! Identifier checks applied before anything is rendered into SQL.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::catalog::TableCatalog;
use crate::error::ValidationError;

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("invalid built-in identifier regex"));

/// Letters, digits, `_` and `-`; nothing else, and never empty.
pub fn is_valid_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

/// Checks tables, columns and aliases against a [`TableCatalog`].
#[derive(Debug, Clone, Copy)]
pub struct Validator<'c> {
    catalog: &'c TableCatalog,
}

impl Default for Validator<'static> {
    fn default() -> Self {
        Self::new(TableCatalog::roster())
    }
}

impl<'c> Validator<'c> {
    pub fn new(catalog: &'c TableCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &'c TableCatalog {
        self.catalog
    }

    pub fn validate_table(&self, name: &str) -> Result<(), ValidationError> {
        if self.catalog.contains_table(name) {
            Ok(())
        } else {
            Err(ValidationError::TableNotAllowed(name.to_string()))
        }
    }

    /// Table first, then the column pattern, then the table's declared list if it has one.
    pub fn validate_column(&self, table: &str, column: &str) -> Result<(), ValidationError> {
        self.validate_table(table)?;
        if !is_valid_identifier(column) {
            return Err(ValidationError::InvalidColumnName(column.to_string()));
        }
        match self.catalog.static_columns(table) {
            Some(columns) if !columns.iter().any(|c| c.name == column) => {
                Err(ValidationError::ColumnNotAllowed {
                    table: table.to_string(),
                    column: column.to_string(),
                })
            }
            _ => Ok(()),
        }
    }

    pub fn validate_alias(&self, alias: &str) -> Result<(), ValidationError> {
        if is_valid_identifier(alias) {
            Ok(())
        } else {
            Err(ValidationError::InvalidAlias(alias.to_string()))
        }
    }
}
