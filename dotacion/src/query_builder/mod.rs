//! Translates a [`QueryDescription`] into parameterized SQL.
//!
//! Every identifier is checked against the catalog while the description is
//! lowered into a [`SelectQuery`], so rejection always happens before any SQL
//! text exists. Caller-supplied values never reach the SQL string; they are
//! collected into the parameter list in placeholder order.

use serde_json::Value;

use crate::catalog::TableCatalog;
use crate::dialect::{Dialect, MySqlDialect};
use crate::error::ValidationError;
use crate::query::QueryDescription;
use crate::sql_ast::{SelectItem, SelectQuery, SqlRenderer, TableRef};
use crate::validation::Validator;

mod filters;
mod resolve;

/// SQL text plus the values bound to its placeholders, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: Vec<Value>,
    query: SelectQuery,
}

impl BuiltQuery {
    /// The statement with parameters inlined as escaped literals.
    ///
    /// Meant for echoing back to users; it is never executed.
    pub fn display_sql(&self, dialect: &dyn Dialect) -> String {
        SqlRenderer::with_inline_params(dialect, &self.params).render_select(&self.query)
    }
}

pub struct SqlBuilder<'c> {
    validator: Validator<'c>,
}

impl Default for SqlBuilder<'static> {
    fn default() -> Self {
        Self::new(TableCatalog::roster())
    }
}

impl<'c> SqlBuilder<'c> {
    pub fn new(catalog: &'c TableCatalog) -> Self {
        Self {
            validator: Validator::new(catalog),
        }
    }

    /// Build SQL for the default (MySQL) dialect.
    pub fn build(
        &self,
        query: &QueryDescription,
        max_limit: u64,
    ) -> Result<BuiltQuery, ValidationError> {
        self.build_with_dialect(query, max_limit, &MySqlDialect)
    }

    /// Build SQL using a provided dialect.
    pub fn build_with_dialect(
        &self,
        query: &QueryDescription,
        max_limit: u64,
        dialect: &dyn Dialect,
    ) -> Result<BuiltQuery, ValidationError> {
        let (select, params) = self.lower(query, max_limit)?;
        let sql = SqlRenderer::new(dialect).render_select(&select);
        tracing::trace!(dialect = dialect.name(), sql = %sql, params = params.len(), "built query");
        Ok(BuiltQuery {
            sql,
            params,
            query: select,
        })
    }

    fn lower(
        &self,
        query: &QueryDescription,
        max_limit: u64,
    ) -> Result<(SelectQuery, Vec<Value>), ValidationError> {
        self.validator.validate_table(&query.from.name)?;

        if query.select.is_empty() {
            return Err(ValidationError::EmptySelect);
        }
        let select = query
            .select
            .iter()
            .map(|column| {
                Ok(SelectItem {
                    expr: resolve::column(&self.validator, column)?,
                    alias: None,
                })
            })
            .collect::<Result<Vec<_>, ValidationError>>()?;

        let alias = query.from.alias.as_deref().filter(|a| !a.is_empty());
        if let Some(alias) = alias {
            self.validator.validate_alias(alias)?;
        }

        if !query.joins.is_empty() {
            return Err(ValidationError::UnsupportedFeature(
                "joins are not supported".to_string(),
            ));
        }

        let mut params = Vec::new();
        let filters = query
            .conditions
            .iter()
            .map(|condition| filters::lower_condition(&self.validator, condition, &mut params))
            .collect::<Result<Vec<_>, ValidationError>>()?;

        let group_by = query
            .group_by
            .iter()
            .map(|column| resolve::column(&self.validator, column))
            .collect::<Result<Vec<_>, ValidationError>>()?;

        let order_by = query
            .order_by
            .iter()
            .map(|order| resolve::order_item(&self.validator, order))
            .collect::<Result<Vec<_>, ValidationError>>()?;

        let select = SelectQuery {
            distinct: query.distinct,
            select,
            from: TableRef {
                name: query.from.name.clone(),
                alias: alias.map(str::to_string),
            },
            filters,
            group_by,
            order_by,
            limit: query.limit.map(|limit| limit.min(max_limit)),
        };
        Ok((select, params))
    }
}
