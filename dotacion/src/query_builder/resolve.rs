use crate::error::ValidationError;
use crate::query::{ColumnRef, OrderBy};
use crate::sql_ast::{OrderItem, SortDirection, SqlExpr};
use crate::validation::Validator;

/// Validated, table-qualified column expression.
pub(crate) fn column(
    validator: &Validator<'_>,
    column: &ColumnRef,
) -> Result<SqlExpr, ValidationError> {
    validator.validate_column(&column.table, &column.column)?;
    Ok(SqlExpr::column(Some(&column.table), &column.column))
}

pub(crate) fn order_item(
    validator: &Validator<'_>,
    order: &OrderBy,
) -> Result<OrderItem, ValidationError> {
    let expr = column(validator, &order.column)?;
    Ok(OrderItem {
        expr,
        direction: parse_direction(&order.direction)?,
    })
}

/// Exact `ASC` or `DESC`; anything else is rejected rather than defaulted.
pub(crate) fn parse_direction(raw: &str) -> Result<SortDirection, ValidationError> {
    match raw {
        "ASC" => Ok(SortDirection::Asc),
        "DESC" => Ok(SortDirection::Desc),
        other => Err(ValidationError::InvalidDirection(other.to_string())),
    }
}
