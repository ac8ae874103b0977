use serde_json::Value;

use crate::error::ValidationError;
use crate::query::Condition;
use crate::sql_ast::{SqlBinaryOperator, SqlExpr};
use crate::validation::Validator;

use super::resolve;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConditionOperator {
    Compare(SqlBinaryOperator),
    Between,
    In,
}

impl ConditionOperator {
    pub(crate) fn parse(raw: &str) -> Result<Self, ValidationError> {
        let op = match raw {
            "=" => ConditionOperator::Compare(SqlBinaryOperator::Eq),
            "!=" => ConditionOperator::Compare(SqlBinaryOperator::Neq),
            ">" => ConditionOperator::Compare(SqlBinaryOperator::Gt),
            "<" => ConditionOperator::Compare(SqlBinaryOperator::Lt),
            ">=" => ConditionOperator::Compare(SqlBinaryOperator::Gte),
            "<=" => ConditionOperator::Compare(SqlBinaryOperator::Lte),
            "LIKE" => ConditionOperator::Compare(SqlBinaryOperator::Like),
            "BETWEEN" => ConditionOperator::Between,
            "IN" => ConditionOperator::In,
            other => return Err(ValidationError::UnsupportedOperator(other.to_string())),
        };
        Ok(op)
    }
}

/// Appends a value to the parameter list and returns its placeholder expression.
fn bind(params: &mut Vec<Value>, value: Value) -> SqlExpr {
    params.push(value);
    SqlExpr::Param(params.len() - 1)
}

pub(crate) fn lower_condition(
    validator: &Validator<'_>,
    condition: &Condition,
    params: &mut Vec<Value>,
) -> Result<SqlExpr, ValidationError> {
    let left = resolve::column(validator, &condition.left)?;

    match ConditionOperator::parse(&condition.operator)? {
        ConditionOperator::Between => match condition.between_values.as_deref() {
            Some([low, high]) => {
                let low = bind(params, low.clone());
                let high = bind(params, high.clone());
                Ok(SqlExpr::Between {
                    expr: Box::new(left),
                    low: Box::new(low),
                    high: Box::new(high),
                })
            }
            _ => Err(ValidationError::InvalidBetween),
        },
        ConditionOperator::In => match condition.in_values.as_deref() {
            Some(values) if !values.is_empty() => {
                let list = values.iter().map(|v| bind(params, v.clone())).collect();
                Ok(SqlExpr::InList {
                    expr: Box::new(left),
                    list,
                })
            }
            _ => Err(ValidationError::InvalidIn),
        },
        ConditionOperator::Compare(op) => {
            let right = match &condition.right_column {
                Some(column) => resolve::column(validator, column)?,
                None => bind(params, condition.right_value.clone().unwrap_or(Value::Null)),
            };
            Ok(SqlExpr::binary(op, left, right))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_supported_operators() {
        for raw in ["=", "!=", ">", "<", ">=", "<=", "LIKE", "BETWEEN", "IN"] {
            assert!(ConditionOperator::parse(raw).is_ok(), "{raw} should parse");
        }
    }

    #[test]
    fn rejects_other_operators() {
        for raw in ["<>", "like", "NOT IN", "ILIKE", "= 1 OR 1=1", ""] {
            assert_eq!(
                ConditionOperator::parse(raw),
                Err(ValidationError::UnsupportedOperator(raw.to_string()))
            );
        }
    }
}
