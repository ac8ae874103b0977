//! Structured query description accepted from clients.
//!
//! Operators and sort directions stay as plain strings on the wire and are
//! parsed by the builder, so an unknown value surfaces as a validation error
//! instead of a deserialization failure.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRef {
    pub table: String,
    pub column: String,
}

impl ColumnRef {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl TableRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub left: ColumnRef,
    pub operator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_column: Option<ColumnRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub between_values: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_values: Option<Vec<Value>>,
}

impl Condition {
    /// `left <operator> value`.
    pub fn compare(left: ColumnRef, operator: &str, value: Value) -> Self {
        Self {
            left,
            operator: operator.to_string(),
            right_value: Some(value),
            right_column: None,
            between_values: None,
            in_values: None,
        }
    }

    /// `left <operator> right`, column to column.
    pub fn columns(left: ColumnRef, operator: &str, right: ColumnRef) -> Self {
        Self {
            right_value: None,
            right_column: Some(right),
            ..Self::compare(left, operator, Value::Null)
        }
    }

    pub fn between(left: ColumnRef, low: Value, high: Value) -> Self {
        Self {
            right_value: None,
            between_values: Some(vec![low, high]),
            ..Self::compare(left, "BETWEEN", Value::Null)
        }
    }

    pub fn in_list(left: ColumnRef, values: Vec<Value>) -> Self {
        Self {
            right_value: None,
            in_values: Some(values),
            ..Self::compare(left, "IN", Value::Null)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub column: ColumnRef,
    #[serde(default = "default_direction")]
    pub direction: String,
}

fn default_direction() -> String {
    "ASC".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryDescription {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub select: Vec<ColumnRef>,
    pub from: TableRef,
    /// Reserved. Any entry causes the query to be rejected.
    #[serde(default, deserialize_with = "null_as_empty", skip_serializing_if = "Vec::is_empty")]
    pub joins: Vec<Value>,
    #[serde(default, rename = "where", deserialize_with = "null_as_empty")]
    pub conditions: Vec<Condition>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub group_by: Vec<ColumnRef>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub order_by: Vec<OrderBy>,
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub distinct: bool,
}

impl QueryDescription {
    pub fn new(from: TableRef) -> Self {
        Self {
            from,
            ..Self::default()
        }
    }

    pub fn select(mut self, column: ColumnRef) -> Self {
        self.select.push(column);
        self
    }

    pub fn filter(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn order(mut self, column: ColumnRef, direction: &str) -> Self {
        self.order_by.push(OrderBy {
            column,
            direction: direction.to_string(),
        });
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn distinct(mut self, distinct: bool) -> Self {
        self.distinct = distinct;
        self
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
