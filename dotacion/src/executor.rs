use chrono::{NaiveDate, NaiveDateTime};
#[cfg(feature = "duckdb")]
use duckdb::types::{TimeUnit, Value as DuckValue};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMeta {
    pub name: String,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A single value as returned by the database, before serialization.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    /// Structured values (lists, maps, JSON columns).
    Json(Value),
}

impl CellValue {
    /// Decimal text becomes a float when it fits, text otherwise.
    pub fn from_decimal_text(text: String) -> Self {
        match text.parse::<f64>() {
            Ok(f) if f.is_finite() => CellValue::Float(f),
            _ => CellValue::Text(text),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

/// Column-ordered result set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<ColumnMeta>,
    pub rows: Vec<Vec<CellValue>>,
}

impl QueryResult {
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Drop rows beyond `cap`. Returns true when rows were removed.
    pub fn truncate(&mut self, cap: usize) -> bool {
        if self.rows.len() > cap {
            self.rows.truncate(cap);
            true
        } else {
            false
        }
    }
}

#[cfg(feature = "duckdb")]
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

#[cfg(feature = "duckdb")]
pub(crate) fn duck_value_to_cell(value: DuckValue) -> CellValue {
    match value {
        DuckValue::Null => CellValue::Null,
        DuckValue::Boolean(b) => CellValue::Bool(b),
        DuckValue::TinyInt(i) => CellValue::Int(i.into()),
        DuckValue::SmallInt(i) => CellValue::Int(i.into()),
        DuckValue::Int(i) => CellValue::Int(i.into()),
        DuckValue::BigInt(i) => CellValue::Int(i),
        DuckValue::HugeInt(i) => i64::try_from(i)
            .map(CellValue::Int)
            .unwrap_or_else(|_| CellValue::Text(i.to_string())),
        DuckValue::UTinyInt(i) => CellValue::Int(i.into()),
        DuckValue::USmallInt(i) => CellValue::Int(i.into()),
        DuckValue::UInt(i) => CellValue::Int(i.into()),
        DuckValue::UBigInt(i) => i64::try_from(i)
            .map(CellValue::Int)
            .unwrap_or_else(|_| CellValue::Text(i.to_string())),
        DuckValue::Float(f) => CellValue::Float(f.into()),
        DuckValue::Double(f) => CellValue::Float(f),
        DuckValue::Decimal(d) => CellValue::from_decimal_text(d.to_string()),
        DuckValue::Timestamp(unit, t) => {
            let micros = match unit {
                TimeUnit::Second => t.saturating_mul(1_000_000),
                TimeUnit::Millisecond => t.saturating_mul(1_000),
                TimeUnit::Microsecond => t,
                TimeUnit::Nanosecond => t / 1_000,
            };
            chrono::DateTime::from_timestamp_micros(micros)
                .map(|dt| CellValue::Timestamp(dt.naive_utc()))
                .unwrap_or(CellValue::Null)
        }
        DuckValue::Text(s) => CellValue::Text(s),
        DuckValue::Blob(bytes) => CellValue::Text(hex::encode(bytes)),
        DuckValue::Date32(days) => days
            .checked_add(UNIX_EPOCH_DAYS_FROM_CE)
            .and_then(NaiveDate::from_num_days_from_ce_opt)
            .map(CellValue::Date)
            .unwrap_or(CellValue::Null),
        DuckValue::Time64(unit, t) => CellValue::Text(format!("{t} ({unit:?})")),
        DuckValue::Interval {
            months,
            days,
            nanos,
        } => CellValue::Text(format!("{months} months {days} days {nanos} nanos")),
        DuckValue::Enum(s) => CellValue::Text(s),
        DuckValue::Union(inner) => duck_value_to_cell(*inner),
        nested @ (DuckValue::List(_)
        | DuckValue::Array(_)
        | DuckValue::Struct(_)
        | DuckValue::Map(_)) => CellValue::Json(duck_value_to_json(nested)),
    }
}

#[cfg(feature = "duckdb")]
fn duck_value_to_json(value: DuckValue) -> Value {
    match value {
        DuckValue::List(items) | DuckValue::Array(items) => {
            Value::Array(items.into_iter().map(duck_value_to_json).collect())
        }
        DuckValue::Struct(fields) => {
            let mut map = serde_json::Map::new();
            for (key, val) in fields.iter() {
                map.insert(key.clone(), duck_value_to_json(val.clone()));
            }
            Value::Object(map)
        }
        DuckValue::Map(entries) => Value::Array(
            entries
                .iter()
                .map(|(k, v)| {
                    Value::Array(vec![
                        duck_value_to_json(k.clone()),
                        duck_value_to_json(v.clone()),
                    ])
                })
                .collect(),
        ),
        scalar => match duck_value_to_cell(scalar) {
            CellValue::Null => Value::Null,
            CellValue::Bool(b) => Value::Bool(b),
            CellValue::Int(i) => Value::from(i),
            CellValue::Float(f) => Value::from(f),
            CellValue::Text(s) => Value::String(s),
            CellValue::Date(d) => Value::String(d.to_string()),
            CellValue::Timestamp(ts) => Value::String(ts.to_string()),
            CellValue::Json(v) => v,
        },
    }
}
