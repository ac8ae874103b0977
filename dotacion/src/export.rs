//! Result serialization: flat JSON records, delimited text and spreadsheets.

use chrono::{DateTime, Utc};
use rust_xlsxwriter::{Workbook, XlsxError};
use serde_json::{Map, Value};

use crate::error::{DotacionError, Result};
use crate::executor::{CellValue, QueryResult};

/// One output row, keyed by column name in column order.
pub type Record = Map<String, Value>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportFormat {
    #[default]
    Csv,
    Xlsx,
}

impl ExportFormat {
    /// `xlsx` selects a spreadsheet; anything else (or nothing) means CSV.
    pub fn from_query(raw: Option<&str>) -> Self {
        match raw {
            Some(value) if value.eq_ignore_ascii_case("xlsx") => ExportFormat::Xlsx,
            _ => ExportFormat::Csv,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }
}

/// A rendered download ready to be sent as an attachment.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportFile {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

impl ExportFile {
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.filename)
    }
}

/// Dates become `YYYY-MM-DD`; everything else maps to its JSON scalar.
pub fn cell_to_json(cell: &CellValue) -> Value {
    match cell {
        CellValue::Null => Value::Null,
        CellValue::Bool(b) => Value::Bool(*b),
        CellValue::Int(i) => Value::from(*i),
        CellValue::Float(f) => Value::from(*f),
        CellValue::Text(s) => Value::String(s.clone()),
        CellValue::Date(d) => Value::String(d.format("%Y-%m-%d").to_string()),
        CellValue::Timestamp(ts) => Value::String(ts.date().format("%Y-%m-%d").to_string()),
        CellValue::Json(v) => v.clone(),
    }
}

pub fn to_flat_records(result: &QueryResult) -> Vec<Record> {
    result
        .rows
        .iter()
        .map(|row| {
            result
                .columns
                .iter()
                .zip(row.iter())
                .map(|(column, cell)| (column.name.clone(), cell_to_json(cell)))
                .collect()
        })
        .collect()
}

/// Headers from the explicit list, else the first record's keys.
fn resolve_headers(records: &[Record], headers: Option<&[String]>) -> Vec<String> {
    match headers {
        Some(headers) => headers.to_vec(),
        None => records
            .first()
            .map(|first| first.keys().cloned().collect())
            .unwrap_or_default(),
    }
}

fn field_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(nested) => nested.to_string(),
    }
}

fn escape_field(text: &str) -> String {
    if text.contains(['"', ',', '\n', '\r']) {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text.to_string()
    }
}

/// Comma-separated text with a header line; rows joined by `\n`, no trailing newline.
///
/// Returns an empty string when there is nothing to write: no records and no
/// explicit headers.
pub fn to_delimited_text(records: &[Record], headers: Option<&[String]>) -> String {
    let headers = resolve_headers(records, headers);
    if headers.is_empty() {
        return String::new();
    }

    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(
        headers
            .iter()
            .map(|h| escape_field(h))
            .collect::<Vec<_>>()
            .join(","),
    );
    for record in records {
        let line = headers
            .iter()
            .map(|h| escape_field(&field_text(record.get(h))))
            .collect::<Vec<_>>()
            .join(",");
        lines.push(line);
    }
    lines.join("\n")
}

fn xlsx_error(e: XlsxError) -> DotacionError {
    DotacionError::Export(e.to_string())
}

/// Single-sheet workbook: header row, then one row per record.
pub fn to_spreadsheet_bytes(
    records: &[Record],
    headers: Option<&[String]>,
    sheet_name: &str,
) -> Result<Vec<u8>> {
    let headers = resolve_headers(records, headers);
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name).map_err(xlsx_error)?;

    for (col, header) in headers.iter().enumerate() {
        let col = column_index(col)?;
        worksheet
            .write_string(0, col, header.as_str())
            .map_err(xlsx_error)?;
    }

    for (idx, record) in records.iter().enumerate() {
        let row = u32::try_from(idx + 1)
            .map_err(|_| DotacionError::Export("too many rows for a worksheet".to_string()))?;
        for (col, header) in headers.iter().enumerate() {
            let col = column_index(col)?;
            match record.get(header) {
                None | Some(Value::Null) => {}
                Some(Value::Bool(b)) => {
                    worksheet.write_boolean(row, col, *b).map_err(xlsx_error)?;
                }
                Some(Value::Number(n)) => match n.as_f64() {
                    Some(f) => {
                        worksheet.write_number(row, col, f).map_err(xlsx_error)?;
                    }
                    None => {
                        worksheet
                            .write_string(row, col, n.to_string().as_str())
                            .map_err(xlsx_error)?;
                    }
                },
                Some(other) => {
                    worksheet
                        .write_string(row, col, field_text(Some(other)).as_str())
                        .map_err(xlsx_error)?;
                }
            }
        }
    }

    workbook.save_to_buffer().map_err(xlsx_error)
}

fn column_index(col: usize) -> Result<u16> {
    u16::try_from(col).map_err(|_| DotacionError::Export("too many columns".to_string()))
}

/// `{base}_{YYYY-MM-DDTHH-MM-SS}.{ext}`.
pub fn export_filename(base: &str, format: ExportFormat, now: DateTime<Utc>) -> String {
    format!(
        "{base}_{}.{}",
        now.format("%Y-%m-%dT%H-%M-%S"),
        format.extension()
    )
}

/// Serialize a result in the requested format.
pub fn render(
    result: &QueryResult,
    format: ExportFormat,
    base_name: &str,
    sheet_name: &str,
    now: DateTime<Utc>,
) -> Result<ExportFile> {
    let records = to_flat_records(result);
    let headers = result.column_names();
    let headers = Some(headers.as_slice());
    let bytes = match format {
        ExportFormat::Csv => to_delimited_text(&records, headers).into_bytes(),
        ExportFormat::Xlsx => to_spreadsheet_bytes(&records, headers, sheet_name)?,
    };
    Ok(ExportFile {
        filename: export_filename(base_name, format, now),
        content_type: format.content_type(),
        bytes,
    })
}
