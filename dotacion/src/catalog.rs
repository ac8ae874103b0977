//! Static catalog of queryable tables.
//!
//! The catalog is the single source of truth for which tables may appear in a
//! query and, for tables with a declared column list, which columns. Tables
//! without a declared list accept any syntactically valid column name; their
//! column metadata is introspected from the database on demand.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

pub const DOTACION_TABLE: &str = "dotacion_gcba_prueba";
pub const PADRON_TABLE: &str = "padron";

/// Coarse column type exposed to clients building queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    String,
    Number,
    Date,
}

impl ColumnType {
    /// Map a database type name (as reported by `information_schema`) to a column type.
    ///
    /// Matching is by substring, numeric names first, so suffixed and compound
    /// names such as `TIMESTAMP_NS`, `timestamptz` or `bigint[]` still classify.
    pub fn from_data_type(data_type: &str) -> Self {
        const NUMBER: &[&str] = &["int", "decimal", "float", "double", "numeric"];
        const DATE: &[&str] = &["date", "time"];

        let lowered = data_type.to_ascii_lowercase();
        if NUMBER.iter().any(|needle| lowered.contains(needle)) {
            ColumnType::Number
        } else if DATE.iter().any(|needle| lowered.contains(needle)) {
            ColumnType::Date
        } else {
            ColumnType::String
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    pub label: String,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, column_type: ColumnType, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type,
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TableInfo {
    pub name: String,
    pub label: String,
    pub description: String,
    /// Declared column whitelist; `None` means columns are introspected.
    #[serde(skip)]
    pub columns: Option<Vec<ColumnInfo>>,
}

#[derive(Debug, Clone, Default)]
pub struct TableCatalog {
    tables: Vec<TableInfo>,
}

const DOTACION_COLUMNS: &[(&str, ColumnType, &str)] = &[
    ("id_dotacion", ColumnType::Number, "ID Dotación"),
    ("MINISTERIO", ColumnType::String, "Ministerio"),
    ("CUIL", ColumnType::String, "CUIL"),
    ("AYN", ColumnType::String, "Apellido y Nombre"),
    ("FEC_NACIM", ColumnType::Date, "Fecha de Nacimiento"),
    ("SEXO", ColumnType::String, "Sexo"),
    ("TIP_DOC", ColumnType::String, "Tipo de Documento"),
    ("NUM_DOC", ColumnType::String, "Número de Documento"),
    ("INGRESO", ColumnType::Date, "Fecha de Ingreso"),
    ("ROL", ColumnType::Number, "Rol"),
    ("LIT_PUESTO", ColumnType::String, "Literal Puesto"),
    ("REGIMEN", ColumnType::String, "Régimen"),
    ("SIGLA", ColumnType::String, "Sigla"),
    ("COD_REP", ColumnType::String, "Código REP"),
    ("DESC_REP", ColumnType::String, "Descripción REP"),
    ("PATH_NOMBRES", ColumnType::String, "Path Nombres"),
    ("DOMICILIO_LABORAL", ColumnType::String, "Domicilio Laboral"),
    ("LIT_AGRUPAMIENTO", ColumnType::String, "Literal Agrupamiento"),
    ("MAIL_LABORAL", ColumnType::String, "Mail Laboral"),
    ("MAIL_PERSONAL", ColumnType::String, "Mail Personal"),
    ("MAIL_MIA", ColumnType::String, "Mail MIA"),
    ("DOMICILIO_PERSONAL", ColumnType::String, "Domicilio Personal"),
    ("CP", ColumnType::String, "Código Postal"),
    ("DISCAP", ColumnType::String, "Discapacidad"),
    ("CUIL_SIN_GUIONES", ColumnType::String, "CUIL Sin Guiones"),
];

static ROSTER: Lazy<TableCatalog> = Lazy::new(|| {
    TableCatalog::new(vec![
        TableInfo {
            name: DOTACION_TABLE.to_string(),
            label: "Dotación GCBA (Prueba)".to_string(),
            description: "Tabla principal de dotación del GCBA".to_string(),
            columns: Some(
                DOTACION_COLUMNS
                    .iter()
                    .map(|(name, ty, label)| ColumnInfo::new(*name, *ty, *label))
                    .collect(),
            ),
        },
        TableInfo {
            name: PADRON_TABLE.to_string(),
            label: "Padrón".to_string(),
            description: "Tabla de padrón".to_string(),
            columns: None,
        },
    ])
});

impl TableCatalog {
    pub fn new(tables: Vec<TableInfo>) -> Self {
        Self { tables }
    }

    /// The built-in roster catalog.
    pub fn roster() -> &'static TableCatalog {
        &ROSTER
    }

    pub fn tables(&self) -> &[TableInfo] {
        &self.tables
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn get_table(&self, name: &str) -> Option<&TableInfo> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn contains_table(&self, name: &str) -> bool {
        self.get_table(name).is_some()
    }

    /// Declared columns for a table, if it has a static whitelist.
    pub fn static_columns(&self, table: &str) -> Option<&[ColumnInfo]> {
        self.get_table(table).and_then(|t| t.columns.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roster_whitelists_two_tables() {
        let catalog = TableCatalog::roster();
        assert_eq!(catalog.table_names(), vec![DOTACION_TABLE, PADRON_TABLE]);
        assert!(!catalog.contains_table("users"));
    }

    #[test]
    fn dotacion_columns_are_declared_in_order() {
        let columns = TableCatalog::roster().static_columns(DOTACION_TABLE).unwrap();
        assert_eq!(columns.len(), 25);
        assert_eq!(columns[0].name, "id_dotacion");
        assert_eq!(columns[0].column_type, ColumnType::Number);
        assert_eq!(columns[4].column_type, ColumnType::Date);
        assert_eq!(columns[24].name, "CUIL_SIN_GUIONES");
        assert!(TableCatalog::roster().static_columns(PADRON_TABLE).is_none());
    }

    #[test]
    fn maps_database_types() {
        assert_eq!(ColumnType::from_data_type("int"), ColumnType::Number);
        assert_eq!(ColumnType::from_data_type("DECIMAL(10,2)"), ColumnType::Number);
        assert_eq!(ColumnType::from_data_type("bigint unsigned"), ColumnType::Number);
        assert_eq!(ColumnType::from_data_type("DATETIME"), ColumnType::Date);
        assert_eq!(ColumnType::from_data_type("timestamp with time zone"), ColumnType::Date);
        assert_eq!(ColumnType::from_data_type("varchar"), ColumnType::String);
        assert_eq!(ColumnType::from_data_type("json"), ColumnType::String);
    }

    #[test]
    fn maps_suffixed_and_compound_type_names() {
        let dates = ["TIMESTAMP_NS", "TIMESTAMP_S", "timestamptz", "smalldatetime", "time"];
        for name in dates {
            assert_eq!(ColumnType::from_data_type(name), ColumnType::Date, "{name}");
        }
        let numbers = ["UHUGEINT", "bigint[]", "DOUBLE PRECISION", "mediumint(8) unsigned"];
        for name in numbers {
            assert_eq!(ColumnType::from_data_type(name), ColumnType::Number, "{name}");
        }
        assert_eq!(ColumnType::from_data_type("character varying"), ColumnType::String);
    }

    #[test]
    fn column_info_serializes_type_field() {
        let info = ColumnInfo::new("CUIL", ColumnType::String, "CUIL");
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json, serde_json::json!({"name": "CUIL", "type": "string", "label": "CUIL"}));
    }
}
