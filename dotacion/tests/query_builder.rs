//! Integration tests for the query builder.
//!
//! These tests exercise the public API: SqlBuilder, QueryDescription, TableCatalog.

#[cfg(feature = "duckdb")]
use dotacion::dialect::DuckDbDialect;
use dotacion::dialect::MySqlDialect;
#[cfg(feature = "postgres")]
use dotacion::dialect::PostgresDialect;
use dotacion::query::{ColumnRef, Condition, QueryDescription, TableRef};
use dotacion::{SqlBuilder, ValidationError};
use serde_json::json;

const MAX: u64 = 50_000;

// ============================================================================
// Test fixtures
// ============================================================================

mod fixtures {
    use super::*;

    pub const ROSTER: &str = "dotacion_gcba_prueba";

    pub fn col(name: &str) -> ColumnRef {
        ColumnRef::new(ROSTER, name)
    }

    pub fn roster_query() -> QueryDescription {
        QueryDescription::new(TableRef::new(ROSTER))
    }

    /// The canonical "names in one ministry" request.
    pub fn ayn_by_ministry() -> QueryDescription {
        roster_query()
            .select(col("AYN"))
            .filter(Condition::compare(col("MINISTERIO"), "=", json!("Salud")))
    }
}

use fixtures::*;

// ============================================================================
// Basic query tests
// ============================================================================

#[test]
fn builds_filtered_select_with_bound_parameter() {
    let built = SqlBuilder::default().build(&ayn_by_ministry(), MAX).unwrap();
    assert_eq!(
        built.sql,
        "SELECT `dotacion_gcba_prueba`.`AYN` FROM `dotacion_gcba_prueba` \
         WHERE `dotacion_gcba_prueba`.`MINISTERIO` = ?"
    );
    assert_eq!(built.params, vec![json!("Salud")]);
}

#[test]
fn distinct_flag_adds_keyword() {
    let built = SqlBuilder::default()
        .build(&ayn_by_ministry().distinct(true), MAX)
        .unwrap();
    assert!(built.sql.starts_with("SELECT DISTINCT `dotacion_gcba_prueba`.`AYN` FROM"));
    assert_eq!(built.params, vec![json!("Salud")]);
}

#[test]
fn joins_are_rejected_before_any_sql() {
    let mut query = ayn_by_ministry();
    query.joins = vec![json!({"table": "padron"})];
    let err = SqlBuilder::default().build(&query, MAX).unwrap_err();
    assert!(matches!(err, ValidationError::UnsupportedFeature(_)));
}

#[test]
fn deserializes_wire_format() {
    let query: QueryDescription = serde_json::from_value(json!({
        "select": [{"table": ROSTER, "column": "AYN"}],
        "from": {"name": ROSTER},
        "where": [{
            "left": {"table": ROSTER, "column": "MINISTERIO"},
            "operator": "=",
            "rightValue": "Salud"
        }],
        "orderBy": [{"column": {"table": ROSTER, "column": "AYN"}, "direction": "DESC"}],
        "groupBy": null,
        "limit": 10
    }))
    .unwrap();

    let built = SqlBuilder::default().build(&query, MAX).unwrap();
    assert_eq!(
        built.sql,
        "SELECT `dotacion_gcba_prueba`.`AYN` FROM `dotacion_gcba_prueba` \
         WHERE `dotacion_gcba_prueba`.`MINISTERIO` = ? \
         ORDER BY `dotacion_gcba_prueba`.`AYN` DESC LIMIT 10"
    );
}

#[test]
fn group_by_and_order_render_in_clause_order() {
    let mut query = roster_query()
        .select(col("MINISTERIO"))
        .order(col("MINISTERIO"), "ASC");
    query.group_by = vec![col("MINISTERIO")];

    let built = SqlBuilder::default().build(&query, MAX).unwrap();
    assert_eq!(
        built.sql,
        "SELECT `dotacion_gcba_prueba`.`MINISTERIO` FROM `dotacion_gcba_prueba` \
         GROUP BY `dotacion_gcba_prueba`.`MINISTERIO` \
         ORDER BY `dotacion_gcba_prueba`.`MINISTERIO` ASC"
    );
    assert!(built.params.is_empty());
}

// ============================================================================
// Limit tests
// ============================================================================

#[test]
fn limit_is_clamped_to_maximum() {
    let built = SqlBuilder::default()
        .build(&ayn_by_ministry().limit(1_000_000), MAX)
        .unwrap();
    assert!(built.sql.ends_with(" LIMIT 50000"), "{}", built.sql);

    let built = SqlBuilder::default()
        .build(&ayn_by_ministry().limit(25), MAX)
        .unwrap();
    assert!(built.sql.ends_with(" LIMIT 25"));
}

#[test]
fn absent_limit_emits_no_clause() {
    let built = SqlBuilder::default().build(&ayn_by_ministry(), MAX).unwrap();
    assert!(!built.sql.contains("LIMIT"));
}

// ============================================================================
// Operator tests
// ============================================================================

#[test]
fn between_binds_low_then_high() {
    let query = roster_query()
        .select(col("AYN"))
        .filter(Condition::between(col("ROL"), json!(10), json!(20)));
    let built = SqlBuilder::default().build(&query, MAX).unwrap();
    assert!(built
        .sql
        .ends_with("WHERE `dotacion_gcba_prueba`.`ROL` BETWEEN ? AND ?"));
    assert_eq!(built.params, vec![json!(10), json!(20)]);
}

#[test]
fn between_requires_exactly_two_values() {
    let mut condition = Condition::between(col("ROL"), json!(1), json!(2));
    condition.between_values = Some(vec![json!(1)]);
    let query = roster_query().select(col("AYN")).filter(condition);
    assert_eq!(
        SqlBuilder::default().build(&query, MAX).unwrap_err(),
        ValidationError::InvalidBetween
    );

    let mut condition = Condition::between(col("ROL"), json!(1), json!(2));
    condition.between_values = None;
    let query = roster_query().select(col("AYN")).filter(condition);
    assert_eq!(
        SqlBuilder::default().build(&query, MAX).unwrap_err(),
        ValidationError::InvalidBetween
    );
}

#[test]
fn in_list_gets_one_placeholder_per_value() {
    let query = roster_query().select(col("AYN")).filter(Condition::in_list(
        col("SEXO"),
        vec![json!("F"), json!("M"), json!("X")],
    ));
    let built = SqlBuilder::default().build(&query, MAX).unwrap();
    assert!(built
        .sql
        .ends_with("WHERE `dotacion_gcba_prueba`.`SEXO` IN (?, ?, ?)"));
    assert_eq!(built.params.len(), 3);
}

#[test]
fn empty_in_list_is_rejected() {
    let query = roster_query()
        .select(col("AYN"))
        .filter(Condition::in_list(col("SEXO"), vec![]));
    assert_eq!(
        SqlBuilder::default().build(&query, MAX).unwrap_err(),
        ValidationError::InvalidIn
    );
}

#[test]
fn like_value_is_bound_not_inlined() {
    let query = roster_query()
        .select(col("AYN"))
        .filter(Condition::compare(col("AYN"), "LIKE", json!("%' OR 1=1 --%")));
    let built = SqlBuilder::default().build(&query, MAX).unwrap();
    assert!(built.sql.ends_with("`dotacion_gcba_prueba`.`AYN` LIKE ?"));
    assert!(!built.sql.contains("OR 1=1"));
    assert_eq!(built.params, vec![json!("%' OR 1=1 --%")]);
}

#[test]
fn column_to_column_comparison_binds_nothing() {
    let query = roster_query().select(col("AYN")).filter(Condition::columns(
        col("MAIL_LABORAL"),
        "!=",
        col("MAIL_PERSONAL"),
    ));
    let built = SqlBuilder::default().build(&query, MAX).unwrap();
    assert!(built.sql.ends_with(
        "`dotacion_gcba_prueba`.`MAIL_LABORAL` != `dotacion_gcba_prueba`.`MAIL_PERSONAL`"
    ));
    assert!(built.params.is_empty());
}

#[test]
fn parameters_follow_placeholder_order_across_conditions() {
    let query = roster_query()
        .select(col("AYN"))
        .filter(Condition::compare(col("MINISTERIO"), "=", json!("Salud")))
        .filter(Condition::between(col("ROL"), json!(1), json!(9)))
        .filter(Condition::in_list(col("SEXO"), vec![json!("F")]));
    let built = SqlBuilder::default().build(&query, MAX).unwrap();
    assert_eq!(
        built.params,
        vec![json!("Salud"), json!(1), json!(9), json!("F")]
    );
    assert_eq!(built.sql.matches('?').count(), 4);
}

#[test]
fn unknown_operator_is_rejected() {
    let query = roster_query()
        .select(col("AYN"))
        .filter(Condition::compare(col("AYN"), "<>", json!("x")));
    assert_eq!(
        SqlBuilder::default().build(&query, MAX).unwrap_err(),
        ValidationError::UnsupportedOperator("<>".to_string())
    );
}

#[test]
fn lowercase_direction_is_rejected() {
    let query = roster_query().select(col("AYN")).order(col("AYN"), "desc");
    assert_eq!(
        SqlBuilder::default().build(&query, MAX).unwrap_err(),
        ValidationError::InvalidDirection("desc".to_string())
    );
}

// ============================================================================
// Whitelist tests
// ============================================================================

#[test]
fn unknown_table_is_rejected() {
    let query =
        QueryDescription::new(TableRef::new("usuarios")).select(ColumnRef::new("usuarios", "id"));
    assert_eq!(
        SqlBuilder::default().build(&query, MAX).unwrap_err(),
        ValidationError::TableNotAllowed("usuarios".to_string())
    );
}

#[test]
fn malformed_column_name_is_rejected() {
    let query = roster_query().select(col("AYN`; DROP TABLE x; --"));
    assert!(matches!(
        SqlBuilder::default().build(&query, MAX).unwrap_err(),
        ValidationError::InvalidColumnName(_)
    ));
}

#[test]
fn undeclared_column_is_rejected() {
    let query = roster_query().select(col("SALARIO"));
    assert_eq!(
        SqlBuilder::default().build(&query, MAX).unwrap_err(),
        ValidationError::ColumnNotAllowed {
            table: ROSTER.to_string(),
            column: "SALARIO".to_string(),
        }
    );
}

#[test]
fn columns_in_filters_are_checked_too() {
    let query = roster_query()
        .select(col("AYN"))
        .filter(Condition::compare(col("SALARIO"), ">", json!(0)));
    assert!(matches!(
        SqlBuilder::default().build(&query, MAX).unwrap_err(),
        ValidationError::ColumnNotAllowed { .. }
    ));
}

#[test]
fn invalid_alias_is_rejected() {
    let mut query = ayn_by_ministry();
    query.from.alias = Some("d; --".to_string());
    assert_eq!(
        SqlBuilder::default().build(&query, MAX).unwrap_err(),
        ValidationError::InvalidAlias("d; --".to_string())
    );
}

#[test]
fn valid_alias_renders_on_from() {
    let mut query = ayn_by_ministry();
    query.from.alias = Some("d".to_string());
    let built = SqlBuilder::default().build(&query, MAX).unwrap();
    assert!(built
        .sql
        .contains("FROM `dotacion_gcba_prueba` AS `d` WHERE"));
}

#[test]
fn empty_select_is_rejected() {
    let query = roster_query();
    assert_eq!(
        SqlBuilder::default().build(&query, MAX).unwrap_err(),
        ValidationError::EmptySelect
    );
}

#[test]
fn introspected_table_accepts_any_well_formed_column() {
    let query = QueryDescription::new(TableRef::new("padron"))
        .select(ColumnRef::new("padron", "DOCUMENTO"))
        .filter(Condition::compare(
            ColumnRef::new("padron", "COMUNA"),
            "=",
            json!(3),
        ));
    let built = SqlBuilder::default().build(&query, MAX).unwrap();
    assert_eq!(
        built.sql,
        "SELECT `padron`.`DOCUMENTO` FROM `padron` WHERE `padron`.`COMUNA` = ?"
    );

    let bad = QueryDescription::new(TableRef::new("padron"))
        .select(ColumnRef::new("padron", "a b"));
    assert!(matches!(
        SqlBuilder::default().build(&bad, MAX).unwrap_err(),
        ValidationError::InvalidColumnName(_)
    ));
}

// ============================================================================
// Display and dialect tests
// ============================================================================

#[test]
fn display_sql_inlines_escaped_values() {
    let query = roster_query()
        .select(col("AYN"))
        .filter(Condition::compare(col("AYN"), "=", json!("O'Brien")))
        .filter(Condition::between(col("ROL"), json!(1), json!(2)));
    let built = SqlBuilder::default().build(&query, MAX).unwrap();
    assert_eq!(
        built.display_sql(&MySqlDialect),
        "SELECT `dotacion_gcba_prueba`.`AYN` FROM `dotacion_gcba_prueba` \
         WHERE `dotacion_gcba_prueba`.`AYN` = 'O''Brien' \
         AND `dotacion_gcba_prueba`.`ROL` BETWEEN 1 AND 2"
    );
    assert!(built.sql.contains("= ?"));
}

#[test]
fn null_right_value_binds_null() {
    let mut condition = Condition::compare(col("MAIL_MIA"), "=", json!(null));
    condition.right_value = None;
    let built = SqlBuilder::default()
        .build(&roster_query().select(col("AYN")).filter(condition), MAX)
        .unwrap();
    assert_eq!(built.params, vec![json!(null)]);
    assert!(built.display_sql(&MySqlDialect).ends_with("= NULL"));
}

#[cfg(feature = "duckdb")]
#[test]
fn duckdb_uses_double_quotes() {
    let built = SqlBuilder::default()
        .build_with_dialect(&ayn_by_ministry(), MAX, &DuckDbDialect)
        .unwrap();
    assert_eq!(
        built.sql,
        "SELECT \"dotacion_gcba_prueba\".\"AYN\" FROM \"dotacion_gcba_prueba\" \
         WHERE \"dotacion_gcba_prueba\".\"MINISTERIO\" = ?"
    );
}

#[cfg(feature = "postgres")]
#[test]
fn postgres_numbers_placeholders() {
    let query = ayn_by_ministry().filter(Condition::between(col("ROL"), json!(1), json!(2)));
    let built = SqlBuilder::default()
        .build_with_dialect(&query, MAX, &PostgresDialect)
        .unwrap();
    assert!(built.sql.contains("= $1"));
    assert!(built.sql.ends_with("BETWEEN $2 AND $3"));
}
