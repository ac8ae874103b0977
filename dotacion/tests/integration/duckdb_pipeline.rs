//! End-to-end pipeline tests against a file-backed DuckDB roster.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use dotacion::backends::DuckDbConnection;
use dotacion::export::ExportFormat;
use dotacion::{
    BackendConnection, ColumnRef, ColumnType, Condition, DotacionConfig, QueryDescription,
    QueryService, TableRef,
};
use regex::Regex;
use serde_json::json;

const ROSTER: &str = "dotacion_gcba_prueba";
const ROSTER_HEADER: &str =
    "id_dotacion,MINISTERIO,CUIL,AYN,FEC_NACIM,MAIL_LABORAL,MAIL_PERSONAL,CUIL_SIN_GUIONES";

fn bootstrap_duckdb(db_path: &Path) -> anyhow::Result<()> {
    let conn = duckdb::Connection::open(db_path)?;
    conn.execute_batch(
        r#"
        CREATE TABLE dotacion_gcba_prueba (
            id_dotacion INTEGER,
            MINISTERIO VARCHAR,
            CUIL VARCHAR,
            AYN VARCHAR,
            FEC_NACIM DATE,
            MAIL_LABORAL VARCHAR,
            MAIL_PERSONAL VARCHAR,
            CUIL_SIN_GUIONES VARCHAR
        );
        INSERT INTO dotacion_gcba_prueba VALUES
            (1, 'MINISTERIO DE SALUD', '20-11111111-1', 'PEREZ, ANA', CAST(current_date - INTERVAL 19 YEAR AS DATE),
             'aperez@buenosaires.gob.ar', 'ana@example.com', '20111111111'),
            (2, 'MINISTERIO DE SALUD', '20-22222222-2', 'GOMEZ, LUIS', CAST(current_date - INTERVAL 45 YEAR AS DATE),
             'lgomez@buenosaires.gob.ar', NULL, '20222222222'),
            (3, 'MINISTERIO DE EDUCACION', '27-33333333-3', 'DIAZ, SOL', CAST(current_date - INTERVAL 23 YEAR AS DATE),
             '', 'sol@example.com', '27333333333'),
            (4, '', '20-44444444-4', 'SIN MINISTERIO', CAST(current_date - INTERVAL 60 YEAR AS DATE),
             NULL, NULL, '');

        CREATE TABLE padron (
            DNI VARCHAR NOT NULL,
            ALTA DATE,
            LEGAJO INTEGER
        );
        "#,
    )?;
    Ok(())
}

async fn roster_service(
    config: &DotacionConfig,
) -> anyhow::Result<(tempfile::TempDir, QueryService)> {
    let dir = tempfile::tempdir()?;
    let db_path = dir.path().join("roster.duckdb");
    bootstrap_duckdb(&db_path)?;
    let backend = Arc::new(DuckDbConnection::new(&db_path));
    Ok((dir, QueryService::new(backend, config)))
}

fn col(name: &str) -> ColumnRef {
    ColumnRef::new(ROSTER, name)
}

fn report_csv(bytes: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(bytes)
        .lines()
        .map(str::to_string)
        .collect()
}

fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

// ============================================================================
// Ad-hoc queries
// ============================================================================

#[tokio::test]
async fn query_binds_parameters_and_orders_rows() -> anyhow::Result<()> {
    let (_dir, service) = roster_service(&DotacionConfig::default()).await?;
    let query = QueryDescription::new(TableRef::new(ROSTER))
        .select(col("AYN"))
        .select(col("FEC_NACIM"))
        .filter(Condition::compare(col("MINISTERIO"), "=", json!("MINISTERIO DE SALUD")))
        .order(col("AYN"), "ASC");

    let outcome = service.run_query(&query).await?;
    assert_eq!(outcome.row_count, 2);
    assert_eq!(outcome.rows[0]["AYN"], "GOMEZ, LUIS");
    assert_eq!(outcome.rows[1]["AYN"], "PEREZ, ANA");

    let date = Regex::new(r"^\d{4}-\d{2}-\d{2}$")?;
    assert!(date.is_match(outcome.rows[0]["FEC_NACIM"].as_str().unwrap()));
    assert!(outcome
        .sql
        .contains("WHERE \"dotacion_gcba_prueba\".\"MINISTERIO\" = 'MINISTERIO DE SALUD'"));
    Ok(())
}

#[tokio::test]
async fn injection_attempt_is_just_a_value() -> anyhow::Result<()> {
    let (_dir, service) = roster_service(&DotacionConfig::default()).await?;
    let query = QueryDescription::new(TableRef::new(ROSTER))
        .select(col("AYN"))
        .filter(Condition::compare(col("AYN"), "=", json!("x' OR '1'='1")));
    let outcome = service.run_query(&query).await?;
    assert_eq!(outcome.row_count, 0);
    Ok(())
}

#[tokio::test]
async fn between_and_in_filters() -> anyhow::Result<()> {
    let (_dir, service) = roster_service(&DotacionConfig::default()).await?;
    let query = QueryDescription::new(TableRef::new(ROSTER))
        .select(col("id_dotacion"))
        .filter(Condition::between(col("id_dotacion"), json!(2), json!(4)))
        .filter(Condition::in_list(
            col("MINISTERIO"),
            vec![json!("MINISTERIO DE SALUD"), json!("")],
        ))
        .order(col("id_dotacion"), "DESC");
    let outcome = service.run_query(&query).await?;
    let ids: Vec<i64> = outcome
        .rows
        .iter()
        .filter_map(|row| row["id_dotacion"].as_i64())
        .collect();
    assert_eq!(ids, vec![4, 2]);
    Ok(())
}

#[tokio::test]
async fn rows_are_capped_by_configuration() -> anyhow::Result<()> {
    let mut config = DotacionConfig::default();
    config.query.max_rows = 2;
    let (_dir, service) = roster_service(&config).await?;

    let unbounded = QueryDescription::new(TableRef::new(ROSTER)).select(col("AYN"));
    assert_eq!(service.run_query(&unbounded).await?.row_count, 2);

    let file = service
        .run_report("integrantes-todos-los-ministerios", &params(&[]), None, ExportFormat::Csv)
        .await?;
    assert_eq!(report_csv(&file.bytes).len(), 3);
    Ok(())
}

#[tokio::test]
async fn backend_reads_no_more_than_requested() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let db_path = dir.path().join("roster.duckdb");
    bootstrap_duckdb(&db_path)?;
    let backend = DuckDbConnection::new(&db_path);

    let sql = "SELECT * FROM \"dotacion_gcba_prueba\"";
    assert_eq!(backend.execute_sql(sql, &[], 3).await?.row_count(), 3);
    assert_eq!(backend.execute_sql(sql, &[], usize::MAX).await?.row_count(), 4);

    let none = backend.execute_sql(sql, &[], 0).await?;
    assert_eq!(none.row_count(), 0);
    assert_eq!(none.columns.len(), 8);
    Ok(())
}

// ============================================================================
// Reports
// ============================================================================

#[tokio::test]
async fn age_report_uses_default_range() -> anyhow::Result<()> {
    let (_dir, service) = roster_service(&DotacionConfig::default()).await?;
    let file = service
        .run_report("integrantes-por-edad-global", &params(&[]), None, ExportFormat::Csv)
        .await?;
    assert!(file.filename.starts_with("integrantes-por-edad-global_"));
    assert!(file.filename.ends_with(".csv"));

    let lines = report_csv(&file.bytes);
    assert_eq!(lines[0], ROSTER_HEADER);
    assert_eq!(lines.len(), 3);
    assert!(lines.iter().any(|l| l.contains("\"PEREZ, ANA\"")));
    assert!(lines.iter().any(|l| l.contains("\"DIAZ, SOL\"")));

    let file = service
        .run_report(
            "integrantes-por-edad-global",
            &params(&[("edad_min", "40"), ("edad_max", "70")]),
            None,
            ExportFormat::Csv,
        )
        .await?;
    assert_eq!(report_csv(&file.bytes).len(), 3);
    Ok(())
}

#[tokio::test]
async fn ministry_report_with_no_matches_is_header_only() -> anyhow::Result<()> {
    let (_dir, service) = roster_service(&DotacionConfig::default()).await?;
    let file = service
        .run_report(
            "integrantes-por-ministerio",
            &params(&[("ministerio", "MINISTERIO INEXISTENTE")]),
            None,
            ExportFormat::Csv,
        )
        .await?;
    assert_eq!(String::from_utf8(file.bytes)?, ROSTER_HEADER);
    Ok(())
}

#[tokio::test]
async fn mail_report_skips_blank_mails() -> anyhow::Result<()> {
    let (_dir, service) = roster_service(&DotacionConfig::default()).await?;
    let file = service
        .run_report("mails-laborales-todos", &params(&[]), None, ExportFormat::Csv)
        .await?;
    let lines = report_csv(&file.bytes);
    assert_eq!(lines[0], "MINISTERIO,AYN,MAIL_LABORAL");
    assert_eq!(lines.len(), 3);
    assert!(lines[1..].iter().all(|l| l.contains("@buenosaires.gob.ar")));
    Ok(())
}

#[tokio::test]
async fn report_downloads_as_spreadsheet() -> anyhow::Result<()> {
    let (_dir, service) = roster_service(&DotacionConfig::default()).await?;
    let file = service
        .run_report("personas-unicas-por-cuil", &params(&[]), Some(false), ExportFormat::Xlsx)
        .await?;
    assert!(file.filename.ends_with(".xlsx"));
    assert!(file.bytes.starts_with(b"PK"));
    Ok(())
}

#[tokio::test]
async fn unknown_report_is_not_found() -> anyhow::Result<()> {
    let (_dir, service) = roster_service(&DotacionConfig::default()).await?;
    let err = service
        .run_report("no-existe", &params(&[]), None, ExportFormat::Csv)
        .await
        .unwrap_err();
    assert!(matches!(err, dotacion::DotacionError::NotFound(_)));
    Ok(())
}

// ============================================================================
// Metadata
// ============================================================================

#[tokio::test]
async fn ministries_are_distinct_sorted_and_non_blank() -> anyhow::Result<()> {
    let (_dir, service) = roster_service(&DotacionConfig::default()).await?;
    assert_eq!(
        service.ministries().await?,
        vec!["MINISTERIO DE EDUCACION", "MINISTERIO DE SALUD"]
    );
    Ok(())
}

#[tokio::test]
async fn columns_come_from_catalog_or_introspection() -> anyhow::Result<()> {
    let (_dir, service) = roster_service(&DotacionConfig::default()).await?;
    assert_eq!(service.columns(ROSTER).await?.len(), 25);

    let padron = service.columns("padron").await?;
    let summary: Vec<(&str, ColumnType)> = padron
        .iter()
        .map(|c| (c.name.as_str(), c.column_type))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("DNI", ColumnType::String),
            ("ALTA", ColumnType::Date),
            ("LEGAJO", ColumnType::Number),
        ]
    );

    assert!(matches!(
        service.columns("usuarios").await,
        Err(dotacion::DotacionError::Forbidden(_))
    ));
    Ok(())
}

#[tokio::test]
async fn health_and_table_listing() -> anyhow::Result<()> {
    let (_dir, service) = roster_service(&DotacionConfig::default()).await?;
    let report = service.health().await?;
    assert!(report.table_accessible);
    assert!(report.database.unwrap().ends_with("roster.duckdb"));

    assert_eq!(service.available_tables().await?, vec![ROSTER, "padron"]);
    Ok(())
}
