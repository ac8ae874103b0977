//! Runs a predefined report against a throwaway DuckDB roster and writes the file.
//!
//! Usage: cargo run --example run_report -- [slug] [csv|xlsx]

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use dotacion::backends::DuckDbConnection;
use dotacion::export::ExportFormat;
use dotacion::{DotacionConfig, QueryService};

fn bootstrap_roster(db_path: &Path) -> anyhow::Result<()> {
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
             '', 'sol@example.com', '27333333333');
        "#,
    )?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let slug = args
        .next()
        .unwrap_or_else(|| "integrantes-por-edad-global".to_string());
    let format = ExportFormat::from_query(args.next().as_deref());

    let dir = tempfile::tempdir()?;
    let db_path = dir.path().join("roster.duckdb");
    bootstrap_roster(&db_path)?;

    let backend = Arc::new(DuckDbConnection::new(&db_path));
    let service = QueryService::new(backend, &DotacionConfig::default());

    let mut params = HashMap::new();
    params.insert("ministerio".to_string(), "MINISTERIO DE SALUD".to_string());
    let file = service.run_report(&slug, &params, None, format).await?;

    std::fs::write(&file.filename, &file.bytes)?;
    println!("wrote {} ({} bytes)", file.filename, file.bytes.len());
    if format == ExportFormat::Csv {
        println!("{}", String::from_utf8_lossy(&file.bytes));
    }
    Ok(())
}
