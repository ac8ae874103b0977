use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand, ValueEnum};

use dotacion::dialect::{Dialect, MySqlDialect};
use dotacion::export::ExportFormat;
use dotacion::web::{self, AppState};
use dotacion::{
    DotacionConfig, QueryDescription, QueryService, ReportRegistry, SqlBuilder, TableCatalog,
};

#[derive(Parser)]
#[command(name = "dotacion", version, about = "Roster query service")]
struct Cli {
    /// Configuration file (defaults to DOTACION_CONFIG, ./dotacion.toml, then the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP API
    Serve {
        /// Address to bind, overriding the configuration
        #[arg(long)]
        bind: Option<String>,
    },
    /// Print the SQL for a JSON query description without executing it
    PrintSql {
        file: PathBuf,
        #[arg(long, value_enum, default_value_t = DialectArg::Mysql)]
        dialect: DialectArg,
    },
    /// Print the SQL of a predefined report
    ReportSql {
        slug: String,
        /// Report parameter as name=value; repeatable
        #[arg(long = "param", value_parser = parse_key_val)]
        params: Vec<(String, String)>,
        #[arg(long)]
        distinct: Option<bool>,
        #[arg(long, value_enum, default_value_t = DialectArg::Mysql)]
        dialect: DialectArg,
    },
    /// Run a predefined report against the configured database and write the file
    Download {
        slug: String,
        #[arg(long = "param", value_parser = parse_key_val)]
        params: Vec<(String, String)>,
        #[arg(long)]
        distinct: Option<bool>,
        #[arg(long, default_value = "csv")]
        format: String,
        /// Output directory
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DialectArg {
    Mysql,
    Duckdb,
    Postgres,
}

impl DialectArg {
    fn dialect(self) -> anyhow::Result<Box<dyn Dialect>> {
        match self {
            DialectArg::Mysql => Ok(Box::new(MySqlDialect)),
            #[cfg(feature = "duckdb")]
            DialectArg::Duckdb => Ok(Box::new(dotacion::dialect::DuckDbDialect)),
            #[cfg(feature = "postgres")]
            DialectArg::Postgres => Ok(Box::new(dotacion::dialect::PostgresDialect)),
            #[allow(unreachable_patterns)]
            other => Err(anyhow!("dialect {other:?} is not compiled in")),
        }
    }
}

fn parse_key_val(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .ok_or_else(|| format!("expected name=value, got '{raw}'"))
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<DotacionConfig> {
    match path {
        Some(path) => {
            let mut config = DotacionConfig::from_file(path)
                .with_context(|| format!("loading config from {}", path.display()))?;
            config.apply_env();
            Ok(config)
        }
        None => Ok(DotacionConfig::load_default()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());
            let service = QueryService::connect(&config).await?;
            let state = Arc::new(AppState::new(service, config.errors.verbose));
            web::serve(state, &bind).await?;
        }
        Command::PrintSql { file, dialect } => {
            let raw = fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let query: QueryDescription = serde_json::from_str(&raw)?;
            let dialect = dialect.dialect()?;
            let built = SqlBuilder::new(TableCatalog::roster()).build_with_dialect(
                &query,
                config.query.effective_max_rows(),
                dialect.as_ref(),
            )?;
            println!("{}", built.sql);
            if !built.params.is_empty() {
                println!("-- params: {}", serde_json::to_string(&built.params)?);
            }
        }
        Command::ReportSql {
            slug,
            params,
            distinct,
            dialect,
        } => {
            let template = ReportRegistry::roster()
                .lookup(&slug)
                .ok_or_else(|| anyhow!("unknown report '{slug}'"))?;
            let raw: HashMap<String, String> = params.into_iter().collect();
            let resolved = template.resolve_params(&raw)?;
            let sql = template.render_sql(
                TableCatalog::roster(),
                &resolved,
                distinct,
                dialect.dialect()?.as_ref(),
            )?;
            println!("{sql}");
        }
        Command::Download {
            slug,
            params,
            distinct,
            format,
            out,
        } => {
            let service = QueryService::connect(&config).await?;
            let raw: HashMap<String, String> = params.into_iter().collect();
            let file = service
                .run_report(&slug, &raw, distinct, ExportFormat::from_query(Some(format.as_str())))
                .await?;
            let path = out.join(&file.filename);
            fs::write(&path, &file.bytes)
                .with_context(|| format!("writing {}", path.display()))?;
            tracing::info!(path = %path.display(), bytes = file.bytes.len(), "report written");
        }
    }
    Ok(())
}
