use std::{env, fs, path::PathBuf};

use dotacion::{dialect::MySqlDialect, QueryDescription, SqlBuilder};

fn usage() {
    eprintln!("Usage: print_sql <query_json>");
    eprintln!("Example: cargo run --example print_sql -- demos/ministerio.json");
}

fn main() -> anyhow::Result<()> {
    let mut args = env::args().skip(1).collect::<Vec<_>>();
    if args.is_empty() {
        usage();
        std::process::exit(1);
    }

    let query_path = PathBuf::from(args.remove(0));
    let query_str = fs::read_to_string(query_path)?;
    let query: QueryDescription = serde_json::from_str(&query_str)?;

    let built = SqlBuilder::default().build(&query, dotacion::config::MAX_ROWS)?;
    println!("{}", built.sql);
    println!("-- params: {}", serde_json::to_string(&built.params)?);
    println!("{}", built.display_sql(&MySqlDialect));
    Ok(())
}
