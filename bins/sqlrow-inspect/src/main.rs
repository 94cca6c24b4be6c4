use std::collections::HashMap;
use std::io::Read;

use clap::Parser;

use sqlrow_api::{Key, Value};
use sqlrow_engine::{EngineError, ResultSet, ResultSetConfig};

#[derive(Parser)]
#[command(name = "sqlrow-inspect", about = "Build result rows from JSON records and inspect them")]
struct Cli {
    /// Path to TOML result-set configuration.
    #[arg(long, default_value = "result.toml", env = "SQLROW_CONFIG")]
    config: String,

    /// JSON file holding an array of records; `-` reads stdin.
    #[arg(long, default_value = "-")]
    rows: String,

    /// Project each row onto these keys (`name` or `table.name`).
    #[arg(long = "key", value_parser = parse_key)]
    keys: Vec<Key>,

    /// Count rows per projected key instead of printing them.
    #[arg(long, requires = "keys")]
    group: bool,
}

fn parse_key(s: &str) -> Result<Key, String> {
    match s.split_once('.') {
        Some((table, name)) if !table.is_empty() && !name.is_empty() => Ok(Key::column(table, name)),
        Some(_) => Err(format!("malformed qualified key '{s}'")),
        None if s.is_empty() => Err("key must not be empty".into()),
        None => Ok(Key::from(s)),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        tracing::error!(error = %e, "inspection failed");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), EngineError> {
    tracing::info!(config = %cli.config, "loading configuration");
    let config = ResultSetConfig::load(&cli.config)?;
    let results = ResultSet::from_config(&config)?;

    let records = read_records(&cli.rows)?;
    tracing::info!(
        columns = config.columns.len(),
        records = records.len(),
        "building rows"
    );

    let projector = if cli.keys.is_empty() {
        None
    } else {
        Some(results.projector(cli.keys.iter().cloned())?)
    };

    let mut groups: Vec<(Vec<Value>, usize)> = Vec::new();
    let mut seen: HashMap<Vec<Value>, usize> = HashMap::new();

    for (n, record) in records.into_iter().enumerate() {
        let row = results
            .row_from_json(record)
            .map_err(|e| e.with_context(format!("record {n}")))?;

        match &projector {
            Some(projector) if cli.group => {
                let key = projector.apply_owned(&row)?;
                match seen.get(&key) {
                    Some(&slot) => groups[slot].1 += 1,
                    None => {
                        seen.insert(key.clone(), groups.len());
                        groups.push((key, 1));
                    }
                }
            }
            Some(projector) => {
                let projected = projector.apply(&row)?;
                println!("{}", to_json(projected.into_iter()));
            }
            None => println!("{}", to_json(row.iter())),
        }
    }

    if cli.group {
        tracing::debug!(groups = groups.len(), "grouped rows");
        for (key, count) in &groups {
            let line = serde_json::json!({ "key": to_json(key.iter()), "count": count });
            println!("{line}");
        }
    }
    Ok(())
}

fn read_records(path: &str) -> Result<Vec<serde_json::Value>, EngineError> {
    let content = if path == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(path)?
    };
    Ok(serde_json::from_str(&content)?)
}

fn to_json<'a>(values: impl Iterator<Item = &'a Value>) -> serde_json::Value {
    serde_json::Value::Array(values.map(serde_json::Value::from).collect())
}
