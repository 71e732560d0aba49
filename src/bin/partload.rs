use anyhow::Context;
use partload::config::{ConfigOverrides, LoaderConfig};
use partload::pipeline::LoadPipeline;
use partload::source::read_records;
use partload::statement::{AnsiDialect, SqlDialect};
use partload::{MemoryStore, SqliteStore};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

fn parse_arg(flag: &str) -> Option<String> {
    let mut args = std::env::args();
    while let Some(arg) = args.next() {
        if arg == flag {
            return args.next();
        }
    }
    None
}

fn has_flag(flag: &str) -> bool {
    std::env::args().any(|arg| arg == flag)
}

fn print_help() {
    eprintln!(
        r#"partload - hash-partitioned business loader

USAGE:
    partload [OPTIONS]

OPTIONS:
    -c, --config <FILE>       Path to config file (TOML)
    -i, --input <FILE>        JSON-lines business file
    -d, --database <FILE>     SQLite database file
    -p, --partitions <N>      Number of partition tables [default: 10]
        --fail-fast           Abort when the schema phase fails
        --dry-run             Print the generated DDL and load into memory only
    -h, --help                Print help

ENVIRONMENT:
    PARTLOAD_CONFIG           Path to config file
    PARTLOAD_PARTITIONS       Number of partition tables
    PARTLOAD_INPUT            JSON-lines business file
    PARTLOAD_DATABASE         SQLite database file
    RUST_LOG                  Log filter, e.g. partload=debug

CONFIG FILE (partload.toml):
    partitions = 10
    continue_on_schema_error = true
    load_attributes = true

    [tables]
    category_prefix = "business_category_"
    attribute_prefix = "business_attribute_"
"#
    );
}

fn main() -> anyhow::Result<()> {
    if has_flag("-h") || has_flag("--help") {
        print_help();
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Build CLI overrides
    let mut overrides = ConfigOverrides::default();
    if let Some(partitions) = parse_arg("--partitions").or_else(|| parse_arg("-p")) {
        overrides.partitions = Some(
            partitions
                .parse()
                .with_context(|| format!("invalid partition count '{partitions}'"))?,
        );
    }
    if let Some(input) = parse_arg("--input").or_else(|| parse_arg("-i")) {
        overrides.input = Some(input.into());
    }
    if let Some(database) = parse_arg("--database").or_else(|| parse_arg("-d")) {
        overrides.database = Some(database.into());
    }
    if has_flag("--fail-fast") {
        overrides.continue_on_schema_error = Some(false);
    }
    if !overrides.is_empty() {
        debug!(?overrides, "command-line overrides");
    }

    // Load config: CLI > Env > File > Defaults
    let config_path = parse_arg("--config")
        .or_else(|| parse_arg("-c"))
        .or_else(|| std::env::var("PARTLOAD_CONFIG").ok());
    let config = LoaderConfig::load(config_path.as_deref(), overrides)?;
    let pipeline_config = config.pipeline_config()?;

    let input = config
        .input
        .clone()
        .context("no input file; pass --input or set PARTLOAD_INPUT")?;
    let records = read_records(&input)
        .with_context(|| format!("failed to read records from {}", input.display()))?;
    info!(records = records.len(), input = %input.display(), "records loaded");

    let report = if has_flag("--dry-run") {
        let mut pipeline = LoadPipeline::new(pipeline_config, MemoryStore::new());
        let plan = pipeline.plan(&records);
        for statement in plan.schema_batch().statements() {
            println!("{};", AnsiDialect.render(statement).sql);
        }
        pipeline.run(&records)?
    } else {
        let database = config
            .database
            .clone()
            .context("no database file; pass --database or set PARTLOAD_DATABASE")?;
        let store = SqliteStore::open(&database)
            .with_context(|| format!("failed to open {}", database.display()))?;
        let mut pipeline = LoadPipeline::new(pipeline_config, store);
        pipeline.run(&records)?
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
