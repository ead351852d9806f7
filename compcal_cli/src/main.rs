use std::{
    env::current_dir,
    fs::{read_to_string, write},
    path::PathBuf,
};

use anyhow::{Context, Result};
use clap::Parser;
use compcal_core::{
    calendar::emit,
    config::ConfigArgs,
    store::{DynamoStore, MemoryStore},
    Config,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Arguments {
    /// the selectors, e.g. `DE+US/Texas`; the default region if omitted
    pub selectors: Option<String>,
    /// where to write the calendar, `calendar.ics` in the current directory by default
    #[arg(long, short)]
    pub output: Option<PathBuf>,
    /// read the competitions from a JSON array instead of the table
    #[arg(long)]
    pub records: Option<PathBuf>,
    #[command(flatten)]
    pub config: ConfigArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Arguments::parse();
    let config = Config::from(args.config);
    let selectors = args.selectors.as_deref();
    let calendar = match &args.records {
        Some(records) => {
            let json = read_to_string(records)
                .with_context(|| format!("reading {}", records.display()))?;
            let store = MemoryStore::from_json(&json)?;
            compcal_core::get(&store, &config, selectors).await?
        }
        None => {
            let store = DynamoStore::connect(&config.table).await;
            compcal_core::get(&store, &config, selectors).await?
        }
    };
    let path = match args.output {
        Some(path) => path,
        None => current_dir()?.join("calendar.ics"),
    };
    write(&path, emit::generate(&calendar))?;
    info!(path = %path.display(), events = calendar.events.len(), "wrote calendar");
    Ok(())
}
