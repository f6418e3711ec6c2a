use std::fs::File;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::prelude::*;

use tx_flow_export::export::{ingest_and_persist, ExportConfig};
use tx_flow_export::parser::BlockchainInfoParser;
use tx_flow_export::store::CanonicalStore;

#[derive(Parser, Debug)]
#[clap(version)]
pub struct Cli {
    /// path to config file
    #[clap(long, value_parser)]
    config_path: PathBuf,
}

#[tokio::main]
async fn main() {
    if let Err(err) = _main().await {
        tracing::error!("ingest failed: {:?}", err);
        std::process::exit(1);
    }
}

async fn _main() -> anyhow::Result<()> {
    // Start logging setup block
    let fmt_layer = tracing_subscriber::fmt::layer();

    tracing_subscriber::registry().with(fmt_layer).init();

    let Cli { config_path } = Cli::parse();

    tracing::info!("Config file {:?}", config_path);
    let file = File::open(&config_path).with_context(|| {
        format!(
            "Cannot read config file {path}",
            path = config_path.display()
        )
    })?;
    let config: ExportConfig = serde_yaml::from_reader(file).with_context(|| {
        format!(
            "Cannot read config file {path}",
            path = config_path.display()
        )
    })?;

    let (mut store, _) = CanonicalStore::load_or_default(&config.store_path);
    let stats = ingest_and_persist(
        &mut store,
        &config.raw_data_path,
        &config.store_path,
        &BlockchainInfoParser::default(),
    )
    .ok_or_else(|| anyhow::anyhow!("raw records at {:?} could not be read", config.raw_data_path))?;

    tracing::info!(
        "Store holds {} addresses after ingest ({} merged, {} skipped, {} failed)",
        store.len(),
        stats.merged,
        stats.skipped,
        stats.failed
    );

    Ok(())
}
