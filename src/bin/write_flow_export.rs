use std::fs::File;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::prelude::*;

use tx_flow_export::export::{run_export, ExportConfig};
use tx_flow_export::parser::BlockchainInfoParser;

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
        tracing::error!("flow export failed: {:?}", err);
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

    let summary = run_export(&config, &BlockchainInfoParser::default())?;
    tracing::info!(
        "Exported {} addresses (deepest level {}), {} blocks, {} transactions ({} out-of-scope flows, {} unconfirmed dropped)",
        summary.addresses,
        summary.deepest_level,
        summary.blocks,
        summary.transactions,
        summary.out_of_scope_flows,
        summary.dropped_unconfirmed
    );

    Ok(())
}
