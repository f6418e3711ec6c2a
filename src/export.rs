use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use crate::export_utils::block_assembler::assemble_blocks;
use crate::export_utils::export_builder::{build_export, ExportStructure};
use crate::export_utils::position_discovery::discover;
use crate::export_utils::xml_writer::write_xml;
use crate::parser::AddressRecordParser;
use crate::store::{CanonicalStore, IngestStats};
use crate::utils::write_atomically;

fn default_depth() -> u32 {
    2
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    #[default]
    Xml,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExportConfig {
    pub start_address: String,
    #[serde(default = "default_depth")]
    pub depth: u32,
    pub raw_data_path: PathBuf,
    pub store_path: PathBuf,
    pub export_path: PathBuf,
    #[serde(default)]
    pub export_format: ExportFormat,
    #[serde(default)]
    pub reload_raw: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExportSummary {
    pub addresses: usize,
    pub deepest_level: u32,
    pub blocks: usize,
    pub transactions: usize,
    pub out_of_scope_flows: usize,
    pub dropped_unconfirmed: usize,
}

/// Merges the raw snapshot into `store` and persists whatever got merged.
/// Neither an unreadable snapshot nor a failed save stops the run.
pub fn ingest_and_persist<Parser: AddressRecordParser>(
    store: &mut CanonicalStore,
    raw_data_path: &Path,
    store_path: &Path,
    parser: &Parser,
) -> Option<IngestStats> {
    let stats = match store.ingest_raw_file(raw_data_path, parser) {
        Ok(stats) => Some(stats),
        Err(err) => {
            tracing::error!("unable to load raw records, skipping ingest: {:?}", err);
            None
        }
    };

    if let Err(err) = store.save(store_path) {
        tracing::warn!("unable to save store, continuing in memory: {:?}", err);
    }

    stats
}

pub fn write_export(
    path: &Path,
    format: ExportFormat,
    export: &ExportStructure,
) -> anyhow::Result<()> {
    write_atomically(path, |writer| {
        match format {
            ExportFormat::Xml => write_xml(writer, export)?,
            ExportFormat::Json => {
                serde_json::to_writer_pretty(&mut *writer, export)?;
                writer.write_all(b"\n")?;
            }
        }
        Ok(())
    })
}

pub fn run_export<Parser: AddressRecordParser>(
    config: &ExportConfig,
    parser: &Parser,
) -> anyhow::Result<ExportSummary> {
    let (mut store, origin) = CanonicalStore::load_or_default(&config.store_path);
    if origin.needs_ingest() || config.reload_raw {
        ingest_and_persist(
            &mut store,
            &config.raw_data_path,
            &config.store_path,
            parser,
        );
    }

    if !store.contains(&config.start_address) {
        tracing::warn!(
            "start address {} has no record, export will only contain it as position 0",
            config.start_address
        );
    }

    let assignment = discover(&store, &config.start_address, config.depth);
    let blocks = assemble_blocks(&store, &assignment);
    let export = build_export(&assignment, &blocks, &store);

    write_export(&config.export_path, config.export_format, &export).with_context(|| {
        format!(
            "export stage failed, can't write {}",
            config.export_path.display()
        )
    })?;

    let summary = ExportSummary {
        addresses: export.addresses.len(),
        deepest_level: assignment.deepest(),
        blocks: export.blocks.len(),
        transactions: export.transactions().count(),
        out_of_scope_flows: export.out_of_scope_flows(),
        dropped_unconfirmed: blocks.dropped_unconfirmed(),
    };
    tracing::info!("export written to {:?}: {:?}", config.export_path, summary);
    Ok(summary)
}
