use crate::parser::AddressRecordParser;
use crate::raw_record::RawAddressRecord;
use crate::tx_record::{Address, AddressRecord};
use crate::utils::{read_json_from_file, write_atomically};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestStats {
    pub merged: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOrigin {
    Loaded,
    Missing,
    Corrupt,
}

impl StoreOrigin {
    pub fn needs_ingest(&self) -> bool {
        !matches!(self, StoreOrigin::Loaded)
    }
}

/// Canonical address records, keyed by address. Entries are only ever replaced whole.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalStore {
    addresses: BTreeMap<Address, AddressRecord>,
}

impl CanonicalStore {
    pub fn get(&self, address: &str) -> Option<&AddressRecord> {
        self.addresses.get(address)
    }

    pub fn contains(&self, address: &str) -> bool {
        self.addresses.contains_key(address)
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replaces the record for `address` when none exists yet or when the raw
    /// record reports more transactions than the stored one. Returns whether
    /// the store changed.
    ///
    /// The raw `n_tx` is compared against the canonical `n_tx`; both come from
    /// the same feed field, so this is a like-for-like count in practice.
    pub fn merge<Parser: AddressRecordParser>(
        &mut self,
        address: &str,
        raw: &RawAddressRecord,
        parser: &Parser,
    ) -> anyhow::Result<bool> {
        let newer = match self.addresses.get(address) {
            None => true,
            Some(existing) => raw.n_tx > existing.n_tx,
        };
        if !newer {
            return Ok(false);
        }

        let record = parser
            .parse(address, raw)
            .with_context(|| format!("can't parse record of {}", address))?;
        self.addresses.insert(address.to_string(), record);
        Ok(true)
    }

    /// Merges every record of a raw snapshot file. Records that fail to parse
    /// are logged and counted; the rest of the snapshot is still merged.
    pub fn ingest_raw_file<Parser: AddressRecordParser>(
        &mut self,
        path: &Path,
        parser: &Parser,
    ) -> anyhow::Result<IngestStats> {
        let raw: BTreeMap<Address, RawAddressRecord> = read_json_from_file(path)?;
        tracing::info!("loaded {} raw records from {:?}", raw.len(), path);

        let mut stats = IngestStats::default();
        for (address, raw_record) in raw.iter() {
            match self.merge(address, raw_record, parser) {
                Ok(true) => stats.merged += 1,
                Ok(false) => stats.skipped += 1,
                Err(err) => {
                    tracing::warn!("skipping raw record: {:?}", err);
                    stats.failed += 1;
                }
            }
        }

        tracing::info!(
            "ingest finished, merged: {}, skipped: {}, failed: {}",
            stats.merged,
            stats.skipped,
            stats.failed
        );
        Ok(stats)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        read_json_from_file(path)
    }

    /// Loads the persisted store, falling back to an empty one when the file is
    /// missing or can't be decoded.
    pub fn load_or_default(path: &Path) -> (Self, StoreOrigin) {
        if !path.exists() {
            tracing::info!("no persisted store at {:?}, starting empty", path);
            return (Self::default(), StoreOrigin::Missing);
        }
        match Self::load(path) {
            Ok(store) => {
                tracing::info!("loaded {} address records from {:?}", store.len(), path);
                (store, StoreOrigin::Loaded)
            }
            Err(err) => {
                tracing::warn!("can't load persisted store, starting empty: {:?}", err);
                (Self::default(), StoreOrigin::Corrupt)
            }
        }
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        write_atomically(path, |writer| {
            serde_json::to_writer(writer, self)?;
            Ok(())
        })?;
        tracing::info!("saved {} address records to {:?}", self.len(), path);
        Ok(())
    }
}

impl FromIterator<(Address, AddressRecord)> for CanonicalStore {
    fn from_iter<T: IntoIterator<Item = (Address, AddressRecord)>>(iter: T) -> Self {
        Self {
            addresses: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::BlockchainInfoParser;
    use crate::raw_record::{RawAddressRecord, RawInput, RawOutput, RawPrevOut, RawTransaction};
    use crate::store::{CanonicalStore, IngestStats, StoreOrigin};
    use crate::utils::temp_path_for;

    fn raw_record(n_tx: u64, hashes: &[&str]) -> RawAddressRecord {
        RawAddressRecord {
            n_tx,
            final_balance: 4_000_000,
            txs: hashes
                .iter()
                .enumerate()
                .map(|(height, hash)| RawTransaction {
                    hash: hash.to_string(),
                    block_height: Some(height as u64 + 100),
                    inputs: vec![RawInput {
                        prev_out: Some(RawPrevOut {
                            addr: Some("A1".to_string()),
                            value: 5_000_000,
                        }),
                    }],
                    outputs: vec![RawOutput {
                        addr: Some("A0".to_string()),
                        value: 4_000_000,
                    }],
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn merge_inserts_missing_address() {
        let mut store = CanonicalStore::default();
        let parser = BlockchainInfoParser::default();
        assert!(store
            .merge("A0", &raw_record(1, &["T1"]), &parser)
            .unwrap());
        assert!(store.contains("A0"));
        assert_eq!(store.get("A0").unwrap().txs[0].hash, "T1");
    }

    #[test]
    fn merge_replaces_only_when_newer() {
        let mut store = CanonicalStore::default();
        let parser = BlockchainInfoParser::default();
        store
            .merge("A0", &raw_record(2, &["T1", "T2"]), &parser)
            .unwrap();

        assert!(!store
            .merge("A0", &raw_record(2, &["T9"]), &parser)
            .unwrap());
        assert!(!store.merge("A0", &raw_record(1, &["T9"]), &parser).unwrap());
        assert_eq!(store.get("A0").unwrap().txs.len(), 2);

        assert!(store
            .merge("A0", &raw_record(3, &["T3"]), &parser)
            .unwrap());
        let record = store.get("A0").unwrap();
        assert_eq!(record.n_tx, 3);
        assert_eq!(record.txs.len(), 1);
        assert_eq!(record.txs[0].hash, "T3");
    }

    #[test]
    fn merge_is_idempotent() {
        let parser = BlockchainInfoParser::default();
        let raw = raw_record(2, &["T1", "T2"]);

        let mut once = CanonicalStore::default();
        once.merge("A0", &raw, &parser).unwrap();

        let mut twice = CanonicalStore::default();
        twice.merge("A0", &raw, &parser).unwrap();
        twice.merge("A0", &raw, &parser).unwrap();

        assert_eq!(once, twice);
    }

    #[test]
    fn merge_failure_leaves_entry_untouched() {
        let mut store = CanonicalStore::default();
        let parser = BlockchainInfoParser::default();
        store.merge("A0", &raw_record(1, &["T1"]), &parser).unwrap();

        assert!(store.merge("A0", &raw_record(2, &["T1", ""]), &parser).is_err());
        assert_eq!(store.get("A0").unwrap().n_tx, 1);
    }

    #[test]
    fn save_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parsed_data.json");
        let parser = BlockchainInfoParser::default();

        let mut store = CanonicalStore::default();
        store
            .merge("A0", &raw_record(2, &["T1", "T2"]), &parser)
            .unwrap();
        store.merge("A1", &raw_record(1, &["T1"]), &parser).unwrap();
        store.save(&path).unwrap();
        assert!(!temp_path_for(&path).exists());

        let (loaded, origin) = CanonicalStore::load_or_default(&path);
        assert_eq!(origin, StoreOrigin::Loaded);
        assert_eq!(loaded, store);
    }

    #[test]
    fn load_falls_back_to_empty() {
        let dir = tempfile::tempdir().unwrap();

        let (store, origin) = CanonicalStore::load_or_default(&dir.path().join("missing.json"));
        assert!(store.is_empty());
        assert_eq!(origin, StoreOrigin::Missing);
        assert!(origin.needs_ingest());

        let corrupt = dir.path().join("corrupt.json");
        std::fs::write(&corrupt, "{\"addresses\": {\"A0\": ").unwrap();
        let (store, origin) = CanonicalStore::load_or_default(&corrupt);
        assert!(store.is_empty());
        assert_eq!(origin, StoreOrigin::Corrupt);
    }

    #[test]
    fn ingest_counts_outcomes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rawdata.json");
        let raw = serde_json::json!({
            "A0": raw_record(2, &["T1", "T2"]),
            "A1": raw_record(1, &["T1"]),
            "A2": raw_record(1, &[""]),
        });
        std::fs::write(&path, raw.to_string()).unwrap();

        let parser = BlockchainInfoParser::default();
        let mut store = CanonicalStore::default();
        store.merge("A1", &raw_record(1, &["T1"]), &parser).unwrap();

        let stats = store.ingest_raw_file(&path, &parser).unwrap();
        assert_eq!(
            stats,
            IngestStats {
                merged: 1,
                skipped: 1,
                failed: 1,
            }
        );
        assert_eq!(store.len(), 2);
        assert!(!store.contains("A2"));
    }

    #[test]
    fn ingest_reports_unreadable_source() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CanonicalStore::default();
        assert!(store
            .ingest_raw_file(
                &dir.path().join("rawdata.json"),
                &BlockchainInfoParser::default()
            )
            .is_err());
    }
}
