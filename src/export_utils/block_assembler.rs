use crate::export_utils::position_discovery::PositionAssignment;
use crate::store::CanonicalStore;
use crate::tx_record::{Transaction, TxHash};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// Confirmed transactions of the in-scope addresses, grouped by block height.
/// Within a block, transactions keep the order in which they were first seen.
#[derive(Debug, Default, Clone)]
pub struct BlockGrouping {
    blocks: BTreeMap<u64, Vec<Arc<Transaction>>>,
    dropped_unconfirmed: usize,
}

impl BlockGrouping {
    /// Blocks in ascending height order.
    pub fn iter(&self) -> impl Iterator<Item = (&u64, &Vec<Arc<Transaction>>)> {
        self.blocks.iter()
    }

    pub fn get(&self, height: u64) -> Option<&Vec<Arc<Transaction>>> {
        self.blocks.get(&height)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn total_transactions(&self) -> usize {
        self.blocks.values().map(Vec::len).sum()
    }

    /// Distinct hashes that only ever appeared without a block height.
    pub fn dropped_unconfirmed(&self) -> usize {
        self.dropped_unconfirmed
    }
}

pub fn assemble_blocks(store: &CanonicalStore, assignment: &PositionAssignment) -> BlockGrouping {
    let mut grouping = BlockGrouping::default();
    let mut seen = HashSet::<TxHash>::new();
    // a stale pending copy in one record must not hide a confirmed copy in another
    let mut pending = HashSet::<TxHash>::new();

    let records = assignment
        .positions()
        .iter()
        .filter_map(|address| store.get(address));
    for record in records {
        for tx in record.txs.iter() {
            match tx.block_height {
                Some(height) => {
                    if seen.insert(tx.hash.clone()) {
                        grouping.blocks.entry(height).or_default().push(tx.clone());
                    }
                }
                None => {
                    pending.insert(tx.hash.clone());
                }
            }
        }
    }
    grouping.dropped_unconfirmed = pending.difference(&seen).count();

    tracing::info!(
        "assembled {} blocks with {} transactions, dropped {} unconfirmed",
        grouping.len(),
        grouping.total_transactions(),
        grouping.dropped_unconfirmed
    );
    grouping
}

#[cfg(test)]
mod tests {
    use crate::export_utils::block_assembler::assemble_blocks;
    use crate::export_utils::position_discovery::discover;
    use crate::store::CanonicalStore;
    use crate::tx_record::test_utils::{record, tx};

    fn shared_history() -> CanonicalStore {
        let t1 = tx("T1", Some(100), &[("A1", 10)], &[("A0", 10)]);
        let t2 = tx("T2", Some(50), &[("A2", 4)], &[("A1", 4)]);
        let t3 = tx("T3", Some(100), &[("A2", 6)], &[("A1", 6)]);
        let pending = tx("U1", None, &[("A2", 1)], &[("A0", 1)]);
        vec![
            (
                "A0".to_string(),
                record(vec![t1.clone(), pending.clone()]),
            ),
            ("A1".to_string(), record(vec![t2.clone(), t1, t3.clone()])),
            ("A2".to_string(), record(vec![t2, t3, pending])),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn scenario_single_block() {
        let store: CanonicalStore = vec![(
            "A0".to_string(),
            record(vec![tx(
                "T1",
                Some(100),
                &[("A1", 5_000_000)],
                &[("A0", 4_000_000)],
            )]),
        )]
        .into_iter()
        .collect();
        let grouping = assemble_blocks(&store, &discover(&store, "A0", 1));
        assert_eq!(grouping.len(), 1);
        let block = grouping.get(100).unwrap();
        assert_eq!(block.len(), 1);
        assert_eq!(block[0].hash, "T1");
    }

    #[test]
    fn shared_transactions_counted_once() {
        let store = shared_history();
        let grouping = assemble_blocks(&store, &discover(&store, "A0", 5));

        let hashes: Vec<_> = grouping
            .iter()
            .flat_map(|(_, txs)| txs.iter().map(|tx| tx.hash.as_str()))
            .collect();
        assert_eq!(hashes, vec!["T2", "T1", "T3"]);
        assert_eq!(grouping.total_transactions(), 3);
    }

    #[test]
    fn blocks_ascend_and_skip_unconfirmed() {
        let store = shared_history();
        let grouping = assemble_blocks(&store, &discover(&store, "A0", 5));

        let heights: Vec<_> = grouping.iter().map(|(height, _)| *height).collect();
        assert_eq!(heights, vec![50, 100]);
        assert_eq!(grouping.dropped_unconfirmed(), 1);
        assert!(grouping
            .iter()
            .all(|(_, txs)| txs.iter().all(|tx| tx.is_confirmed())));
    }

    #[test]
    fn restricted_to_scope() {
        let store = shared_history();
        let grouping = assemble_blocks(&store, &discover(&store, "A0", 0));
        assert_eq!(grouping.total_transactions(), 1);
        assert_eq!(grouping.get(100).unwrap()[0].hash, "T1");
    }

    #[test]
    fn confirmed_copy_wins_over_stale_pending() {
        let stale = tx("T5", None, &[("A1", 3)], &[("A0", 3)]);
        let confirmed = tx("T5", Some(100), &[("A1", 3)], &[("A0", 3)]);
        let earlier = tx("T9", Some(90), &[("A1", 2)], &[("A0", 2)]);
        let store: CanonicalStore = vec![
            ("A0".to_string(), record(vec![earlier, stale])),
            ("A1".to_string(), record(vec![confirmed])),
        ]
        .into_iter()
        .collect();
        let grouping = assemble_blocks(&store, &discover(&store, "A0", 1));

        let heights: Vec<_> = grouping.iter().map(|(height, _)| *height).collect();
        assert_eq!(heights, vec![90, 100]);
        let block = grouping.get(100).unwrap();
        assert_eq!(block.len(), 1);
        assert_eq!(block[0].hash, "T5");
        assert!(block[0].is_confirmed());
        assert_eq!(grouping.dropped_unconfirmed(), 0);
    }
}
