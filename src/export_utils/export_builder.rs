use crate::export_utils::block_assembler::BlockGrouping;
use crate::export_utils::position_discovery::{PositionAssignment, OUT_OF_SCOPE};
use crate::store::CanonicalStore;
use crate::tx_record::{scale_amount, scale_balance, Address, Transaction};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FlowExport {
    pub position: i64,
    pub amount: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FlowSideExport {
    pub count: usize,
    pub total: u64,
    pub flows: Vec<FlowExport>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TransactionExport {
    pub id: u64,
    pub generative: bool,
    pub inputs: FlowSideExport,
    pub outputs: FlowSideExport,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BlockExport {
    pub height: u64,
    pub transactions: Vec<TransactionExport>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AddressExport {
    pub position: usize,
    pub starting_balance: i64,
}

/// Position-relative view of one traversal, ready for a writer.
/// Amounts and balances are in display units (truncating division).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ExportStructure {
    pub addresses: Vec<AddressExport>,
    pub blocks: Vec<BlockExport>,
}

impl ExportStructure {
    pub fn transactions(&self) -> impl Iterator<Item = &TransactionExport> {
        self.blocks.iter().flat_map(|block| block.transactions.iter())
    }

    pub fn out_of_scope_flows(&self) -> usize {
        self.transactions()
            .flat_map(|tx| tx.inputs.flows.iter().chain(tx.outputs.flows.iter()))
            .filter(|flow| flow.position == OUT_OF_SCOPE)
            .count()
    }
}

/// Hands out export transaction ids: 0, 1, 2, ... for one export.
#[derive(Debug, Default)]
struct TxIdCounter {
    next: u64,
}

impl TxIdCounter {
    fn next_id(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }
}

fn flows(mapping: &BTreeMap<Address, u64>, assignment: &PositionAssignment) -> Vec<FlowExport> {
    mapping
        .iter()
        .map(|(address, amount)| FlowExport {
            position: assignment.position_of(address),
            amount: scale_amount(*amount),
        })
        .collect()
}

fn transaction_export(
    tx: &Transaction,
    id: u64,
    assignment: &PositionAssignment,
) -> TransactionExport {
    TransactionExport {
        id,
        generative: tx.generative,
        inputs: FlowSideExport {
            count: tx.inputs.len(),
            total: scale_amount(tx.total_in),
            flows: flows(&tx.inputs, assignment),
        },
        outputs: FlowSideExport {
            count: tx.outputs.len(),
            total: scale_amount(tx.total_out),
            flows: flows(&tx.outputs, assignment),
        },
    }
}

pub fn build_export(
    assignment: &PositionAssignment,
    blocks: &BlockGrouping,
    store: &CanonicalStore,
) -> ExportStructure {
    let addresses = assignment
        .positions()
        .iter()
        .enumerate()
        .map(|(position, address)| AddressExport {
            position,
            starting_balance: store
                .get(address)
                .map(|record| scale_balance(record.starting_balance))
                .unwrap_or_default(),
        })
        .collect();

    let mut ids = TxIdCounter::default();
    let blocks = blocks
        .iter()
        .map(|(height, txs)| BlockExport {
            height: *height,
            transactions: txs
                .iter()
                .map(|tx| transaction_export(tx, ids.next_id(), assignment))
                .collect(),
        })
        .collect();

    ExportStructure { addresses, blocks }
}
