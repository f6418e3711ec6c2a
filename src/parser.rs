use crate::raw_record::{RawAddressRecord, RawTransaction};
use crate::tx_record::{AddressRecord, Transaction};
use anyhow::anyhow;
use itertools::Itertools;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Normalizes a raw per-address record into its canonical form.
pub trait AddressRecordParser {
    fn parse(&self, address: &str, raw: &RawAddressRecord) -> anyhow::Result<AddressRecord>;
}

/// Parser for the blockchain.info address feed.
#[derive(Default)]
pub struct BlockchainInfoParser {}

impl BlockchainInfoParser {
    fn parse_transaction(raw: &RawTransaction) -> anyhow::Result<Transaction> {
        if raw.hash.is_empty() {
            return Err(anyhow!("transaction without hash: {:?}", raw));
        }

        let mut inputs = BTreeMap::<String, u64>::new();
        let mut total_in = 0u64;
        let mut generative = true;
        for prev_out in raw.spent_outputs() {
            generative = false;
            total_in += prev_out.value;
            if let Some(addr) = &prev_out.addr {
                *inputs.entry(addr.clone()).or_default() += prev_out.value;
            }
        }

        let mut outputs = BTreeMap::<String, u64>::new();
        let mut total_out = 0u64;
        for output in raw.outputs.iter() {
            total_out += output.value;
            if let Some(addr) = &output.addr {
                *outputs.entry(addr.clone()).or_default() += output.value;
            }
        }

        Ok(Transaction {
            hash: raw.hash.clone(),
            inputs,
            outputs,
            block_height: raw.block_height,
            total_in,
            total_out,
            generative,
        })
    }
}

impl AddressRecordParser for BlockchainInfoParser {
    fn parse(&self, address: &str, raw: &RawAddressRecord) -> anyhow::Result<AddressRecord> {
        if address.is_empty() {
            return Err(anyhow!("can't parse record without address"));
        }

        let mut txs = Vec::with_capacity(raw.txs.len());
        for raw_tx in raw.txs.iter() {
            txs.push(Arc::new(Self::parse_transaction(raw_tx)?));
        }
        // stable: unconfirmed keep their feed order at the end
        let txs: Vec<_> = txs
            .into_iter()
            .sorted_by_key(|tx| (tx.block_height.is_none(), tx.block_height))
            .collect();

        let listed_flow: i64 = txs.iter().map(|tx| tx.net_flow(address)).sum();

        Ok(AddressRecord {
            n_tx: raw.n_tx,
            total_in: raw.total_received,
            total_out: raw.total_sent,
            final_balance: raw.final_balance,
            starting_balance: raw.final_balance - listed_flow,
            txs,
        })
    }
}
