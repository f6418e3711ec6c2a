use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;
use std::sync::Arc;

pub type Address = String;
pub type TxHash = String;

/// Minor units per display unit in the export.
pub const BIG_DIVISOR: u64 = 1_000_000;

pub fn scale_amount(amount: u64) -> u64 {
    amount / BIG_DIVISOR
}

pub fn scale_balance(balance: i64) -> i64 {
    balance / BIG_DIVISOR as i64
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub hash: TxHash,
    pub inputs: BTreeMap<Address, u64>,
    pub outputs: BTreeMap<Address, u64>,
    pub block_height: Option<u64>,
    pub total_in: u64,
    pub total_out: u64,
    pub generative: bool,
}

impl Transaction {
    pub fn is_confirmed(&self) -> bool {
        self.block_height.is_some()
    }

    pub fn is_funded_by(&self, address: &str) -> bool {
        self.inputs.contains_key(address)
    }

    /// Net amount this transaction moved into `address` (negative when it spent more than it received).
    pub fn net_flow(&self, address: &str) -> i64 {
        let received = self.outputs.get(address).copied().unwrap_or_default() as i64;
        let spent = self.inputs.get(address).copied().unwrap_or_default() as i64;
        received - spent
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRecord {
    /// Ascending block height, unconfirmed transactions last.
    pub txs: Vec<Arc<Transaction>>,
    pub n_tx: u64,
    pub total_in: u64,
    pub total_out: u64,
    pub final_balance: i64,
    pub starting_balance: i64,
}

impl AddressRecord {
    /// Addresses that funded this one: input addresses of every transaction
    /// the address did not itself spend in. Duplicates are kept.
    pub fn sources<'a>(&'a self, address: &'a str) -> impl Iterator<Item = &'a Address> + 'a {
        self.txs
            .iter()
            .filter(move |tx| !tx.is_funded_by(address))
            .flat_map(|tx| tx.inputs.keys())
    }
}
