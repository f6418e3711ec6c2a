use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPrevOut {
    #[serde(default)]
    pub addr: Option<String>,
    pub value: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawInput {
    #[serde(default)]
    pub prev_out: Option<RawPrevOut>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawOutput {
    #[serde(default)]
    pub addr: Option<String>,
    pub value: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTransaction {
    pub hash: String,
    #[serde(default)]
    pub block_height: Option<u64>,
    #[serde(default)]
    pub inputs: Vec<RawInput>,
    #[serde(rename = "out", default)]
    pub outputs: Vec<RawOutput>,
}

impl RawTransaction {
    /// Inputs that spend a previous output, i.e. everything except coinbase inputs.
    pub fn spent_outputs(&self) -> impl Iterator<Item = &RawPrevOut> {
        self.inputs.iter().filter_map(|input| input.prev_out.as_ref())
    }
}

/// Unparsed per-address record as delivered by the upstream address feed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAddressRecord {
    pub n_tx: u64,
    #[serde(default)]
    pub total_received: u64,
    #[serde(default)]
    pub total_sent: u64,
    #[serde(default)]
    pub final_balance: i64,
    #[serde(default)]
    pub txs: Vec<RawTransaction>,
}
