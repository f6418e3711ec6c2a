pub mod export;
pub mod export_utils;
pub mod parser;
pub mod raw_record;
pub mod store;
pub mod tx_record;
pub mod utils;
