pub mod block_assembler;
pub mod export_builder;
pub mod position_discovery;
pub mod xml_writer;
