use crate::export_utils::export_builder::{
    AddressExport, BlockExport, ExportStructure, FlowSideExport, TransactionExport,
};
use std::io::Write;

const INDENT: &str = "  ";

fn python_bool(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

fn write_addr<W: Write>(out: &mut W, address: &AddressExport) -> anyhow::Result<()> {
    out.write_all(
        format!(
            "{INDENT}{INDENT}<Addr Position=\"{}\" StartingBalance=\"{}\"/>\n",
            address.position, address.starting_balance
        )
        .as_bytes(),
    )?;
    Ok(())
}

fn write_side<W: Write>(out: &mut W, tag: &str, side: &FlowSideExport) -> anyhow::Result<()> {
    let pad = INDENT.repeat(4);
    let open = format!("{pad}<{tag} Num=\"{}\" Total=\"{}\"", side.count, side.total);
    if side.flows.is_empty() {
        out.write_all(format!("{open}/>\n").as_bytes())?;
        return Ok(());
    }
    out.write_all(format!("{open}>\n").as_bytes())?;
    for flow in side.flows.iter() {
        out.write_all(
            format!(
                "{pad}{INDENT}<Flow Position=\"{}\" Amt=\"{}\"/>\n",
                flow.position, flow.amount
            )
            .as_bytes(),
        )?;
    }
    out.write_all(format!("{pad}</{tag}>\n").as_bytes())?;
    Ok(())
}

fn write_transaction<W: Write>(out: &mut W, tx: &TransactionExport) -> anyhow::Result<()> {
    let pad = INDENT.repeat(3);
    out.write_all(
        format!(
            "{pad}<Transaction ID=\"{}\" Generative=\"{}\">\n",
            tx.id,
            python_bool(tx.generative)
        )
        .as_bytes(),
    )?;
    write_side(out, "Inputs", &tx.inputs)?;
    write_side(out, "Outputs", &tx.outputs)?;
    out.write_all(format!("{pad}</Transaction>\n").as_bytes())?;
    Ok(())
}

fn write_block<W: Write>(out: &mut W, block: &BlockExport) -> anyhow::Result<()> {
    let open = format!(
        "{INDENT}{INDENT}<Block Number=\"{}\" Transactions=\"{}\"",
        block.height,
        block.transactions.len()
    );
    if block.transactions.is_empty() {
        out.write_all(format!("{open}/>\n").as_bytes())?;
        return Ok(());
    }
    out.write_all(format!("{open}>\n").as_bytes())?;
    for tx in block.transactions.iter() {
        write_transaction(out, tx)?;
    }
    out.write_all(format!("{INDENT}{INDENT}</Block>\n").as_bytes())?;
    Ok(())
}

/// Renders the export as the `BitcoinXML` document consumed by the visualization.
pub fn write_xml<W: Write>(out: &mut W, export: &ExportStructure) -> anyhow::Result<()> {
    out.write_all(b"<BitcoinXML>\n")?;

    let addrs = format!("{INDENT}<Addrs NumAddrs=\"{}\"", export.addresses.len());
    if export.addresses.is_empty() {
        out.write_all(format!("{addrs}/>\n").as_bytes())?;
    } else {
        out.write_all(format!("{addrs}>\n").as_bytes())?;
        for address in export.addresses.iter() {
            write_addr(out, address)?;
        }
        out.write_all(format!("{INDENT}</Addrs>\n").as_bytes())?;
    }

    let blocks = format!("{INDENT}<Blocks NumBlocks=\"{}\"", export.blocks.len());
    if export.blocks.is_empty() {
        out.write_all(format!("{blocks}/>\n").as_bytes())?;
    } else {
        out.write_all(format!("{blocks}>\n").as_bytes())?;
        for block in export.blocks.iter() {
            write_block(out, block)?;
        }
        out.write_all(format!("{INDENT}</Blocks>\n").as_bytes())?;
    }

    out.write_all(b"</BitcoinXML>\n")?;
    Ok(())
}
