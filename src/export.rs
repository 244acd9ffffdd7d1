//! Serialize engine output. Callers decide where it goes.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::types::{PnlRecord, StockExpiryTotal};

pub fn records_csv(records: &[PnlRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "date",
        "expiry",
        "stock",
        "net_quantity",
        "trade_kind",
        "parity",
        "expense",
        "pnl",
    ])?;
    for r in records {
        wtr.write_record([
            r.date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default(),
            r.expiry.clone(),
            r.stock.clone(),
            r.net_quantity.to_string(),
            r.trade_kind.to_string(),
            format!("{:.2}", r.parity),
            format!("{:.2}", r.expense),
            format!("{:.2}", r.pnl),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

pub fn totals_csv(totals: &[StockExpiryTotal]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["stock", "expiry", "trades", "net_quantity", "pnl"])?;
    for t in totals {
        wtr.write_record([
            t.stock.clone(),
            t.expiry.clone(),
            t.trades.to_string(),
            t.net_quantity.to_string(),
            format!("{:.2}", t.pnl),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

pub fn records_json(records: &[PnlRecord]) -> Result<String> {
    Ok(serde_json::to_string_pretty(records)?)
}

/// Write records and totals into `dir`; returns the files written.
pub fn save_all(
    records: &[PnlRecord],
    totals: &[StockExpiryTotal],
    dir: &Path,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let files = [
        ("pnl_records.csv", records_csv(records)?),
        ("pnl_by_stock_expiry.csv", totals_csv(totals)?),
        ("pnl_records.json", records_json(records)?),
    ];
    let mut out = Vec::with_capacity(files.len());
    for (name, body) in files {
        let path = dir.join(name);
        std::fs::write(&path, body).with_context(|| format!("writing {}", path.display()))?;
        out.push(path);
    }
    Ok(out)
}
