//! Post-computation filtering and group-and-sum over P/L records.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::error::EngineError;
use crate::types::{PnlRecord, StockExpiryTotal};

/// Keep records dated within `[start, end]`. Undated records never match.
pub fn filter_by_date(records: &[PnlRecord], start: NaiveDate, end: NaiveDate) -> Vec<PnlRecord> {
    records
        .iter()
        .filter(|r| matches!(r.date, Some(d) if d >= start && d <= end))
        .cloned()
        .collect()
}

/// Total P/L per (stock, expiry), sorted by stock then expiry.
pub fn totals_by_stock_expiry(records: &[PnlRecord]) -> Result<Vec<StockExpiryTotal>, EngineError> {
    let mut acc: BTreeMap<(&str, &str), StockExpiryTotal> = BTreeMap::new();
    for r in records {
        let t = acc
            .entry((r.stock.as_str(), r.expiry.as_str()))
            .or_insert_with(|| StockExpiryTotal {
                stock: r.stock.clone(),
                expiry: r.expiry.clone(),
                trades: 0,
                net_quantity: 0,
                pnl: 0.0,
            });
        t.trades += 1;
        t.net_quantity = t.net_quantity.checked_add(r.net_quantity).ok_or_else(|| {
            EngineError::QuantityOverflow {
                symbol: r.stock.clone(),
                expiry: r.expiry.clone(),
            }
        })?;
        t.pnl += r.pnl;
    }
    Ok(acc.into_values().collect())
}

/// P/L summed per trade date. Undated records are left out.
pub fn totals_by_date(records: &[PnlRecord]) -> Vec<(NaiveDate, f64)> {
    let mut acc: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for r in records {
        if let Some(d) = r.date {
            *acc.entry(d).or_insert(0.0) += r.pnl;
        }
    }
    acc.into_iter().collect()
}
