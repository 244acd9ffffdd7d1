//! Portfolio metrics over the daily PnL-by-strategy sheet: headline KPIs,
//! equity curve, daily P/L and how capital is spread across expiries and
//! strategies.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::ReportError;
use crate::source::Table;
use crate::types::DailyPnlRow;
use crate::utils::{coerce_float, round2};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d-%b-%Y", "%d/%m/%Y", "%d %b %Y", "%Y/%m/%d"];

pub fn parse_sheet_date(s: &str) -> Option<NaiveDate> {
    let t = s.trim();
    // Sheets often carry a time part ("2024-01-05 00:00:00").
    let head = t.split_whitespace().next().unwrap_or(t);
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(t, f).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(head, f).ok())
        })
}

/// Decode the daily sheet. Rows with an unreadable date are rejected.
pub fn decode_daily(table: &Table) -> Result<Vec<DailyPnlRow>, ReportError> {
    let col = |name: &str| {
        table.column(name).ok_or_else(|| ReportError::MissingColumn {
            column: name.to_string(),
        })
    };
    let date_c = col("Date")?;
    let pnl_c = col("Pnl")?;
    let optional = |name: &str| table.column(name);
    let total_c = optional("Total Fund");
    let used_c = optional("Fund used");
    let tused_c = optional("Tfund used");
    let expiry_c = optional("Expiry");
    let strat_c = optional("Strategy");

    table
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let raw_date = cell(row, Some(date_c));
            let date = parse_sheet_date(&raw_date).ok_or(ReportError::BadDate {
                row: i,
                value: raw_date,
            })?;
            Ok(DailyPnlRow {
                date,
                pnl: coerce_float(&cell(row, Some(pnl_c))),
                total_fund: coerce_float(&cell(row, total_c)),
                fund_used: coerce_float(&cell(row, used_c)),
                total_fund_used: coerce_float(&cell(row, tused_c)),
                expiry: cell(row, expiry_c),
                strategy: cell(row, strat_c),
            })
        })
        .collect()
}

fn cell(row: &[String], c: Option<usize>) -> String {
    c.and_then(|i| row.get(i))
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

/// Earliest and latest date in the sheet.
pub fn default_range(rows: &[DailyPnlRow]) -> Option<(NaiveDate, NaiveDate)> {
    let min = rows.iter().map(|r| r.date).min()?;
    let max = rows.iter().map(|r| r.date).max()?;
    Some((min, max))
}

/// Rows within `[start, end]` that carry a P/L value.
pub fn filter_rows(rows: &[DailyPnlRow], start: NaiveDate, end: NaiveDate) -> Vec<DailyPnlRow> {
    rows.iter()
        .filter(|r| r.date >= start && r.date <= end && r.pnl.is_some())
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Summary {
    /// In crores, from the earliest-dated row.
    pub total_fund: f64,
    pub total_pnl: f64,
    /// Percent of fund; `None` when the fund is zero or missing.
    pub pct_return: Option<f64>,
}

pub fn summary(rows: &[DailyPnlRow], fund_unit: f64) -> Result<Summary, ReportError> {
    let first = earliest(rows).ok_or(ReportError::EmptyRange)?;
    let total_fund = first.total_fund.unwrap_or(0.0);
    let total_pnl: f64 = rows.iter().filter_map(|r| r.pnl).sum();
    let denom = total_fund * fund_unit;
    let pct_return = if denom != 0.0 {
        Some(round2(total_pnl / denom * 100.0))
    } else {
        None
    };
    Ok(Summary {
        total_fund,
        total_pnl,
        pct_return,
    })
}

/// P/L summed per date, ascending.
pub fn daily_pnl(rows: &[DailyPnlRow]) -> Vec<(NaiveDate, f64)> {
    let mut acc: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for r in rows {
        if let Some(p) = r.pnl {
            *acc.entry(r.date).or_insert(0.0) += p;
        }
    }
    acc.into_iter().collect()
}

/// Running total of the daily P/L series.
pub fn equity_curve(rows: &[DailyPnlRow]) -> Vec<(NaiveDate, f64)> {
    let mut equity = 0.0;
    daily_pnl(rows)
        .into_iter()
        .map(|(d, p)| {
            equity += p;
            (d, equity)
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct CapitalAllocation {
    pub used_pct: f64,
    pub idle_pct: f64,
}

/// Share of the fund in use as of the latest-dated row.
pub fn capital_allocation(rows: &[DailyPnlRow]) -> Result<Option<CapitalAllocation>, ReportError> {
    let first = earliest(rows).ok_or(ReportError::EmptyRange)?;
    let last = latest(rows).ok_or(ReportError::EmptyRange)?;
    let (Some(total), Some(used)) = (first.total_fund, last.total_fund_used) else {
        return Ok(None);
    };
    if total == 0.0 {
        return Ok(None);
    }
    let used_pct = used / total * 100.0;
    Ok(Some(CapitalAllocation {
        used_pct,
        idle_pct: 100.0 - used_pct,
    }))
}

#[derive(Debug, Clone, Serialize, PartialEq, Default)]
pub struct FundDistribution {
    pub by_expiry_strategy: Vec<(String, String, f64)>,
    pub by_expiry: Vec<(String, f64)>,
    pub by_strategy: Vec<(String, f64)>,
}

/// `Fund used` summed per (expiry, strategy), with per-expiry and
/// per-strategy rollups. Missing values count as nothing.
pub fn fund_distribution(rows: &[DailyPnlRow]) -> FundDistribution {
    let mut pair: BTreeMap<(&str, &str), f64> = BTreeMap::new();
    let mut expiry: BTreeMap<&str, f64> = BTreeMap::new();
    let mut strategy: BTreeMap<&str, f64> = BTreeMap::new();
    for r in rows {
        let v = r.fund_used.unwrap_or(0.0);
        *pair.entry((r.expiry.as_str(), r.strategy.as_str())).or_insert(0.0) += v;
        *expiry.entry(r.expiry.as_str()).or_insert(0.0) += v;
        *strategy.entry(r.strategy.as_str()).or_insert(0.0) += v;
    }
    FundDistribution {
        by_expiry_strategy: pair
            .into_iter()
            .map(|((e, s), v)| (e.to_string(), s.to_string(), v))
            .collect(),
        by_expiry: expiry.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
        by_strategy: strategy.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
    }
}

// Ties keep input order: first row for earliest, last row for latest.
fn earliest(rows: &[DailyPnlRow]) -> Option<&DailyPnlRow> {
    rows.iter().reduce(|a, b| if b.date < a.date { b } else { a })
}

fn latest(rows: &[DailyPnlRow]) -> Option<&DailyPnlRow> {
    rows.iter().reduce(|a, b| if b.date >= a.date { b } else { a })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[[&str; 7]]) -> Table {
        Table {
            headers: ["Date", "Pnl", "Total Fund", "Fund used", "Tfund used", "Expiry", "Strategy"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        }
    }

    fn sample() -> Vec<DailyPnlRow> {
        decode_daily(&table(&[
            ["2024-01-03", "5000", "2", "1.0", "1.5", "JAN", "NIFTY"],
            ["2024-01-02", "10000", "2", "0.5", "1.0", "JAN", "BANKNIFTY"],
            ["2024-01-03", "-3000", "3", "0.5", "1.2", "FEB", "NIFTY"],
            ["2024-01-04", "", "2", "0.25", "1.4", "FEB", "NIFTY"],
        ]))
        .unwrap()
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn sheet_date_formats() {
        assert_eq!(parse_sheet_date("2024-01-05"), Some(d(5)));
        assert_eq!(parse_sheet_date("05-Jan-2024"), Some(d(5)));
        assert_eq!(parse_sheet_date("05/01/2024"), Some(d(5)));
        assert_eq!(parse_sheet_date("2024-01-05 00:00:00"), Some(d(5)));
        assert_eq!(parse_sheet_date("yesterday"), None);
    }

    #[test]
    fn decode_rejects_bad_date_and_keeps_missing_pnl() {
        let rows = sample();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[3].pnl, None);
        let err = decode_daily(&table(&[["soon", "1", "1", "1", "1", "E", "S"]])).unwrap_err();
        assert_eq!(
            err,
            ReportError::BadDate {
                row: 0,
                value: "soon".into()
            }
        );
    }

    #[test]
    fn filter_drops_missing_pnl() {
        let rows = sample();
        assert_eq!(default_range(&rows), Some((d(2), d(4))));
        let f = filter_rows(&rows, d(2), d(4));
        assert_eq!(f.len(), 3);
        assert_eq!(filter_rows(&rows, d(3), d(3)).len(), 2);
    }

    #[test]
    fn summary_uses_earliest_fund() {
        let rows = filter_rows(&sample(), d(1), d(31));
        let s = summary(&rows, 1e7).unwrap();
        assert_eq!(s.total_fund, 2.0);
        assert_eq!(s.total_pnl, 12000.0);
        // 12000 / 2e7 * 100 = 0.06
        assert_eq!(s.pct_return, Some(0.06));
        assert_eq!(summary(&[], 1e7), Err(ReportError::EmptyRange));
    }

    #[test]
    fn equity_is_cumulative_daily() {
        let rows = sample();
        assert_eq!(daily_pnl(&rows), vec![(d(2), 10000.0), (d(3), 2000.0)]);
        assert_eq!(equity_curve(&rows), vec![(d(2), 10000.0), (d(3), 12000.0)]);
    }

    #[test]
    fn allocation_from_latest_row() {
        let a = capital_allocation(&sample()).unwrap().unwrap();
        // latest row: Tfund used 1.4 of 2 crore
        assert!((a.used_pct - 70.0).abs() < 1e-9);
        assert!((a.idle_pct - 30.0).abs() < 1e-9);
    }

    #[test]
    fn distribution_rollups() {
        let dist = fund_distribution(&sample());
        assert_eq!(
            dist.by_expiry,
            vec![("FEB".to_string(), 0.75), ("JAN".to_string(), 1.5)]
        );
        assert_eq!(
            dist.by_strategy,
            vec![("BANKNIFTY".to_string(), 0.5), ("NIFTY".to_string(), 1.75)]
        );
        assert_eq!(dist.by_expiry_strategy.len(), 3);
    }
}
