//! Core domain types for fills, leg groups and per-trade P/L.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::normalize_token;

pub const DIRECTION_BUY: i64 = 1;
pub const DIRECTION_SELL: i64 = 2;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Map a source direction code (1 = buy, 2 = sell).
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            DIRECTION_BUY => Some(Side::Buy),
            DIRECTION_SELL => Some(Side::Sell),
            _ => None,
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Side::Buy => DIRECTION_BUY,
            Side::Sell => DIRECTION_SELL,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InstrumentType {
    Call,
    Put,
    /// Synthetic marker for a whole multi-leg execution ("XX" in the export).
    Combo,
    /// Anything else, kept verbatim so it still groups but never prices.
    Other(String),
}

impl InstrumentType {
    pub fn parse(raw: &str) -> Self {
        let t = normalize_token(raw);
        match t.as_str() {
            "CE" | "CALL" | "C" => InstrumentType::Call,
            "PE" | "PUT" | "P" => InstrumentType::Put,
            "XX" | "COMBO" => InstrumentType::Combo,
            _ => InstrumentType::Other(t),
        }
    }
}

impl fmt::Display for InstrumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstrumentType::Call => write!(f, "CALL"),
            InstrumentType::Put => write!(f, "PUT"),
            InstrumentType::Combo => write!(f, "COMBO"),
            InstrumentType::Other(s) => write!(f, "{s}"),
        }
    }
}

/// One executed fill, decoded from a raw trade-log record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Leg {
    /// Zero-based index of the source row.
    pub row: usize,
    pub symbol: String,
    pub contract_type: String,
    pub expiry: String,
    pub strike: Option<f64>,
    pub instrument_type: InstrumentType,
    pub instrument_name: String,
    pub leg_id: String,
    /// Raw direction code; 0 when the source value did not coerce.
    pub direction: i64,
    pub quantity: i64,
    pub price: Option<f64>,
    pub secondary_id: String,
    pub order_time: String,
    pub exchange_time: String,
    pub trade_date: Option<NaiveDate>,
}

impl Leg {
    pub fn side(&self) -> Option<Side> {
        Side::from_code(self.direction)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupKey {
    pub symbol: String,
    pub expiry: String,
    pub instrument_type: InstrumentType,
    pub direction: i64,
}

/// All fills sharing one leg role, collapsed to a representative row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LegGroup {
    pub key: GroupKey,
    /// Earliest known trade date among the fills.
    pub trade_date: Option<NaiveDate>,
    /// Mean of the fills that carry a strike.
    pub strike: Option<f64>,
    pub quantity: i64,
    /// Mean of the fills that carry a price.
    pub price: Option<f64>,
    /// Smallest leg id in the group.
    pub leg_id: String,
    pub fills: usize,
}

impl LegGroup {
    pub fn side(&self) -> Option<Side> {
        Side::from_code(self.key.direction)
    }

    pub fn is(&self, instrument: &InstrumentType, side: Side) -> bool {
        &self.key.instrument_type == instrument && self.key.direction == side.code()
    }
}

/// The companion leg a logical trade needs, e.g. BUY CALL.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LegRole {
    pub side: Side,
    pub kind: RoleKind,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RoleKind {
    Call,
    Put,
    Combo,
}

impl LegRole {
    pub const fn new(side: Side, kind: RoleKind) -> Self {
        Self { side, kind }
    }

    pub fn instrument(self) -> InstrumentType {
        match self.kind {
            RoleKind::Call => InstrumentType::Call,
            RoleKind::Put => InstrumentType::Put,
            RoleKind::Combo => InstrumentType::Combo,
        }
    }
}

impl fmt::Display for LegRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.side, self.instrument())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeKind {
    Open,
    Close,
}

impl fmt::Display for TradeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeKind::Open => write!(f, "OPEN"),
            TradeKind::Close => write!(f, "CLOSE"),
        }
    }
}

/// One priced logical trade.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PnlRecord {
    pub date: Option<NaiveDate>,
    pub expiry: String,
    pub stock: String,
    pub net_quantity: i64,
    pub trade_kind: TradeKind,
    pub parity: f64,
    pub expense: f64,
    pub pnl: f64,
}

/// Total P/L per (stock, expiry).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockExpiryTotal {
    pub stock: String,
    pub expiry: String,
    pub trades: usize,
    pub net_quantity: i64,
    pub pnl: f64,
}

/// One row of the daily PnL-by-strategy feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyPnlRow {
    pub date: NaiveDate,
    pub pnl: Option<f64>,
    /// In crores.
    pub total_fund: Option<f64>,
    pub fund_used: Option<f64>,
    pub total_fund_used: Option<f64>,
    pub expiry: String,
    pub strategy: String,
}
