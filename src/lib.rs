//! Rebuild multi-leg option trades from a flat trade log and attribute P/L.
//!
//! raw rows -> [`parser`] -> legs -> [`engine`] -> P/L records ->
//! [`aggregate`] / [`report`] -> [`export`]

pub mod aggregate;
pub mod config;
pub mod costs;
pub mod engine;
pub mod error;
pub mod export;
pub mod parser;
pub mod report;
pub mod source;
pub mod types;
pub mod utils;

pub use config::AppConfig;
pub use costs::CostSchedule;
pub use engine::{group_legs, Engine, PartitionOutcome};
pub use error::{EngineError, ParseError, ReportError};
pub use parser::{extract_date, RecordDecoder};
pub use source::{CsvDirSource, DataSource, MemorySource, Table};
pub use types::{InstrumentType, Leg, LegGroup, PnlRecord, Side, StockExpiryTotal, TradeKind};
