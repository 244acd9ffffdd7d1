//! Domain errors. Application glue wraps these in `anyhow`.

use thiserror::Error;

use crate::types::LegRole;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("malformed record at row {row}: expected {expected} fields, found {found}")]
    MalformedRecord {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("schema offset {offset} is outside record arity {arity}")]
    InvalidSchema { offset: usize, arity: usize },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("incomplete trade {symbol} {expiry}: no {missing} leg")]
    IncompleteTrade {
        symbol: String,
        expiry: String,
        missing: LegRole,
    },
    #[error("cannot price {symbol} {expiry}: {role} leg has no {field}")]
    MissingValue {
        symbol: String,
        expiry: String,
        role: LegRole,
        field: &'static str,
    },
    #[error("quantity overflow summing {symbol} {expiry}")]
    QuantityOverflow { symbol: String, expiry: String },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReportError {
    #[error("row {row}: unrecognized date {value:?}")]
    BadDate { row: usize, value: String },
    #[error("daily sheet has no {column:?} column")]
    MissingColumn { column: String },
    #[error("no data in the selected date range")]
    EmptyRange,
}
