//! Decode raw trade-log records into legs.
//! Records are fixed-arity comma-delimited tuples from the broker export.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::config::SchemaCfg;
use crate::error::ParseError;
use crate::types::{InstrumentType, Leg};
use crate::utils::{coerce_count, coerce_float, coerce_int, sanitize_symbol};

fn date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // "05 Jan 2024" anywhere in the field
    RE.get_or_init(|| Regex::new(r"\b(\d{1,2})\s+([A-Za-z]{3})\s+(\d{4})\b").unwrap())
}

/// Pull a `DD Mon YYYY` date out of free text. Never fails; no match or an
/// impossible calendar date gives `None`.
pub fn extract_date(field: &str) -> Option<NaiveDate> {
    let c = date_re().captures(field)?;
    let month = title_case(&c[2]);
    let s = format!("{} {} {}", &c[1], month, &c[3]);
    NaiveDate::parse_from_str(&s, "%d %b %Y").ok()
}

fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for (i, ch) in s.chars().enumerate() {
        if i == 0 {
            out.push(ch.to_ascii_uppercase());
        } else {
            out.push(ch.to_ascii_lowercase());
        }
    }
    out
}

/// Fixed-schema record decoder.
#[derive(Debug, Clone, Default)]
pub struct RecordDecoder {
    schema: SchemaCfg,
}

impl RecordDecoder {
    /// Rejects layouts with an offset outside the record arity.
    pub fn new(schema: SchemaCfg) -> Result<Self, ParseError> {
        schema.validate()?;
        Ok(Self { schema })
    }

    pub fn schema(&self) -> &SchemaCfg {
        &self.schema
    }

    pub fn parse_record(&self, row: usize, raw: &str) -> Result<Leg, ParseError> {
        let f: Vec<&str> = raw.split(',').collect();
        if f.len() != self.schema.arity {
            return Err(ParseError::MalformedRecord {
                row,
                expected: self.schema.arity,
                found: f.len(),
            });
        }
        let s = &self.schema;
        let field = |i: usize| f[i].trim();

        let order_time = field(s.order_time).to_string();
        let exchange_time = field(s.exchange_time).to_string();
        let trade_date = extract_date(&order_time).or_else(|| extract_date(&exchange_time));
        if trade_date.is_none() {
            debug!("row {}: no trade date in {:?} / {:?}", row, order_time, exchange_time);
        }

        Ok(Leg {
            row,
            symbol: sanitize_symbol(field(s.symbol)),
            contract_type: field(s.contract_type).to_string(),
            expiry: field(s.expiry).to_string(),
            strike: coerce_float(field(s.strike)),
            instrument_type: InstrumentType::parse(field(s.instrument_type)),
            instrument_name: field(s.instrument_name).to_string(),
            leg_id: field(s.leg_id).to_string(),
            direction: coerce_int(field(s.direction)),
            quantity: coerce_count(field(s.quantity)),
            price: coerce_float(field(s.price)),
            secondary_id: field(s.secondary_id).to_string(),
            order_time,
            exchange_time,
            trade_date,
        })
    }

    /// Decode every record; the first malformed one fails the batch.
    pub fn parse_records<I, S>(&self, raws: I) -> Result<Vec<Leg>, ParseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        raws.into_iter()
            .enumerate()
            .map(|(i, r)| self.parse_record(i, r.as_ref()))
            .collect()
    }

    /// Decode every record, logging and skipping malformed ones.
    pub fn parse_records_lenient<I, S>(&self, raws: I) -> (Vec<Leg>, Vec<ParseError>)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut legs = Vec::new();
        let mut rejected = Vec::new();
        for (i, r) in raws.into_iter().enumerate() {
            match self.parse_record(i, r.as_ref()) {
                Ok(leg) => legs.push(leg),
                Err(e) => {
                    warn!("Skipping record: {}", e);
                    rejected.push(e);
                }
            }
        }
        (legs, rejected)
    }
}
