//! Load runtime configuration. Every section falls back to defaults that
//! reproduce the historical reports.

use anyhow::Context;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::info;

use crate::costs::CostSchedule;
use crate::error::ParseError;

pub const CONFIG_ENV: &str = "COMBO_PNL_CONFIG";

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SourceCfg {
    /// Directory holding one `<sheet>.csv` per sheet.
    pub dir: String,
    pub trade_sheet: String,
    pub daily_sheet: String,
    /// Column holding the raw comma-delimited record. When unset the row's
    /// cells are re-joined with ','.
    pub raw_column: Option<String>,
}

impl Default for SourceCfg {
    fn default() -> Self {
        Self {
            dir: "data".into(),
            trade_sheet: "Trades".into(),
            daily_sheet: "Sheet1".into(),
            raw_column: None,
        }
    }
}

/// Positional layout of a raw trade-log record.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct SchemaCfg {
    pub arity: usize,
    pub symbol: usize,
    pub contract_type: usize,
    pub expiry: usize,
    pub strike: usize,
    pub instrument_type: usize,
    pub instrument_name: usize,
    pub leg_id: usize,
    pub direction: usize,
    pub quantity: usize,
    pub price: usize,
    pub secondary_id: usize,
    pub order_time: usize,
    pub exchange_time: usize,
}

impl Default for SchemaCfg {
    fn default() -> Self {
        Self {
            arity: 25,
            symbol: 0,
            contract_type: 1,
            expiry: 2,
            strike: 3,
            instrument_type: 4,
            instrument_name: 5,
            leg_id: 6,
            direction: 7,
            quantity: 8,
            price: 9,
            secondary_id: 10,
            order_time: 11,
            exchange_time: 12,
        }
    }
}

impl SchemaCfg {
    fn max_offset(&self) -> usize {
        [
            self.symbol,
            self.contract_type,
            self.expiry,
            self.strike,
            self.instrument_type,
            self.instrument_name,
            self.leg_id,
            self.direction,
            self.quantity,
            self.price,
            self.secondary_id,
            self.order_time,
            self.exchange_time,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }

    pub fn validate(&self) -> Result<(), ParseError> {
        let max = self.max_offset();
        if max >= self.arity {
            return Err(ParseError::InvalidSchema {
                offset: max,
                arity: self.arity,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EngineCfg {
    /// Process expiry partitions on the rayon pool.
    pub parallel: bool,
    /// Skip malformed records instead of failing the batch.
    pub skip_malformed: bool,
}

impl Default for EngineCfg {
    fn default() -> Self {
        Self {
            parallel: true,
            skip_malformed: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ReportCfg {
    /// Multiplier from the `Total Fund` column to currency units (crore).
    pub fund_unit: f64,
    pub output_dir: String,
}

impl Default for ReportCfg {
    fn default() -> Self {
        Self {
            fund_unit: 1e7,
            output_dir: "out".into(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub source: SourceCfg,
    pub schema: SchemaCfg,
    pub costs: CostSchedule,
    pub engine: EngineCfg,
    pub report: ReportCfg,
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let s = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_yaml(&s).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_yaml(s: &str) -> anyhow::Result<Self> {
        let cfg: Self = serde_yaml::from_str(s)?;
        cfg.schema.validate()?;
        Ok(cfg)
    }

    /// Explicit path, then `$COMBO_PNL_CONFIG`, then `./config.yaml`, then
    /// the platform config dir. Defaults when none exist.
    pub fn discover(explicit: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(p) = explicit {
            return Self::load(p);
        }
        if let Ok(p) = std::env::var(CONFIG_ENV) {
            return Self::load(p);
        }
        for candidate in candidate_paths() {
            if candidate.exists() {
                info!("Using config {}", candidate.display());
                return Self::load(candidate);
            }
        }
        info!("No config file found; using defaults");
        Ok(Self::default())
    }
}

fn candidate_paths() -> Vec<PathBuf> {
    let mut out = vec![PathBuf::from("config.yaml")];
    if let Some(dirs) = directories::ProjectDirs::from("", "", "combo-pnl") {
        out.push(dirs.config_dir().join("config.yaml"));
    }
    out
}
