//! Tabular data sources. The engine never fetches anything itself; callers
//! hand it rows pulled through a `DataSource`.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::info;

/// Header names plus string cells, as exported from a spreadsheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name.trim()))
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

pub trait DataSource {
    fn fetch(&self, sheet: &str) -> Result<Table>;
}

/// One `<sheet>.csv` per sheet under a directory.
#[derive(Debug, Clone)]
pub struct CsvDirSource {
    dir: PathBuf,
}

impl CsvDirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl DataSource for CsvDirSource {
    fn fetch(&self, sheet: &str) -> Result<Table> {
        let path = self.dir.join(format!("{sheet}.csv"));
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&path)
            .with_context(|| format!("opening {}", path.display()))?;
        let headers = rdr
            .headers()
            .with_context(|| format!("reading header of {}", path.display()))?
            .iter()
            .map(String::from)
            .collect();
        let mut rows = Vec::new();
        for (i, rec) in rdr.records().enumerate() {
            let rec = rec.with_context(|| format!("{} row {}", path.display(), i))?;
            rows.push(rec.iter().map(String::from).collect());
        }
        info!("Loaded {} rows from {}", rows.len(), path.display());
        Ok(Table { headers, rows })
    }
}

/// In-memory sheets, for embedding callers and tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    sheets: HashMap<String, Table>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sheet(mut self, name: &str, table: Table) -> Self {
        self.sheets.insert(name.to_string(), table);
        self
    }
}

impl DataSource for MemorySource {
    fn fetch(&self, sheet: &str) -> Result<Table> {
        self.sheets
            .get(sheet)
            .cloned()
            .with_context(|| format!("no sheet named {sheet:?}"))
    }
}

/// Turn trade-log rows into raw delimited records: the named column when
/// given, otherwise every cell re-joined with ','.
pub fn raw_records(table: &Table, raw_column: Option<&str>) -> Result<Vec<String>> {
    match raw_column {
        Some(name) => {
            let idx = table
                .column(name)
                .with_context(|| format!("trade log has no column {name:?}"))?;
            Ok(table
                .rows
                .iter()
                .map(|r| r.get(idx).cloned().unwrap_or_default())
                .collect())
        }
        None => Ok(table.rows.iter().map(|r| r.join(",")).collect()),
    }
}
