//! Entry point. Wires source -> parser -> engine -> aggregation -> export.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use std::path::PathBuf;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

use combo_pnl::aggregate::{filter_by_date, totals_by_stock_expiry};
use combo_pnl::source::raw_records;
use combo_pnl::{export, report, AppConfig, CsvDirSource, DataSource, Engine, RecordDecoder};

#[derive(Parser)]
#[command(name = "combo-pnl", about = "Per-trade P/L for multi-leg option combos")]
struct Cli {
    /// Path to a YAML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild trades from the trade log and compute P/L.
    Run {
        /// First trade date to keep (YYYY-MM-DD).
        #[arg(long)]
        start: Option<NaiveDate>,
        /// Last trade date to keep (YYYY-MM-DD).
        #[arg(long)]
        end: Option<NaiveDate>,
        /// Output directory; overrides report.output_dir.
        #[arg(long)]
        out: Option<PathBuf>,
        /// Skip malformed records instead of failing.
        #[arg(long, default_value_t = false)]
        skip_malformed: bool,
    },
    /// Portfolio metrics from the daily PnL-by-strategy sheet.
    Report {
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
    },
}

fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    let cli = Cli::parse();
    let cfg = AppConfig::discover(cli.config.as_deref())?;
    let source = CsvDirSource::new(&cfg.source.dir);

    let res = match cli.command {
        Commands::Run {
            start,
            end,
            out,
            skip_malformed,
        } => run_pnl(&cfg, &source, start, end, out, skip_malformed),
        Commands::Report { start, end } => run_report(&cfg, &source, start, end),
    };
    if let Err(e) = &res {
        error!("{:#}", e);
    }
    res
}

fn run_pnl(
    cfg: &AppConfig,
    source: &dyn DataSource,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    out: Option<PathBuf>,
    skip_malformed: bool,
) -> Result<()> {
    let table = source.fetch(&cfg.source.trade_sheet)?;
    let raws = raw_records(&table, cfg.source.raw_column.as_deref())?;
    let decoder = RecordDecoder::new(cfg.schema.clone())?;

    let legs = if skip_malformed || cfg.engine.skip_malformed {
        let (legs, rejected) = decoder.parse_records_lenient(&raws);
        if !rejected.is_empty() {
            warn!("{} malformed records skipped", rejected.len());
        }
        legs
    } else {
        decoder.parse_records(&raws)?
    };
    let undated = legs.iter().filter(|l| l.trade_date.is_none()).count();
    info!("Decoded {} legs ({} without a trade date)", legs.len(), undated);

    let engine = Engine::new(cfg.costs).with_parallelism(cfg.engine.parallel);
    let records = engine.reconstruct(&legs).context("trade reconstruction failed")?;
    info!("Priced {} trades", records.len());

    let records = match (start, end) {
        (None, None) => records,
        (s, e) => filter_by_date(
            &records,
            s.unwrap_or(NaiveDate::MIN),
            e.unwrap_or(NaiveDate::MAX),
        ),
    };
    let totals = totals_by_stock_expiry(&records)?;
    for t in &totals {
        info!(
            "{:<12} {:<12} trades={:<3} qty={:<6} pnl={:.2}",
            t.stock, t.expiry, t.trades, t.net_quantity, t.pnl
        );
    }

    let dir = out.unwrap_or_else(|| PathBuf::from(&cfg.report.output_dir));
    for path in export::save_all(&records, &totals, &dir)? {
        info!("Wrote {}", path.display());
    }
    Ok(())
}

fn run_report(
    cfg: &AppConfig,
    source: &dyn DataSource,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<()> {
    let table = source.fetch(&cfg.source.daily_sheet)?;
    let rows = report::decode_daily(&table)?;
    let (lo, hi) = report::default_range(&rows).context("daily sheet is empty")?;
    let rows = report::filter_rows(&rows, start.unwrap_or(lo), end.unwrap_or(hi));

    let s = report::summary(&rows, cfg.report.fund_unit)?;
    info!(
        "Total fund {} Cr, P/L {:.0}, return {}",
        s.total_fund,
        s.total_pnl,
        s.pct_return
            .map(|p| format!("{p}%"))
            .unwrap_or_else(|| "n/a".into())
    );
    for (d, eq) in report::equity_curve(&rows) {
        info!("{}  equity={:.2}", d.format("%d-%b-%Y"), eq);
    }
    if let Some(a) = report::capital_allocation(&rows)? {
        info!("Capital used {:.2}% / idle {:.2}%", a.used_pct, a.idle_pct);
    }
    let dist = report::fund_distribution(&rows);
    for (expiry, v) in &dist.by_expiry {
        info!("Fund used by expiry {}: {}", expiry, v);
    }
    for (strategy, v) in &dist.by_strategy {
        info!("Fund used by strategy {}: {}", strategy, v);
    }
    Ok(())
}
