//! Rebuild logical combo trades from leg groups and price them.
//!
//! Legs are partitioned by expiry; each partition is grouped, split by
//! symbol and priced on its own, so partitions can run on the rayon pool.
//! A SELL combo opens a position (BUY CALL + SELL PUT companions), any
//! other combo closes one (SELL CALL + BUY PUT).

use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::costs::CostSchedule;
use crate::error::EngineError;
use crate::types::{
    GroupKey, InstrumentType, Leg, LegGroup, LegRole, PnlRecord, RoleKind, Side, TradeKind,
};
use crate::utils::{mean_present, round2};

const BUY_CALL: LegRole = LegRole::new(Side::Buy, RoleKind::Call);
const SELL_CALL: LegRole = LegRole::new(Side::Sell, RoleKind::Call);
const BUY_PUT: LegRole = LegRole::new(Side::Buy, RoleKind::Put);
const SELL_PUT: LegRole = LegRole::new(Side::Sell, RoleKind::Put);
const BUY_COMBO: LegRole = LegRole::new(Side::Buy, RoleKind::Combo);
const SELL_COMBO: LegRole = LegRole::new(Side::Sell, RoleKind::Combo);

/// Collapse legs sharing (symbol, expiry, instrument type, direction).
/// Output is sorted by key.
pub fn group_legs<'a, I>(legs: I) -> Result<Vec<LegGroup>, EngineError>
where
    I: IntoIterator<Item = &'a Leg>,
{
    let mut buckets: BTreeMap<GroupKey, Vec<&Leg>> = BTreeMap::new();
    for leg in legs {
        let key = GroupKey {
            symbol: leg.symbol.clone(),
            expiry: leg.expiry.clone(),
            instrument_type: leg.instrument_type.clone(),
            direction: leg.direction,
        };
        buckets.entry(key).or_default().push(leg);
    }
    buckets
        .into_iter()
        .map(|(key, members)| {
            let quantity = members
                .iter()
                .try_fold(0i64, |acc, l| acc.checked_add(l.quantity))
                .ok_or_else(|| EngineError::QuantityOverflow {
                    symbol: key.symbol.clone(),
                    expiry: key.expiry.clone(),
                })?;
            Ok(LegGroup {
                trade_date: members.iter().filter_map(|l| l.trade_date).min(),
                strike: mean_present(members.iter().map(|l| l.strike)),
                quantity,
                price: mean_present(members.iter().map(|l| l.price)),
                leg_id: members
                    .iter()
                    .map(|l| l.leg_id.as_str())
                    .min()
                    .unwrap_or_default()
                    .to_string(),
                fills: members.len(),
                key,
            })
        })
        .collect()
}

/// Result of one expiry partition.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionOutcome {
    pub expiry: String,
    pub result: Result<Vec<PnlRecord>, EngineError>,
}

#[derive(Debug, Clone)]
pub struct Engine {
    costs: CostSchedule,
    parallel: bool,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(CostSchedule::default())
    }
}

impl Engine {
    pub fn new(costs: CostSchedule) -> Self {
        Self {
            costs,
            parallel: true,
        }
    }

    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Price every logical trade; the first failing partition (in expiry
    /// order) fails the batch.
    pub fn reconstruct(&self, legs: &[Leg]) -> Result<Vec<PnlRecord>, EngineError> {
        let mut out = Vec::new();
        for p in self.reconstruct_partitioned(legs) {
            out.extend(p.result?);
        }
        Ok(out)
    }

    /// Price each expiry independently. Sorted by expiry.
    pub fn reconstruct_partitioned(&self, legs: &[Leg]) -> Vec<PartitionOutcome> {
        let mut partitions: BTreeMap<&str, Vec<&Leg>> = BTreeMap::new();
        for leg in legs {
            partitions.entry(leg.expiry.as_str()).or_default().push(leg);
        }
        let partitions: Vec<(&str, Vec<&Leg>)> = partitions.into_iter().collect();

        let run = |(expiry, legs): &(&str, Vec<&Leg>)| PartitionOutcome {
            expiry: expiry.to_string(),
            result: self.price_partition(expiry, legs),
        };

        if self.parallel {
            partitions.par_iter().map(run).collect()
        } else {
            partitions.iter().map(run).collect()
        }
    }

    fn price_partition(&self, expiry: &str, legs: &[&Leg]) -> Result<Vec<PnlRecord>, EngineError> {
        let groups = group_legs(legs.iter().copied())?;
        let mut by_symbol: BTreeMap<&str, Vec<&LegGroup>> = BTreeMap::new();
        for g in &groups {
            by_symbol.entry(g.key.symbol.as_str()).or_default().push(g);
        }

        let mut out = Vec::new();
        for (symbol, groups) in by_symbol {
            let combos = groups
                .iter()
                .filter(|g| g.key.instrument_type == InstrumentType::Combo);
            for combo in combos {
                out.push(self.price_trade(combo, &groups)?);
            }
            debug!("{} {}: {} leg groups", expiry, symbol, groups.len());
        }
        Ok(out)
    }

    fn price_trade(&self, combo: &LegGroup, groups: &[&LegGroup]) -> Result<PnlRecord, EngineError> {
        let symbol = combo.key.symbol.as_str();
        let expiry = combo.key.expiry.as_str();
        let kind = match combo.side() {
            Some(Side::Sell) => TradeKind::Open,
            Some(Side::Buy) => TradeKind::Close,
            None => {
                warn!(
                    "{} {}: combo direction code {} is neither buy nor sell; treating as close",
                    symbol, expiry, combo.key.direction
                );
                TradeKind::Close
            }
        };
        let (call_role, put_role, combo_role) = match kind {
            TradeKind::Open => (BUY_CALL, SELL_PUT, SELL_COMBO),
            TradeKind::Close => (SELL_CALL, BUY_PUT, BUY_COMBO),
        };

        let call = find_role(groups, symbol, expiry, call_role)?;
        let put = find_role(groups, symbol, expiry, put_role)?;

        let missing = |role: LegRole, field: &'static str| EngineError::MissingValue {
            symbol: symbol.to_string(),
            expiry: expiry.to_string(),
            role,
            field,
        };
        let call_price = call.price.ok_or_else(|| missing(call_role, "price"))?;
        let strike = call.strike.ok_or_else(|| missing(call_role, "strike"))?;
        let put_price = put.price.ok_or_else(|| missing(put_role, "price"))?;
        let combo_price = combo.price.ok_or_else(|| missing(combo_role, "price"))?;

        let (parity, expense, net_quantity) = match kind {
            TradeKind::Open => (
                round2((call_price - put_price - combo_price).abs() - strike),
                self.costs.open.expense(call_price, put_price, combo_price),
                put.quantity,
            ),
            TradeKind::Close => (
                round2(-(-call_price + put_price + combo_price).abs() + strike),
                self.costs.close.expense(call_price, put_price, combo_price),
                put.quantity,
            ),
        };

        Ok(PnlRecord {
            date: call.trade_date,
            expiry: call.key.expiry.clone(),
            stock: symbol.to_string(),
            net_quantity,
            trade_kind: kind,
            parity,
            expense,
            pnl: (parity - expense) * net_quantity as f64,
        })
    }
}

fn find_role<'g>(
    groups: &[&'g LegGroup],
    symbol: &str,
    expiry: &str,
    role: LegRole,
) -> Result<&'g LegGroup, EngineError> {
    groups
        .iter()
        .copied()
        .find(|g| g.is(&role.instrument(), role.side))
        .ok_or_else(|| EngineError::IncompleteTrade {
            symbol: symbol.to_string(),
            expiry: expiry.to_string(),
            missing: role,
        })
}
