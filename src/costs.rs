//! Transaction cost schedules per leg role.
//!
//! Each coefficient is a fraction of the leg's (mean) price. The defaults
//! are the brokerage and exchange rates the historical reports were
//! computed with.

use serde::{Deserialize, Serialize};

use crate::utils::round2;

/// Coefficients for the three legs of one trade direction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LegRates {
    pub call: f64,
    pub put: f64,
    pub combo: f64,
}

impl LegRates {
    /// Rounded expense for the given leg prices.
    pub fn expense(&self, call_price: f64, put_price: f64, combo_price: f64) -> f64 {
        round2(call_price * self.call + put_price * self.put + combo_price * self.combo)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(from = "ScheduleOverride")]
pub struct CostSchedule {
    /// Buy call, sell put, sell combo.
    pub open: LegRates,
    /// Sell call, buy put, buy combo.
    pub close: LegRates,
}

impl Default for CostSchedule {
    fn default() -> Self {
        Self {
            open: LegRates {
                call: 0.00055,
                put: 0.001625,
                combo: 0.00028118,
            },
            close: LegRates {
                call: 0.001625,
                put: 0.00055,
                combo: 0.00005618,
            },
        }
    }
}

// Config may override single rates; the rest keep their defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RatesOverride {
    call: Option<f64>,
    put: Option<f64>,
    combo: Option<f64>,
}

impl RatesOverride {
    fn apply(self, base: LegRates) -> LegRates {
        LegRates {
            call: self.call.unwrap_or(base.call),
            put: self.put.unwrap_or(base.put),
            combo: self.combo.unwrap_or(base.combo),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ScheduleOverride {
    open: RatesOverride,
    close: RatesOverride,
}

impl From<ScheduleOverride> for CostSchedule {
    fn from(o: ScheduleOverride) -> Self {
        let d = CostSchedule::default();
        CostSchedule {
            open: o.open.apply(d.open),
            close: o.close.apply(d.close),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_expense_matches_reference_rates() {
        let s = CostSchedule::default();
        // 10*0.00055 + 8*0.001625 + 3.5*0.00028118 = 0.0195...
        assert_eq!(s.open.expense(10.0, 8.0, 3.5), 0.02);
        // 1000*0.00055 + 800*0.001625 + 350*0.00028118 = 1.948413
        assert_eq!(s.open.expense(1000.0, 800.0, 350.0), 1.95);
    }

    #[test]
    fn close_expense_matches_reference_rates() {
        let s = CostSchedule::default();
        // 1000*0.001625 + 800*0.00055 + 350*0.00005618 = 2.084663
        assert_eq!(s.close.expense(1000.0, 800.0, 350.0), 2.08);
    }

    #[test]
    fn override_keeps_other_rates() {
        let s: CostSchedule = serde_yaml::from_str("close:\n  put: 0.001\n").unwrap();
        assert_eq!(s.close.put, 0.001);
        assert_eq!(s.close.call, 0.001625);
        assert_eq!(s.open, CostSchedule::default().open);
    }
}
