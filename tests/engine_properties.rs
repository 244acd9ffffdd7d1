//! Property tests for grouping, partitioning and the pricing formulas.

use chrono::NaiveDate;
use combo_pnl::utils::round2;
use combo_pnl::{group_legs, Engine, EngineError, InstrumentType, Leg, Side, TradeKind};
use proptest::prelude::*;

fn leg(
    symbol: &str,
    expiry: &str,
    itype: InstrumentType,
    side: Side,
    qty: i64,
    price: Option<f64>,
    strike: Option<f64>,
) -> Leg {
    Leg {
        row: 0,
        symbol: symbol.into(),
        contract_type: "OPTSTK".into(),
        expiry: expiry.into(),
        strike,
        instrument_type: itype,
        instrument_name: String::new(),
        leg_id: "L".into(),
        direction: side.code(),
        quantity: qty,
        price,
        secondary_id: String::new(),
        order_time: String::new(),
        exchange_time: String::new(),
        trade_date: NaiveDate::from_ymd_opt(2024, 3, 1),
    }
}

fn price() -> impl Strategy<Value = f64> {
    (0u32..500_000).prop_map(|c| c as f64 / 100.0)
}

fn strike() -> impl Strategy<Value = f64> {
    (1u32..400).prop_map(|s| s as f64 * 50.0)
}

proptest! {
    #[test]
    fn group_sums_quantity_and_averages_present(
        fills in prop::collection::vec((0i64..1_000, prop::option::of(price()), prop::option::of(strike())), 1..20)
    ) {
        let legs: Vec<Leg> = fills
            .iter()
            .map(|(q, p, k)| leg("TCS", "E", InstrumentType::Put, Side::Sell, *q, *p, *k))
            .collect();
        let groups = group_legs(&legs).unwrap();
        prop_assert_eq!(groups.len(), 1);
        let g = &groups[0];

        prop_assert_eq!(g.quantity, fills.iter().map(|f| f.0).sum::<i64>());

        let prices: Vec<f64> = fills.iter().filter_map(|f| f.1).collect();
        match g.price {
            None => prop_assert!(prices.is_empty()),
            Some(p) => {
                let mean = prices.iter().sum::<f64>() / prices.len() as f64;
                prop_assert!((p - mean).abs() < 1e-9);
            }
        }
        let strikes: Vec<f64> = fills.iter().filter_map(|f| f.2).collect();
        match g.strike {
            None => prop_assert!(strikes.is_empty()),
            Some(k) => {
                let mean = strikes.iter().sum::<f64>() / strikes.len() as f64;
                prop_assert!((k - mean).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn open_formula_holds(c in price(), q in price(), p in price(), k in strike(), n in 1i64..500) {
        let legs = vec![
            leg("TCS", "E", InstrumentType::Combo, Side::Sell, n, Some(p), None),
            leg("TCS", "E", InstrumentType::Call, Side::Buy, 1, Some(c), Some(k)),
            leg("TCS", "E", InstrumentType::Put, Side::Sell, n, Some(q), Some(k)),
        ];
        let recs = Engine::default().reconstruct(&legs).unwrap();
        prop_assert_eq!(recs.len(), 1);
        let r = &recs[0];
        let parity = round2((c - q - p).abs() - k);
        let expense = round2(c * 0.00055 + q * 0.001625 + p * 0.00028118);
        prop_assert_eq!(r.trade_kind, TradeKind::Open);
        prop_assert_eq!(r.parity, parity);
        prop_assert_eq!(r.expense, expense);
        prop_assert_eq!(r.net_quantity, n);
        prop_assert_eq!(r.pnl, (parity - expense) * n as f64);
    }

    #[test]
    fn close_formula_holds(c in price(), q in price(), p in price(), k in strike(), n in 1i64..500) {
        let legs = vec![
            leg("TCS", "E", InstrumentType::Combo, Side::Buy, n, Some(p), None),
            leg("TCS", "E", InstrumentType::Call, Side::Sell, 1, Some(c), Some(k)),
            leg("TCS", "E", InstrumentType::Put, Side::Buy, n, Some(q), Some(k)),
        ];
        let r = &Engine::default().reconstruct(&legs).unwrap()[0];
        let parity = round2(-(-c + q + p).abs() + k);
        let expense = round2(c * 0.001625 + q * 0.00055 + p * 0.00005618);
        prop_assert_eq!(r.trade_kind, TradeKind::Close);
        prop_assert_eq!(r.parity, parity);
        prop_assert_eq!(r.expense, expense);
        prop_assert_eq!(r.pnl, (parity - expense) * n as f64);
    }

    #[test]
    fn other_expiries_do_not_leak(
        noise in prop::collection::vec((0usize..3, 0usize..2, 0i64..100, prop::option::of(price())), 0..30)
    ) {
        let base = vec![
            leg("TCS", "A", InstrumentType::Combo, Side::Sell, 10, Some(3.5), None),
            leg("TCS", "A", InstrumentType::Call, Side::Buy, 1, Some(10.0), Some(4000.0)),
            leg("TCS", "A", InstrumentType::Put, Side::Sell, 10, Some(8.0), Some(4000.0)),
        ];
        let types = [InstrumentType::Call, InstrumentType::Put, InstrumentType::Combo];
        let sides = [Side::Buy, Side::Sell];
        let mut mixed = base.clone();
        for (t, s, qty, px) in &noise {
            mixed.push(leg("TCS", "B", types[*t].clone(), sides[*s], *qty, *px, Some(4000.0)));
        }

        let engine = Engine::default();
        let alone = engine.reconstruct_partitioned(&base);
        let together = engine.reconstruct_partitioned(&mixed);
        let a = together.iter().find(|o| o.expiry == "A").unwrap();
        prop_assert_eq!(&alone[0], a);
    }
}

#[test]
fn missing_call_names_symbol_expiry_role() {
    let legs = vec![
        leg("INFY", "28MAR2024", InstrumentType::Combo, Side::Sell, 10, Some(1.0), None),
        leg("INFY", "28MAR2024", InstrumentType::Put, Side::Sell, 10, Some(1.0), Some(1500.0)),
    ];
    match Engine::default().reconstruct(&legs) {
        Err(EngineError::IncompleteTrade { symbol, expiry, missing }) => {
            assert_eq!(symbol, "INFY");
            assert_eq!(expiry, "28MAR2024");
            assert_eq!(missing.side, Side::Buy);
            assert_eq!(missing.instrument(), InstrumentType::Call);
        }
        other => panic!("expected IncompleteTrade, got {other:?}"),
    }
}
