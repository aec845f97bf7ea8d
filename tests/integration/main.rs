//! End-to-end tests for the calendar arbitrage engine.
//!
//! Run with: cargo test --test integration

use calendar_arb::arbitrage::{
    ArbitrageEngine, ArbitragePattern, FinancingSource, PatternResult, PatternStatus,
};
use calendar_arb::calendar::HolidayCalendar;
use calendar_arb::config::Config;
use calendar_arb::grouping::RateSource;
use calendar_arb::records::{
    Currency, FeeBreakdown, RawFinancing, RawOperation, ScheduleFeeResolver,
};
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

type Engine = ArbitrageEngine<HolidayCalendar, ScheduleFeeResolver>;

/// Engine with a zero fee schedule so only supplied fees count.
fn fee_free_engine() -> Engine {
    let config = Config {
        commission_rate: Decimal::ZERO,
        market_rights_rate: Decimal::ZERO,
        financing_commission_rate: Decimal::ZERO,
        ..Config::default()
    };
    ArbitrageEngine::from_config(&config).unwrap()
}

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

fn leg(side: &str, venue: &str, quantity: Decimal, price: Decimal, fee: Decimal) -> RawOperation {
    RawOperation {
        instrument: "S31O5".to_string(),
        side: side.to_string(),
        venue: venue.to_string(),
        traded_at: "2025-10-03T14:30:00Z".parse().unwrap(),
        quantity,
        price,
        commission: Decimal::ZERO,
        currency: Some("ARS".to_string()),
        fees: Some(FeeBreakdown {
            commission: fee,
            ..FeeBreakdown::default()
        }),
    }
}

fn caucion(role: &str, principal: Decimal, rate: Decimal, tenor_days: u32, currency: &str) -> RawFinancing {
    RawFinancing {
        instrument: "PESOS".to_string(),
        principal,
        rate,
        tenor_days,
        currency: Some(currency.to_string()),
        role: role.to_string(),
        accrued_interest: None,
        fees: None,
    }
}

fn assert_close(actual: Decimal, expected: Decimal, tolerance: Decimal) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "expected {expected} +/- {tolerance}, got {actual}"
    );
}

fn pattern(results: &[PatternResult], pattern: ArbitragePattern) -> &PatternResult {
    results
        .iter()
        .find(|r| r.pattern == pattern)
        .expect("pattern present")
}

/// Friday trade: 130 immediate sells against two deferred buybacks, lent over the weekend.
fn friday_lend_then_buy_back() -> (Vec<RawOperation>, Vec<RawFinancing>) {
    let mut ops = Vec::new();
    for i in 0..130 {
        let fee = if i == 129 { dec!(13.33) } else { dec!(15.00) };
        ops.push(leg("venta", "CI", dec!(1146128), dec!(130.76), fee));
    }
    ops.push(leg("compra", "24hs", dec!(100000000), dec!(131.00), dec!(1318.64)));
    ops.push(leg("compra", "24hs", dec!(48996640), dec!(131.00), dec!(646.13)));

    let financing = vec![caucion("colocadora", dec!(195000000), dec!(34.5), 3, "ARS")];
    (ops, financing)
}

#[tokio::test]
async fn friday_calendar_trade_reconciles() {
    let (ops, financing) = friday_lend_then_buy_back();

    let run = fee_free_engine()
        .run(&ops, &financing, date("2025-10-03"), None)
        .await
        .unwrap();

    assert_eq!(run.grouped.tenor_days, 3);
    assert_eq!(run.report.results.len(), 1);

    let result = pattern(&run.report.results, ArbitragePattern::LendThenBuyBack);
    assert_eq!(result.status, PatternStatus::Complete);
    assert_eq!(result.financing_source, FinancingSource::Rate);
    assert_eq!(result.rate, Some(dec!(34.5)));
    assert_eq!(result.immediate.quantity, dec!(148996640));
    assert_eq!(result.deferred.quantity, dec!(148996640));
    assert_eq!(result.weighted_price, dec!(130.76));

    let cent = dec!(0.01);
    assert_close(result.matched_quantity, dec!(148860029.3888), cent);
    assert_close(result.trade_pnl, dec!(-361173.5827), cent);
    assert_close(result.principal, dec!(194649374.4287), cent);
    assert_close(result.base_amount, dec!(195006638.4993), cent);
    assert_close(result.financing_pnl, dec!(551950.9658), cent);
    assert_close(result.total_pnl, dec!(190777.3831), cent);
    assert_eq!(result.financing_fees, Decimal::ZERO);
    assert_eq!(result.total_pnl, result.trade_pnl + result.financing_pnl);
}

#[tokio::test]
async fn friday_trade_without_consolidation_matches() {
    let (ops, financing) = friday_lend_then_buy_back();

    let merged = fee_free_engine()
        .run(&ops, &financing, date("2025-10-03"), None)
        .await
        .unwrap();
    let separate = fee_free_engine()
        .with_consolidation(false)
        .run(&ops, &financing, date("2025-10-03"), None)
        .await
        .unwrap();

    let a = &merged.report.results[0];
    let b = &separate.report.results[0];
    assert_eq!(a.immediate.legs, 1);
    assert_eq!(b.immediate.legs, 130);
    assert_eq!(a.matched_quantity, b.matched_quantity);
    assert_close(a.total_pnl, b.total_pnl, dec!(0.000001));
}

#[tokio::test]
async fn one_sided_group_has_no_counterparty() {
    let ops = vec![leg("SELL", "CI", dec!(1000), dec!(99.5), dec!(1))];
    let financing = vec![caucion("lender", dec!(100000), dec!(30), 1, "ARS")];

    let run = fee_free_engine()
        .run(&ops, &financing, date("2025-10-01"), None)
        .await
        .unwrap();

    let result = pattern(&run.report.results, ArbitragePattern::LendThenBuyBack);
    assert_eq!(result.status, PatternStatus::NoCounterparty);
    assert_eq!(result.matched_quantity, Decimal::ZERO);
    assert_eq!(result.trade_pnl, Decimal::ZERO);
    assert_eq!(result.financing_pnl, Decimal::ZERO);
    assert_eq!(result.total_pnl, Decimal::ZERO);
    assert!(run
        .report
        .results
        .iter()
        .all(|r| r.pattern != ArbitragePattern::BorrowThenSellForward));
}

#[tokio::test]
async fn matched_group_without_financing_is_flagged() {
    let ops = vec![
        leg("BUY", "CI", dec!(1000), dec!(99.5), dec!(1)),
        leg("SELL", "24hs", dec!(1000), dec!(99.9), dec!(1)),
    ];

    let run = fee_free_engine()
        .run(&ops, &[], date("2025-10-01"), None)
        .await
        .unwrap();

    assert!(run.grouped.rates.is_empty());
    let group = run.grouped.groups.values().next().unwrap();
    assert_eq!(group.rate_source, RateSource::Unavailable);

    let result = pattern(&run.report.results, ArbitragePattern::BorrowThenSellForward);
    assert_eq!(result.status, PatternStatus::NoFinancing);
    assert_eq!(result.financing_source, FinancingSource::None);
    assert_eq!(result.financing_pnl, Decimal::ZERO);
    assert_eq!(result.trade_pnl, result.total_pnl);
    assert!(result.matched_quantity > Decimal::ZERO);
}

#[tokio::test]
async fn financing_sign_follows_role() {
    let ops = vec![
        leg("SELL", "CI", dec!(1000), dec!(100), dec!(0)),
        leg("BUY", "24hs", dec!(1000), dec!(100.1), dec!(0)),
        leg("BUY", "CI", dec!(500), dec!(100), dec!(0)),
        leg("SELL", "24hs", dec!(400), dec!(100.1), dec!(0)),
    ];
    let financing = vec![
        caucion("colocadora", dec!(1000), dec!(36.5), 1, "ARS"),
        caucion("tomadora", dec!(500), dec!(36.5), 1, "ARS"),
    ];

    let run = ArbitrageEngine::from_config(&Config::default())
        .unwrap()
        .run(&ops, &financing, date("2025-10-01"), None)
        .await
        .unwrap();

    let lend = pattern(&run.report.results, ArbitragePattern::LendThenBuyBack);
    let borrow = pattern(&run.report.results, ArbitragePattern::BorrowThenSellForward);

    assert_eq!(lend.status, PatternStatus::Complete);
    assert_eq!(borrow.status, PatternStatus::UnbalancedQuantities);
    assert!(lend.financing_pnl > Decimal::ZERO);
    assert!(borrow.financing_pnl < Decimal::ZERO);
    assert!(lend.financing_fees > Decimal::ZERO);
    assert!(borrow.financing_fees > Decimal::ZERO);
}

#[tokio::test]
async fn zero_rate_falls_back_to_recorded_interest() {
    let ops = vec![
        leg("SELL", "CI", dec!(1000), dec!(100), dec!(0)),
        leg("BUY", "24hs", dec!(1000), dec!(100), dec!(0)),
    ];
    let financing = vec![RawFinancing {
        accrued_interest: Some(dec!(40)),
        ..caucion("lender", dec!(2000), dec!(0), 1, "ARS")
    }];

    let run = fee_free_engine()
        .run(&ops, &financing, date("2025-10-01"), None)
        .await
        .unwrap();

    let result = pattern(&run.report.results, ArbitragePattern::LendThenBuyBack);
    assert_eq!(result.financing_source, FinancingSource::Transactions);
    assert_eq!(result.rate, None);
    // principal 1000 of 2000 financed
    assert_eq!(result.accrued_interest, dec!(20));
    assert_eq!(result.financing_pnl, dec!(20));
}

#[tokio::test]
async fn zero_principal_currency_averages_to_zero() {
    let mut usd_sell = leg("SELL", "CI", dec!(100), dec!(100), dec!(0));
    usd_sell.instrument = "AL30D".to_string();
    usd_sell.currency = Some("usd".to_string());
    let mut usd_buy = leg("BUY", "24hs", dec!(100), dec!(100.2), dec!(0));
    usd_buy.instrument = "AL30D".to_string();
    usd_buy.currency = Some("USD".to_string());

    let financing = vec![
        caucion("lender", dec!(0), dec!(4), 3, "usd"),
        caucion("lender", dec!(1000), dec!(30), 1, "ARS"),
        caucion("lender", dec!(3000), dec!(40), 1, "ARS"),
    ];

    let run = fee_free_engine()
        .run(&[usd_sell, usd_buy], &financing, date("2025-10-01"), None)
        .await
        .unwrap();

    assert_eq!(run.grouped.rates.get(&Currency::new("USD")), Some(Decimal::ZERO));
    assert_eq!(run.grouped.rates.get(&Currency::new("ARS")), Some(dec!(37.5)));

    let group = run.grouped.groups.values().next().unwrap();
    assert_eq!(group.currency, Currency::new("USD"));
    assert_eq!(group.rate_source, RateSource::DayAverage);
    assert_eq!(group.avg_tna, Some(Decimal::ZERO));

    // a zero average never prices the carry
    let result = pattern(&run.report.results, ArbitragePattern::LendThenBuyBack);
    assert_eq!(result.status, PatternStatus::NoFinancing);
}

#[tokio::test]
async fn unrecognized_rows_are_dropped() {
    let ops = vec![
        leg("SELL", "CI", dec!(1000), dec!(100), dec!(0)),
        leg("SELL", "48hs", dec!(1000), dec!(100), dec!(0)),
        leg("HOLD", "24hs", dec!(1000), dec!(100), dec!(0)),
    ];
    let financing = vec![caucion("broker", dec!(1000), dec!(30), 1, "ARS")];

    let run = fee_free_engine()
        .run(&ops, &financing, date("2025-10-01"), None)
        .await
        .unwrap();

    assert!(run.grouped.rates.is_empty());
    let result = pattern(&run.report.results, ArbitragePattern::LendThenBuyBack);
    assert_eq!(result.immediate.quantity, dec!(1000));
    assert_eq!(result.status, PatternStatus::NoCounterparty);
}

#[tokio::test]
async fn holidays_stretch_the_tenor() {
    let config = Config {
        market_holidays: vec!["2025-10-06".to_string()],
        ..Config::default()
    };
    let engine = ArbitrageEngine::from_config(&config).unwrap();

    let run = engine.run(&[], &[], date("2025-10-03"), None).await.unwrap();

    assert_eq!(run.grouped.tenor_days, 4);
    assert!(run.report.is_empty());
}

#[tokio::test]
async fn repeated_runs_are_identical() {
    let (ops, financing) = friday_lend_then_buy_back();
    let engine = fee_free_engine();

    let first = engine.run(&ops, &financing, date("2025-10-03"), None).await.unwrap();
    let second = engine.run(&ops, &financing, date("2025-10-03"), None).await.unwrap();
    let parallel = fee_free_engine()
        .with_parallelism(true)
        .run(&ops, &financing, date("2025-10-03"), None)
        .await
        .unwrap();

    assert_eq!(first.report, second.report);
    assert_eq!(first.report, parallel.report);
}

#[tokio::test]
async fn larger_buy_back_leaves_unbalanced_surplus() {
    let (mut ops, financing) = friday_lend_then_buy_back();
    ops.pop();
    ops.push(leg("compra", "24hs", dec!(50000000), dec!(131.00), dec!(646.13)));

    let run = fee_free_engine()
        .run(&ops, &financing, date("2025-10-03"), None)
        .await
        .unwrap();

    let result = pattern(&run.report.results, ArbitragePattern::LendThenBuyBack);
    assert_eq!(result.status, PatternStatus::UnbalancedQuantities);
    assert_eq!(result.immediate.quantity, dec!(148996640));
    assert_eq!(result.deferred.quantity, dec!(150000000));

    // the mean-price match stays below the full sell quantity
    let cent = dec!(0.01);
    assert_close(result.matched_quantity, dec!(148860029.3888), cent);
    assert!(result.matched_quantity < result.immediate.quantity);
    assert_close(result.trade_pnl, dec!(-361160.4523), cent);
    assert_close(result.financing_pnl, dec!(551950.9658), cent);
    assert_close(result.total_pnl, dec!(190790.5135), cent);
}

#[tokio::test]
async fn record_commission_reaches_trade_pnl() {
    let mut sell = leg("SELL", "CI", dec!(1000), dec!(100), dec!(0));
    let mut buy = leg("BUY", "24hs", dec!(1000), dec!(100), dec!(0));
    for op in [&mut sell, &mut buy] {
        op.commission = dec!(0.01);
        op.fees = None;
    }

    let run = fee_free_engine()
        .run(&[sell, buy], &[], date("2025-10-01"), None)
        .await
        .unwrap();

    let result = pattern(&run.report.results, ArbitragePattern::LendThenBuyBack);
    assert_eq!(result.immediate.weighted_commission, dec!(0.01));
    assert_eq!(result.deferred.weighted_commission, dec!(0.01));
    assert_eq!(result.trade_pnl, dec!(-20));
}

#[tokio::test]
async fn supplied_zero_financing_fees_are_kept() {
    let ops = vec![
        leg("SELL", "CI", dec!(1000), dec!(100), dec!(0)),
        leg("BUY", "24hs", dec!(1000), dec!(100), dec!(0)),
    ];
    let financing = vec![RawFinancing {
        fees: Some(FeeBreakdown::default()),
        ..caucion("lender", dec!(1000), dec!(36.5), 1, "ARS")
    }];

    let run = ArbitrageEngine::from_config(&Config::default())
        .unwrap()
        .run(&ops, &financing, date("2025-10-01"), None)
        .await
        .unwrap();

    let result = pattern(&run.report.results, ArbitragePattern::LendThenBuyBack);
    assert_eq!(result.financing_fees, Decimal::ZERO);
    assert_eq!(result.financing_pnl, dec!(1));
}
