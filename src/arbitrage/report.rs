//! Flattened, ordered day report ready for display.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use super::matcher::{GroupResults, PatternResult};
use super::pattern::{ArbitragePattern, PatternStatus};
use crate::grouping::{FinancingRates, GroupKey};

/// P&L totals over a set of results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PnlTotals {
    /// Σ trade P&L.
    pub trade_pnl: Decimal,
    /// Σ financing P&L.
    pub financing_pnl: Decimal,
    /// Σ total P&L.
    pub total_pnl: Decimal,
    /// Σ matched quantity.
    pub matched_quantity: Decimal,
}

impl PnlTotals {
    fn add(&mut self, result: &PatternResult) {
        self.trade_pnl += result.trade_pnl;
        self.financing_pnl += result.financing_pnl;
        self.total_pnl += result.total_pnl;
        self.matched_quantity += result.matched_quantity;
    }
}

/// Every pattern result of a trading day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArbitrageReport {
    /// Trading day.
    pub trading_day: NaiveDate,
    /// Tenor of the day.
    pub tenor_days: u32,
    /// Day-level average TNA per currency.
    pub rates: FinancingRates,
    /// Results sorted by instrument, tenor, pattern.
    pub results: Vec<PatternResult>,
    /// Totals over every result.
    pub totals: PnlTotals,
    /// Totals per pattern.
    pub by_pattern: BTreeMap<ArbitragePattern, PnlTotals>,
    /// Result count per status.
    pub status_counts: BTreeMap<PatternStatus, usize>,
}

impl ArbitrageReport {
    /// Flatten per-group results into a sorted report.
    pub fn new(
        trading_day: NaiveDate,
        tenor_days: u32,
        rates: FinancingRates,
        grouped: &BTreeMap<GroupKey, GroupResults>,
    ) -> Self {
        let mut results: Vec<PatternResult> = grouped.values().flatten().cloned().collect();
        results.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

        let mut totals = PnlTotals::default();
        let mut by_pattern: BTreeMap<ArbitragePattern, PnlTotals> = BTreeMap::new();
        let mut status_counts: BTreeMap<PatternStatus, usize> = BTreeMap::new();
        for result in &results {
            totals.add(result);
            by_pattern.entry(result.pattern).or_default().add(result);
            *status_counts.entry(result.status).or_default() += 1;
        }

        Self {
            trading_day,
            tenor_days,
            rates,
            results,
            totals,
            by_pattern,
            status_counts,
        }
    }

    /// Results for one instrument.
    pub fn for_instrument<'a>(&'a self, instrument: &'a str) -> impl Iterator<Item = &'a PatternResult> + 'a {
        self.results.iter().filter(move |r| r.instrument == instrument)
    }

    /// Whether any result was produced.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}
