//! Per-group pattern evaluation.

use std::collections::BTreeMap;

use rayon::prelude::*;
use rust_decimal::Decimal;
use serde::Serialize;
use smallvec::SmallVec;
use tracing::{debug, instrument};

use super::calculator::{
    financing_pnl, matched_quantity, safe_div, trade_pnl, FinancingOutcome, FinancingTerms, LegSummary,
};
use super::pattern::{ArbitragePattern, FinancingSource, PatternStatus};
use crate::grouping::{GroupKey, GroupedDay, InstrumentTenorGroup};
use crate::metrics;
use crate::records::{Currency, FinancingTransaction, Operation, Side};

/// Results of one group; at most one per pattern.
pub type GroupResults = SmallVec<[PatternResult; 2]>;

/// Outcome of one pattern for one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatternResult {
    /// Pattern evaluated.
    pub pattern: ArbitragePattern,
    /// Instrument ticker.
    pub instrument: String,
    /// Tenor in days.
    pub tenor_days: u32,
    /// Group currency.
    pub currency: Currency,
    /// Quantity paired between the two legs.
    pub matched_quantity: Decimal,
    /// Weighted price of the immediate leg.
    pub weighted_price: Decimal,
    /// Immediate leg aggregates.
    pub immediate: LegSummary,
    /// Deferred leg aggregates.
    pub deferred: LegSummary,
    /// Price differential net of commissions.
    pub trade_pnl: Decimal,
    /// Signed carry of the financing leg.
    pub financing_pnl: Decimal,
    /// Trade plus financing.
    pub total_pnl: Decimal,
    /// Result classification.
    pub status: PatternStatus,
    /// How the financing leg was priced.
    pub financing_source: FinancingSource,
    /// TNA applied, if priced from a rate.
    pub rate: Option<Decimal>,
    /// Principal financed over the tenor.
    pub principal: Decimal,
    /// Amount settled by the deferred leg on the matched quantity.
    pub base_amount: Decimal,
    /// Gross interest of the financing leg (unsigned).
    pub accrued_interest: Decimal,
    /// Financing fees attributed to the position.
    pub financing_fees: Decimal,
    /// Legs on both sides.
    pub operations: Vec<Operation>,
    /// Financing transactions taken in the pattern's role.
    pub financing: Vec<FinancingTransaction>,
}

impl PatternResult {
    /// Deterministic display order: instrument, tenor, pattern.
    pub fn sort_key(&self) -> (&str, u32, ArbitragePattern) {
        (&self.instrument, self.tenor_days, self.pattern)
    }
}

/// Evaluates arbitrage patterns over grouped legs.
#[derive(Debug, Clone, Copy)]
pub struct PatternMatcher {
    quote_base: Decimal,
    day_count_basis: u32,
}

impl Default for PatternMatcher {
    fn default() -> Self {
        Self {
            quote_base: Decimal::ONE_HUNDRED,
            day_count_basis: 365,
        }
    }
}

impl PatternMatcher {
    /// Create a matcher for a quote base and day-count basis.
    pub fn new(quote_base: Decimal, day_count_basis: u32) -> Self {
        Self {
            quote_base,
            day_count_basis,
        }
    }

    /// Evaluate one pattern; `None` when both of its legs are empty.
    pub fn evaluate_pattern(
        &self,
        group: &InstrumentTenorGroup,
        pattern: ArbitragePattern,
    ) -> Option<PatternResult> {
        let (immediate_ops, deferred_ops) = pattern.legs(&group.buckets);
        if immediate_ops.is_empty() && deferred_ops.is_empty() {
            return None;
        }

        let immediate = LegSummary::from_operations(immediate_ops, self.quote_base);
        let deferred = LegSummary::from_operations(deferred_ops, self.quote_base);
        let role = pattern.financing_role();
        let role_financing: Vec<FinancingTransaction> = group
            .financing
            .iter()
            .filter(|tx| tx.role == role)
            .cloned()
            .collect();
        let operations: Vec<Operation> = immediate_ops.iter().chain(deferred_ops).cloned().collect();

        let matched = matched_quantity(&immediate, &deferred);
        if matched.is_zero() {
            return Some(PatternResult {
                pattern,
                instrument: group.instrument().to_string(),
                tenor_days: group.tenor_days(),
                currency: group.currency.clone(),
                matched_quantity: Decimal::ZERO,
                weighted_price: immediate.weighted_price,
                immediate,
                deferred,
                trade_pnl: Decimal::ZERO,
                financing_pnl: Decimal::ZERO,
                total_pnl: Decimal::ZERO,
                status: PatternStatus::NoCounterparty,
                financing_source: FinancingSource::None,
                rate: None,
                principal: Decimal::ZERO,
                base_amount: Decimal::ZERO,
                accrued_interest: Decimal::ZERO,
                financing_fees: Decimal::ZERO,
                operations,
                financing: role_financing,
            });
        }

        let (sell, buy) = match pattern.immediate_side() {
            Side::Sell => (&immediate, &deferred),
            Side::Buy => (&deferred, &immediate),
        };
        let trade = trade_pnl(sell, buy, matched, self.quote_base);

        let principal = safe_div(immediate.weighted_price * matched, self.quote_base);
        let base_amount = safe_div(deferred.weighted_price * matched, self.quote_base);
        let financing: FinancingOutcome = financing_pnl(&FinancingTerms {
            role,
            principal,
            rate: group.avg_tna,
            tenor_days: group.tenor_days(),
            day_count_basis: self.day_count_basis,
            transactions: &role_financing,
        });

        let status = if financing.source == FinancingSource::None {
            PatternStatus::NoFinancing
        } else if immediate.quantity == deferred.quantity {
            PatternStatus::Complete
        } else {
            PatternStatus::UnbalancedQuantities
        };
        if financing.source == FinancingSource::Transactions {
            metrics::inc_financing_fallbacks();
        }

        debug!(
            group = %group.key,
            pattern = %pattern,
            matched = %matched,
            trade_pnl = %trade,
            financing_pnl = %financing.pnl,
            status = %status,
            "Pattern evaluated"
        );

        Some(PatternResult {
            pattern,
            instrument: group.instrument().to_string(),
            tenor_days: group.tenor_days(),
            currency: group.currency.clone(),
            matched_quantity: matched,
            weighted_price: immediate.weighted_price,
            immediate,
            deferred,
            trade_pnl: trade,
            financing_pnl: financing.pnl,
            total_pnl: trade + financing.pnl,
            status,
            financing_source: financing.source,
            rate: financing.rate,
            principal: financing.principal,
            base_amount,
            accrued_interest: financing.accrued_interest,
            financing_fees: financing.fees,
            operations,
            financing: role_financing,
        })
    }

    /// Evaluate every pattern of a group, in pattern order.
    pub fn evaluate_group(&self, group: &InstrumentTenorGroup) -> GroupResults {
        let results: GroupResults = ArbitragePattern::ALL
            .iter()
            .filter_map(|pattern| self.evaluate_pattern(group, *pattern))
            .collect();
        for result in &results {
            metrics::inc_pattern_results(result.status);
        }
        results
    }

    /// Evaluate every group sequentially.
    #[instrument(skip_all, fields(groups = day.groups.len()))]
    pub fn evaluate_all(&self, day: &GroupedDay) -> BTreeMap<GroupKey, GroupResults> {
        let _timer = metrics::timer_evaluation();
        day.groups
            .iter()
            .map(|(key, group)| (key.clone(), self.evaluate_group(group)))
            .collect()
    }

    /// Evaluate every group on the rayon pool.
    ///
    /// Groups share no state; the map restores key order afterwards.
    #[instrument(skip_all, fields(groups = day.groups.len()))]
    pub fn evaluate_all_parallel(&self, day: &GroupedDay) -> BTreeMap<GroupKey, GroupResults> {
        let _timer = metrics::timer_evaluation();
        let groups: Vec<(&GroupKey, &InstrumentTenorGroup)> = day.groups.iter().collect();
        groups
            .into_par_iter()
            .map(|(key, group)| (key.clone(), self.evaluate_group(group)))
            .collect::<Vec<_>>()
            .into_iter()
            .collect()
    }
}
