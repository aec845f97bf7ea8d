//! Partitioning of trade legs by instrument, venue and side.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::metrics;
use crate::records::{
    Currency, FinancingTransaction, Operation, RawFinancing, RawOperation, SettlementVenue, Side,
};

/// The four role-tagged buckets of one instrument.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OperationBuckets {
    /// Sold for immediate settlement.
    pub sell_immediate: Vec<Operation>,
    /// Bought for deferred settlement.
    pub buy_deferred: Vec<Operation>,
    /// Bought for immediate settlement.
    pub buy_immediate: Vec<Operation>,
    /// Sold for deferred settlement.
    pub sell_deferred: Vec<Operation>,
}

impl OperationBuckets {
    /// Bucket for a (side, venue) pair.
    pub fn bucket(&self, side: Side, venue: SettlementVenue) -> &[Operation] {
        match (side, venue) {
            (Side::Sell, SettlementVenue::Immediate) => &self.sell_immediate,
            (Side::Buy, SettlementVenue::Deferred) => &self.buy_deferred,
            (Side::Buy, SettlementVenue::Immediate) => &self.buy_immediate,
            (Side::Sell, SettlementVenue::Deferred) => &self.sell_deferred,
        }
    }

    fn bucket_mut(&mut self, side: Side, venue: SettlementVenue) -> &mut Vec<Operation> {
        match (side, venue) {
            (Side::Sell, SettlementVenue::Immediate) => &mut self.sell_immediate,
            (Side::Buy, SettlementVenue::Deferred) => &mut self.buy_deferred,
            (Side::Buy, SettlementVenue::Immediate) => &mut self.buy_immediate,
            (Side::Sell, SettlementVenue::Deferred) => &mut self.sell_deferred,
        }
    }

    /// Append an operation to its bucket.
    pub fn push(&mut self, operation: Operation) {
        self.bucket_mut(operation.side, operation.venue).push(operation);
    }

    /// Total number of legs across every bucket.
    pub fn len(&self) -> usize {
        self.sell_immediate.len()
            + self.buy_deferred.len()
            + self.buy_immediate.len()
            + self.sell_deferred.len()
    }

    /// Whether every bucket is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over every leg, bucket by bucket.
    pub fn iter(&self) -> impl Iterator<Item = &Operation> {
        self.sell_immediate
            .iter()
            .chain(&self.buy_deferred)
            .chain(&self.buy_immediate)
            .chain(&self.sell_deferred)
    }
}

/// Operations partitioned per instrument.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifiedOperations {
    /// Buckets keyed by instrument ticker.
    pub by_instrument: BTreeMap<String, OperationBuckets>,
}

impl ClassifiedOperations {
    /// Number of distinct instruments.
    pub fn instrument_count(&self) -> usize {
        self.by_instrument.len()
    }

    /// Buckets of one instrument.
    pub fn get(&self, instrument: &str) -> Option<&OperationBuckets> {
        self.by_instrument.get(instrument)
    }
}

/// Partition operations by (instrument, venue, side).
#[instrument(skip_all)]
pub fn classify(operations: impl IntoIterator<Item = Operation>) -> ClassifiedOperations {
    let mut classified = ClassifiedOperations::default();
    for op in operations {
        classified
            .by_instrument
            .entry(op.instrument.clone())
            .or_default()
            .push(op);
    }
    debug!(instruments = classified.instrument_count(), "Operations classified");
    classified
}

/// Resolve raw rows, silently dropping any with an unrecognized venue or side.
pub fn admit_operations(raw: &[RawOperation], default_currency: &Currency) -> Vec<Operation> {
    raw.iter()
        .filter_map(|row| match row.to_operation(default_currency) {
            Ok(op) => Some(op),
            Err(e) => {
                debug!(instrument = %row.instrument, error = %e, "Operation dropped");
                metrics::inc_records_dropped("operation");
                None
            }
        })
        .collect()
}

/// Resolve raw financing rows, dropping any with an unrecognized role.
pub fn admit_financing(
    raw: &[RawFinancing],
    default_currency: &Currency,
    day_count_basis: u32,
) -> Vec<FinancingTransaction> {
    raw.iter()
        .filter_map(|row| match row.to_transaction(default_currency, day_count_basis) {
            Ok(tx) => Some(tx),
            Err(e) => {
                debug!(instrument = %row.instrument, error = %e, "Financing dropped");
                metrics::inc_records_dropped("financing");
                None
            }
        })
        .collect()
}

/// Merge legs sharing instrument, venue, side, currency and price.
///
/// Quantities are summed and per-unit commission is quantity-weighted. The
/// earliest timestamp is kept. Fee breakdowns are summed component-wise.
pub fn consolidate(operations: Vec<Operation>) -> Vec<Operation> {
    let mut merged: BTreeMap<(String, bool, bool, Currency, Decimal), Operation> = BTreeMap::new();

    for op in operations {
        let key = (
            op.instrument.clone(),
            op.side == Side::Buy,
            op.venue == SettlementVenue::Immediate,
            op.currency.clone(),
            op.price.normalize(),
        );
        match merged.get_mut(&key) {
            Some(existing) => {
                let commission = existing.total_commission() + op.total_commission();
                existing.quantity += op.quantity;
                existing.commission = if existing.quantity.is_zero() {
                    Decimal::ZERO
                } else {
                    commission / existing.quantity
                };
                existing.traded_at = existing.traded_at.min(op.traded_at);
                existing.fees = match (existing.fees.take(), op.fees) {
                    (Some(mut a), Some(b)) => {
                        a.commission += b.commission;
                        a.market_rights += b.market_rights;
                        a.guarantee_expense += b.guarantee_expense;
                        a.tax_on_expenses += b.tax_on_expenses;
                        a.net_settlement += b.net_settlement;
                        Some(a)
                    }
                    (a, b) => a.or(b),
                };
            }
            None => {
                merged.insert(key, op);
            }
        }
    }

    merged.into_values().collect()
}
