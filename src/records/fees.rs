//! Fee resolution and enrichment.
//!
//! The engine never computes fees itself. A [`FeeResolver`] prices every
//! record before grouping starts; enrichment is the only async step and is
//! awaited to completion before any matching happens.

use std::future::Future;

use futures::future::try_join_all;
use rust_decimal::Decimal;
use tracing::{debug, instrument};

use super::types::{FeeBreakdown, FinancingRole, FinancingTransaction, Operation, Side};
use crate::error::FeeError;

/// Upstream fee/commission resolver.
pub trait FeeResolver: Send + Sync {
    /// Fees for a trade leg.
    fn operation_fees(
        &self,
        operation: &Operation,
    ) -> impl Future<Output = Result<FeeBreakdown, FeeError>> + Send;

    /// Fees for a financing transaction.
    fn financing_fees(
        &self,
        transaction: &FinancingTransaction,
    ) -> impl Future<Output = Result<FeeBreakdown, FeeError>> + Send;
}

/// Rate-schedule resolver. Every rate is a fraction (0.001 = 0.1%).
#[derive(Debug, Clone)]
pub struct ScheduleFeeResolver {
    /// Broker commission on traded notional.
    pub commission_rate: Decimal,
    /// Market rights on traded notional or financed principal.
    pub market_rights_rate: Decimal,
    /// Annualized guarantee expense on financed principal.
    pub guarantee_rate: Decimal,
    /// Annualized broker commission on financed principal.
    pub financing_commission_rate: Decimal,
    /// Tax applied over every expense.
    pub expenses_tax_rate: Decimal,
    /// Units of nominal per quoted price.
    pub quote_base: Decimal,
    /// Day-count denominator.
    pub day_count_basis: u32,
}

impl ScheduleFeeResolver {
    /// Price a trade leg.
    pub fn price_operation(&self, operation: &Operation) -> FeeBreakdown {
        let notional = if self.quote_base.is_zero() {
            Decimal::ZERO
        } else {
            operation.gross_value() / self.quote_base
        };

        let commission = notional * self.commission_rate;
        let market_rights = notional * self.market_rights_rate;
        let tax_on_expenses = (commission + market_rights) * self.expenses_tax_rate;
        let total = commission + market_rights + tax_on_expenses;

        let net_settlement = match operation.side {
            Side::Buy => notional + total,
            Side::Sell => notional - total,
        };

        FeeBreakdown {
            commission,
            market_rights,
            guarantee_expense: Decimal::ZERO,
            tax_on_expenses,
            net_settlement,
        }
    }

    /// Price a financing transaction.
    pub fn price_financing(&self, transaction: &FinancingTransaction) -> FeeBreakdown {
        let days = Decimal::from(transaction.tenor_days);
        let basis = Decimal::from(self.day_count_basis);
        let principal = transaction.principal;
        let accrue = |rate: Decimal| {
            if basis.is_zero() {
                Decimal::ZERO
            } else {
                principal * rate * days / basis
            }
        };

        let commission = accrue(self.financing_commission_rate);
        let market_rights = accrue(self.market_rights_rate);
        let guarantee_expense = accrue(self.guarantee_rate);
        let tax_on_expenses = (commission + market_rights + guarantee_expense) * self.expenses_tax_rate;
        let total = commission + market_rights + guarantee_expense + tax_on_expenses;

        let gross = principal + transaction.accrued_interest;
        let net_settlement = match transaction.role {
            FinancingRole::Lender => gross - total,
            FinancingRole::Borrower => gross + total,
        };

        FeeBreakdown {
            commission,
            market_rights,
            guarantee_expense,
            tax_on_expenses,
            net_settlement,
        }
    }
}

impl FeeResolver for ScheduleFeeResolver {
    fn operation_fees(
        &self,
        operation: &Operation,
    ) -> impl Future<Output = Result<FeeBreakdown, FeeError>> + Send {
        let fees = self.price_operation(operation);
        async move { Ok(fees) }
    }

    fn financing_fees(
        &self,
        transaction: &FinancingTransaction,
    ) -> impl Future<Output = Result<FeeBreakdown, FeeError>> + Send {
        let fees = self.price_financing(transaction);
        async move { Ok(fees) }
    }
}

/// Attach fees to every operation that lacks them.
///
/// Fees priced by the resolver are added to the record's per-unit
/// commission. A breakdown carried by the record already covers every
/// expense of the leg, so it replaces the per-unit commission instead.
#[instrument(skip_all, fields(count = operations.len()))]
pub async fn enrich_operations<R: FeeResolver>(
    resolver: &R,
    operations: Vec<Operation>,
) -> Result<Vec<Operation>, FeeError> {
    let enriched = try_join_all(operations.into_iter().map(|mut op| async move {
        if op.quantity.is_zero() {
            return Ok::<_, FeeError>(op);
        }
        match op.fees.take() {
            Some(fees) => {
                let per_unit = fees.total() / op.quantity;
                if !op.commission.is_zero() && op.commission != per_unit {
                    debug!(
                        instrument = %op.instrument,
                        commission = %op.commission,
                        per_unit = %per_unit,
                        "Record commission replaced by supplied fee breakdown"
                    );
                }
                op.commission = per_unit;
                op.fees = Some(fees);
            }
            None => {
                let fees = resolver.operation_fees(&op).await?;
                op.commission += fees.total() / op.quantity;
                op.fees = Some(fees);
            }
        }
        Ok(op)
    }))
    .await?;

    debug!(count = enriched.len(), "Operations enriched");
    Ok(enriched)
}

/// Attach fees to financing transactions that carry none.
///
/// A supplied breakdown is kept as is, including an all-zero one.
#[instrument(skip_all, fields(count = transactions.len()))]
pub async fn enrich_financing<R: FeeResolver>(
    resolver: &R,
    transactions: Vec<FinancingTransaction>,
) -> Result<Vec<FinancingTransaction>, FeeError> {
    try_join_all(transactions.into_iter().map(|mut tx| async move {
        if tx.fees.is_none() {
            tx.fees = Some(resolver.financing_fees(&tx).await?);
        }
        Ok::<_, FeeError>(tx)
    }))
    .await
}
