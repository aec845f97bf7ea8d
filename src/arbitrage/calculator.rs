//! Matched quantity, trade P&L and financing P&L calculations.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::pattern::FinancingSource;
use crate::records::{FinancingRole, FinancingTransaction, Operation};

/// Aggregates of one side of a pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegSummary {
    /// Number of legs.
    pub legs: usize,
    /// Σ quantity.
    pub quantity: Decimal,
    /// Σ quantity × price.
    pub gross_value: Decimal,
    /// Gross value over the quote base.
    pub notional: Decimal,
    /// Quantity-weighted price.
    pub weighted_price: Decimal,
    /// Σ commission over every leg.
    pub total_commission: Decimal,
    /// Quantity-weighted per-unit commission.
    pub weighted_commission: Decimal,
}

impl LegSummary {
    /// Summarize a set of legs.
    pub fn from_operations(operations: &[Operation], quote_base: Decimal) -> Self {
        let mut summary = LegSummary {
            legs: operations.len(),
            ..LegSummary::default()
        };

        for op in operations {
            summary.quantity += op.quantity;
            summary.gross_value += op.gross_value();
            summary.total_commission += op.total_commission();
        }

        summary.notional = safe_div(summary.gross_value, quote_base);
        summary.weighted_price = safe_div(summary.gross_value, summary.quantity);
        summary.weighted_commission = safe_div(summary.total_commission, summary.quantity);

        debug_assert!(summary.quantity >= Decimal::ZERO, "negative leg quantity");
        summary
    }

    /// Whether there is nothing on this side.
    pub fn is_empty(&self) -> bool {
        self.quantity.is_zero()
    }
}

/// Division resolving to zero when the divisor is zero.
pub fn safe_div(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator.is_zero() {
        Decimal::ZERO
    } else {
        numerator / denominator
    }
}

/// Quantity both sides can be paired on.
///
/// Sized from the smaller notional over the mean of the two weighted
/// prices, so surplus quantity on one side never inflates the match.
pub fn matched_quantity(a: &LegSummary, b: &LegSummary) -> Decimal {
    if a.is_empty() || b.is_empty() {
        return Decimal::ZERO;
    }
    let mean_price = (a.weighted_price + b.weighted_price) / Decimal::TWO;
    let matched = safe_div(a.gross_value.min(b.gross_value), mean_price);
    debug_assert!(matched >= Decimal::ZERO, "negative matched quantity");
    matched.max(Decimal::ZERO)
}

/// Price differential on the matched quantity net of both sides' commissions.
pub fn trade_pnl(sell: &LegSummary, buy: &LegSummary, matched: Decimal, quote_base: Decimal) -> Decimal {
    let differential = sell.weighted_price - buy.weighted_price;
    let gross = safe_div(differential * matched, quote_base);
    let commissions = (sell.weighted_commission + buy.weighted_commission) * matched;
    gross - commissions
}

/// Financing leg of a matched position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancingOutcome {
    /// Signed financing P&L.
    pub pnl: Decimal,
    /// Principal the interest accrues on.
    pub principal: Decimal,
    /// Gross interest before fees (unsigned).
    pub accrued_interest: Decimal,
    /// Fees attributed to the matched principal.
    pub fees: Decimal,
    /// TNA used when priced from a rate.
    pub rate: Option<Decimal>,
    /// Pricing path taken.
    pub source: FinancingSource,
}

impl FinancingOutcome {
    /// Outcome for a position with nothing to price the carry.
    pub fn unpriced(principal: Decimal) -> Self {
        Self {
            pnl: Decimal::ZERO,
            principal,
            accrued_interest: Decimal::ZERO,
            fees: Decimal::ZERO,
            rate: None,
            source: FinancingSource::None,
        }
    }
}

/// Inputs to the financing calculation.
#[derive(Debug, Clone, Copy)]
pub struct FinancingTerms<'a> {
    /// Lender or borrower.
    pub role: FinancingRole,
    /// Principal of the matched position.
    pub principal: Decimal,
    /// Group TNA in percent.
    pub rate: Option<Decimal>,
    /// Tenor in days.
    pub tenor_days: u32,
    /// Day-count denominator.
    pub day_count_basis: u32,
    /// Transactions already filtered to `role`.
    pub transactions: &'a [FinancingTransaction],
}

/// Price the financing leg.
///
/// A positive rate with a positive tenor accrues simple interest on the
/// principal. Without one, recorded interest of every role transaction is
/// blended pro rata to principal. Lending yields income, borrowing a cost;
/// fees always reduce the result.
pub fn financing_pnl(terms: &FinancingTerms<'_>) -> FinancingOutcome {
    let role_principal: Decimal = terms.transactions.iter().map(|tx| tx.principal).sum();
    let role_fees: Decimal = terms.transactions.iter().map(|tx| tx.total_fees()).sum();

    let fees = if role_principal.is_zero() {
        role_fees
    } else {
        role_fees * (terms.principal / role_principal).min(Decimal::ONE)
    };

    let usable_rate = terms
        .rate
        .filter(|rate| *rate > Decimal::ZERO && terms.tenor_days > 0 && terms.day_count_basis > 0);

    let (accrued_interest, rate, source) = if let Some(rate) = usable_rate {
        let interest = terms.principal * (rate / Decimal::ONE_HUNDRED) * Decimal::from(terms.tenor_days)
            / Decimal::from(terms.day_count_basis);
        (interest, Some(rate), FinancingSource::Rate)
    } else if !terms.transactions.is_empty() {
        let recorded: Decimal = terms.transactions.iter().map(|tx| tx.accrued_interest).sum();
        let interest = if role_principal.is_zero() {
            recorded
        } else {
            recorded * terms.principal / role_principal
        };
        (interest, None, FinancingSource::Transactions)
    } else {
        return FinancingOutcome::unpriced(terms.principal);
    };

    let pnl = match terms.role {
        FinancingRole::Lender => accrued_interest - fees,
        FinancingRole::Borrower => -accrued_interest - fees,
    };

    FinancingOutcome {
        pnl,
        principal: terms.principal,
        accrued_interest,
        fees,
        rate,
        source,
    }
}
