//! The two canonical calendar-arbitrage patterns and their outcome states.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::grouping::OperationBuckets;
use crate::records::{FinancingRole, Operation, SettlementVenue, Side};

/// Calendar-arbitrage pattern.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
pub enum ArbitragePattern {
    /// Sell immediate, buy back deferred, lend the proceeds.
    #[strum(serialize = "sell_immediate_buy_deferred", serialize = "A")]
    LendThenBuyBack,
    /// Buy immediate, sell deferred, borrow to fund the purchase.
    #[strum(serialize = "buy_immediate_sell_deferred", serialize = "B")]
    BorrowThenSellForward,
}

impl ArbitragePattern {
    /// Every pattern, in evaluation order.
    pub const ALL: [ArbitragePattern; 2] = [
        ArbitragePattern::LendThenBuyBack,
        ArbitragePattern::BorrowThenSellForward,
    ];

    /// Financing role the pattern takes over the tenor.
    pub fn financing_role(&self) -> FinancingRole {
        match self {
            ArbitragePattern::LendThenBuyBack => FinancingRole::Lender,
            ArbitragePattern::BorrowThenSellForward => FinancingRole::Borrower,
        }
    }

    /// Side of the immediate leg.
    pub fn immediate_side(&self) -> Side {
        match self {
            ArbitragePattern::LendThenBuyBack => Side::Sell,
            ArbitragePattern::BorrowThenSellForward => Side::Buy,
        }
    }

    /// Side of the deferred leg.
    pub fn deferred_side(&self) -> Side {
        match self {
            ArbitragePattern::LendThenBuyBack => Side::Buy,
            ArbitragePattern::BorrowThenSellForward => Side::Sell,
        }
    }

    /// (immediate, deferred) legs of this pattern within a group.
    pub fn legs<'a>(&self, buckets: &'a OperationBuckets) -> (&'a [Operation], &'a [Operation]) {
        (
            buckets.bucket(self.immediate_side(), SettlementVenue::Immediate),
            buckets.bucket(self.deferred_side(), SettlementVenue::Deferred),
        )
    }
}

/// Outcome of evaluating one pattern for one group.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
pub enum PatternStatus {
    /// One side has nothing to match against.
    #[strum(serialize = "no counterparty")]
    NoCounterparty,
    /// Matched, but no rate or financing transaction to price the carry.
    #[strum(serialize = "matched, no financing transaction")]
    NoFinancing,
    /// Both sides carry exactly the same raw quantity.
    #[strum(serialize = "complete")]
    Complete,
    /// Matched with surplus on one side.
    #[strum(serialize = "unbalanced quantities")]
    UnbalancedQuantities,
}

impl PatternStatus {
    /// Whether the pattern produced a priced position.
    pub fn is_priced(&self) -> bool {
        matches!(self, PatternStatus::Complete | PatternStatus::UnbalancedQuantities)
    }
}

/// How the financing leg of a result was priced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum FinancingSource {
    /// Accrued from the group's average TNA over the tenor.
    #[strum(serialize = "rate")]
    Rate,
    /// Blended from recorded interest of the role's transactions.
    #[strum(serialize = "transactions")]
    Transactions,
    /// Not priced.
    #[strum(serialize = "none")]
    None,
}
