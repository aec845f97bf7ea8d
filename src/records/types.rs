//! Canonical trade and financing records consumed by the engine.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Trade side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// Buy leg.
    #[strum(
        serialize = "BUY",
        serialize = "buy",
        serialize = "Buy",
        serialize = "COMPRA",
        serialize = "compra"
    )]
    Buy,
    /// Sell leg.
    #[strum(
        serialize = "SELL",
        serialize = "sell",
        serialize = "Sell",
        serialize = "VENTA",
        serialize = "venta"
    )]
    Sell,
}

/// Settlement venue of a trade leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
pub enum SettlementVenue {
    /// Settles the same day (contado inmediato).
    #[strum(
        serialize = "immediate",
        serialize = "IMMEDIATE",
        serialize = "CI",
        serialize = "ci",
        serialize = "T+0"
    )]
    Immediate,
    /// Settles on a later, pre-agreed date.
    #[strum(
        serialize = "deferred",
        serialize = "DEFERRED",
        serialize = "24hs",
        serialize = "24HS",
        serialize = "T+1"
    )]
    Deferred,
}

/// Role taken in a financing transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
pub enum FinancingRole {
    /// Principal is placed and earns interest.
    #[strum(
        serialize = "lender",
        serialize = "LENDER",
        serialize = "colocadora",
        serialize = "COLOCADORA"
    )]
    Lender,
    /// Principal is taken and interest is owed.
    #[strum(
        serialize = "borrower",
        serialize = "BORROWER",
        serialize = "tomadora",
        serialize = "TOMADORA"
    )]
    Borrower,
}

/// Case-normalized currency code.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    /// Normalize a raw currency code (trimmed, uppercase).
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_uppercase())
    }

    /// Normalized code.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Currency {
    fn from(code: String) -> Self {
        Self::new(code)
    }
}

impl From<&str> for Currency {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fee breakdown supplied by the fee resolver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    /// Broker commission.
    #[serde(default)]
    pub commission: Decimal,
    /// Market rights (derechos de mercado).
    #[serde(default)]
    pub market_rights: Decimal,
    /// Guarantee expense.
    #[serde(default)]
    pub guarantee_expense: Decimal,
    /// Tax on expenses (VAT).
    #[serde(default)]
    pub tax_on_expenses: Decimal,
    /// Net amount settled after fees.
    #[serde(default)]
    pub net_settlement: Decimal,
}

impl FeeBreakdown {
    /// Sum of every fee component.
    pub fn total(&self) -> Decimal {
        self.commission + self.market_rights + self.guarantee_expense + self.tax_on_expenses
    }
}

/// One trade leg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Instrument ticker.
    pub instrument: String,
    /// Buy or sell.
    pub side: Side,
    /// Settlement venue.
    pub venue: SettlementVenue,
    /// Execution timestamp.
    pub traded_at: DateTime<Utc>,
    /// Nominal quantity (always positive).
    pub quantity: Decimal,
    /// Price per quote base of nominal.
    pub price: Decimal,
    /// Commission per unit of quantity.
    pub commission: Decimal,
    /// Settlement currency.
    pub currency: Currency,
    /// Fee breakdown, once enriched.
    pub fees: Option<FeeBreakdown>,
}

impl Operation {
    /// Quantity times price, before applying the quote base.
    pub fn gross_value(&self) -> Decimal {
        self.quantity * self.price
    }

    /// Commission charged on the whole leg.
    pub fn total_commission(&self) -> Decimal {
        self.commission * self.quantity
    }
}

/// A caución/repo leg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancingTransaction {
    /// Funding label (e.g. a cash-equivalent ticker).
    pub instrument: String,
    /// Principal amount.
    pub principal: Decimal,
    /// Annualized nominal rate (TNA) in percent.
    pub rate: Decimal,
    /// Tenor in calendar days.
    pub tenor_days: u32,
    /// Funding currency.
    pub currency: Currency,
    /// Lender or borrower.
    pub role: FinancingRole,
    /// Interest accrued over the tenor.
    pub accrued_interest: Decimal,
    /// Fee breakdown, once supplied or resolved.
    pub fees: Option<FeeBreakdown>,
}

impl FinancingTransaction {
    /// Total fees charged on this transaction.
    pub fn total_fees(&self) -> Decimal {
        self.fees.as_ref().map_or(Decimal::ZERO, FeeBreakdown::total)
    }
}
