//! Raw record shapes accepted from upstream adapters.
//!
//! Numeric fields are typed, so missing or malformed numbers are rejected by
//! serde before a record reaches the engine. Venue, side and role stay as
//! strings here and are resolved when the records are admitted.

use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::types::{
    Currency, FeeBreakdown, FinancingRole, FinancingTransaction, Operation, SettlementVenue, Side,
};
use crate::error::{self, InputError};

/// Operation row as produced by a CSV or broker adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawOperation {
    /// Instrument ticker.
    pub instrument: String,
    /// Side label (BUY/SELL, compra/venta).
    pub side: String,
    /// Venue label (CI, 24hs, immediate, deferred).
    pub venue: String,
    /// Execution timestamp.
    pub traded_at: DateTime<Utc>,
    /// Quantity.
    pub quantity: Decimal,
    /// Price.
    pub price: Decimal,
    /// Per-unit commission, if already known.
    #[serde(default)]
    pub commission: Decimal,
    /// Currency code.
    #[serde(default)]
    pub currency: Option<String>,
    /// Pre-resolved fees.
    #[serde(default)]
    pub fees: Option<FeeBreakdown>,
}

impl RawOperation {
    /// Resolve into a canonical operation.
    pub fn to_operation(&self, default_currency: &Currency) -> Result<Operation, InputError> {
        let side =
            Side::from_str(self.side.trim()).map_err(|_| InputError::UnknownSide(self.side.clone()))?;
        let venue = SettlementVenue::from_str(self.venue.trim())
            .map_err(|_| InputError::UnknownVenue(self.venue.clone()))?;

        Ok(Operation {
            instrument: self.instrument.trim().to_string(),
            side,
            venue,
            traded_at: self.traded_at,
            quantity: self.quantity.abs(),
            price: self.price,
            commission: self.commission,
            currency: self
                .currency
                .as_deref()
                .map(Currency::new)
                .unwrap_or_else(|| default_currency.clone()),
            fees: self.fees.clone(),
        })
    }
}

/// Financing row as produced by a CSV or broker adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawFinancing {
    /// Funding label.
    pub instrument: String,
    /// Principal.
    pub principal: Decimal,
    /// TNA in percent.
    pub rate: Decimal,
    /// Tenor in days.
    pub tenor_days: u32,
    /// Currency code.
    #[serde(default)]
    pub currency: Option<String>,
    /// Role label (lender/borrower, colocadora/tomadora).
    pub role: String,
    /// Accrued interest; derived from rate and tenor when absent.
    #[serde(default)]
    pub accrued_interest: Option<Decimal>,
    /// Pre-resolved fees.
    #[serde(default)]
    pub fees: Option<FeeBreakdown>,
}

impl RawFinancing {
    /// Resolve into a canonical financing transaction.
    pub fn to_transaction(
        &self,
        default_currency: &Currency,
        day_count_basis: u32,
    ) -> Result<FinancingTransaction, InputError> {
        let role = FinancingRole::from_str(self.role.trim())
            .map_err(|_| InputError::UnknownRole(self.role.clone()))?;
        let principal = self.principal.abs();

        let accrued_interest = self.accrued_interest.unwrap_or_else(|| {
            simple_interest(principal, self.rate, self.tenor_days, day_count_basis)
        });

        Ok(FinancingTransaction {
            instrument: self.instrument.trim().to_string(),
            principal,
            rate: self.rate,
            tenor_days: self.tenor_days,
            currency: self
                .currency
                .as_deref()
                .map(Currency::new)
                .unwrap_or_else(|| default_currency.clone()),
            role,
            accrued_interest,
            fees: self.fees.clone(),
        })
    }
}

/// Read a JSON array of raw records from disk.
pub async fn read_records<T: DeserializeOwned>(path: &Path) -> error::Result<Vec<T>> {
    let raw = tokio::fs::read_to_string(path).await?;
    let records: Vec<T> = serde_json::from_str(&raw)?;
    debug!(path = %path.display(), count = records.len(), "Records read");
    Ok(records)
}

/// Simple interest on `principal` at `rate` percent for `days` over `basis`.
pub fn simple_interest(principal: Decimal, rate: Decimal, days: u32, basis: u32) -> Decimal {
    if basis == 0 {
        return Decimal::ZERO;
    }
    principal * (rate / Decimal::ONE_HUNDRED) * Decimal::from(days) / Decimal::from(basis)
}
