//! Settlement gap between immediate and deferred legs.

use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::BusinessCalendar;
use crate::error::CalendarError;

/// How the deferred settlement date is derived from the trading day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementConvention {
    /// Next trading day per the market calendar.
    #[default]
    NextBusinessDay,
    /// T+n, counted in trading days.
    BusinessDays(u32),
}

impl FromStr for SettlementConvention {
    type Err = String;

    /// Accepts `next_business_day` or `t+N`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        if normalized == "next_business_day" {
            return Ok(SettlementConvention::NextBusinessDay);
        }
        normalized
            .strip_prefix("t+")
            .and_then(|n| n.parse::<u32>().ok())
            .map(SettlementConvention::BusinessDays)
            .ok_or_else(|| format!("unknown settlement convention: {s}"))
    }
}

/// Computes tenors against a business calendar.
#[derive(Debug, Clone)]
pub struct TenorResolver<C> {
    calendar: C,
    market: String,
    convention: SettlementConvention,
}

impl<C: BusinessCalendar> TenorResolver<C> {
    /// Create a resolver for one market.
    pub fn new(calendar: C, market: impl Into<String>, convention: SettlementConvention) -> Self {
        Self {
            calendar,
            market: market.into(),
            convention,
        }
    }

    /// Market identifier passed to the calendar.
    pub fn market(&self) -> &str {
        &self.market
    }

    /// Deferred settlement date for a trading day.
    pub fn deferred_settlement_date(&self, trading_day: NaiveDate) -> Result<NaiveDate, CalendarError> {
        let steps = match self.convention {
            SettlementConvention::NextBusinessDay => 1,
            SettlementConvention::BusinessDays(n) => n,
        };

        let mut date = trading_day;
        for _ in 0..steps {
            date = self.calendar.next_trading_day(date, &self.market)?;
        }
        Ok(date)
    }

    /// Calendar days between immediate and deferred settlement.
    pub fn tenor_days(&self, trading_day: NaiveDate) -> Result<u32, CalendarError> {
        let deferred = self.deferred_settlement_date(trading_day)?;
        let days = (deferred - trading_day).num_days().max(0) as u32;
        debug!(%trading_day, %deferred, days, market = %self.market, "Tenor resolved");
        Ok(days)
    }
}
