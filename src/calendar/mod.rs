//! Business calendar and settlement tenor resolution.
//!
//! This module handles:
//! - The market calendar collaborator interface
//! - A weekend + holiday-list calendar
//! - Tenor computation between immediate and deferred settlement

pub mod tenor;

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate, Weekday};

use crate::error::CalendarError;

pub use tenor::{SettlementConvention, TenorResolver};

/// Longest stretch of consecutive non-trading days searched before giving up.
pub const MAX_TRADING_DAY_SEARCH: u32 = 31;

/// Market calendar collaborator.
pub trait BusinessCalendar {
    /// Whether `date` is a trading day on `market`.
    fn is_trading_day(&self, date: NaiveDate, market: &str) -> bool;

    /// First trading day strictly after `date`.
    fn next_trading_day(&self, date: NaiveDate, market: &str) -> Result<NaiveDate, CalendarError> {
        let mut current = date;
        for _ in 0..MAX_TRADING_DAY_SEARCH {
            current = current
                .succ_opt()
                .ok_or(CalendarError::DateOutOfRange(current))?;
            if self.is_trading_day(current, market) {
                return Ok(current);
            }
        }
        Err(CalendarError::NoTradingDay {
            market: market.to_string(),
            from: date,
            days: MAX_TRADING_DAY_SEARCH,
        })
    }
}

/// Calendar closed on weekends and on a fixed list of holidays.
///
/// The holiday list applies to every market identifier.
#[derive(Debug, Clone, Default)]
pub struct HolidayCalendar {
    holidays: BTreeSet<NaiveDate>,
}

impl HolidayCalendar {
    /// Create a calendar from a set of holidays.
    pub fn new(holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            holidays: holidays.into_iter().collect(),
        }
    }

    /// Parse `YYYY-MM-DD` holiday entries.
    pub fn from_strings<S: AsRef<str>>(entries: &[S]) -> Result<Self, CalendarError> {
        let holidays = entries
            .iter()
            .map(|raw| raw.as_ref().trim())
            .filter(|raw| !raw.is_empty())
            .map(|raw| {
                NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| CalendarError::InvalidHoliday {
                    value: raw.to_string(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(Self { holidays })
    }

    /// Number of configured holidays.
    pub fn holiday_count(&self) -> usize {
        self.holidays.len()
    }
}

impl BusinessCalendar for HolidayCalendar {
    fn is_trading_day(&self, date: NaiveDate, _market: &str) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !self.holidays.contains(&date)
    }
}
