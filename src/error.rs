//! Unified error types for the arbitrage engine.

use chrono::NaiveDate;
use thiserror::Error;

/// Unified error type for the arbitrage engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Configuration loaded but failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Business calendar error.
    #[error("calendar error: {0}")]
    Calendar(#[from] CalendarError),

    /// Fee enrichment error.
    #[error("fee error: {0}")]
    Fee(#[from] FeeError),

    /// Record file parsing error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Record file read error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Business calendar and settlement date errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalendarError {
    /// No trading day found within the search window.
    #[error("no trading day for {market} within {days} days after {from}")]
    NoTradingDay {
        /// Market identifier.
        market: String,
        /// Date the search started from.
        from: NaiveDate,
        /// Search window in days.
        days: u32,
    },

    /// Date arithmetic left the representable range.
    #[error("date out of range after {0}")]
    DateOutOfRange(NaiveDate),

    /// Holiday entry could not be parsed.
    #[error("invalid holiday date {value:?}: {reason}")]
    InvalidHoliday {
        /// Raw configured value.
        value: String,
        /// Parser message.
        reason: String,
    },
}

/// Adapter-level record errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    /// Settlement venue string not recognized.
    #[error("unknown settlement venue: {0}")]
    UnknownVenue(String),

    /// Side string not recognized.
    #[error("unknown side: {0}")]
    UnknownSide(String),

    /// Financing role string not recognized.
    #[error("unknown financing role: {0}")]
    UnknownRole(String),
}

/// Fee resolver errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeeError {
    /// The resolver could not price a record.
    #[error("fees unavailable for {instrument}: {reason}")]
    Unavailable {
        /// Instrument or funding label.
        instrument: String,
        /// Reason for failure.
        reason: String,
    },
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, EngineError>;
