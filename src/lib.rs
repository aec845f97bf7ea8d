//! Calendar arbitrage matching and P&L engine.
//!
//! Reconciles a day's executed legs, split between immediate settlement
//! and next-business-day settlement, against the repo financing booked
//! for the same tenor, and reports the P&L of each matched pattern:
//!
//! ```text
//! LendThenBuyBack:        SELL immediate + BUY deferred  + lend cash
//! BorrowThenSellForward:  BUY immediate  + SELL deferred + borrow cash
//! ─────────────────────────────────────────────────────────────────
//! total P&L = trade P&L + financing P&L
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`records`]: Operations, financing transactions and fee enrichment
//! - [`calendar`]: Business calendar and tenor resolution
//! - [`grouping`]: Classification, rate aggregation and grouping
//! - [`arbitrage`]: Pattern matching, P&L and the day report
//! - [`metrics`]: Pipeline metrics

pub mod arbitrage;
pub mod calendar;
pub mod config;
pub mod error;
pub mod grouping;
pub mod metrics;
pub mod records;

pub use config::Config;
pub use error::{EngineError, Result};
