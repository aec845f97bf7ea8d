//! Arbitrage module for matching calendar legs and computing P&L.
//!
//! This module handles:
//! - Pattern definitions and result statuses
//! - Leg summaries, trade and financing P&L
//! - Per-group pattern matching and the day report
//! - The end-to-end day run

pub mod calculator;
pub mod engine;
pub mod matcher;
pub mod pattern;
pub mod report;

pub use calculator::{
    financing_pnl, matched_quantity, trade_pnl, FinancingOutcome, FinancingTerms, LegSummary,
};
pub use engine::{ArbitrageEngine, DayRun};
pub use matcher::{GroupResults, PatternMatcher, PatternResult};
pub use pattern::{ArbitragePattern, FinancingSource, PatternStatus};
pub use report::{ArbitrageReport, PnlTotals};
