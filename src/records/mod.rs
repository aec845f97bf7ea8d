//! Records module for trade legs and financing transactions.
//!
//! This module handles:
//! - Canonical record types consumed by the engine
//! - Raw adapter rows and their resolution
//! - Fee resolution and async enrichment

pub mod adapter;
pub mod fees;
pub mod types;

pub use adapter::{read_records, simple_interest, RawFinancing, RawOperation};
pub use fees::{enrich_financing, enrich_operations, FeeResolver, ScheduleFeeResolver};
pub use types::{
    Currency, FeeBreakdown, FinancingRole, FinancingTransaction, Operation, SettlementVenue, Side,
};
