//! Grouping module for classified legs and financing.
//!
//! This module handles:
//! - Partitioning legs into role-tagged buckets
//! - Principal-weighted financing rates per currency
//! - Building per-(instrument, tenor) groups

pub mod classifier;
pub mod financing;
pub mod grouper;

pub use classifier::{
    admit_financing, admit_operations, classify, consolidate, ClassifiedOperations,
    OperationBuckets,
};
pub use financing::{average_rates_by_currency, weighted_rate, FinancingRates};
pub use grouper::{build_groups, GroupKey, GroupedDay, InstrumentGrouper, InstrumentTenorGroup, RateSource};
