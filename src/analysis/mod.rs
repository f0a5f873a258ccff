//! Statistical combination of worker results.

pub mod aggregator;

pub use aggregator::aggregate;
