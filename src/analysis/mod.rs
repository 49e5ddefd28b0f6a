//! Analysis modules.
//!
//! Statistics and history folding over measurement batches.

pub mod aggregator;

pub use aggregator::*;
