//! Progress tracking
//!
//! Completion percentage, time metrics and per-pillar progress, all derived
//! from task statuses.

#![warn(missing_docs)]

pub mod aggregator;
pub mod estimator;

pub use aggregator::ProgressAggregator;
pub use estimator::{CompletionEstimator, TimeEstimation};
