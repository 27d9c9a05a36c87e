pub mod error;
pub mod experiments;
pub mod types;

pub use error::{AdVerdictError, Result};
pub use experiments::config::{
    AdAttribute, ComparisonConfig, ControlMatcher, Metric, MetricDirections, MetricWeights,
};
pub use experiments::engine::{
    AdGroupReport, BatchOutcome, ComparisonEngine, ComparisonVerdict, MetricComparisonResult,
    Outcome, SkipReason, SkippedGroup,
};
pub use types::{AdGroup, AdMetrics, AdStatus};
