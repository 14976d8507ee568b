//! Hazard curves: aggregation, smoothing and rate lookup

mod curve;
mod estimator;
mod smoothing;

pub use curve::{AggregateRow, HazardCurve, HazardKind, RateCurve};
pub use estimator::{HazardRateEstimator, DEFAULT_SMOOTHING_WINDOW};
pub use smoothing::centered_moving_average;

pub(crate) use estimator::flow_rate;
