//! Credit Hazard - hazard-rate curve estimation and cohort cash-flow forecasting
//!
//! This library provides:
//! - Flow table loading and validation (shape, ranges, roll-forward consistency)
//! - Portfolio-level payment and charge-off hazard curves with centered smoothing
//! - Actual-vs-expected variance diagnostics for new cohorts
//! - Balance-decay forecasting of a cohort from its known actuals
//! - Origination-normalized output tables

pub mod error;
pub mod flows;
pub mod validation;
pub mod curves;
pub mod transfer;
pub mod forecast;
pub mod output;
pub mod pipeline;

// Re-export commonly used types
pub use error::{HazardError, Result};
pub use flows::{FlowRecord, FlowTable};
pub use validation::{ValidationReport, Validator};
pub use curves::{HazardCurve, HazardKind, HazardRateEstimator};
pub use transfer::{CurveTransferEngine, TransferReport};
pub use forecast::{ForecastFlag, ForecastGenerator, ForecastRecord};
pub use output::{OutputFormatter, OutputRecord};
pub use pipeline::{HazardPipeline, PipelineConfig};
