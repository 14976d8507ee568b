//! Error types for curve training, inference and tabular exchange

use thiserror::Error;

use crate::validation::ValidationError;

/// Errors raised by the hazard pipeline
///
/// Advisory irregularities (balance-flow drift, large variances, ...) are never
/// raised; they are collected as warnings on the relevant report.
#[derive(Error, Debug)]
pub enum HazardError {
    /// Required columns are absent from the flow table
    #[error("Missing required columns: {}", missing.join(", "))]
    Schema { missing: Vec<String> },

    /// Input violates a hard business rule (negative ages or flows)
    #[error("Flow table failed validation: {}", format_errors(errors))]
    BusinessRule { errors: Vec<ValidationError> },

    /// Rate queried before the estimator was fitted
    #[error("Hazard curves must be fitted before querying rates")]
    NotFitted,

    /// Forecast requested before the pipeline was trained
    #[error("Pipeline must be trained before forecasting")]
    NotTrained,

    /// Unrecognized hazard type
    #[error("Invalid hazard kind: {0} (expected 'payment' or 'chargeoff')")]
    InvalidKind(String),

    /// No actual rows to roll forward from
    #[error("Known actuals are empty; nothing to extend")]
    EmptyActuals,

    /// Single-cohort operation given several cohorts
    #[error("Expected a single segment, found {}: {}", segments.len(), segments.join(", "))]
    MixedSegments { segments: Vec<String> },

    /// Origination amount must be positive and finite
    #[error("Origination amount must be positive, got {0}")]
    InvalidOrigination(f64),

    /// Smoothing window must cover at least one sample
    #[error("Smoothing window must be at least 1, got {0}")]
    InvalidSmoothingWindow(usize),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, HazardError>;
