//! Train → validate → forecast orchestration
//!
//! A pipeline starts `Untrained`. A successful [`HazardPipeline::train`] moves
//! it to `Trained` with a curve snapshot; retraining swaps the snapshot and
//! never moves the pipeline back. Forecasting reads the snapshot only.
//!
//! # Example
//! ```ignore
//! let mut pipeline = HazardPipeline::new(PipelineConfig::default())?;
//! pipeline.train(&training)?;
//! let (output, diagnostics) = pipeline.forecast(&actuals, 8_000_000.0, 48)?;
//! ```
//!
//! A pipeline may be shared across threads for forecasting; `train` takes
//! `&mut self`, so concurrent retraining needs external serialization.

use crate::curves::{HazardCurve, HazardRateEstimator, DEFAULT_SMOOTHING_WINDOW};
use crate::error::{HazardError, Result};
use crate::flows::FlowTable;
use crate::forecast::{ForecastConfig, ForecastGenerator, OutflowPolicy, DEFAULT_BALANCE_FLOOR};
use crate::output::{ForecastSummary, OutputFormatter, OutputRecord};
use crate::transfer::{CurveTransferEngine, TransferReport};
use crate::validation::{ValidationReport, Validator};
use log::{info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

/// Default forecast horizon (months on book)
pub const DEFAULT_MAX_AGE: i32 = 60;

fn default_smoothing_window() -> usize {
    DEFAULT_SMOOTHING_WINDOW
}

fn default_max_age() -> i32 {
    DEFAULT_MAX_AGE
}

fn default_balance_floor() -> f64 {
    DEFAULT_BALANCE_FLOOR
}

/// Pipeline settings, loadable from JSON with per-field defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Centered smoothing window in ages (1 disables smoothing)
    #[serde(default = "default_smoothing_window")]
    pub smoothing_window: usize,

    /// Last month on book to forecast to
    #[serde(default = "default_max_age")]
    pub max_age: i32,

    /// Running balance at or below which projection stops
    #[serde(default = "default_balance_floor")]
    pub balance_floor: f64,

    #[serde(default)]
    pub outflow_policy: OutflowPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            smoothing_window: DEFAULT_SMOOTHING_WINDOW,
            max_age: DEFAULT_MAX_AGE,
            balance_floor: DEFAULT_BALANCE_FLOOR,
            outflow_policy: OutflowPolicy::default(),
        }
    }
}

impl PipelineConfig {
    /// Load from a JSON file; absent fields take their defaults
    pub fn from_json_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(file)?)
    }

    pub fn forecast_config(&self) -> ForecastConfig {
        ForecastConfig {
            balance_floor: self.balance_floor,
            outflow_policy: self.outflow_policy,
        }
    }
}

/// Headline figures about the training table
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrainingSummary {
    pub segments_processed: usize,
    pub max_age: Option<i32>,
    pub total_volume: f64,
}

/// Everything `train` learned about its input
#[derive(Debug, Clone, Serialize)]
pub struct TrainingDiagnostics {
    pub validation_results: ValidationReport,
    pub hazard_curves: Arc<HazardCurve>,
    pub training_summary: TrainingSummary,
}

/// Diagnostics produced alongside a forecast
#[derive(Debug, Clone, Serialize)]
pub struct ForecastDiagnostics {
    pub data_validation: ValidationReport,
    pub curve_validation: TransferReport,
    pub forecast_summary: ForecastSummary,
}

/// Forecast of one segment from a multi-cohort table
#[derive(Debug, Clone, Serialize)]
pub struct SegmentForecast {
    pub segment_id: String,
    pub origination_amount: f64,
    pub output: Vec<OutputRecord>,
    pub diagnostics: ForecastDiagnostics,
}

#[derive(Debug, Clone)]
enum PipelineState {
    Untrained,
    Trained(Arc<HazardCurve>),
}

/// Balance at a segment's earliest observed month, used as its origination amount
pub fn implied_origination(table: &FlowTable) -> Option<f64> {
    table
        .iter()
        .min_by_key(|r| r.month_on_book)
        .map(|r| r.outstanding_balance)
}

/// Hazard-curve training and forecasting pipeline
#[derive(Debug, Clone)]
pub struct HazardPipeline {
    config: PipelineConfig,
    validator: Validator,
    estimator: HazardRateEstimator,
    formatter: OutputFormatter,
    state: PipelineState,
}

impl HazardPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let estimator = HazardRateEstimator::new(config.smoothing_window)?;
        Ok(Self {
            config,
            validator: Validator::new(),
            estimator,
            formatter: OutputFormatter::new(),
            state: PipelineState::Untrained,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn is_trained(&self) -> bool {
        matches!(self.state, PipelineState::Trained(_))
    }

    /// Current trained curve snapshot
    pub fn hazard_curve(&self) -> Result<&Arc<HazardCurve>> {
        match &self.state {
            PipelineState::Trained(curve) => Ok(curve),
            PipelineState::Untrained => Err(HazardError::NotTrained),
        }
    }

    /// Validate the training table and fit hazard curves
    ///
    /// An invalid table is rejected before fitting and leaves any previous
    /// training in place.
    pub fn train(&mut self, training_data: &FlowTable) -> Result<TrainingDiagnostics> {
        let validation_results = self.validator.validate(training_data).into_result()?;
        for warning in &validation_results.warnings {
            warn!("training data: {}", warning);
        }

        let curve = self.estimator.fit(training_data);
        self.state = PipelineState::Trained(Arc::clone(&curve));

        let training_summary = TrainingSummary {
            segments_processed: training_data.segment_ids().len(),
            max_age: training_data.max_age(),
            total_volume: training_data.total_volume(),
        };
        info!(
            "trained on {} segment(s), {} row(s), max age {:?}",
            training_summary.segments_processed,
            training_data.len(),
            training_summary.max_age
        );

        Ok(TrainingDiagnostics {
            validation_results,
            hazard_curves: curve,
            training_summary,
        })
    }

    /// Validate a cohort's actuals, compare them to the curves, project and format
    pub fn forecast(
        &self,
        known_actuals: &FlowTable,
        origination_amount: f64,
        max_age: i32,
    ) -> Result<(Vec<OutputRecord>, ForecastDiagnostics)> {
        let curve = self.hazard_curve()?;

        let data_validation = self.validator.validate(known_actuals).into_result()?;
        for warning in &data_validation.warnings {
            warn!("known actuals: {}", warning);
        }

        let curve_validation = CurveTransferEngine::new(curve).compare(known_actuals);
        let records = ForecastGenerator::new(curve, self.config.forecast_config())
            .extend(known_actuals, max_age)?;
        let output = self.formatter.format(&records, origination_amount)?;
        let forecast_summary = ForecastSummary::from_output(&output);

        Ok((
            output,
            ForecastDiagnostics {
                data_validation,
                curve_validation,
                forecast_summary,
            },
        ))
    }

    /// Forecast every segment of `table` in parallel, ordered by segment id
    ///
    /// Each segment's origination amount is its balance at its earliest observed month.
    pub fn forecast_segments(&self, table: &FlowTable, max_age: i32) -> Result<Vec<SegmentForecast>> {
        self.hazard_curve()?;

        let segments = table.split_by_segment();
        info!("forecasting {} segment(s) to age {}", segments.len(), max_age);

        segments
            .into_par_iter()
            .map(|(segment_id, actuals)| -> Result<SegmentForecast> {
                let origination_amount =
                    implied_origination(&actuals).ok_or(HazardError::EmptyActuals)?;
                let (output, diagnostics) = self.forecast(&actuals, origination_amount, max_age)?;
                Ok(SegmentForecast {
                    segment_id,
                    origination_amount,
                    output,
                    diagnostics,
                })
            })
            .collect()
    }
}

impl Default for HazardPipeline {
    fn default() -> Self {
        Self {
            config: PipelineConfig::default(),
            validator: Validator::new(),
            estimator: HazardRateEstimator::default(),
            formatter: OutputFormatter::new(),
            state: PipelineState::Untrained,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flows::FlowRecord;
    use crate::forecast::ForecastFlag;
    use approx::assert_relative_eq;

    /// Deterministic cohort with fixed monthly rates, consistent roll-forward
    fn cohort(segment: &str, origination: f64, payment_rate: f64, chargeoff_rate: f64, months: i32) -> Vec<FlowRecord> {
        let mut balance = origination;
        let mut rows = Vec::new();
        for month in 0..=months {
            let payments = balance * (payment_rate * (1.0 - 0.002 * month as f64));
            let chargeoffs = balance * chargeoff_rate;
            rows.push(FlowRecord::new(segment, month, balance, payments, chargeoffs));
            balance = balance - payments - chargeoffs;
        }
        rows
    }

    fn training_table() -> FlowTable {
        let mut rows = cohort("Prime_2021Q1", 10_000_000.0, 0.08, 0.005, 48);
        rows.extend(cohort("Near_Prime_2021Q2", 5_000_000.0, 0.09, 0.012, 48));
        rows.extend(cohort("Subprime_2021Q3", 3_000_000.0, 0.11, 0.025, 48));
        FlowTable::from_records(rows)
    }

    fn test_actuals() -> FlowTable {
        FlowTable::from_records(cohort("Prime_2023Q1", 8_000_000.0, 0.08, 0.005, 12))
    }

    #[test]
    fn test_forecast_before_train() {
        let pipeline = HazardPipeline::default();
        assert!(matches!(
            pipeline.forecast(&test_actuals(), 8_000_000.0, 48),
            Err(HazardError::NotTrained)
        ));
        assert!(matches!(pipeline.hazard_curve(), Err(HazardError::NotTrained)));
    }

    #[test]
    fn test_train_rejects_missing_columns() {
        let mut pipeline = HazardPipeline::default();
        let invalid = FlowTable::with_columns(
            vec!["wrong_column".to_string(), "another_wrong".to_string()],
            Vec::new(),
        );
        assert!(matches!(pipeline.train(&invalid), Err(HazardError::Schema { .. })));
        assert!(!pipeline.is_trained());
    }

    #[test]
    fn test_train_summary() {
        let mut pipeline = HazardPipeline::default();
        let diagnostics = pipeline.train(&training_table()).unwrap();

        assert!(diagnostics.validation_results.is_valid());
        assert!(diagnostics.validation_results.warnings.is_empty());
        assert_eq!(diagnostics.training_summary.segments_processed, 3);
        assert_eq!(diagnostics.training_summary.max_age, Some(48));
        assert_eq!(diagnostics.hazard_curves.payment_hazard.len(), 49);
        assert!(pipeline.is_trained());
    }

    #[test]
    fn test_end_to_end_forecast() {
        let mut pipeline = HazardPipeline::default();
        pipeline.train(&training_table()).unwrap();

        let (output, diagnostics) = pipeline.forecast(&test_actuals(), 8_000_000.0, 48).unwrap();

        assert_eq!(output.first().unwrap().month_on_book, 0);
        assert_eq!(output.last().unwrap().month_on_book, 48);
        assert_eq!(diagnostics.forecast_summary.actual_months, 13);
        assert_eq!(diagnostics.forecast_summary.forecast_months, 36);
        assert_eq!(output[0].outstanding_balance_ratio, 1.0);
        assert!(output
            .iter()
            .all(|r| (0.0..=1.0).contains(&r.payment_hazard_rate)
                && (0.0..=1.0).contains(&r.chargeoff_hazard_rate)));
        assert!(output[12].forecast_flag == ForecastFlag::Actual);
        assert!(output[13].forecast_flag == ForecastFlag::Forecast);
        assert!(diagnostics.curve_validation.summary.is_some());
        assert!(diagnostics.data_validation.is_valid());
    }

    #[test]
    fn test_final_ratio_is_exact() {
        let mut pipeline = HazardPipeline::default();
        pipeline.train(&training_table()).unwrap();

        let curve = Arc::clone(pipeline.hazard_curve().unwrap());
        let records = ForecastGenerator::new(&curve, pipeline.config().forecast_config())
            .extend(&test_actuals(), 48)
            .unwrap();
        let (output, _) = pipeline.forecast(&test_actuals(), 8_000_000.0, 48).unwrap();

        let final_balance = records.last().unwrap().outstanding_balance;
        assert_eq!(output.last().unwrap().outstanding_balance_ratio, final_balance / 8_000_000.0);
    }

    #[test]
    fn test_forecast_rejects_negative_actuals() {
        let mut pipeline = HazardPipeline::default();
        pipeline.train(&training_table()).unwrap();

        let bad = FlowTable::from_records(vec![FlowRecord::new("X", 0, 1000.0, -5.0, 0.0)]);
        assert!(matches!(
            pipeline.forecast(&bad, 1000.0, 12),
            Err(HazardError::BusinessRule { .. })
        ));
    }

    #[test]
    fn test_retrain_replaces_curve() {
        let mut pipeline = HazardPipeline::default();
        let first = pipeline.train(&training_table()).unwrap().hazard_curves;
        let second = pipeline
            .train(&FlowTable::from_records(cohort("Other", 1000.0, 0.2, 0.01, 6)))
            .unwrap()
            .hazard_curves;

        assert_eq!(second.version, first.version + 1);
        assert!(Arc::ptr_eq(pipeline.hazard_curve().unwrap(), &second));
        // Older snapshot untouched
        assert_eq!(first.payment_hazard.len(), 49);
    }

    #[test]
    fn test_failed_retrain_keeps_previous_curve() {
        let mut pipeline = HazardPipeline::default();
        pipeline.train(&training_table()).unwrap();
        let bad = FlowTable::from_records(vec![FlowRecord::new("X", 0, 1000.0, 0.0, -1.0)]);

        assert!(pipeline.train(&bad).is_err());
        assert!(pipeline.is_trained());
        assert_eq!(pipeline.hazard_curve().unwrap().version, 1);
    }

    #[test]
    fn test_forecast_segments_in_parallel() {
        let mut pipeline = HazardPipeline::default();
        pipeline.train(&training_table()).unwrap();

        let mut rows = cohort("B_2023Q2", 2_000_000.0, 0.09, 0.012, 6);
        rows.extend(cohort("A_2023Q1", 8_000_000.0, 0.08, 0.005, 12));
        let results = pipeline
            .forecast_segments(&FlowTable::from_records(rows), 24)
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].segment_id, "A_2023Q1");
        assert_eq!(results[0].origination_amount, 8_000_000.0);
        assert_eq!(results[1].output.first().unwrap().outstanding_balance_ratio, 1.0);
        assert_eq!(results[1].output.last().unwrap().month_on_book, 24);
    }

    #[test]
    fn test_config_from_json_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"smoothing_window": 5, "outflow_policy": "unclamped"}"#).unwrap();
        assert_eq!(config.smoothing_window, 5);
        assert_eq!(config.max_age, DEFAULT_MAX_AGE);
        assert_relative_eq!(config.balance_floor, 0.01);
        assert_eq!(config.outflow_policy, OutflowPolicy::Unclamped);
    }

    #[test]
    fn test_config_from_json_path() {
        let path = std::env::temp_dir().join("credit_hazard_pipeline_config.json");
        std::fs::write(&path, r#"{"max_age": 36, "balance_floor": 1.0}"#).unwrap();

        let config = PipelineConfig::from_json_path(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.max_age, 36);
        assert_eq!(config.smoothing_window, DEFAULT_SMOOTHING_WINDOW);
        assert_eq!(config.forecast_config().balance_floor, 1.0);
        assert_eq!(config.outflow_policy, OutflowPolicy::Prorate);
    }

    #[test]
    fn test_zero_window_config_rejected() {
        let config = PipelineConfig {
            smoothing_window: 0,
            ..Default::default()
        };
        assert!(matches!(
            HazardPipeline::new(config),
            Err(HazardError::InvalidSmoothingWindow(0))
        ));
    }
}
