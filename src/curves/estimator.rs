//! Portfolio-level hazard rate estimation from flow tables

use super::curve::{AggregateRow, HazardCurve, HazardKind, RateCurve};
use super::smoothing::centered_moving_average;
use crate::error::{HazardError, Result};
use crate::flows::FlowTable;
use log::{debug, info};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Default centered smoothing window (ages)
pub const DEFAULT_SMOOTHING_WINDOW: usize = 3;

/// Flow divided by balance, 0 when there is no positive balance to divide by
pub(crate) fn flow_rate(amount: f64, balance: f64) -> f64 {
    if balance <= 0.0 {
        0.0
    } else {
        amount / balance
    }
}

/// Estimates payment and charge-off hazard curves from historical flows
///
/// All segments are pooled by month on book; hazard rates are treated as a
/// portfolio-level signal. Each call to [`fit`](Self::fit) replaces the held
/// snapshot with a new one; snapshots already handed out stay valid.
#[derive(Debug, Clone)]
pub struct HazardRateEstimator {
    smoothing_window: usize,
    curve: Option<Arc<HazardCurve>>,
    fits: u64,
}

impl HazardRateEstimator {
    /// Create an estimator with the given smoothing window (1 disables smoothing)
    pub fn new(smoothing_window: usize) -> Result<Self> {
        if smoothing_window == 0 {
            return Err(HazardError::InvalidSmoothingWindow(smoothing_window));
        }
        Ok(Self {
            smoothing_window,
            curve: None,
            fits: 0,
        })
    }

    pub fn smoothing_window(&self) -> usize {
        self.smoothing_window
    }

    pub fn is_fitted(&self) -> bool {
        self.curve.is_some()
    }

    /// Current curve snapshot
    pub fn curve(&self) -> Result<&Arc<HazardCurve>> {
        self.curve.as_ref().ok_or(HazardError::NotFitted)
    }

    /// Aggregate flows by age, compute and smooth hazard rates, store the snapshot
    pub fn fit(&mut self, table: &FlowTable) -> Arc<HazardCurve> {
        let mut totals: BTreeMap<i32, (f64, f64, f64)> = BTreeMap::new();
        for record in table {
            let entry = totals.entry(record.month_on_book).or_insert((0.0, 0.0, 0.0));
            entry.0 += record.outstanding_balance;
            entry.1 += record.payments;
            entry.2 += record.chargeoffs;
        }

        let payment_raw: Vec<f64> = totals
            .values()
            .map(|&(balance, payments, _)| flow_rate(payments, balance))
            .collect();
        let chargeoff_raw: Vec<f64> = totals
            .values()
            .map(|&(balance, _, chargeoffs)| flow_rate(chargeoffs, balance))
            .collect();

        let payment_smoothed = centered_moving_average(&payment_raw, self.smoothing_window);
        let chargeoff_smoothed = centered_moving_average(&chargeoff_raw, self.smoothing_window);

        let training_data: Vec<AggregateRow> = totals
            .iter()
            .enumerate()
            .map(|(i, (&age, &(balance, payments, chargeoffs)))| AggregateRow {
                month_on_book: age,
                outstanding_balance: balance,
                payments,
                chargeoffs,
                payment_hazard_rate: payment_raw[i],
                chargeoff_hazard_rate: chargeoff_raw[i],
                payment_hazard_rate_smoothed: payment_smoothed[i],
                chargeoff_hazard_rate_smoothed: chargeoff_smoothed[i],
            })
            .collect();

        let payment_hazard = RateCurve::from_points(
            training_data
                .iter()
                .map(|r| (r.month_on_book, r.payment_hazard_rate_smoothed))
                .collect(),
        );
        let chargeoff_hazard = RateCurve::from_points(
            training_data
                .iter()
                .map(|r| (r.month_on_book, r.chargeoff_hazard_rate_smoothed))
                .collect(),
        );

        self.fits += 1;
        debug!(
            "smoothed {} ages with window {}",
            training_data.len(),
            self.smoothing_window
        );
        info!(
            "fitted hazard curves v{} over ages {:?}..={:?}",
            self.fits,
            payment_hazard.min_age(),
            payment_hazard.max_age()
        );

        let curve = Arc::new(HazardCurve {
            version: self.fits,
            smoothing_window: self.smoothing_window,
            payment_hazard,
            chargeoff_hazard,
            training_data,
        });
        self.curve = Some(Arc::clone(&curve));
        curve
    }

    /// Hazard rate for `age` from the fitted curves
    pub fn get_rate(&self, age: i32, kind: HazardKind) -> Result<f64> {
        Ok(self.curve()?.rate(age, kind))
    }

    /// Same as [`get_rate`](Self::get_rate) with the kind given by name
    pub fn get_rate_by_name(&self, age: i32, kind: &str) -> Result<f64> {
        let curve = self.curve()?;
        let kind: HazardKind = kind.parse()?;
        Ok(curve.rate(age, kind))
    }
}

impl Default for HazardRateEstimator {
    fn default() -> Self {
        Self {
            smoothing_window: DEFAULT_SMOOTHING_WINDOW,
            curve: None,
            fits: 0,
        }
    }
}
