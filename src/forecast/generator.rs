//! Balance-decay recurrence that extends known actuals with trained curves

use super::records::{ForecastFlag, ForecastRecord};
use crate::curves::{HazardCurve, HazardKind};
use crate::error::{HazardError, Result};
use crate::flows::FlowTable;
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Balance at or below which the projection stops
pub const DEFAULT_BALANCE_FLOOR: f64 = 0.01;

/// What to do when projected payments plus charge-offs exceed the running balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutflowPolicy {
    /// Scale both outflows down so together they equal the balance
    #[default]
    Prorate,
    /// Apply the rates as-is; the balance update still floors at zero
    Unclamped,
}

/// Configuration for a forecast run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastConfig {
    pub balance_floor: f64,
    pub outflow_policy: OutflowPolicy,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            balance_floor: DEFAULT_BALANCE_FLOOR,
            outflow_policy: OutflowPolicy::Prorate,
        }
    }
}

/// Projects a single cohort forward month by month
pub struct ForecastGenerator<'a> {
    curve: &'a HazardCurve,
    config: ForecastConfig,
}

impl<'a> ForecastGenerator<'a> {
    pub fn new(curve: &'a HazardCurve, config: ForecastConfig) -> Self {
        Self { curve, config }
    }

    /// Known actuals (flag `Actual`) followed by projected rows (flag `Forecast`)
    /// through `max_age`, ordered by month on book
    ///
    /// Projection stops early once the running balance is at or below the floor;
    /// the remaining ages are simply absent.
    pub fn extend(&self, known_actuals: &FlowTable, max_age: i32) -> Result<Vec<ForecastRecord>> {
        let segments = known_actuals.segment_ids();
        if segments.len() > 1 {
            return Err(HazardError::MixedSegments {
                segments: segments.into_iter().map(String::from).collect(),
            });
        }

        let mut actuals: Vec<&_> = known_actuals.records().iter().collect();
        actuals.sort_by_key(|r| r.month_on_book);

        let last_known_age = actuals
            .last()
            .map(|r| r.month_on_book)
            .ok_or(HazardError::EmptyActuals)?;
        let last = actuals
            .iter()
            .find(|r| r.month_on_book == last_known_age)
            .ok_or(HazardError::EmptyActuals)?;

        let segment_id = last.segment_id.clone();
        let mut balance = last.ending_balance();

        let mut rows: Vec<ForecastRecord> =
            actuals.iter().map(|r| ForecastRecord::actual(r)).collect();
        let actual_count = rows.len();

        if last_known_age >= max_age {
            debug!("segment {} already observed through month {}", segment_id, max_age);
            return Ok(rows);
        }

        // last_known_age < max_age, so the successor cannot overflow
        for month in (last_known_age + 1)..=max_age {
            if balance <= self.config.balance_floor {
                debug!(
                    "segment {} balance {:.4} reached floor before month {}",
                    segment_id, balance, month
                );
                break;
            }

            let payment_rate = self.curve.rate(month, HazardKind::Payment);
            let chargeoff_rate = self.curve.rate(month, HazardKind::Chargeoff);
            let (payments, chargeoffs) = self.outflows(balance, payment_rate, chargeoff_rate);

            rows.push(ForecastRecord {
                segment_id: segment_id.clone(),
                month_on_book: month,
                outstanding_balance: balance,
                payments,
                chargeoffs,
                forecast_flag: ForecastFlag::Forecast,
            });

            balance = (balance - payments - chargeoffs).max(0.0);
        }

        info!(
            "segment {}: {} actual and {} forecast month(s)",
            segment_id,
            actual_count,
            rows.len() - actual_count
        );

        Ok(rows)
    }

    /// Dollar payment and charge-off amounts for one projected month
    fn outflows(&self, balance: f64, payment_rate: f64, chargeoff_rate: f64) -> (f64, f64) {
        let payments = balance * payment_rate;
        let chargeoffs = balance * chargeoff_rate;
        let total = payments + chargeoffs;

        match self.config.outflow_policy {
            OutflowPolicy::Prorate if total > balance => {
                let scale = balance / total;
                (payments * scale, chargeoffs * scale)
            }
            _ => (payments, chargeoffs),
        }
    }
}
