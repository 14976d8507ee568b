//! Forecast output rows

use crate::flows::FlowRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a row was observed or projected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForecastFlag {
    Actual,
    Forecast,
}

impl ForecastFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ForecastFlag::Actual => "Actual",
            ForecastFlag::Forecast => "Forecast",
        }
    }
}

impl fmt::Display for ForecastFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One month of a cohort's combined actual + projected series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRecord {
    pub segment_id: String,
    pub month_on_book: i32,
    /// Balance at the start of the month
    pub outstanding_balance: f64,
    pub payments: f64,
    pub chargeoffs: f64,
    pub forecast_flag: ForecastFlag,
}

impl ForecastRecord {
    /// Carry an observed row into the forecast series
    pub fn actual(record: &FlowRecord) -> Self {
        Self {
            segment_id: record.segment_id.clone(),
            month_on_book: record.month_on_book,
            outstanding_balance: record.outstanding_balance,
            payments: record.payments,
            chargeoffs: record.chargeoffs,
            forecast_flag: ForecastFlag::Actual,
        }
    }

    pub fn is_forecast(&self) -> bool {
        self.forecast_flag == ForecastFlag::Forecast
    }

    pub fn ending_balance(&self) -> f64 {
        self.outstanding_balance - self.payments - self.chargeoffs
    }
}
