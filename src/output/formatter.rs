//! Ratio-based, origination-normalized output rows

use crate::curves::flow_rate;
use crate::error::{HazardError, Result};
use crate::forecast::{ForecastFlag, ForecastRecord};
use serde::{Deserialize, Serialize};

/// One output row; field order is the output column order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRecord {
    pub month_on_book: i32,
    pub outstanding_balance_ratio: f64,
    pub payments_ratio: f64,
    pub chargeoffs_ratio: f64,
    pub payment_hazard_rate: f64,
    pub chargeoff_hazard_rate: f64,
    pub forecast_flag: ForecastFlag,
}

/// Converts forecast rows into ratios of the origination amount
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputFormatter;

impl OutputFormatter {
    pub fn new() -> Self {
        Self
    }

    /// Per-row hazard rates plus balance and flow ratios to `origination_amount`
    pub fn format(
        &self,
        records: &[ForecastRecord],
        origination_amount: f64,
    ) -> Result<Vec<OutputRecord>> {
        if !(origination_amount.is_finite() && origination_amount > 0.0) {
            return Err(HazardError::InvalidOrigination(origination_amount));
        }

        Ok(records
            .iter()
            .map(|r| OutputRecord {
                month_on_book: r.month_on_book,
                outstanding_balance_ratio: r.outstanding_balance / origination_amount,
                payments_ratio: r.payments / origination_amount,
                chargeoffs_ratio: r.chargeoffs / origination_amount,
                payment_hazard_rate: flow_rate(r.payments, r.outstanding_balance),
                chargeoff_hazard_rate: flow_rate(r.chargeoffs, r.outstanding_balance),
                forecast_flag: r.forecast_flag,
            })
            .collect())
    }
}

/// Headline figures for a formatted forecast
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastSummary {
    pub actual_months: usize,
    pub forecast_months: usize,
    pub starting_balance_ratio: f64,
    pub final_balance_ratio: f64,
    pub total_payments_ratio: f64,
    pub total_chargeoffs_ratio: f64,
}

impl ForecastSummary {
    pub fn from_output(rows: &[OutputRecord]) -> Self {
        let forecast_months = rows
            .iter()
            .filter(|r| r.forecast_flag == ForecastFlag::Forecast)
            .count();

        Self {
            actual_months: rows.len() - forecast_months,
            forecast_months,
            starting_balance_ratio: rows.first().map(|r| r.outstanding_balance_ratio).unwrap_or(0.0),
            final_balance_ratio: rows.last().map(|r| r.outstanding_balance_ratio).unwrap_or(0.0),
            total_payments_ratio: rows.iter().map(|r| r.payments_ratio).sum(),
            total_chargeoffs_ratio: rows.iter().map(|r| r.chargeoffs_ratio).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn row(month: i32, balance: f64, payments: f64, chargeoffs: f64, flag: ForecastFlag) -> ForecastRecord {
        ForecastRecord {
            segment_id: "N".to_string(),
            month_on_book: month,
            outstanding_balance: balance,
            payments,
            chargeoffs,
            forecast_flag: flag,
        }
    }

    #[test]
    fn test_ratios_and_rates() {
        let records = vec![
            row(0, 8_000_000.0, 640_000.0, 40_000.0, ForecastFlag::Actual),
            row(1, 7_320_000.0, 585_600.0, 36_600.0, ForecastFlag::Forecast),
        ];
        let output = OutputFormatter::new().format(&records, 8_000_000.0).unwrap();

        assert_eq!(output[0].outstanding_balance_ratio, 1.0);
        assert_relative_eq!(output[0].payments_ratio, 0.08);
        assert_relative_eq!(output[0].payment_hazard_rate, 0.08);
        assert_relative_eq!(output[1].chargeoff_hazard_rate, 0.005);
        assert_eq!(output[1].forecast_flag, ForecastFlag::Forecast);
        // Exact division, no rounding
        assert_eq!(output[1].outstanding_balance_ratio, 7_320_000.0 / 8_000_000.0);
    }

    #[test]
    fn test_zero_balance_row_has_zero_rates() {
        let records = vec![row(5, 0.0, 0.0, 0.0, ForecastFlag::Actual)];
        let output = OutputFormatter::new().format(&records, 1000.0).unwrap();
        assert_eq!(output[0].payment_hazard_rate, 0.0);
        assert_eq!(output[0].chargeoff_hazard_rate, 0.0);
    }

    #[test]
    fn test_origination_guard() {
        let formatter = OutputFormatter::new();
        for bad in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                formatter.format(&[], bad),
                Err(HazardError::InvalidOrigination(_))
            ));
        }
    }

    #[test]
    fn test_summary() {
        let records = vec![
            row(0, 1000.0, 100.0, 10.0, ForecastFlag::Actual),
            row(1, 890.0, 89.0, 8.9, ForecastFlag::Forecast),
            row(2, 792.1, 79.21, 7.921, ForecastFlag::Forecast),
        ];
        let output = OutputFormatter::new().format(&records, 1000.0).unwrap();
        let summary = ForecastSummary::from_output(&output);

        assert_eq!(summary.actual_months, 1);
        assert_eq!(summary.forecast_months, 2);
        assert_eq!(summary.starting_balance_ratio, 1.0);
        assert_relative_eq!(summary.final_balance_ratio, 0.7921, epsilon = 1e-12);
        assert_relative_eq!(summary.total_payments_ratio, 0.26821, epsilon = 1e-12);
    }
}
