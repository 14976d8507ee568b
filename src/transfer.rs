//! Compare a cohort's observed hazard rates against trained curves
//!
//! Each input row is scored as `actual - expected` for both outflows. Rows whose
//! variance breaches a fixed threshold are flagged for review; the report also
//! carries mean and root-mean-square variance across all compared rows.

use crate::curves::{flow_rate, HazardCurve, HazardKind, HazardRateEstimator};
use crate::error::Result;
use crate::flows::FlowTable;
use log::{info, warn};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::fmt;

/// Absolute payment-rate variance above which a row is flagged
pub const PAYMENT_VARIANCE_THRESHOLD: f64 = 0.05;

/// Absolute charge-off-rate variance above which a row is flagged
///
/// Tighter than the payment threshold: charge-off rates are an order of magnitude smaller.
pub const CHARGEOFF_VARIANCE_THRESHOLD: f64 = 0.02;

/// Observed vs expected rates for one input row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub month_on_book: i32,
    pub expected_payment_rate: f64,
    pub actual_payment_rate: f64,
    pub payment_variance: f64,
    pub expected_chargeoff_rate: f64,
    pub actual_chargeoff_rate: f64,
    pub chargeoff_variance: f64,
}

/// A row whose variance exceeded its threshold
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VarianceWarning {
    LargePaymentVariance { month_on_book: i32, variance: f64 },
    LargeChargeoffVariance { month_on_book: i32, variance: f64 },
}

impl fmt::Display for VarianceWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarianceWarning::LargePaymentVariance {
                month_on_book,
                variance,
            } => write!(f, "Large payment variance at month {}: {:.3}", month_on_book, variance),
            VarianceWarning::LargeChargeoffVariance {
                month_on_book,
                variance,
            } => write!(
                f,
                "Large chargeoff variance at month {}: {:.3}",
                month_on_book, variance
            ),
        }
    }
}

/// Aggregate variance statistics across compared rows
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VarianceSummary {
    pub mean_payment_variance: f64,
    pub mean_chargeoff_variance: f64,
    pub rmse_payment: f64,
    pub rmse_chargeoff: f64,
}

impl VarianceSummary {
    /// Summarize rows; `None` for an empty comparison
    pub fn from_rows(rows: &[ComparisonRow]) -> Option<Self> {
        if rows.is_empty() {
            return None;
        }
        let n = rows.len() as f64;
        let mean = |f: fn(&ComparisonRow) -> f64| rows.iter().map(f).sum::<f64>() / n;

        Some(Self {
            mean_payment_variance: mean(|r| r.payment_variance),
            mean_chargeoff_variance: mean(|r| r.chargeoff_variance),
            rmse_payment: mean(|r| r.payment_variance * r.payment_variance).sqrt(),
            rmse_chargeoff: mean(|r| r.chargeoff_variance * r.chargeoff_variance).sqrt(),
        })
    }
}

/// Full comparison output
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransferReport {
    pub rows: Vec<ComparisonRow>,
    pub warnings: Vec<VarianceWarning>,
    /// Serialized as `{}` when nothing was compared
    #[serde(serialize_with = "summary_or_empty")]
    pub summary: Option<VarianceSummary>,
}

fn summary_or_empty<S: Serializer>(
    summary: &Option<VarianceSummary>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match summary {
        Some(stats) => stats.serialize(serializer),
        None => serializer.serialize_map(Some(0))?.end(),
    }
}

/// Scores observed flows against one trained curve snapshot
pub struct CurveTransferEngine<'a> {
    curve: &'a HazardCurve,
}

impl<'a> CurveTransferEngine<'a> {
    pub fn new(curve: &'a HazardCurve) -> Self {
        Self { curve }
    }

    /// Borrow the estimator's current snapshot; fails if it was never fitted
    pub fn from_estimator(estimator: &'a HazardRateEstimator) -> Result<Self> {
        Ok(Self::new(estimator.curve()?))
    }

    /// Compare every row of `table`, in input order, against the curve
    pub fn compare(&self, table: &FlowTable) -> TransferReport {
        let mut rows = Vec::with_capacity(table.len());
        let mut warnings = Vec::new();

        for record in table {
            let age = record.month_on_book;
            let expected_payment_rate = self.curve.rate(age, HazardKind::Payment);
            let expected_chargeoff_rate = self.curve.rate(age, HazardKind::Chargeoff);
            let actual_payment_rate = flow_rate(record.payments, record.outstanding_balance);
            let actual_chargeoff_rate = flow_rate(record.chargeoffs, record.outstanding_balance);

            let row = ComparisonRow {
                month_on_book: age,
                expected_payment_rate,
                actual_payment_rate,
                payment_variance: actual_payment_rate - expected_payment_rate,
                expected_chargeoff_rate,
                actual_chargeoff_rate,
                chargeoff_variance: actual_chargeoff_rate - expected_chargeoff_rate,
            };

            if row.payment_variance.abs() > PAYMENT_VARIANCE_THRESHOLD {
                warnings.push(VarianceWarning::LargePaymentVariance {
                    month_on_book: age,
                    variance: row.payment_variance,
                });
            }
            if row.chargeoff_variance.abs() > CHARGEOFF_VARIANCE_THRESHOLD {
                warnings.push(VarianceWarning::LargeChargeoffVariance {
                    month_on_book: age,
                    variance: row.chargeoff_variance,
                });
            }

            rows.push(row);
        }

        let summary = VarianceSummary::from_rows(&rows);
        if !warnings.is_empty() {
            warn!("{} large variance(s) against curve v{}", warnings.len(), self.curve.version);
        }
        info!("compared {} row(s) against curve v{}", rows.len(), self.curve.version);

        TransferReport {
            rows,
            warnings,
            summary,
        }
    }
}

/// Compare `table` against the estimator's fitted curves
pub fn compare(table: &FlowTable, estimator: &HazardRateEstimator) -> Result<TransferReport> {
    Ok(CurveTransferEngine::from_estimator(estimator)?.compare(table))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HazardError;
    use crate::flows::FlowRecord;
    use approx::assert_relative_eq;

    fn trained() -> HazardRateEstimator {
        let mut estimator = HazardRateEstimator::new(1).unwrap();
        estimator.fit(&FlowTable::from_records(vec![
            FlowRecord::new("T", 0, 1000.0, 100.0, 10.0),
            FlowRecord::new("T", 1, 890.0, 89.0, 8.9),
        ]));
        estimator
    }

    #[test]
    fn test_compare_before_fit() {
        let estimator = HazardRateEstimator::default();
        assert!(matches!(
            compare(&FlowTable::default(), &estimator),
            Err(HazardError::NotFitted)
        ));
    }

    #[test]
    fn test_matching_cohort_has_no_variance() {
        let estimator = trained();
        let actuals = FlowTable::from_records(vec![FlowRecord::new("N", 0, 500.0, 50.0, 5.0)]);
        let report = compare(&actuals, &estimator).unwrap();

        assert_eq!(report.rows.len(), 1);
        assert_relative_eq!(report.rows[0].payment_variance, 0.0, epsilon = 1e-12);
        assert_relative_eq!(report.rows[0].chargeoff_variance, 0.0, epsilon = 1e-12);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_large_variances_flagged_with_asymmetric_thresholds() {
        let estimator = trained();
        // Month 0: payment 0.16 vs 0.10, charge-off 0.04 vs 0.01
        // Month 1: payment 0.125 vs 0.10 stays under 0.05, charge-off 0.035 vs 0.01 breaches 0.02
        let actuals = FlowTable::from_records(vec![
            FlowRecord::new("N", 0, 1000.0, 160.0, 40.0),
            FlowRecord::new("N", 1, 800.0, 100.0, 28.0),
        ]);
        let report = compare(&actuals, &estimator).unwrap();

        assert_eq!(report.warnings.len(), 3);
        assert_eq!(
            report.warnings[0].to_string(),
            "Large payment variance at month 0: 0.060"
        );
        assert!(matches!(
            report.warnings[1],
            VarianceWarning::LargeChargeoffVariance { month_on_book: 0, .. }
        ));
        assert!(matches!(
            report.warnings[2],
            VarianceWarning::LargeChargeoffVariance { month_on_book: 1, .. }
        ));
    }

    #[test]
    fn test_summary_statistics() {
        let estimator = trained();
        let actuals = FlowTable::from_records(vec![
            FlowRecord::new("N", 0, 1000.0, 130.0, 10.0),
            FlowRecord::new("N", 1, 860.0, 60.2, 8.6),
        ]);
        let report = compare(&actuals, &estimator).unwrap();
        let summary = report.summary.expect("summary for non-empty input");

        // Payment variances +0.03 and -0.03
        assert_relative_eq!(summary.mean_payment_variance, 0.0, epsilon = 1e-12);
        assert_relative_eq!(summary.rmse_payment, 0.03, epsilon = 1e-12);
        assert_relative_eq!(summary.mean_chargeoff_variance, 0.0, epsilon = 1e-12);
        assert_relative_eq!(summary.rmse_chargeoff, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_empty_input_has_no_summary() {
        let report = compare(&FlowTable::default(), &trained()).unwrap();
        assert!(report.rows.is_empty());
        assert!(report.summary.is_none());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["summary"], serde_json::json!({}));
    }
}
