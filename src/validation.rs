//! Shape, range and consistency checks for flow tables
//!
//! Fatal problems (missing columns, negative ages or flows) are collected as
//! [`ValidationError`]s and make the report invalid. Everything else is an
//! advisory [`ValidationWarning`] that never blocks training or forecasting.

use crate::error::{HazardError, Result};
use crate::flows::FlowTable;
use log::{debug, warn};
use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// Tolerance for the balance roll-forward check
pub const BALANCE_FLOW_TOLERANCE: f64 = 0.01;

/// Fatal validation findings
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    /// Required columns absent; no further checks were run
    MissingColumns { missing: Vec<String> },
    NegativeMonthOnBook,
    NegativePayments,
    NegativeChargeoffs,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::MissingColumns { missing } => {
                write!(f, "Missing required columns: {}", missing.join(", "))
            }
            ValidationError::NegativeMonthOnBook => write!(f, "month_on_book cannot be negative"),
            ValidationError::NegativePayments => write!(f, "Negative payments detected"),
            ValidationError::NegativeChargeoffs => write!(f, "Negative chargeoffs detected"),
        }
    }
}

/// Advisory validation findings
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationWarning {
    NonPositiveBalance,
    PaymentRateAboveOne,
    ChargeoffRateAboveOne,
    /// First month in a segment whose ending balance does not match the next opening balance
    BalanceFlowInconsistency {
        segment_id: String,
        month_on_book: i32,
        implied_next_balance: f64,
        next_balance: f64,
    },
    /// Ages absent between a segment's first and last observed month, as inclusive ranges
    MissingMonths {
        segment_id: String,
        gaps: Vec<(i32, i32)>,
        missing_count: u64,
    },
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationWarning::NonPositiveBalance => {
                write!(f, "Zero or negative outstanding_balance detected")
            }
            ValidationWarning::PaymentRateAboveOne => write!(f, "Payment rates > 100% detected"),
            ValidationWarning::ChargeoffRateAboveOne => {
                write!(f, "Chargeoff rates > 100% detected")
            }
            ValidationWarning::BalanceFlowInconsistency {
                segment_id,
                month_on_book,
                ..
            } => write!(
                f,
                "Balance flow inconsistency in segment {} at month {}",
                segment_id, month_on_book
            ),
            ValidationWarning::MissingMonths { segment_id, gaps, .. } => {
                let listed: Vec<String> = gaps
                    .iter()
                    .map(|&(from, to)| {
                        if from == to {
                            from.to_string()
                        } else {
                            format!("{}-{}", from, to)
                        }
                    })
                    .collect();
                write!(f, "Missing months in segment {}: {}", segment_id, listed.join(", "))
            }
        }
    }
}

/// Outcome of validating one flow table
///
/// Serializes as `{valid, errors, warnings}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Convert an invalid report into the matching typed error
    pub fn into_result(self) -> Result<ValidationReport> {
        if self.is_valid() {
            return Ok(self);
        }

        let missing = self.errors.iter().find_map(|e| match e {
            ValidationError::MissingColumns { missing } => Some(missing.clone()),
            _ => None,
        });

        match missing {
            Some(missing) => Err(HazardError::Schema { missing }),
            None => Err(HazardError::BusinessRule { errors: self.errors }),
        }
    }
}

impl Serialize for ValidationReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ValidationReport", 3)?;
        state.serialize_field("valid", &self.is_valid())?;
        state.serialize_field("errors", &self.errors)?;
        state.serialize_field("warnings", &self.warnings)?;
        state.end()
    }
}

/// Stateless flow table validator
#[derive(Debug, Clone, Copy, Default)]
pub struct Validator;

impl Validator {
    pub fn new() -> Self {
        Self
    }

    /// Validate structure, ranges, roll-forward consistency and completeness
    pub fn validate(&self, table: &FlowTable) -> ValidationReport {
        let mut report = ValidationReport::default();

        let missing = table.missing_columns();
        if !missing.is_empty() {
            report.errors.push(ValidationError::MissingColumns { missing });
            return report;
        }

        check_ranges(table, &mut report);
        check_balance_flow(table, &mut report);
        check_completeness(table, &mut report);

        if !report.errors.is_empty() {
            warn!("flow table has {} validation error(s)", report.errors.len());
        }
        if !report.warnings.is_empty() {
            debug!("flow table has {} validation warning(s)", report.warnings.len());
        }

        report
    }
}

fn check_ranges(table: &FlowTable, report: &mut ValidationReport) {
    let rows = table.records();

    if rows.iter().any(|r| r.month_on_book < 0) {
        report.errors.push(ValidationError::NegativeMonthOnBook);
    }

    if rows.iter().any(|r| r.outstanding_balance <= 0.0) {
        report.warnings.push(ValidationWarning::NonPositiveBalance);
    }

    if rows.iter().any(|r| r.payments < 0.0) {
        report.errors.push(ValidationError::NegativePayments);
    }

    if rows.iter().any(|r| r.chargeoffs < 0.0) {
        report.errors.push(ValidationError::NegativeChargeoffs);
    }

    // IEEE division: a positive flow against a zero balance is an infinite rate.
    if rows.iter().any(|r| r.payments / r.outstanding_balance > 1.0) {
        report.warnings.push(ValidationWarning::PaymentRateAboveOne);
    }

    if rows.iter().any(|r| r.chargeoffs / r.outstanding_balance > 1.0) {
        report.warnings.push(ValidationWarning::ChargeoffRateAboveOne);
    }
}

fn check_balance_flow(table: &FlowTable, report: &mut ValidationReport) {
    for (segment_id, rows) in table.by_segment() {
        let drift = rows.windows(2).find(|pair| {
            (pair[0].ending_balance() - pair[1].outstanding_balance).abs() > BALANCE_FLOW_TOLERANCE
        });

        if let Some(pair) = drift {
            report.warnings.push(ValidationWarning::BalanceFlowInconsistency {
                segment_id: segment_id.to_string(),
                month_on_book: pair[0].month_on_book,
                implied_next_balance: pair[0].ending_balance(),
                next_balance: pair[1].outstanding_balance,
            });
        }
    }
}

fn check_completeness(table: &FlowTable, report: &mut ValidationReport) {
    for (segment_id, rows) in table.by_segment() {
        let months: BTreeSet<i32> = rows.iter().map(|r| r.month_on_book).collect();

        // Walk neighbouring observed ages so the cost tracks rows, not the age span
        let gaps: Vec<(i32, i32)> = months
            .iter()
            .zip(months.iter().skip(1))
            .filter(|&(&prev, &next)| i64::from(next) - i64::from(prev) > 1)
            .map(|(&prev, &next)| (prev + 1, next - 1))
            .collect();

        if !gaps.is_empty() {
            let missing_count = gaps
                .iter()
                .map(|&(from, to)| (i64::from(to) - i64::from(from) + 1) as u64)
                .sum();
            report.warnings.push(ValidationWarning::MissingMonths {
                segment_id: segment_id.to_string(),
                gaps,
                missing_count,
            });
        }
    }
}
