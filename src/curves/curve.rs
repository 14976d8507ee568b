//! Hazard curve storage and rate lookup

use crate::error::HazardError;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Which outflow a hazard rate describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HazardKind {
    Payment,
    Chargeoff,
}

impl HazardKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HazardKind::Payment => "payment",
            HazardKind::Chargeoff => "chargeoff",
        }
    }
}

impl fmt::Display for HazardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HazardKind {
    type Err = HazardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "payment" => Ok(HazardKind::Payment),
            "chargeoff" => Ok(HazardKind::Chargeoff),
            other => Err(HazardError::InvalidKind(other.to_string())),
        }
    }
}

/// Flows summed across every segment for one month on book
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRow {
    pub month_on_book: i32,
    pub outstanding_balance: f64,
    pub payments: f64,
    pub chargeoffs: f64,
    pub payment_hazard_rate: f64,
    pub chargeoff_hazard_rate: f64,
    pub payment_hazard_rate_smoothed: f64,
    pub chargeoff_hazard_rate_smoothed: f64,
}

/// A rate curve over integer ages, sorted ascending by age
///
/// Lookups binary-search the age axis: exact hits return the stored rate, ages
/// between two known points are interpolated linearly, and ages outside the
/// observed range take the nearest endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RateCurve {
    points: Vec<(i32, f64)>,
}

impl RateCurve {
    /// Build from `(age, rate)` pairs; input order does not matter
    pub fn from_points(mut points: Vec<(i32, f64)>) -> Self {
        points.sort_by_key(|&(age, _)| age);
        points.dedup_by_key(|&mut (age, _)| age);
        Self { points }
    }

    pub fn points(&self) -> &[(i32, f64)] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn min_age(&self) -> Option<i32> {
        self.points.first().map(|&(age, _)| age)
    }

    pub fn max_age(&self) -> Option<i32> {
        self.points.last().map(|&(age, _)| age)
    }

    /// Rate at `age` using exact lookup, linear interpolation or flat extrapolation
    pub fn rate_at(&self, age: i32) -> f64 {
        let (Some(&(_, first)), Some(&(_, last))) = (self.points.first(), self.points.last())
        else {
            return 0.0;
        };

        match self.points.binary_search_by_key(&age, |&(a, _)| a) {
            Ok(idx) => self.points[idx].1,
            Err(0) => first,
            Err(idx) if idx == self.points.len() => last,
            Err(idx) => {
                let (age_lo, r_lo) = self.points[idx - 1];
                let (age_hi, r_hi) = self.points[idx];
                let w = (age - age_lo) as f64 / (age_hi - age_lo) as f64;
                r_lo * (1.0 - w) + r_hi * w
            }
        }
    }
}

/// Trained payment and charge-off hazard curves
///
/// Immutable once built; retraining produces a new snapshot with a higher
/// `version`.
#[derive(Debug, Clone, Serialize)]
pub struct HazardCurve {
    pub version: u64,
    pub smoothing_window: usize,
    pub payment_hazard: RateCurve,
    pub chargeoff_hazard: RateCurve,
    /// Aggregate rows kept for diagnostics
    pub training_data: Vec<AggregateRow>,
}

impl HazardCurve {
    pub fn curve(&self, kind: HazardKind) -> &RateCurve {
        match kind {
            HazardKind::Payment => &self.payment_hazard,
            HazardKind::Chargeoff => &self.chargeoff_hazard,
        }
    }

    pub fn rate(&self, age: i32, kind: HazardKind) -> f64 {
        self.curve(kind).rate_at(age)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample() -> RateCurve {
        RateCurve::from_points(vec![(6, 0.02), (2, 0.10), (4, 0.06)])
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("payment".parse::<HazardKind>().unwrap(), HazardKind::Payment);
        assert_eq!("chargeoff".parse::<HazardKind>().unwrap(), HazardKind::Chargeoff);
        assert!(matches!(
            "prepayment".parse::<HazardKind>(),
            Err(HazardError::InvalidKind(ref k)) if k == "prepayment"
        ));
    }

    #[test]
    fn test_points_sorted() {
        let curve = sample();
        assert_eq!(curve.min_age(), Some(2));
        assert_eq!(curve.max_age(), Some(6));
    }

    #[test]
    fn test_exact_and_interpolated() {
        let curve = sample();
        assert_eq!(curve.rate_at(4), 0.06);
        assert_relative_eq!(curve.rate_at(3), 0.08, epsilon = 1e-12);
        assert_relative_eq!(curve.rate_at(5), 0.04, epsilon = 1e-12);
    }

    #[test]
    fn test_flat_extrapolation() {
        let curve = sample();
        assert_eq!(curve.rate_at(0), 0.10);
        assert_eq!(curve.rate_at(-5), 0.10);
        assert_eq!(curve.rate_at(7), 0.02);
        assert_eq!(curve.rate_at(600), 0.02);
    }

    #[test]
    fn test_uneven_spacing_weights() {
        let curve = RateCurve::from_points(vec![(0, 0.0), (10, 1.0)]);
        assert_relative_eq!(curve.rate_at(3), 0.3, epsilon = 1e-12);
    }

    #[test]
    fn test_empty_curve_returns_zero() {
        assert_eq!(RateCurve::default().rate_at(12), 0.0);
    }
}
