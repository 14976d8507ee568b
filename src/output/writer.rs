//! CSV writers for forecast output and hazard curve tables

use super::formatter::OutputRecord;
use crate::curves::HazardCurve;
use crate::error::Result;
use csv::Writer;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// Hazard curve inspection row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurveRow {
    pub month_on_book: i32,
    pub payment_hazard_rate: f64,
    pub chargeoff_hazard_rate: f64,
}

/// Smoothed rates at every trained age
pub fn curve_rows(curve: &HazardCurve) -> Vec<CurveRow> {
    curve
        .training_data
        .iter()
        .map(|r| CurveRow {
            month_on_book: r.month_on_book,
            payment_hazard_rate: r.payment_hazard_rate_smoothed,
            chargeoff_hazard_rate: r.chargeoff_hazard_rate_smoothed,
        })
        .collect()
}

fn write_rows<W: Write, T: Serialize>(writer: W, rows: &[T]) -> Result<()> {
    let mut csv_writer = Writer::from_writer(writer);
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write output rows to any writer
pub fn write_output<W: Write>(writer: W, rows: &[OutputRecord]) -> Result<()> {
    write_rows(writer, rows)
}

/// Write output rows to a CSV file
pub fn write_output_csv<P: AsRef<Path>>(path: P, rows: &[OutputRecord]) -> Result<()> {
    write_output(std::fs::File::create(path)?, rows)
}

/// Write the curve table to any writer
pub fn write_curves<W: Write>(writer: W, curve: &HazardCurve) -> Result<()> {
    write_rows(writer, &curve_rows(curve))
}

/// Write the curve table to a CSV file
pub fn write_curves_csv<P: AsRef<Path>>(path: P, curve: &HazardCurve) -> Result<()> {
    write_curves(std::fs::File::create(path)?, curve)
}
