//! Load flow tables from delimited files

use super::{FlowRecord, FlowTable, REQUIRED_COLUMNS};
use crate::error::Result;
use csv::{Reader, StringRecord};
use log::debug;
use std::path::Path;

/// Raw CSV row matching the flow table columns
#[derive(Debug, serde::Deserialize)]
struct CsvRow {
    segment_id: String,
    month_on_book: i32,
    outstanding_balance: f64,
    payments: f64,
    chargeoffs: f64,
}

impl From<CsvRow> for FlowRecord {
    fn from(row: CsvRow) -> Self {
        FlowRecord {
            segment_id: row.segment_id,
            month_on_book: row.month_on_book,
            outstanding_balance: row.outstanding_balance,
            payments: row.payments,
            chargeoffs: row.chargeoffs,
        }
    }
}

fn read_table<R: std::io::Read>(mut reader: Reader<R>) -> Result<FlowTable> {
    let headers: StringRecord = reader.headers()?.clone();
    let columns: Vec<String> = headers.iter().map(|h| h.trim().to_string()).collect();

    // Without the full column set the rows cannot be typed; the validator reports it.
    let has_schema = REQUIRED_COLUMNS
        .iter()
        .all(|required| columns.iter().any(|c| c == required));
    if !has_schema {
        debug!("flow table header {:?} lacks required columns", columns);
        return Ok(FlowTable::with_columns(columns, Vec::new()));
    }

    let trimmed = StringRecord::from(columns.clone());
    let mut records = Vec::new();
    for result in reader.records() {
        let raw = result?;
        let row: CsvRow = raw.deserialize(Some(&trimmed))?;
        records.push(row.into());
    }

    debug!("loaded {} flow rows", records.len());
    Ok(FlowTable::with_columns(columns, records))
}

/// Load a flow table from a CSV file
pub fn load_flow_table<P: AsRef<Path>>(path: P) -> Result<FlowTable> {
    read_table(Reader::from_path(path)?)
}

/// Load a flow table from any reader (e.g., string buffer, network stream)
pub fn load_flow_table_from_reader<R: std::io::Read>(reader: R) -> Result<FlowTable> {
    read_table(Reader::from_reader(reader))
}
