//! Flow table structures matching the cohort performance format

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Column names every flow table must carry (order-independent)
pub const REQUIRED_COLUMNS: [&str; 5] = [
    "segment_id",
    "month_on_book",
    "outstanding_balance",
    "payments",
    "chargeoffs",
];

/// One month of performance for one segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowRecord {
    /// Segment / vintage identifier
    pub segment_id: String,

    /// Months since origination (0, 1, 2, ...)
    ///
    /// Signed so that bad input reaches the validator instead of failing at parse time.
    pub month_on_book: i32,

    /// Balance at the START of the month (rate denominator)
    pub outstanding_balance: f64,

    /// Dollar payments made this month
    pub payments: f64,

    /// Dollar charge-offs this month
    pub chargeoffs: f64,
}

impl FlowRecord {
    pub fn new(
        segment_id: impl Into<String>,
        month_on_book: i32,
        outstanding_balance: f64,
        payments: f64,
        chargeoffs: f64,
    ) -> Self {
        Self {
            segment_id: segment_id.into(),
            month_on_book,
            outstanding_balance,
            payments,
            chargeoffs,
        }
    }

    /// Balance left after this month's outflows
    pub fn ending_balance(&self) -> f64 {
        self.outstanding_balance - self.payments - self.chargeoffs
    }
}

/// A collection of flow records plus the column set it was read with
///
/// Rows may arrive in any order; segments are independent time series keyed by
/// `segment_id`.
#[derive(Debug, Clone, Default)]
pub struct FlowTable {
    columns: Vec<String>,
    records: Vec<FlowRecord>,
}

impl FlowTable {
    /// Build a table from typed records (all required columns present by construction)
    pub fn from_records(records: Vec<FlowRecord>) -> Self {
        Self {
            columns: REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect(),
            records,
        }
    }

    /// Build a table from an external header and whatever records could be read under it
    pub fn with_columns(columns: Vec<String>, records: Vec<FlowRecord>) -> Self {
        Self { columns, records }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[FlowRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<FlowRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FlowRecord> {
        self.records.iter()
    }

    /// Required columns not present in the header, in canonical order
    pub fn missing_columns(&self) -> Vec<String> {
        REQUIRED_COLUMNS
            .iter()
            .filter(|required| !self.columns.iter().any(|c| c == *required))
            .map(|c| c.to_string())
            .collect()
    }

    /// Distinct segment ids, sorted
    pub fn segment_ids(&self) -> BTreeSet<&str> {
        self.records.iter().map(|r| r.segment_id.as_str()).collect()
    }

    /// Records grouped by segment, each group sorted by month on book
    pub fn by_segment(&self) -> BTreeMap<&str, Vec<&FlowRecord>> {
        let mut groups: BTreeMap<&str, Vec<&FlowRecord>> = BTreeMap::new();
        for record in &self.records {
            groups.entry(record.segment_id.as_str()).or_default().push(record);
        }
        for rows in groups.values_mut() {
            rows.sort_by_key(|r| r.month_on_book);
        }
        groups
    }

    /// Split into one owned table per segment, ordered by segment id
    pub fn split_by_segment(&self) -> Vec<(String, FlowTable)> {
        self.by_segment()
            .into_iter()
            .map(|(segment, rows)| {
                let records = rows.into_iter().cloned().collect();
                (segment.to_string(), FlowTable::with_columns(self.columns.clone(), records))
            })
            .collect()
    }

    /// Highest month on book present, if any
    pub fn max_age(&self) -> Option<i32> {
        self.records.iter().map(|r| r.month_on_book).max()
    }

    /// Sum of outstanding balance across every row
    pub fn total_volume(&self) -> f64 {
        self.records.iter().map(|r| r.outstanding_balance).sum()
    }
}

impl From<Vec<FlowRecord>> for FlowTable {
    fn from(records: Vec<FlowRecord>) -> Self {
        Self::from_records(records)
    }
}

impl<'a> IntoIterator for &'a FlowTable {
    type Item = &'a FlowRecord;
    type IntoIter = std::slice::Iter<'a, FlowRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FlowTable {
        FlowTable::from_records(vec![
            FlowRecord::new("B", 1, 500.0, 50.0, 5.0),
            FlowRecord::new("A", 1, 900.0, 90.0, 0.0),
            FlowRecord::new("A", 0, 1000.0, 100.0, 0.0),
            FlowRecord::new("B", 0, 600.0, 95.0, 5.0),
        ])
    }

    #[test]
    fn test_from_records_has_all_columns() {
        assert!(sample().missing_columns().is_empty());
    }

    #[test]
    fn test_missing_columns_reported_in_canonical_order() {
        let table = FlowTable::with_columns(
            vec!["chargeoffs".to_string(), "segment_id".to_string()],
            Vec::new(),
        );
        assert_eq!(
            table.missing_columns(),
            vec!["month_on_book", "outstanding_balance", "payments"]
        );
    }

    #[test]
    fn test_by_segment_sorts_each_group() {
        let table = sample();
        let groups = table.by_segment();
        let ages: Vec<i32> = groups["A"].iter().map(|r| r.month_on_book).collect();
        assert_eq!(ages, vec![0, 1]);
        assert_eq!(groups.keys().copied().collect::<Vec<_>>(), vec!["A", "B"]);
    }

    #[test]
    fn test_summary_helpers() {
        let table = sample();
        assert_eq!(table.max_age(), Some(1));
        assert_eq!(table.total_volume(), 3000.0);
        assert_eq!(table.segment_ids().len(), 2);
        assert_eq!(FlowRecord::new("A", 0, 1000.0, 100.0, 10.0).ending_balance(), 890.0);
    }
}
