//! Output formatting and tabular export

mod formatter;
pub mod writer;

pub use formatter::{ForecastSummary, OutputFormatter, OutputRecord};
pub use writer::{curve_rows, write_curves, write_curves_csv, write_output, write_output_csv, CurveRow};
