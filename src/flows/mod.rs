//! Flow table data structures and CSV loading

mod data;
pub mod loader;

pub use data::{FlowRecord, FlowTable, REQUIRED_COLUMNS};
pub use loader::{load_flow_table, load_flow_table_from_reader};
