//! Forward projection of cohort balances from trained hazard curves

mod generator;
mod records;

pub use generator::{ForecastConfig, ForecastGenerator, OutflowPolicy, DEFAULT_BALANCE_FLOOR};
pub use records::{ForecastFlag, ForecastRecord};
