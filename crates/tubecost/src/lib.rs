//! `tubecost` - Daily production cost ledger for paper tubes
//!
//! This library derives per-tube costs from a day's raw production inputs,
//! keeps one record per day in an embedded or hosted `SQLite` store, and
//! serves the records over a JSON HTTP API.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod calculator;
pub mod cli;
pub mod config;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod record;
pub mod server;
pub mod storage;

pub use calculator::{calculate, Divisor, DivisorPolicy};
pub use config::{Backend, Config};
pub use error::{Error, Result};
pub use ledger::Ledger;
pub use logging::init_logging;
pub use record::{
    CalculatedRecord, CalculationPreview, CostBreakdown, ProductionInputs, ProductionRecord,
};
pub use storage::RecordStore;
