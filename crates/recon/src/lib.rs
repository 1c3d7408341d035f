//! `steep-recon`: report engine for sales spreadsheets.
//!
//! Pure engine crate: receives a raw input table and an injected
//! `DataSource`, returns labeled sheets. No file or database IO.

pub mod aggregate;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod matcher;
pub mod model;
pub mod registry;
pub mod source;
pub mod table;

pub use config::{ReportConfig, Strategy};
pub use engine::run;
pub use error::ReportError;
pub use model::{ReportBook, ReportSheet, ReportWarning, RunSummary};
pub use registry::ConfigRegistry;
pub use source::DataSource;
pub use table::{Scalar, Table};
