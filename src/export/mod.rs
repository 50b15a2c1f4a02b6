//! Export functionality for simulation results.
//!
//! Provides CSV burden tables, cohort CSV export and JSON session snapshots.

mod csv_export;
mod json_export;

pub use csv_export::{export_burden_csv, write_burden_csv, CohortExporter, CohortRecord};
pub use json_export::{export_session_json, export_session_json_to, SessionExport};
