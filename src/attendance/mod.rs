//! Attendance domain types and surfaces
//!
//! This module provides:
//! - `AttendanceRecord` / `AttendanceStatus` - the extracted roll-call entries
//! - CSV export with the fixed `Nombre,Estado,Fecha` layout
//! - `AttendanceStore` - the single JSON snapshot persisted between runs

mod csv;
mod store;

pub use csv::{export_filename, records_to_csv, write_csv};
pub use store::AttendanceStore;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a student answered the roll call.
///
/// The wire values are the Spanish strings the extraction model is
/// instructed to emit; they also appear verbatim in the CSV export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttendanceStatus {
    Presente,
    Ausente,
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttendanceStatus::Presente => write!(f, "Presente"),
            AttendanceStatus::Ausente => write!(f, "Ausente"),
        }
    }
}

/// One roll-call entry, produced only by the extraction call.
///
/// Names are not deduplicated: repeated mentions in the transcript yield
/// repeated records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    /// Student name as heard in the transcript
    pub name: String,
    /// Presente or Ausente
    pub status: AttendanceStatus,
    /// ISO-8601 date string (e.g. "2024-01-01")
    pub date: String,
}
