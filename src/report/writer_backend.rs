//! Writer backend trait for report tables
//!
//! Defines the interface for persisting a finished [`ReportTable`] to a
//! backend. A call either replaces the whole artifact or leaves the previous
//! one in place.

use super::table::ReportTable;
use crate::error::AnalysisError;

#[derive(Debug)]
pub enum ReportWriterError {
    Io(std::io::Error),
    Serialization(serde_json::Error),
    Database(rusqlite::Error),
}

impl From<std::io::Error> for ReportWriterError {
    fn from(err: std::io::Error) -> Self {
        ReportWriterError::Io(err)
    }
}

impl From<serde_json::Error> for ReportWriterError {
    fn from(err: serde_json::Error) -> Self {
        ReportWriterError::Serialization(err)
    }
}

impl From<rusqlite::Error> for ReportWriterError {
    fn from(err: rusqlite::Error) -> Self {
        ReportWriterError::Database(err)
    }
}

impl std::fmt::Display for ReportWriterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportWriterError::Io(e) => write!(f, "IO error: {}", e),
            ReportWriterError::Serialization(e) => write!(f, "Serialization error: {}", e),
            ReportWriterError::Database(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for ReportWriterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReportWriterError::Io(e) => Some(e),
            ReportWriterError::Serialization(e) => Some(e),
            ReportWriterError::Database(e) => Some(e),
        }
    }
}

impl ReportWriterError {
    pub fn for_table(self, table: &str) -> AnalysisError {
        AnalysisError::Sink {
            table: table.to_string(),
            reason: self.to_string(),
        }
    }
}

/// Backend trait for writing report tables
pub trait ReportSink {
    /// Replace the artifact named `table.name` with this table's rows
    fn write_table(&mut self, table: &ReportTable) -> Result<(), ReportWriterError>;

    /// Get backend type for logging
    fn backend_type(&self) -> &'static str;
}
