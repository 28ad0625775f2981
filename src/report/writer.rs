//! Unified report writer
//!
//! Routes tables to either the JSONL or the SQLite backend based on configuration.

use super::jsonl_writer::JsonlReportWriter;
use super::sqlite_writer::SqliteReportWriter;
use super::table::ReportTable;
use super::writer_backend::{ReportSink, ReportWriterError};
use crate::config::{BackendType, OutputConfig};

/// Unified writer that routes to either JSONL or SQLite backend
pub enum ReportWriter {
    Jsonl(JsonlReportWriter),
    Sqlite(SqliteReportWriter),
}

impl ReportWriter {
    pub fn new(output: &OutputConfig) -> Result<Self, ReportWriterError> {
        match output.backend {
            BackendType::Jsonl => Ok(ReportWriter::Jsonl(JsonlReportWriter::new(&output.path)?)),
            BackendType::Sqlite => Ok(ReportWriter::Sqlite(SqliteReportWriter::new(&output.path)?)),
        }
    }
}

impl ReportSink for ReportWriter {
    fn write_table(&mut self, table: &ReportTable) -> Result<(), ReportWriterError> {
        match self {
            ReportWriter::Jsonl(w) => w.write_table(table),
            ReportWriter::Sqlite(w) => w.write_table(table),
        }
    }

    fn backend_type(&self) -> &'static str {
        match self {
            ReportWriter::Jsonl(w) => w.backend_type(),
            ReportWriter::Sqlite(w) => w.backend_type(),
        }
    }
}
