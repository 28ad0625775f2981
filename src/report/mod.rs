//! Report Sink
//!
//! ```text
//! engine output → ReportTable (name, typed columns, rows)
//!     → ReportWriter ─┬─ JSONL:  <dir>/<name>.jsonl   (tmp file + rename)
//!                     └─ SQLite: <name> table + report_catalog (one transaction)
//! ```

pub mod jsonl_writer;
pub mod sqlite_writer;
pub mod table;
pub mod writer;
pub mod writer_backend;

pub use table::{CellValue, Column, ColumnType, ReportTable};
pub use writer::ReportWriter;
pub use writer_backend::{ReportSink, ReportWriterError};
