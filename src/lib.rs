//! fraudscope - batch analytics over a labeled card-transaction store
//!
//! Reads a bulk-loaded SQLite store, computes hourly aggregates, amount
//! outliers, behavioral segments and distribution tables, and writes each one
//! as a named report table.

pub mod analysis_core;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod store;

pub use config::{AnalysisConfig, BackendType, ConfigError};
pub use error::{AnalysisError, AnalysisResult, Stage};
pub use pipeline::{AnalysisPipeline, RunSummary, StageOutput, StageReport};
pub use report::{ReportSink, ReportWriter};
pub use store::TransactionStore;
