//! Read-only accessor over the transactions store
//!
//! Opens the SQLite file the bulk loader produced, registers the shared SQL
//! functions and refuses any write. Engines only ever see this type.

use super::functions::register_analysis_functions;
use super::pragma::apply_read_pragmas;
use super::record::{
    label_from_class, Transaction, AMOUNT_COLUMN, LABEL_COLUMN, TIME_COLUMN, TRANSACTIONS_TABLE,
};
use crate::error::{AnalysisError, AnalysisResult, Stage};
use rusqlite::{Connection, OpenFlags, Params, Row};
use std::path::Path;

pub struct TransactionStore {
    conn: Connection,
}

impl TransactionStore {
    /// Open an existing store; a missing file is a data access error, never
    /// an empty database.
    pub fn open(db_path: impl AsRef<Path>) -> AnalysisResult<Self> {
        let db_path = db_path.as_ref();
        let conn = Connection::open_with_flags(
            db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        let store = Self::from_connection(conn)?;
        log::info!("📥 Transaction store opened: {}", db_path.display());
        Ok(store)
    }

    /// Wrap an already-populated connection (in-memory fixtures, tests)
    pub fn from_connection(conn: Connection) -> AnalysisResult<Self> {
        apply_read_pragmas(&conn)?;
        register_analysis_functions(&conn)?;
        Ok(Self { conn })
    }

    /// Fail with `SchemaMismatch` naming every absent column. A missing table
    /// reports the table itself.
    pub fn require_columns(&self, stage: Stage, columns: &[&str]) -> AnalysisResult<()> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM pragma_table_info(?1)")
            .map_err(|e| AnalysisError::from(e).in_stage(stage))?;
        let present = stmt
            .query_map([TRANSACTIONS_TABLE], |row| row.get::<_, String>(0))
            .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
            .map_err(|e| AnalysisError::from(e).in_stage(stage))?;

        if present.is_empty() {
            return Err(AnalysisError::SchemaMismatch {
                stage,
                missing: vec![format!("table {}", TRANSACTIONS_TABLE)],
            });
        }

        // SQLite identifiers are case-insensitive
        let missing: Vec<String> = columns
            .iter()
            .filter(|c| !present.iter().any(|p| p.eq_ignore_ascii_case(c)))
            .map(|c| c.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AnalysisError::SchemaMismatch { stage, missing })
        }
    }

    /// Run a read-only query and map every row
    pub fn query_rows<T, P, F>(&self, stage: Stage, sql: &str, params: P, f: F) -> AnalysisResult<Vec<T>>
    where
        P: Params,
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let run = || -> rusqlite::Result<Vec<T>> {
            let mut stmt = self.conn.prepare(sql)?;
            let mapped = stmt.query_map(params, f)?;
            let collected = mapped.collect::<rusqlite::Result<Vec<T>>>();
            collected
        };
        let rows = run().map_err(|e| AnalysisError::from(e).in_stage(stage))?;
        log::debug!("[{}] query returned {} rows", stage, rows.len());
        Ok(rows)
    }

    /// Run a read-only query expected to produce exactly one row
    pub fn query_one<T, P, F>(&self, stage: Stage, sql: &str, params: P, f: F) -> AnalysisResult<T>
    where
        P: Params,
        F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    {
        self.conn
            .query_row(sql, params, f)
            .map_err(|e| AnalysisError::from(e).in_stage(stage))
    }

    pub fn record_count(&self) -> AnalysisResult<u64> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", TRANSACTIONS_TABLE),
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Materialize `(id, time, amount, label)` for every record, in rowid order
    pub fn load_transactions(&self, stage: Stage) -> AnalysisResult<Vec<Transaction>> {
        self.require_columns(stage, &[TIME_COLUMN, AMOUNT_COLUMN, LABEL_COLUMN])?;

        let sql = format!(
            "SELECT rowid, {}, {}, {} FROM {} ORDER BY rowid",
            TIME_COLUMN, AMOUNT_COLUMN, LABEL_COLUMN, TRANSACTIONS_TABLE
        );
        let transactions = self.query_rows(stage, &sql, [], |row| {
            Ok(Transaction {
                id: row.get(0)?,
                time: row.get(1)?,
                amount: row.get(2)?,
                label: label_from_class(row.get(3)?),
            })
        })?;

        log::info!("[{}] 📥 Loaded {} transactions", stage, transactions.len());
        Ok(transactions)
    }
}
