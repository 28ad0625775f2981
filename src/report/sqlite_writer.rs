//! SQLite report writer
//!
//! One table per artifact plus `report_catalog(name, row_count, generated_at)`.
//! Drop, create, insert and the catalog upsert share one transaction.

use super::table::ReportTable;
use super::writer_backend::{ReportSink, ReportWriterError};
use crate::store::pragma::apply_write_pragmas;
use rusqlite::{params, params_from_iter, Connection};
use std::fs;
use std::path::Path;

const CATALOG_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS report_catalog (
        name TEXT PRIMARY KEY,
        row_count INTEGER NOT NULL,
        generated_at TEXT NOT NULL
    )";

const CATALOG_UPSERT: &str = "
    INSERT INTO report_catalog (name, row_count, generated_at)
    VALUES (?1, ?2, ?3)
    ON CONFLICT(name) DO UPDATE SET
        row_count = excluded.row_count,
        generated_at = excluded.generated_at";

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub struct SqliteReportWriter {
    conn: Connection,
}

impl SqliteReportWriter {
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self, ReportWriterError> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(db_path)?;
        apply_write_pragmas(&conn)?;
        conn.execute(CATALOG_SCHEMA, [])?;

        log::info!("✅ SQLite report writer initialized: {}", db_path.display());
        Ok(Self { conn })
    }

    fn create_sql(table: &ReportTable) -> String {
        let columns: Vec<String> = table
            .columns
            .iter()
            .map(|c| format!("{} {}", quote_ident(c.name), c.kind.sql_type()))
            .collect();
        format!(
            "CREATE TABLE {} ({})",
            quote_ident(&table.name),
            columns.join(", ")
        )
    }

    fn insert_sql(table: &ReportTable) -> String {
        let names: Vec<String> = table.columns.iter().map(|c| quote_ident(c.name)).collect();
        let placeholders: Vec<String> = (1..=table.columns.len()).map(|i| format!("?{}", i)).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(&table.name),
            names.join(", "),
            placeholders.join(", ")
        )
    }
}

impl ReportSink for SqliteReportWriter {
    fn write_table(&mut self, table: &ReportTable) -> Result<(), ReportWriterError> {
        let tx = self.conn.transaction()?;

        tx.execute(&format!("DROP TABLE IF EXISTS {}", quote_ident(&table.name)), [])?;
        tx.execute(&Self::create_sql(table), [])?;
        {
            let mut stmt = tx.prepare(&Self::insert_sql(table))?;
            for row in &table.rows {
                stmt.execute(params_from_iter(row.iter()))?;
            }
        }
        tx.execute(
            CATALOG_UPSERT,
            params![
                table.name,
                table.row_count() as i64,
                table.generated_at.to_rfc3339()
            ],
        )?;
        tx.commit()?;

        log::debug!("✅ {} rows written to table {}", table.row_count(), table.name);
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "SQLite"
    }
}
