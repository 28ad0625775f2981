//! JSONL report writer - one `<name>.jsonl` file per table, one object per row

use super::table::ReportTable;
use super::writer_backend::{ReportSink, ReportWriterError};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub struct JsonlReportWriter {
    base_path: PathBuf,
}

impl JsonlReportWriter {
    pub fn new(base_path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path)?;
        log::info!("📝 Writing JSONL reports to: {}", base_path.display());
        Ok(Self { base_path })
    }

    pub fn table_path(&self, name: &str) -> PathBuf {
        self.base_path.join(format!("{}.jsonl", name))
    }

    fn write_rows(path: &Path, table: &ReportTable) -> Result<(), ReportWriterError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        for row in &table.rows {
            serde_json::to_writer(&mut writer, &table.row_object(row))?;
            writer.write_all(b"\n")?;
        }

        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        Ok(())
    }
}

impl ReportSink for JsonlReportWriter {
    fn write_table(&mut self, table: &ReportTable) -> Result<(), ReportWriterError> {
        let final_path = self.table_path(&table.name);
        let tmp_path = self.base_path.join(format!(".{}.jsonl.tmp", table.name));

        // Readers only ever see the old file or the complete new one
        if let Err(e) = Self::write_rows(&tmp_path, table) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }
        fs::rename(&tmp_path, &final_path)?;

        log::debug!(
            "✅ {} rows written to {}",
            table.row_count(),
            final_path.display()
        );
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "JSONL"
    }
}
