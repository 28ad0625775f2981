//! Named, typed tables handed to the report sink
//!
//! Column names and order here are the artifact layout; sinks persist them
//! verbatim and never reorder rows.

use crate::analysis_core::{
    HistogramBin, HourlyStat, OutlierSet, SamplePoint, SegmentationResult, TopAmount,
};
use chrono::{DateTime, Utc};
use rusqlite::types::{ToSql, ToSqlOutput, Value};
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

pub const HOURLY_STATS_TABLE: &str = "sql_hourly_stats";
pub const OUTLIERS_TABLE: &str = "sql_amount_zscore_outliers";
pub const TOP_AMOUNTS_TABLE: &str = "sql_top_amounts";
pub const SEGMENT_SUMMARY_TABLE: &str = "segment_summary";
pub const AMOUNT_HISTOGRAM_TABLE: &str = "amount_histogram";
pub const TIME_AMOUNT_SAMPLE_TABLE: &str = "time_amount_sample";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Real,
}

impl ColumnType {
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnType,
}

const fn int(name: &'static str) -> Column {
    Column {
        name,
        kind: ColumnType::Integer,
    }
}

const fn real(name: &'static str) -> Column {
    Column {
        name,
        kind: ColumnType::Real,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Integer(i64),
    Real(f64),
    Null,
}

impl From<i64> for CellValue {
    fn from(v: i64) -> Self {
        CellValue::Integer(v)
    }
}

impl From<u64> for CellValue {
    fn from(v: u64) -> Self {
        CellValue::Integer(v as i64)
    }
}

impl From<usize> for CellValue {
    fn from(v: usize) -> Self {
        CellValue::Integer(v as i64)
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::Real(v)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(CellValue::Null, Into::into)
    }
}

impl ToSql for CellValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::Owned(match self {
            CellValue::Integer(v) => Value::Integer(*v),
            CellValue::Real(v) => Value::Real(*v),
            CellValue::Null => Value::Null,
        }))
    }
}

fn label_cell(label: Option<bool>) -> CellValue {
    label.map(|fraud| fraud as i64).into()
}

#[derive(Debug, Clone)]
pub struct ReportTable {
    pub name: String,
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<CellValue>>,
    pub generated_at: DateTime<Utc>,
}

impl ReportTable {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
            generated_at: Utc::now(),
        }
    }

    pub fn push_row(&mut self, row: Vec<CellValue>) {
        debug_assert_eq!(row.len(), self.columns.len(), "row width mismatch in {}", self.name);
        self.rows.push(row);
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    /// Row as a JSON object keyed by column name
    pub fn row_object(&self, row: &[CellValue]) -> Map<String, JsonValue> {
        self.columns
            .iter()
            .zip(row)
            .map(|(col, cell)| {
                let value = serde_json::to_value(cell).unwrap_or(JsonValue::Null);
                (col.name.to_string(), value)
            })
            .collect()
    }
}

pub fn hourly_stats_table(stats: &[HourlyStat]) -> ReportTable {
    let mut table = ReportTable::new(
        HOURLY_STATS_TABLE,
        vec![
            int("hour_of_day"),
            int("txn_count"),
            int("fraud_count"),
            real("avg_amount"),
            real("max_amount"),
        ],
    );
    for s in stats {
        table.push_row(vec![
            s.hour_of_day.into(),
            s.txn_count.into(),
            s.fraud_count.into(),
            s.avg_amount.into(),
            s.max_amount.into(),
        ]);
    }
    table
}

pub fn outliers_table(set: &OutlierSet) -> ReportTable {
    let mut table = ReportTable::new(
        OUTLIERS_TABLE,
        vec![int("id"), real("amount"), real("z_score")],
    );
    for o in &set.outliers {
        table.push_row(vec![o.id.into(), o.amount.into(), o.z_score.into()]);
    }
    table
}

pub fn top_amounts_table(rows: &[TopAmount]) -> ReportTable {
    let mut table = ReportTable::new(
        TOP_AMOUNTS_TABLE,
        vec![int("id"), real("amount"), real("time"), int("label")],
    );
    for t in rows {
        table.push_row(vec![
            t.id.into(),
            t.amount.into(),
            t.time.into(),
            label_cell(t.label),
        ]);
    }
    table
}

pub fn segment_summary_table(result: &SegmentationResult) -> ReportTable {
    let mut table = ReportTable::new(
        SEGMENT_SUMMARY_TABLE,
        vec![int("segment"), int("txns"), real("avg_amount"), real("pct_fraud")],
    );
    for p in &result.profiles {
        table.push_row(vec![
            p.segment.into(),
            p.txns.into(),
            p.avg_amount.into(),
            p.pct_fraud.into(),
        ]);
    }
    table
}

pub fn amount_histogram_table(bins: &[HistogramBin]) -> ReportTable {
    let mut table = ReportTable::new(
        AMOUNT_HISTOGRAM_TABLE,
        vec![int("bin"), real("lower"), real("upper"), int("count")],
    );
    for b in bins {
        table.push_row(vec![
            b.bin.into(),
            b.lower.into(),
            b.upper.into(),
            b.count.into(),
        ]);
    }
    table
}

pub fn time_amount_sample_table(points: &[SamplePoint]) -> ReportTable {
    let mut table = ReportTable::new(
        TIME_AMOUNT_SAMPLE_TABLE,
        vec![int("id"), real("time"), real("amount")],
    );
    for p in points {
        table.push_row(vec![p.id.into(), p.time.into(), p.amount.into()]);
    }
    table
}
