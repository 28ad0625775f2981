//! Hourly aggregation and top-amount ranking, both run inside the store

use crate::config::AggregationConfig;
use crate::error::{AnalysisResult, Stage};
use crate::store::record::{label_from_class, AMOUNT_COLUMN, LABEL_COLUMN, TIME_COLUMN};
use crate::store::TransactionStore;

#[derive(Debug, Clone, PartialEq)]
pub struct HourlyStat {
    pub hour_of_day: i64,
    pub txn_count: i64,
    pub fraud_count: i64,
    pub avg_amount: f64,
    pub max_amount: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TopAmount {
    pub id: i64,
    pub amount: f64,
    pub time: f64,
    pub label: Option<bool>,
}

const HOURLY_STATS_SQL: &str = "
    SELECT hour_of_day(Time) AS hour_of_day,
           COUNT(*) AS txn_count,
           SUM(CASE WHEN Class = 1 THEN 1 ELSE 0 END) AS fraud_count,
           AVG(Amount) AS avg_amount,
           MAX(Amount) AS max_amount
    FROM transactions
    GROUP BY hour_of_day
    ORDER BY hour_of_day";

// rowid extends the sort key so equal amounts come back in load order
const TOP_AMOUNTS_SQL: &str = "
    SELECT rowid AS id, Amount, Time, Class
    FROM transactions
    ORDER BY Amount DESC, rowid ASC
    LIMIT ?1";

pub struct AggregationEngine {
    config: AggregationConfig,
}

impl AggregationEngine {
    pub fn new(config: AggregationConfig) -> Self {
        Self { config }
    }

    /// One row per hour present in the data, ascending by hour
    pub fn hourly_stats(&self, store: &TransactionStore) -> AnalysisResult<Vec<HourlyStat>> {
        let stage = Stage::HourlyStats;
        store.require_columns(stage, &[TIME_COLUMN, AMOUNT_COLUMN, LABEL_COLUMN])?;

        let stats = store.query_rows(stage, HOURLY_STATS_SQL, [], |row| {
            Ok(HourlyStat {
                hour_of_day: row.get(0)?,
                txn_count: row.get(1)?,
                fraud_count: row.get(2)?,
                avg_amount: row.get(3)?,
                max_amount: row.get(4)?,
            })
        })?;

        log::info!("[{}] 📊 {} hourly buckets", stage, stats.len());
        Ok(stats)
    }

    /// Largest `top_n` transactions by amount
    pub fn top_amounts(&self, store: &TransactionStore) -> AnalysisResult<Vec<TopAmount>> {
        let stage = Stage::TopAmounts;
        store.require_columns(stage, &[TIME_COLUMN, AMOUNT_COLUMN, LABEL_COLUMN])?;

        let limit = self.config.top_n as i64;
        let rows = store.query_rows(stage, TOP_AMOUNTS_SQL, [limit], |row| {
            Ok(TopAmount {
                id: row.get(0)?,
                amount: row.get(1)?,
                time: row.get(2)?,
                label: label_from_class(row.get(3)?),
            })
        })?;

        log::info!("[{}] 💰 {} top transactions by amount", stage, rows.len());
        Ok(rows)
    }
}
