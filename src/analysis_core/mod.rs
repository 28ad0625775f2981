//! Analysis Core - Aggregation, Outlier Scoring and Segmentation
//!
//! Every engine reads the store on its own and returns a materialized table;
//! none depends on another's output.
//!
//! # Architecture
//!
//! ```text
//! TransactionStore (read-only SQLite)
//!     ├─ AggregationEngine    → hourly stats, top amounts      (SQL)
//!     ├─ AnomalyScorer        → z-score outliers > 3σ          (SQL + stddev_pop)
//!     ├─ SegmentationEngine   → scaler + k-means, profiles     (in-process)
//!     └─ DistributionProfiler → histogram bins, scatter sample
//!             ↓
//!     ReportWriter → JSONL or SQLite backend
//! ```

pub mod aggregation;
pub mod anomaly;
pub mod distribution;
pub mod hour;
pub mod kmeans;
pub mod moments;
pub mod scaler;
pub mod segmentation;

pub use aggregation::{AggregationEngine, HourlyStat, TopAmount};
pub use anomaly::{AnomalyScorer, DistributionSummary, OutlierRecord, OutlierSet, Unscored};
pub use distribution::{DistributionProfiler, HistogramBin, SamplePoint};
pub use hour::hour_of_day;
pub use kmeans::{Clusterer, KMeans, KMeansFit};
pub use scaler::StandardScaler;
pub use segmentation::{
    SegmentAssignment, SegmentProfile, SegmentationEngine, SegmentationResult,
};

#[cfg(test)]
pub(crate) mod test_support {
    use crate::store::{create_transactions_table, insert_transactions, NewTransaction, TransactionStore};
    use rusqlite::Connection;

    pub fn fixture_store(rows: &[NewTransaction]) -> TransactionStore {
        let mut conn = Connection::open_in_memory().unwrap();
        create_transactions_table(&conn).unwrap();
        insert_transactions(&mut conn, rows).unwrap();
        TransactionStore::from_connection(conn).unwrap()
    }

    /// One row per amount, a minute apart, all labeled legitimate
    pub fn rows_with_amounts(amounts: &[f64]) -> Vec<NewTransaction> {
        amounts
            .iter()
            .enumerate()
            .map(|(i, &amount)| NewTransaction::new(i as f64 * 60.0, amount, 0))
            .collect()
    }
}
