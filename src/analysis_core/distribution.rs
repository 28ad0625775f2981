//! Tables behind the amount histogram and time-vs-amount scatter figures

use crate::config::DistributionConfig;
use crate::error::{AnalysisResult, Stage};
use crate::store::record::{AMOUNT_COLUMN, TIME_COLUMN};
use crate::store::TransactionStore;
use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Debug, Clone, PartialEq)]
pub struct HistogramBin {
    pub bin: usize,
    pub lower: f64,
    pub upper: f64,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SamplePoint {
    pub id: i64,
    pub time: f64,
    pub amount: f64,
}

const RANGE_SQL: &str =
    "SELECT COUNT(Amount), MIN(Amount), MAX(Amount) FROM transactions WHERE Amount IS NOT NULL";

// Two-argument MIN folds the maximum amount into the last (closed) bin
const BIN_COUNTS_SQL: &str = "
    SELECT MIN(CAST((Amount - ?1) / ?2 AS INTEGER), ?3 - 1) AS bin, COUNT(*)
    FROM transactions
    WHERE Amount IS NOT NULL
    GROUP BY bin
    ORDER BY bin";

const POINTS_SQL: &str = "SELECT rowid, Time, Amount FROM transactions ORDER BY rowid";

pub struct DistributionProfiler {
    config: DistributionConfig,
}

impl DistributionProfiler {
    pub fn new(config: DistributionConfig) -> Self {
        Self { config }
    }

    /// Equal-width bins over `[min, max]` of amount; every bin is reported,
    /// including empty ones
    pub fn amount_histogram(&self, store: &TransactionStore) -> AnalysisResult<Vec<HistogramBin>> {
        let stage = Stage::AmountHistogram;
        store.require_columns(stage, &[AMOUNT_COLUMN])?;

        let (count, min, max): (i64, Option<f64>, Option<f64>) =
            store.query_one(stage, RANGE_SQL, [], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })?;

        let (min, max) = match (min, max) {
            (Some(min), Some(max)) if count > 0 => (min, max),
            _ => {
                log::info!("[{}] no amounts to bin", stage);
                return Ok(Vec::new());
            }
        };

        if min == max {
            return Ok(vec![HistogramBin {
                bin: 0,
                lower: min,
                upper: max,
                count: count as u64,
            }]);
        }

        let bins = self.config.histogram_bins.max(1);
        let width = (max - min) / bins as f64;
        let counted = store.query_rows(
            stage,
            BIN_COUNTS_SQL,
            rusqlite::params![min, width, bins as i64],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
        )?;

        let mut histogram: Vec<HistogramBin> = (0..bins)
            .map(|bin| HistogramBin {
                bin,
                lower: min + bin as f64 * width,
                upper: if bin + 1 == bins {
                    max
                } else {
                    min + (bin + 1) as f64 * width
                },
                count: 0,
            })
            .collect();

        for (bin, n) in counted {
            let idx = (bin.max(0) as usize).min(bins - 1);
            histogram[idx].count += n as u64;
        }

        log::info!("[{}] 📊 {} amounts in {} bins", stage, count, bins);
        Ok(histogram)
    }

    /// Seeded uniform sample without replacement, returned in id order
    pub fn time_amount_sample(&self, store: &TransactionStore) -> AnalysisResult<Vec<SamplePoint>> {
        let stage = Stage::TimeAmountSample;
        // Only time and amount are plotted; the label column is not required
        store.require_columns(stage, &[TIME_COLUMN, AMOUNT_COLUMN])?;

        let points = store.query_rows(stage, POINTS_SQL, [], |row| {
            Ok(SamplePoint {
                id: row.get(0)?,
                time: row.get(1)?,
                amount: row.get(2)?,
            })
        })?;
        let total = points.len();

        let amount = self.config.sample_size.min(total);
        let mut rng = StdRng::seed_from_u64(self.config.sample_seed);
        let mut picked = rand::seq::index::sample(&mut rng, total, amount).into_vec();
        picked.sort_unstable();

        let sample: Vec<SamplePoint> = picked.into_iter().map(|idx| points[idx].clone()).collect();

        log::info!(
            "[{}] 🎯 sampled {} of {} transactions",
            stage,
            sample.len(),
            total
        );
        Ok(sample)
    }
}
