//! Global z-score outlier detection on transaction amount
//!
//! # Policy
//! - Population standard deviation (divide by N): the table is the whole
//!   population under analysis, not a sample
//! - One-sided: only `z_score > threshold` (high amounts) is flagged
//! - Ranked by `z_score` descending, capped at `max_outliers`
//! - Zero or undefined spread means nothing is scored; the result carries the
//!   reason instead of dividing by zero

use crate::config::AnomalyConfig;
use crate::error::{AnalysisError, AnalysisResult, Stage};
use crate::store::record::AMOUNT_COLUMN;
use crate::store::TransactionStore;

/// Amount distribution over the full record set, recomputed per call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistributionSummary {
    pub count: u64,
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutlierRecord {
    pub id: i64,
    pub amount: f64,
    pub z_score: f64,
}

/// Why no record could be scored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unscored {
    EmptyInput,
    ZeroVariance,
    NonFiniteSpread,
}

impl Unscored {
    pub fn describe(&self) -> &'static str {
        match self {
            Unscored::EmptyInput => "no transactions to score",
            Unscored::ZeroVariance => "amount column has zero variance",
            Unscored::NonFiniteSpread => "amount mean/std is not finite",
        }
    }
}

#[derive(Debug, Clone)]
pub struct OutlierSet {
    pub summary: DistributionSummary,
    pub outliers: Vec<OutlierRecord>,
    /// `Some` when scoring was skipped; `outliers` is then empty
    pub unscored: Option<Unscored>,
}

impl OutlierSet {
    /// Turn a skipped scoring run into `DegenerateInput`
    pub fn require_scored(self) -> AnalysisResult<Self> {
        match self.unscored {
            Some(reason) => Err(AnalysisError::degenerate(
                Stage::AmountOutliers,
                reason.describe(),
            )),
            None => Ok(self),
        }
    }
}

const SUMMARY_SQL: &str = "SELECT COUNT(Amount), AVG(Amount), stddev_pop(Amount) FROM transactions";

// id breaks z_score ties so the cap is deterministic
const SCORED_SQL: &str = "
    WITH scored AS (
        SELECT rowid AS id, Amount, (Amount - ?1) / ?2 AS z_score
        FROM transactions
    )
    SELECT id, Amount, z_score
    FROM scored
    WHERE z_score > ?3
    ORDER BY z_score DESC, id ASC
    LIMIT ?4";

pub struct AnomalyScorer {
    config: AnomalyConfig,
}

impl AnomalyScorer {
    pub fn new(config: AnomalyConfig) -> Self {
        Self { config }
    }

    pub fn distribution_summary(&self, store: &TransactionStore) -> AnalysisResult<DistributionSummary> {
        let stage = Stage::AmountOutliers;
        store.require_columns(stage, &[AMOUNT_COLUMN])?;

        store.query_one(stage, SUMMARY_SQL, [], |row| {
            Ok(DistributionSummary {
                count: row.get::<_, i64>(0)? as u64,
                mean: row.get(1)?,
                std_dev: row.get(2)?,
            })
        })
    }

    /// Score every record and return the ranked, capped outlier set
    pub fn score(&self, store: &TransactionStore) -> AnalysisResult<OutlierSet> {
        let stage = Stage::AmountOutliers;
        let summary = self.distribution_summary(store)?;

        let (mean, std_dev) = match check_spread(&summary) {
            Ok(spread) => spread,
            Err(reason) => {
                log::warn!(
                    "[{}] ⚠️  Skipping z-score: {} (n={})",
                    stage,
                    reason.describe(),
                    summary.count
                );
                return Ok(OutlierSet {
                    summary,
                    outliers: Vec::new(),
                    unscored: Some(reason),
                });
            }
        };

        log::debug!(
            "[{}] amount distribution: n={} mean={:.4} std={:.4}",
            stage,
            summary.count,
            mean,
            std_dev
        );

        let limit = self.config.max_outliers as i64;
        let outliers = store.query_rows(
            stage,
            SCORED_SQL,
            rusqlite::params![mean, std_dev, self.config.z_threshold, limit],
            |row| {
                Ok(OutlierRecord {
                    id: row.get(0)?,
                    amount: row.get(1)?,
                    z_score: row.get(2)?,
                })
            },
        )?;

        log::info!(
            "[{}] 🚨 {} outliers above {}σ (cap {})",
            stage,
            outliers.len(),
            self.config.z_threshold,
            self.config.max_outliers
        );

        Ok(OutlierSet {
            summary,
            outliers,
            unscored: None,
        })
    }
}

fn check_spread(summary: &DistributionSummary) -> Result<(f64, f64), Unscored> {
    match (summary.mean, summary.std_dev) {
        _ if summary.count == 0 => Err(Unscored::EmptyInput),
        (Some(mean), Some(std_dev)) if mean.is_finite() && std_dev.is_finite() => {
            if std_dev == 0.0 {
                Err(Unscored::ZeroVariance)
            } else {
                Ok((mean, std_dev))
            }
        }
        (None, _) | (_, None) => Err(Unscored::EmptyInput),
        _ => Err(Unscored::NonFiniteSpread),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis_core::test_support::{fixture_store, rows_with_amounts};

    fn scorer() -> AnomalyScorer {
        AnomalyScorer::new(AnomalyConfig::default())
    }

    #[test]
    fn test_lenient_threshold_not_applied() {
        // 500 sits ~2σ above the mean, so nothing qualifies under 3σ
        let store = fixture_store(&rows_with_amounts(&[10.0, 12.0, 11.0, 9.0, 500.0]));
        let set = scorer().score(&store).unwrap();

        let mean = set.summary.mean.unwrap();
        let std_dev = set.summary.std_dev.unwrap();
        assert!((mean - 108.4).abs() < 1e-9);
        assert!((std_dev - 195.80).abs() < 0.01, "population std, got {}", std_dev);
        assert!(((500.0 - mean) / std_dev - 2.0).abs() < 0.01);

        assert!(set.outliers.is_empty());
        assert_eq!(set.unscored, None);
    }

    #[test]
    fn test_zero_variance_yields_empty_set() {
        let store = fixture_store(&rows_with_amounts(&[50.0; 5]));
        let set = scorer().score(&store).unwrap();

        assert!(set.outliers.is_empty());
        assert_eq!(set.unscored, Some(Unscored::ZeroVariance));
        assert_eq!(set.summary.std_dev, Some(0.0));

        let err = set.require_scored().unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::DegenerateInput { stage: Stage::AmountOutliers, .. }
        ));
    }

    #[test]
    fn test_empty_store_is_unscored() {
        let store = fixture_store(&[]);
        let set = scorer().score(&store).unwrap();
        assert!(set.outliers.is_empty());
        assert_eq!(set.unscored, Some(Unscored::EmptyInput));
    }

    #[test]
    fn test_single_high_amount_is_flagged() {
        // n-1 equal values and one spike: z of the spike is sqrt(n - 1)
        let mut amounts = vec![10.0; 20];
        amounts.push(1000.0);
        let store = fixture_store(&rows_with_amounts(&amounts));

        let set = scorer().score(&store).unwrap().require_scored().unwrap();
        assert_eq!(set.outliers.len(), 1);
        assert_eq!(set.outliers[0].id, 21);
        assert_eq!(set.outliers[0].amount, 1000.0);
        assert!((set.outliers[0].z_score - 20f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_outliers_ranked_and_capped() {
        let mut amounts = vec![1.0; 400];
        amounts.extend([900.0, 700.0, 1000.0, 800.0]);
        let store = fixture_store(&rows_with_amounts(&amounts));

        let all = scorer().score(&store).unwrap();
        assert_eq!(all.outliers.len(), 4);
        assert!(all.outliers.iter().all(|o| o.z_score > 3.0));
        assert!(all
            .outliers
            .windows(2)
            .all(|w| w[0].z_score > w[1].z_score));
        assert_eq!(all.outliers[0].amount, 1000.0);

        let capped = AnomalyScorer::new(AnomalyConfig {
            max_outliers: 2,
            ..AnomalyConfig::default()
        })
        .score(&store)
        .unwrap();
        assert_eq!(capped.outliers.len(), 2);
        assert_eq!(capped.outliers[0], all.outliers[0]);
        assert_eq!(capped.outliers[1], all.outliers[1]);
    }

    #[test]
    fn test_default_cap_keeps_top_thousand() {
        // 1500 spikes all clear 3σ, only the largest 1000 survive the cap
        let mut amounts = vec![1.0; 100_000];
        amounts.extend((0..1500).map(|i| 1000.0 + i as f64));
        let store = fixture_store(&rows_with_amounts(&amounts));

        let set = scorer().score(&store).unwrap();

        assert_eq!(set.outliers.len(), 1000);
        assert!(set.outliers.iter().all(|o| o.z_score > 3.0));
        assert!(set.outliers.windows(2).all(|w| w[0].z_score > w[1].z_score));
        assert_eq!(set.outliers[0].amount, 2499.0);
        assert_eq!(set.outliers[999].amount, 1500.0);
    }

    #[test]
    fn test_low_amounts_never_flagged() {
        let mut amounts = vec![1000.0; 30];
        amounts.push(0.0);
        let store = fixture_store(&rows_with_amounts(&amounts));

        let set = scorer().score(&store).unwrap();
        assert!(set.outliers.is_empty());
    }
}
