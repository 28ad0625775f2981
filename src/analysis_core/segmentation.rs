//! Behavioral segmentation over `[amount, hour_of_day]`
//!
//! # Pipeline
//!
//! ```text
//! transactions → [amount, hour_of_day] → StandardScaler (fit here)
//!     → Clusterer::fit_predict (k segments) → per-segment profile
//! ```
//!
//! Segment ids carry no meaning beyond the seed that produced them.

use super::hour::hour_of_day;
use super::kmeans::{Clusterer, KMeans};
use super::scaler::StandardScaler;
use crate::config::SegmentationConfig;
use crate::error::{AnalysisError, AnalysisResult, Stage};
use crate::store::{Transaction, TransactionStore};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentAssignment {
    pub id: i64,
    pub segment: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SegmentProfile {
    pub segment: usize,
    pub txns: u64,
    pub avg_amount: f64,
    /// `100 * mean(label)` over labeled rows; `None` if no row is labeled
    pub pct_fraud: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct SegmentationResult {
    pub assignments: Vec<SegmentAssignment>,
    pub profiles: Vec<SegmentProfile>,
}

/// The two clustering features for one transaction
pub fn segment_features(txn: &Transaction) -> Vec<f64> {
    vec![txn.amount, hour_of_day(txn.time) as f64]
}

pub struct SegmentationEngine<C: Clusterer = KMeans> {
    clusterer: C,
}

impl SegmentationEngine<KMeans> {
    pub fn new(config: &SegmentationConfig) -> Self {
        Self {
            clusterer: KMeans::new(config),
        }
    }
}

impl<C: Clusterer> SegmentationEngine<C> {
    pub fn with_clusterer(clusterer: C) -> Self {
        Self { clusterer }
    }

    pub fn run(&self, store: &TransactionStore) -> AnalysisResult<SegmentationResult> {
        let transactions = store.load_transactions(Stage::Segmentation)?;
        self.segment(&transactions)
    }

    pub fn segment(&self, transactions: &[Transaction]) -> AnalysisResult<SegmentationResult> {
        let stage = Stage::Segmentation;
        let k = self.clusterer.n_clusters();

        let features: Vec<Vec<f64>> = transactions.iter().map(segment_features).collect();

        let distinct = distinct_points(&features);
        if distinct < k {
            return Err(AnalysisError::degenerate(
                stage,
                format!(
                    "{} distinct (amount, hour_of_day) points across {} transactions, need at least {} for {} segments",
                    distinct,
                    transactions.len(),
                    k,
                    k
                ),
            ));
        }

        let (scaler, scaled) = StandardScaler::fit_transform(&features);
        log::debug!(
            "[{}] scaler fit: means={:?} scales={:?}",
            stage,
            scaler.means(),
            scaler.scales()
        );

        let labels = self.clusterer.fit_predict(&scaled)?;
        if labels.len() != transactions.len() {
            return Err(AnalysisError::degenerate(
                stage,
                format!(
                    "clusterer returned {} labels for {} transactions",
                    labels.len(),
                    transactions.len()
                ),
            ));
        }
        if let Some(bad) = labels.iter().find(|&&l| l >= k) {
            return Err(AnalysisError::degenerate(
                stage,
                format!("clusterer returned segment {} outside [0, {})", bad, k),
            ));
        }

        let profiles = profile_segments(transactions, &labels, k)?;
        let assignments = transactions
            .iter()
            .zip(&labels)
            .map(|(txn, &segment)| SegmentAssignment { id: txn.id, segment })
            .collect();

        log::info!(
            "[{}] 🧩 {} transactions in {} segments",
            stage,
            transactions.len(),
            k
        );

        Ok(SegmentationResult {
            assignments,
            profiles,
        })
    }
}

fn distinct_points(features: &[Vec<f64>]) -> usize {
    features
        .iter()
        // +0.0 folds -0.0 into 0.0 before comparing bit patterns
        .map(|row| row.iter().map(|v| (v + 0.0).to_bits()).collect::<Vec<u64>>())
        .collect::<HashSet<_>>()
        .len()
}

#[derive(Default)]
struct SegmentTally {
    txns: u64,
    amount_sum: f64,
    labeled: u64,
    frauds: u64,
}

fn profile_segments(
    transactions: &[Transaction],
    labels: &[usize],
    k: usize,
) -> AnalysisResult<Vec<SegmentProfile>> {
    let mut tallies: Vec<SegmentTally> = (0..k).map(|_| SegmentTally::default()).collect();

    for (txn, &segment) in transactions.iter().zip(labels) {
        let tally = &mut tallies[segment];
        tally.txns += 1;
        tally.amount_sum += txn.amount;
        if txn.label.is_some() {
            tally.labeled += 1;
        }
        if txn.is_fraud() {
            tally.frauds += 1;
        }
    }

    tallies
        .into_iter()
        .enumerate()
        .map(|(segment, tally)| {
            if tally.txns == 0 {
                return Err(AnalysisError::degenerate(
                    Stage::Segmentation,
                    format!("segment {} received no transactions", segment),
                ));
            }
            Ok(SegmentProfile {
                segment,
                txns: tally.txns,
                avg_amount: tally.amount_sum / tally.txns as f64,
                pct_fraud: (tally.labeled > 0)
                    .then(|| 100.0 * tally.frauds as f64 / tally.labeled as f64),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn txn(id: i64, time: f64, amount: f64, label: Option<bool>) -> Transaction {
        Transaction {
            id,
            time,
            amount,
            label,
        }
    }

    fn mixed_transactions() -> Vec<Transaction> {
        let mut rows = Vec::new();
        let mut id = 1;
        // small daytime, large night-time, mid-range evening
        for i in 0..20 {
            rows.push(txn(id, 10.0 * 3600.0 + i as f64 * 60.0, 5.0 + i as f64 * 0.1, Some(false)));
            id += 1;
        }
        for i in 0..10 {
            rows.push(txn(id, 2.0 * 3600.0 + i as f64 * 60.0, 900.0 + i as f64, Some(i % 2 == 0)));
            id += 1;
        }
        for i in 0..15 {
            rows.push(txn(id, 20.0 * 3600.0 + i as f64 * 60.0, 60.0 + i as f64, None));
            id += 1;
        }
        rows
    }

    /// Deterministic stand-in: bucket by hour thirds
    struct HourThirds;

    impl Clusterer for HourThirds {
        fn n_clusters(&self) -> usize {
            3
        }

        fn fit_predict(&self, features: &[Vec<f64>]) -> AnalysisResult<Vec<usize>> {
            // features are standardized, so split on sign/magnitude of the hour column
            Ok(features
                .iter()
                .map(|f| if f[1] < -0.5 { 0 } else if f[1] < 0.5 { 1 } else { 2 })
                .collect())
        }
    }

    #[test]
    fn test_profiles_partition_all_transactions() {
        let txns = mixed_transactions();
        let engine = SegmentationEngine::new(&SegmentationConfig::default());
        let result = engine.segment(&txns).unwrap();

        assert_eq!(result.assignments.len(), txns.len());
        assert_eq!(result.profiles.len(), 3);
        assert_eq!(
            result.profiles.iter().map(|p| p.segment).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );

        let total: u64 = result.profiles.iter().map(|p| p.txns).sum();
        assert_eq!(total, txns.len() as u64);

        for profile in &result.profiles {
            if let Some(pct) = profile.pct_fraud {
                assert!((0.0..=100.0).contains(&pct));
            }
        }
    }

    #[test]
    fn test_deterministic_assignment() {
        let txns = mixed_transactions();
        let config = SegmentationConfig::default();

        let a = SegmentationEngine::new(&config).segment(&txns).unwrap();
        let b = SegmentationEngine::new(&config).segment(&txns).unwrap();

        assert_eq!(a.assignments, b.assignments);
        assert_eq!(a.profiles, b.profiles);
    }

    #[test]
    fn test_groups_found_by_kmeans() {
        let txns = mixed_transactions();
        let result = SegmentationEngine::new(&SegmentationConfig::default())
            .segment(&txns)
            .unwrap();

        let seg_of = |range: std::ops::Range<usize>| {
            let first = result.assignments[range.start].segment;
            assert!(result.assignments[range].iter().all(|a| a.segment == first));
            first
        };
        let small = seg_of(0..20);
        let large = seg_of(20..30);
        let evening = seg_of(30..45);
        assert_ne!(small, large);
        assert_ne!(small, evening);
        assert_ne!(large, evening);

        let large_profile = &result.profiles[large];
        assert_eq!(large_profile.txns, 10);
        assert_eq!(large_profile.pct_fraud, Some(50.0));
        assert!((large_profile.avg_amount - 904.5).abs() < 1e-9);

        // Unlabeled rows never turn into a 0% fraud rate
        assert_eq!(result.profiles[evening].pct_fraud, None);
    }

    #[test]
    fn test_too_few_distinct_points() {
        // Five rows but only two distinct (amount, hour) points
        let txns = vec![
            txn(1, 0.0, 10.0, Some(false)),
            txn(2, 60.0, 10.0, Some(false)),
            txn(3, 120.0, 10.0, Some(true)),
            txn(4, 3600.0, 25.0, Some(false)),
            txn(5, 3700.0, 25.0, Some(false)),
        ];
        let engine = SegmentationEngine::new(&SegmentationConfig::default());
        let err = engine.segment(&txns).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::DegenerateInput { stage: Stage::Segmentation, .. }
        ));
    }

    #[test]
    fn test_empty_input_rejected() {
        let engine = SegmentationEngine::new(&SegmentationConfig::default());
        assert!(matches!(
            engine.segment(&[]),
            Err(AnalysisError::DegenerateInput { .. })
        ));
    }

    #[test]
    fn test_custom_clusterer_plugs_in() {
        let txns = mixed_transactions();
        let result = SegmentationEngine::with_clusterer(HourThirds)
            .segment(&txns)
            .unwrap();

        // hour 2 → lowest standardized hour, hour 20 → highest
        assert_eq!(result.assignments[20].segment, 0);
        assert_eq!(result.assignments[0].segment, 1);
        assert_eq!(result.assignments[30].segment, 2);
    }

    #[test]
    fn test_clusterer_leaving_segment_empty_is_rejected() {
        struct AllZero;
        impl Clusterer for AllZero {
            fn n_clusters(&self) -> usize {
                3
            }
            fn fit_predict(&self, features: &[Vec<f64>]) -> AnalysisResult<Vec<usize>> {
                Ok(vec![0; features.len()])
            }
        }

        let err = SegmentationEngine::with_clusterer(AllZero)
            .segment(&mixed_transactions())
            .unwrap_err();
        assert!(matches!(err, AnalysisError::DegenerateInput { .. }));
    }
}
