//! Seeded k-means behind the `Clusterer` capability
//!
//! k-means++ seeding, Lloyd iterations, `n_init` restarts drawn from a single
//! `StdRng`, lowest inertia kept. Same features + seed + k give the same labels.

use crate::config::SegmentationConfig;
use crate::error::{AnalysisError, AnalysisResult, Stage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Anything that can partition feature rows into `n_clusters()` labels
pub trait Clusterer {
    fn n_clusters(&self) -> usize;

    /// One label in `[0, n_clusters())` per input row
    fn fit_predict(&self, features: &[Vec<f64>]) -> AnalysisResult<Vec<usize>>;
}

#[derive(Debug, Clone)]
pub struct KMeansFit {
    pub centroids: Vec<Vec<f64>>,
    pub labels: Vec<usize>,
    pub inertia: f64,
    pub iterations: usize,
}

#[derive(Debug, Clone)]
pub struct KMeans {
    k: usize,
    seed: u64,
    n_init: usize,
    max_iter: usize,
    tolerance: f64,
}

impl KMeans {
    pub fn new(config: &SegmentationConfig) -> Self {
        Self {
            k: config.segments,
            seed: config.seed,
            n_init: config.n_init.max(1),
            max_iter: config.max_iter.max(1),
            tolerance: config.tolerance,
        }
    }

    pub fn fit(&self, features: &[Vec<f64>]) -> AnalysisResult<KMeansFit> {
        if self.k == 0 {
            return Err(AnalysisError::degenerate(
                Stage::Segmentation,
                "cluster count must be at least 1",
            ));
        }
        if features.len() < self.k {
            return Err(AnalysisError::degenerate(
                Stage::Segmentation,
                format!(
                    "{} rows cannot form {} clusters",
                    features.len(),
                    self.k
                ),
            ));
        }

        let tol = self.tolerance * mean_column_variance(features);
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut best: Option<KMeansFit> = None;

        for run in 0..self.n_init {
            let seeds = kmeans_plus_plus(features, self.k, &mut rng);
            let fit = lloyd(features, seeds, self.max_iter, tol);
            log::debug!(
                "k-means run {}: inertia={:.6} iterations={}",
                run,
                fit.inertia,
                fit.iterations
            );

            // Strict `<` keeps the earliest run on ties
            if best.as_ref().map_or(true, |b| fit.inertia < b.inertia) {
                best = Some(fit);
            }
        }

        best.ok_or_else(|| AnalysisError::degenerate(Stage::Segmentation, "no k-means run completed"))
    }
}

impl Clusterer for KMeans {
    fn n_clusters(&self) -> usize {
        self.k
    }

    fn fit_predict(&self, features: &[Vec<f64>]) -> AnalysisResult<Vec<usize>> {
        self.fit(features).map(|fit| fit.labels)
    }
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn mean_column_variance(features: &[Vec<f64>]) -> f64 {
    let width = features.first().map_or(0, Vec::len);
    if width == 0 {
        return 0.0;
    }
    let n = features.len() as f64;
    let total: f64 = (0..width)
        .map(|col| {
            let mean = features.iter().map(|r| r[col]).sum::<f64>() / n;
            features.iter().map(|r| (r[col] - mean).powi(2)).sum::<f64>() / n
        })
        .sum();
    total / width as f64
}

/// Index and squared distance of the closest centroid; ties go to the lower index
fn nearest(point: &[f64], centroids: &[Vec<f64>]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (idx, centroid) in centroids.iter().enumerate() {
        let d = squared_distance(point, centroid);
        if d < best.1 {
            best = (idx, d);
        }
    }
    best
}

fn kmeans_plus_plus(features: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let n = features.len();
    let mut centroids = Vec::with_capacity(k);
    centroids.push(features[rng.gen_range(0..n)].clone());

    let mut closest: Vec<f64> = features
        .iter()
        .map(|p| squared_distance(p, &centroids[0]))
        .collect();

    while centroids.len() < k {
        let total: f64 = closest.iter().sum();
        let pick = if total > 0.0 {
            let target = rng.gen::<f64>() * total;
            let mut cumulative = 0.0;
            let mut chosen = None;
            for (idx, weight) in closest.iter().enumerate() {
                if *weight <= 0.0 {
                    continue;
                }
                cumulative += weight;
                chosen = Some(idx);
                if cumulative > target {
                    break;
                }
            }
            chosen.unwrap_or(0)
        } else {
            // Every point coincides with a seed; empty clusters get repaired later
            rng.gen_range(0..n)
        };

        let centroid = features[pick].clone();
        for (d, p) in closest.iter_mut().zip(features) {
            *d = (*d).min(squared_distance(p, &centroid));
        }
        centroids.push(centroid);
    }

    centroids
}

fn assign(features: &[Vec<f64>], centroids: &[Vec<f64>]) -> Vec<usize> {
    features.iter().map(|p| nearest(p, centroids).0).collect()
}

/// Give each empty cluster the point farthest from its current centroid,
/// taken from a cluster that can spare one.
fn repair_empty_clusters(features: &[Vec<f64>], labels: &mut [usize], centroids: &mut [Vec<f64>]) {
    let k = centroids.len();
    loop {
        let mut sizes = vec![0usize; k];
        for &label in labels.iter() {
            sizes[label] += 1;
        }
        let Some(empty) = sizes.iter().position(|&s| s == 0) else {
            return;
        };

        let donor = labels
            .iter()
            .enumerate()
            .filter(|&(_, &label)| sizes[label] > 1)
            .map(|(idx, &label)| (idx, squared_distance(&features[idx], &centroids[label])))
            .fold(None, |acc: Option<(usize, f64)>, (idx, d)| match acc {
                Some((_, best)) if best >= d => acc,
                _ => Some((idx, d)),
            });

        let Some((idx, _)) = donor else {
            return;
        };
        labels[idx] = empty;
        centroids[empty] = features[idx].clone();
    }
}

fn update_centroids(features: &[Vec<f64>], labels: &[usize], previous: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let width = previous.first().map_or(0, Vec::len);
    let mut sums = vec![vec![0.0; width]; previous.len()];
    let mut counts = vec![0usize; previous.len()];

    for (point, &label) in features.iter().zip(labels) {
        counts[label] += 1;
        for (s, v) in sums[label].iter_mut().zip(point) {
            *s += v;
        }
    }

    sums.into_iter()
        .zip(counts)
        .zip(previous)
        .map(|((sum, count), prev)| {
            if count == 0 {
                prev.clone()
            } else {
                sum.into_iter().map(|s| s / count as f64).collect()
            }
        })
        .collect()
}

fn lloyd(features: &[Vec<f64>], mut centroids: Vec<Vec<f64>>, max_iter: usize, tol: f64) -> KMeansFit {
    let mut iterations = 0;

    for _ in 0..max_iter {
        iterations += 1;
        let mut labels = assign(features, &centroids);
        repair_empty_clusters(features, &mut labels, &mut centroids);

        let updated = update_centroids(features, &labels, &centroids);
        let shift: f64 = centroids
            .iter()
            .zip(&updated)
            .map(|(old, new)| squared_distance(old, new))
            .sum();
        centroids = updated;

        if shift <= tol {
            break;
        }
    }

    let mut labels = assign(features, &centroids);
    repair_empty_clusters(features, &mut labels, &mut centroids);
    // A repair moves points between clusters, so refresh every centroid
    let centroids = update_centroids(features, &labels, &centroids);
    let inertia = features
        .iter()
        .zip(&labels)
        .map(|(p, &label)| squared_distance(p, &centroids[label]))
        .sum();

    KMeansFit {
        centroids,
        labels,
        inertia,
        iterations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blobs() -> Vec<Vec<f64>> {
        let mut rows = Vec::new();
        for (cx, cy) in [(0.0, 0.0), (10.0, 10.0), (-10.0, 10.0)] {
            for i in 0..10 {
                let jitter = i as f64 * 0.05;
                rows.push(vec![cx + jitter, cy - jitter]);
            }
        }
        rows
    }

    fn config(seed: u64) -> SegmentationConfig {
        SegmentationConfig {
            seed,
            ..SegmentationConfig::default()
        }
    }

    #[test]
    fn test_separates_obvious_blobs() {
        let rows = blobs();
        let fit = KMeans::new(&config(42)).fit(&rows).unwrap();

        assert_eq!(fit.centroids.len(), 3);
        for blob in 0..3 {
            let first = fit.labels[blob * 10];
            assert!(
                fit.labels[blob * 10..(blob + 1) * 10].iter().all(|&l| l == first),
                "blob {} split across clusters",
                blob
            );
        }
        let mut distinct = fit.labels.clone();
        distinct.sort_unstable();
        distinct.dedup();
        assert_eq!(distinct, vec![0, 1, 2]);
    }

    #[test]
    fn test_same_seed_same_labels() {
        let rows = blobs();
        let a = KMeans::new(&config(7)).fit_predict(&rows).unwrap();
        let b = KMeans::new(&config(7)).fit_predict(&rows).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_every_cluster_populated_with_exactly_k_points() {
        let rows = vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![0.0, 1.0]];
        let labels = KMeans::new(&config(42)).fit_predict(&rows).unwrap();
        let mut sorted = labels.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![0, 1, 2]);
    }

    #[test]
    fn test_duplicates_still_fill_every_cluster() {
        let mut rows = vec![vec![0.0, 0.0]; 50];
        rows.push(vec![5.0, 5.0]);
        rows.push(vec![-5.0, 5.0]);
        let labels = KMeans::new(&config(3)).fit_predict(&rows).unwrap();
        for c in 0..3 {
            assert!(labels.contains(&c), "cluster {} empty", c);
        }
    }

    fn assert_centroids_are_member_means(rows: &[Vec<f64>], fit: &KMeansFit) {
        for (c, centroid) in fit.centroids.iter().enumerate() {
            let members: Vec<&Vec<f64>> = rows
                .iter()
                .zip(&fit.labels)
                .filter(|&(_, &l)| l == c)
                .map(|(r, _)| r)
                .collect();
            assert!(!members.is_empty(), "cluster {} empty", c);
            for dim in 0..centroid.len() {
                let mean = members.iter().map(|r| r[dim]).sum::<f64>() / members.len() as f64;
                assert!((centroid[dim] - mean).abs() < 1e-12, "cluster {} centroid stale", c);
            }
        }

        let inertia: f64 = rows
            .iter()
            .zip(&fit.labels)
            .map(|(r, &l)| squared_distance(r, &fit.centroids[l]))
            .sum();
        assert!((fit.inertia - inertia).abs() < 1e-9);
    }

    #[test]
    fn test_centroids_consistent_after_final_repair() {
        // Two distinct points for three clusters: the last assignment always
        // leaves a cluster empty and has to be repaired
        let mut rows = vec![vec![0.0, 0.0]; 4];
        rows.push(vec![1.0, 0.0]);

        for seed in [1, 7, 42] {
            let fit = KMeans::new(&config(seed)).fit(&rows).unwrap();
            assert_centroids_are_member_means(&rows, &fit);
        }
    }

    #[test]
    fn test_centroids_consistent_on_blobs() {
        let rows = blobs();
        let fit = KMeans::new(&config(42)).fit(&rows).unwrap();
        assert_centroids_are_member_means(&rows, &fit);
    }

    #[test]
    fn test_too_few_rows_rejected() {
        let rows = vec![vec![0.0, 0.0], vec![1.0, 1.0]];
        let err = KMeans::new(&config(42)).fit(&rows).unwrap_err();
        assert!(matches!(err, AnalysisError::DegenerateInput { .. }));
    }

    #[test]
    fn test_best_inertia_not_worse_than_single_run() {
        let rows = blobs();
        let single = KMeans::new(&SegmentationConfig {
            n_init: 1,
            ..config(11)
        })
        .fit(&rows)
        .unwrap();
        let multi = KMeans::new(&SegmentationConfig {
            n_init: 10,
            ..config(11)
        })
        .fit(&rows)
        .unwrap();
        // First of the ten restarts is the single run itself
        assert!(multi.inertia <= single.inertia);
    }
}
