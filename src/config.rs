//! Analysis configuration
//!
//! Every engine receives its section explicitly; nothing reads paths or
//! thresholds from process-wide state. `from_env` is only for the binary.

use std::env;
use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_DB_PATH: &str = "data/raw/transactions.db";
pub const DEFAULT_JSONL_OUTPUT: &str = "reports";
pub const DEFAULT_SQLITE_OUTPUT: &str = "reports/reports.db";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    Jsonl,
    Sqlite,
}

impl BackendType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jsonl" => Some(BackendType::Jsonl),
            "sqlite" => Some(BackendType::Sqlite),
            _ => None,
        }
    }

    pub fn default_output_path(&self) -> &'static str {
        match self {
            BackendType::Jsonl => DEFAULT_JSONL_OUTPUT,
            BackendType::Sqlite => DEFAULT_SQLITE_OUTPUT,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidValue(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidValue(msg) => write!(f, "Invalid configuration value: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct AggregationConfig {
    /// Rows kept by the top-amounts ranking
    pub top_n: usize,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self { top_n: 1000 }
    }
}

#[derive(Debug, Clone)]
pub struct AnomalyConfig {
    /// One-sided threshold; a record is an outlier when `z_score > z_threshold`
    pub z_threshold: f64,
    pub max_outliers: usize,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            z_threshold: 3.0,
            max_outliers: 1000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SegmentationConfig {
    pub segments: usize,
    pub seed: u64,
    /// k-means restarts; the lowest-inertia run wins
    pub n_init: usize,
    pub max_iter: usize,
    /// Convergence tolerance, relative to the mean feature variance
    pub tolerance: f64,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            segments: 3,
            seed: 42,
            n_init: 10,
            max_iter: 300,
            tolerance: 1e-4,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DistributionConfig {
    pub histogram_bins: usize,
    pub sample_size: usize,
    pub sample_seed: u64,
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self {
            histogram_bins: 60,
            sample_size: 30_000,
            sample_seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub backend: BackendType,
    /// Directory for JSONL, database file for SQLite
    pub path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            backend: BackendType::Jsonl,
            path: PathBuf::from(DEFAULT_JSONL_OUTPUT),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub db_path: PathBuf,
    pub output: OutputConfig,
    pub aggregation: AggregationConfig,
    pub anomaly: AnomalyConfig,
    pub segmentation: SegmentationConfig,
    pub distribution: DistributionConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            output: OutputConfig::default(),
            aggregation: AggregationConfig::default(),
            anomaly: AnomalyConfig::default(),
            segmentation: SegmentationConfig::default(),
            distribution: DistributionConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `FRAUDSCOPE_DB_PATH` (default: data/raw/transactions.db)
    /// - `REPORT_BACKEND` (jsonl | sqlite, default: jsonl)
    /// - `REPORTS_OUTPUT_PATH` (default: reports, or reports/reports.db for sqlite)
    /// - `SEGMENT_SEED` (default: 42)
    /// - `HISTOGRAM_BINS` (default: 60)
    /// - `SAMPLE_SIZE` (default: 30000)
    pub fn from_env(backend_override: Option<BackendType>) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok(), backend_override)
    }

    pub fn from_lookup<F>(lookup: F, backend_override: Option<BackendType>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend = match backend_override {
            Some(backend) => backend,
            None => match lookup("REPORT_BACKEND") {
                Some(raw) => BackendType::parse(&raw).ok_or_else(|| {
                    ConfigError::InvalidValue(format!(
                        "REPORT_BACKEND must be 'jsonl' or 'sqlite', got '{}'",
                        raw
                    ))
                })?,
                None => BackendType::Jsonl,
            },
        };

        let output_path = lookup("REPORTS_OUTPUT_PATH")
            .unwrap_or_else(|| backend.default_output_path().to_string());

        let mut segmentation = SegmentationConfig::default();
        if let Some(seed) = parse_var(&lookup, "SEGMENT_SEED")? {
            segmentation.seed = seed;
        }

        let mut distribution = DistributionConfig::default();
        if let Some(bins) = parse_var::<usize, _>(&lookup, "HISTOGRAM_BINS")? {
            if bins == 0 {
                return Err(ConfigError::InvalidValue(
                    "HISTOGRAM_BINS must be at least 1".to_string(),
                ));
            }
            distribution.histogram_bins = bins;
        }
        if let Some(size) = parse_var(&lookup, "SAMPLE_SIZE")? {
            distribution.sample_size = size;
        }

        Ok(Self {
            db_path: lookup("FRAUDSCOPE_DB_PATH")
                .unwrap_or_else(|| DEFAULT_DB_PATH.to_string())
                .into(),
            output: OutputConfig {
                backend,
                path: output_path.into(),
            },
            aggregation: AggregationConfig::default(),
            anomaly: AnomalyConfig::default(),
            segmentation,
            distribution,
        })
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(format!("{}='{}' is not a valid number", key, raw))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = AnalysisConfig::from_lookup(lookup_from(&[]), None).unwrap();

        assert_eq!(config.db_path, PathBuf::from("data/raw/transactions.db"));
        assert_eq!(config.output.backend, BackendType::Jsonl);
        assert_eq!(config.output.path, PathBuf::from("reports"));
        assert_eq!(config.anomaly.z_threshold, 3.0);
        assert_eq!(config.anomaly.max_outliers, 1000);
        assert_eq!(config.aggregation.top_n, 1000);
        assert_eq!(config.segmentation.segments, 3);
        assert_eq!(config.segmentation.seed, 42);
        assert_eq!(config.segmentation.n_init, 10);
        assert_eq!(config.distribution.histogram_bins, 60);
        assert_eq!(config.distribution.sample_size, 30_000);
    }

    #[test]
    fn test_custom_config() {
        let config = AnalysisConfig::from_lookup(
            lookup_from(&[
                ("FRAUDSCOPE_DB_PATH", "/tmp/test.db"),
                ("REPORT_BACKEND", "SQLite"),
                ("SEGMENT_SEED", "7"),
                ("SAMPLE_SIZE", "500"),
            ]),
            None,
        )
        .unwrap();

        assert_eq!(config.db_path, PathBuf::from("/tmp/test.db"));
        assert_eq!(config.output.backend, BackendType::Sqlite);
        assert_eq!(config.output.path, PathBuf::from("reports/reports.db"));
        assert_eq!(config.segmentation.seed, 7);
        assert_eq!(config.distribution.sample_size, 500);
    }

    #[test]
    fn test_backend_override_wins() {
        let config = AnalysisConfig::from_lookup(
            lookup_from(&[("REPORT_BACKEND", "jsonl"), ("REPORTS_OUTPUT_PATH", "out/r.db")]),
            Some(BackendType::Sqlite),
        )
        .unwrap();

        assert_eq!(config.output.backend, BackendType::Sqlite);
        assert_eq!(config.output.path, PathBuf::from("out/r.db"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(AnalysisConfig::from_lookup(lookup_from(&[("REPORT_BACKEND", "csv")]), None).is_err());
        assert!(AnalysisConfig::from_lookup(lookup_from(&[("SEGMENT_SEED", "abc")]), None).is_err());
        assert!(AnalysisConfig::from_lookup(lookup_from(&[("HISTOGRAM_BINS", "0")]), None).is_err());
    }
}
