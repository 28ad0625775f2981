//! Fraud Report Binary - batch analytics over the transactions store
//!
//! Runs every analysis stage against the store and writes one report table
//! per stage.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release --bin fraud_report -- --backend sqlite
//! ```
//!
//! ## Environment Variables
//!
//! - FRAUDSCOPE_DB_PATH - Transactions store (default: data/raw/transactions.db)
//! - REPORT_BACKEND - jsonl | sqlite (default: jsonl, `--backend` wins)
//! - REPORTS_OUTPUT_PATH - JSONL directory or SQLite file (default: reports / reports/reports.db)
//! - SEGMENT_SEED - k-means seed (default: 42)
//! - HISTOGRAM_BINS - Amount histogram bins (default: 60)
//! - SAMPLE_SIZE - Time-vs-amount sample size (default: 30000)
//! - RUST_LOG - Logging level (optional, default: info)

use fraudscope::{AnalysisConfig, AnalysisPipeline, BackendType, ReportSink, ReportWriter, TransactionStore};
use std::env;

fn parse_backend_from_args() -> Option<BackendType> {
    let args: Vec<String> = env::args().collect();
    let idx = args.iter().position(|x| x == "--backend")?;
    match args.get(idx + 1).and_then(|s| BackendType::parse(s)) {
        Some(backend) => Some(backend),
        None => {
            log::warn!("⚠️  --backend expects 'jsonl' or 'sqlite', falling back to environment");
            None
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    dotenv::dotenv().ok();

    let config = AnalysisConfig::from_env(parse_backend_from_args())?;

    log::info!("🚀 Starting fraud transaction analytics");
    log::info!("   Store: {}", config.db_path.display());
    log::info!("   Output: {}", config.output.path.display());
    log::info!(
        "   Segments: {} (seed {}, n_init {})",
        config.segmentation.segments,
        config.segmentation.seed,
        config.segmentation.n_init
    );
    log::info!(
        "   Outliers: z > {} (max {})",
        config.anomaly.z_threshold,
        config.anomaly.max_outliers
    );

    let store = TransactionStore::open(&config.db_path)?;
    match store.record_count() {
        Ok(n) => log::info!("📦 {} transactions in store", n),
        Err(e) => log::warn!("⚠️  Could not count transactions: {}", e),
    }
    let writer = ReportWriter::new(&config.output)?;
    log::info!("📊 Backend: {}", writer.backend_type());

    let mut pipeline = AnalysisPipeline::new(config, store, writer);
    let summary = pipeline.run_all();

    for report in &summary.completed {
        match report.note {
            Some(note) => log::warn!("   {:<28} {:>8} rows ⚠️  {}", report.table, report.rows, note),
            None => log::info!("   {:<28} {:>8} rows", report.table, report.rows),
        }
    }

    if summary.is_success() {
        Ok(())
    } else {
        let failed: Vec<&str> = summary.failed.iter().map(|(stage, _)| stage.as_str()).collect();
        Err(format!("{} stage(s) failed: {}", failed.len(), failed.join(", ")).into())
    }
}
