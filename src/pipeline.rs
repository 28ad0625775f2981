//! Pipeline runner - one store, one sink, every stage run independently
//!
//! Each stage reads the store, builds its report table and hands it to the
//! sink. A failing stage is logged and recorded; the remaining stages still
//! run and their artifacts are still written.

use crate::analysis_core::{
    AggregationEngine, AnomalyScorer, DistributionProfiler, SegmentationEngine,
};
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, AnalysisResult, Stage};
use crate::report::table::{
    amount_histogram_table, hourly_stats_table, outliers_table, segment_summary_table,
    time_amount_sample_table, top_amounts_table,
};
use crate::report::{ReportSink, ReportTable};
use crate::store::TransactionStore;
use chrono::{DateTime, Utc};
use std::time::Instant;

#[derive(Debug, Clone, PartialEq)]
pub struct StageReport {
    pub stage: Stage,
    pub table: String,
    pub rows: usize,
    /// Set when the stage succeeded but could not compute its statistic
    pub note: Option<&'static str>,
}

/// A computed table plus any degenerate-input note for the run summary
#[derive(Debug, Clone)]
pub struct StageOutput {
    pub table: ReportTable,
    pub note: Option<&'static str>,
}

impl From<ReportTable> for StageOutput {
    fn from(table: ReportTable) -> Self {
        Self { table, note: None }
    }
}

#[derive(Debug)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub completed: Vec<StageReport>,
    pub failed: Vec<(Stage, AnalysisError)>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct AnalysisPipeline<S: ReportSink> {
    config: AnalysisConfig,
    store: TransactionStore,
    sink: S,
}

impl<S: ReportSink> AnalysisPipeline<S> {
    pub fn new(config: AnalysisConfig, store: TransactionStore, sink: S) -> Self {
        Self {
            config,
            store,
            sink,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Compute the table for one stage without writing it
    pub fn build_table(&self, stage: Stage) -> AnalysisResult<StageOutput> {
        let store = &self.store;
        let aggregation = || AggregationEngine::new(self.config.aggregation.clone());
        let profiler = || DistributionProfiler::new(self.config.distribution.clone());

        let output = match stage {
            Stage::HourlyStats => hourly_stats_table(&aggregation().hourly_stats(store)?).into(),
            Stage::TopAmounts => top_amounts_table(&aggregation().top_amounts(store)?).into(),
            Stage::AmountOutliers => {
                // Zero-variance input is reported as an empty table, not a failure
                let set = AnomalyScorer::new(self.config.anomaly.clone()).score(store)?;
                StageOutput {
                    table: outliers_table(&set),
                    note: set.unscored.map(|reason| reason.describe()),
                }
            }
            Stage::Segmentation => {
                let result = SegmentationEngine::new(&self.config.segmentation).run(store)?;
                segment_summary_table(&result).into()
            }
            Stage::AmountHistogram => amount_histogram_table(&profiler().amount_histogram(store)?).into(),
            Stage::TimeAmountSample => {
                time_amount_sample_table(&profiler().time_amount_sample(store)?).into()
            }
        };
        Ok(output)
    }

    /// Compute one stage and replace its artifact
    pub fn run_stage(&mut self, stage: Stage) -> AnalysisResult<StageReport> {
        let started = Instant::now();
        log::info!("▶️  [{}] starting", stage);

        let StageOutput { table, note } = self.build_table(stage)?;
        self.sink
            .write_table(&table)
            .map_err(|e| e.for_table(&table.name))?;

        log::info!(
            "✅ [{}] {} rows → {} ({} backend, {:.2?})",
            stage,
            table.row_count(),
            table.name,
            self.sink.backend_type(),
            started.elapsed()
        );

        Ok(StageReport {
            stage,
            table: table.name,
            rows: table.rows.len(),
            note,
        })
    }

    /// Run every stage; a failure is logged and recorded, never propagated
    pub fn run_all(&mut self) -> RunSummary {
        let started_at = Utc::now();
        let mut completed = Vec::new();
        let mut failed = Vec::new();

        for stage in Stage::all() {
            match self.run_stage(stage) {
                Ok(report) => completed.push(report),
                Err(e) => {
                    log::error!("❌ [{}] stage failed: {}", stage, e);
                    failed.push((stage, e));
                }
            }
        }

        let finished_at = Utc::now();
        log::info!(
            "🏁 Run finished: {} stages ok, {} failed in {}ms",
            completed.len(),
            failed.len(),
            (finished_at - started_at).num_milliseconds()
        );

        RunSummary {
            started_at,
            finished_at,
            completed,
            failed,
        }
    }
}
