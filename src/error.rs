//! Error taxonomy shared by every analysis stage
//!
//! Each variant carries the [`Stage`] that failed so the runner can report
//! which stage broke and which precondition was violated.

use std::fmt;

/// Analysis stage identifier, also used as the log/report label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    HourlyStats,
    TopAmounts,
    AmountOutliers,
    Segmentation,
    AmountHistogram,
    TimeAmountSample,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::HourlyStats => "hourly_stats",
            Stage::TopAmounts => "top_amounts",
            Stage::AmountOutliers => "amount_outliers",
            Stage::Segmentation => "segmentation",
            Stage::AmountHistogram => "amount_histogram",
            Stage::TimeAmountSample => "time_amount_sample",
        }
    }

    pub fn all() -> [Stage; 6] {
        [
            Stage::HourlyStats,
            Stage::TopAmounts,
            Stage::AmountOutliers,
            Stage::Segmentation,
            Stage::AmountHistogram,
            Stage::TimeAmountSample,
        ]
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub enum AnalysisError {
    /// Store unreachable or query malformed
    DataAccess {
        stage: Option<Stage>,
        source: rusqlite::Error,
    },
    /// Input exists but cannot support the requested statistic
    DegenerateInput { stage: Stage, reason: String },
    /// Required table or columns are absent from the store
    SchemaMismatch { stage: Stage, missing: Vec<String> },
    /// Report sink rejected a table
    Sink { table: String, reason: String },
}

impl AnalysisError {
    pub fn degenerate(stage: Stage, reason: impl Into<String>) -> Self {
        AnalysisError::DegenerateInput {
            stage,
            reason: reason.into(),
        }
    }

    /// Attach a stage to a data access error raised below the engine layer
    pub fn in_stage(self, stage: Stage) -> Self {
        match self {
            AnalysisError::DataAccess { stage: None, source } => AnalysisError::DataAccess {
                stage: Some(stage),
                source,
            },
            other => other,
        }
    }

    pub fn stage(&self) -> Option<Stage> {
        match self {
            AnalysisError::DataAccess { stage, .. } => *stage,
            AnalysisError::DegenerateInput { stage, .. } => Some(*stage),
            AnalysisError::SchemaMismatch { stage, .. } => Some(*stage),
            AnalysisError::Sink { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for AnalysisError {
    fn from(err: rusqlite::Error) -> Self {
        AnalysisError::DataAccess {
            stage: None,
            source: err,
        }
    }
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::DataAccess {
                stage: Some(stage),
                source,
            } => write!(f, "[{}] data access error: {}", stage, source),
            AnalysisError::DataAccess {
                stage: None,
                source,
            } => write!(f, "data access error: {}", source),
            AnalysisError::DegenerateInput { stage, reason } => {
                write!(f, "[{}] degenerate input: {}", stage, reason)
            }
            AnalysisError::SchemaMismatch { stage, missing } => write!(
                f,
                "[{}] schema mismatch: missing {}",
                stage,
                missing.join(", ")
            ),
            AnalysisError::Sink { table, reason } => {
                write!(f, "report sink error for '{}': {}", table, reason)
            }
        }
    }
}

impl std::error::Error for AnalysisError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AnalysisError::DataAccess { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_stage_tags_data_access_only() {
        let err = AnalysisError::from(rusqlite::Error::InvalidQuery).in_stage(Stage::HourlyStats);
        assert_eq!(err.stage(), Some(Stage::HourlyStats));

        let err = AnalysisError::degenerate(Stage::Segmentation, "too few points")
            .in_stage(Stage::HourlyStats);
        assert_eq!(err.stage(), Some(Stage::Segmentation));
    }

    #[test]
    fn test_display_names_stage_and_reason() {
        let err = AnalysisError::SchemaMismatch {
            stage: Stage::AmountOutliers,
            missing: vec!["Amount".to_string(), "Class".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "[amount_outliers] schema mismatch: missing Amount, Class"
        );
    }
}
