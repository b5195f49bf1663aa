//! Runner-local error type (§7). Wraps [`historian_core::AnalyzerError`]
//! for failures that originate inside an analyzer, and adds the wiring
//! failures that are specific to assembling and driving the DAG.

use historian_core::errors::{error_code, ErrorCode};
use historian_core::AnalyzerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunnerError {
    /// The declared `depends_on()` graph is not acyclic, or an analyzer
    /// depends on a flag no plumbing analyzer in this run produces.
    #[error("plumbing DAG wiring: {0}")]
    DagWiring(String),

    #[error("{analyzer}: {source}")]
    Analyzer {
        analyzer: String,
        #[source]
        source: AnalyzerError,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error("input error: {0}")]
    Input(String),
}

impl RunnerError {
    pub fn analyzer(analyzer: impl Into<String>, source: AnalyzerError) -> Self {
        if source.is_cancelled() {
            return RunnerError::Cancelled;
        }
        RunnerError::Analyzer {
            analyzer: analyzer.into(),
            source,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RunnerError::Cancelled)
    }
}

impl ErrorCode for RunnerError {
    fn error_code(&self) -> &'static str {
        match self {
            RunnerError::DagWiring(_) => error_code::CONFIGURATION_ERROR,
            RunnerError::Analyzer { source, .. } => source.error_code(),
            RunnerError::Cancelled => error_code::CANCELLED,
            RunnerError::Input(_) => error_code::INPUT_ERROR,
        }
    }
}
