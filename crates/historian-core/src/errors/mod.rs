//! Error taxonomy for the historian engine (§7).
//!
//! Five kinds: Configuration, Input, Transient, Analyzer (fatal to one
//! analyzer, not the run), Cancellation. Transient failures are logged and
//! suppressed by callers rather than represented as hard errors here — see
//! `tracing::warn!` call sites in `historian-plumbing`.

pub mod error_code;

pub use error_code::ErrorCode;

use thiserror::Error;

/// The engine-wide error type. Each crate that needs a narrower type wraps
/// this (e.g. `historian-runtime::RunnerError`) rather than redefining the
/// taxonomy.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("configure {analyzer}: {message}")]
    Configuration { analyzer: String, message: String },

    #[error("input error: {0}")]
    Input(String),

    #[error("{analyzer} consume: {message}")]
    Consume { analyzer: String, message: String },

    #[error("{analyzer} finalize: {message}")]
    Finalize { analyzer: String, message: String },

    #[error("operation cancelled")]
    Cancelled,

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("invalid reversed people dict: {0}")]
    InvalidReversedPeopleDict(String),

    #[error("invalid emotions payload: {0}")]
    InvalidEmotions(String),

    #[error("checkpoint {analyzer}: {message}")]
    Persistence { analyzer: String, message: String },
}

impl ErrorCode for AnalyzerError {
    fn error_code(&self) -> &'static str {
        self.error_code()
    }
}

impl AnalyzerError {
    pub fn configuration(analyzer: impl Into<String>, message: impl std::fmt::Display) -> Self {
        AnalyzerError::Configuration {
            analyzer: analyzer.into(),
            message: message.to_string(),
        }
    }

    pub fn consume(analyzer: impl Into<String>, message: impl std::fmt::Display) -> Self {
        AnalyzerError::Consume {
            analyzer: analyzer.into(),
            message: message.to_string(),
        }
    }

    pub fn finalize(analyzer: impl Into<String>, message: impl std::fmt::Display) -> Self {
        AnalyzerError::Finalize {
            analyzer: analyzer.into(),
            message: message.to_string(),
        }
    }

    pub fn checkpoint(analyzer: impl Into<String>, message: impl std::fmt::Display) -> Self {
        AnalyzerError::Persistence {
            analyzer: analyzer.into(),
            message: message.to_string(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, AnalyzerError::Cancelled)
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AnalyzerError::Configuration { .. } => error_code::CONFIGURATION_ERROR,
            AnalyzerError::Input(_) => error_code::INPUT_ERROR,
            AnalyzerError::Consume { .. } => error_code::ANALYZER_ERROR,
            AnalyzerError::Finalize { .. } => error_code::ANALYZER_ERROR,
            AnalyzerError::Cancelled => error_code::CANCELLED,
            AnalyzerError::UnsupportedFormat(_) => error_code::UNSUPPORTED_FORMAT,
            AnalyzerError::UnsupportedLanguage(_) => error_code::UNSUPPORTED_LANGUAGE,
            AnalyzerError::InvalidReversedPeopleDict(_) => {
                error_code::INVALID_REVERSED_PEOPLE_DICT
            }
            AnalyzerError::InvalidEmotions(_) => error_code::INVALID_EMOTIONS,
            AnalyzerError::Persistence { .. } => error_code::PERSISTENCE_ERROR,
        }
    }
}
