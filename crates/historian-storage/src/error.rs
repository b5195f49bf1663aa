//! `PersistError` — the persistence layer's boundary error type (§7
//! "Persistence — checkpoint write failure logs and continues; load
//! failure aborts resume and falls back to a cold start after explicit
//! operator opt-in").

use historian_core::errors::{error_code, ErrorCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("encode {basename}: {message}")]
    Encode { basename: String, message: String },

    #[error("decode {basename}: {message}")]
    Decode { basename: String, message: String },

    #[error("corrupt {basename}: {message}")]
    Corrupt { basename: String, message: String },
}

impl PersistError {
    pub fn encode(basename: impl Into<String>, message: impl std::fmt::Display) -> Self {
        PersistError::Encode {
            basename: basename.into(),
            message: message.to_string(),
        }
    }

    pub fn decode(basename: impl Into<String>, message: impl std::fmt::Display) -> Self {
        PersistError::Decode {
            basename: basename.into(),
            message: message.to_string(),
        }
    }

    pub fn corrupt(basename: impl Into<String>, message: impl std::fmt::Display) -> Self {
        PersistError::Corrupt {
            basename: basename.into(),
            message: message.to_string(),
        }
    }
}

impl ErrorCode for PersistError {
    fn error_code(&self) -> &'static str {
        error_code::PERSISTENCE_ERROR
    }
}
