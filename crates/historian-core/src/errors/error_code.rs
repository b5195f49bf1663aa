//! Stable, programmatically-matchable error codes.
//!
//! Mirrors the teacher pattern of a small `ErrorCode` trait plus a flat set
//! of `&'static str` constants, rather than relying on `Display` text.

pub const CONFIGURATION_ERROR: &str = "CONFIGURATION_ERROR";
pub const INPUT_ERROR: &str = "INPUT_ERROR";
pub const ANALYZER_ERROR: &str = "ANALYZER_ERROR";
pub const CANCELLED: &str = "CANCELLED";
pub const UNSUPPORTED_FORMAT: &str = "UNSUPPORTED_FORMAT";
pub const UNSUPPORTED_LANGUAGE: &str = "UNSUPPORTED_LANGUAGE";
pub const INVALID_REVERSED_PEOPLE_DICT: &str = "INVALID_REVERSED_PEOPLE_DICT";
pub const INVALID_EMOTIONS: &str = "INVALID_EMOTIONS";
pub const PERSISTENCE_ERROR: &str = "PERSISTENCE_ERROR";

/// Implemented by every crate-local error type so callers across crate
/// boundaries can match on a stable code instead of parsing `Display` text.
pub trait ErrorCode {
    fn error_code(&self) -> &'static str;
}
