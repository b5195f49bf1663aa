//! # historian-core
//!
//! Foundation crate for the historian history-analysis engine.
//! Defines the analyzer contract, the value types that flow through the
//! plumbing DAG, the external VCS/UAST interfaces the engine consumes,
//! configuration, cancellation, and errors. Every other crate in the
//! workspace depends on this one.

#![allow(dead_code)]

pub mod analyzer;
pub mod cancellation;
pub mod config;
pub mod errors;
pub mod traits;
pub mod types;
pub mod uast;
pub mod vcs;

pub use analyzer::{
    downcast_branch, Analyzer, ConfigFacts, ConfigValue, ConfigurationOption, ConsumeContext,
    Descriptor, Mode, OptionType, SerializeFormat,
};
pub use cancellation::CancellationToken;
pub use errors::{AnalyzerError, ErrorCode};
pub use types::collections::{FxHashMap, FxHashSet};
pub use types::ids::{AuthorId, CommitHash, FileId, Tick, AUTHOR_MISSING};
