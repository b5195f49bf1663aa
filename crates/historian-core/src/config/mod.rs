//! Shared configuration facts (§4.1, §4.2) and per-analyzer option defaults.
//!
//! `ConfigFacts` is a type-erased bag because the set of facts producers
//! publish (`commitsByTick`, `peopleDict`, ...) and the set consumers read
//! are disjoint across crates that don't depend on each other's concrete
//! types. `facts` below gives both sides a typed, string-keyed view over it
//! instead of scattering `downcast_ref` calls through every analyzer.

pub mod facts;

use crate::analyzer::ConfigValue;

/// `TreeDiff` (§4.2.1).
#[derive(Clone, Debug)]
pub struct TreeDiffConfig {
    pub enable_blacklist: bool,
    pub blacklisted_prefixes: Vec<String>,
    pub languages: Vec<String>,
    pub whitelist_regex: Option<String>,
}

impl Default for TreeDiffConfig {
    fn default() -> Self {
        Self {
            enable_blacklist: false,
            blacklisted_prefixes: vec![
                "vendor/".to_string(),
                "vendors/".to_string(),
                "package-lock.json".to_string(),
                "Gopkg.lock".to_string(),
            ],
            languages: vec!["all".to_string()],
            whitelist_regex: None,
        }
    }
}

/// `BlobCache` (§4.2.3).
#[derive(Clone, Debug)]
pub struct BlobCacheConfig {
    pub fail_on_missing_submodules: bool,
    pub workers: usize,
}

impl Default for BlobCacheConfig {
    fn default() -> Self {
        Self {
            fail_on_missing_submodules: false,
            workers: 1,
        }
    }
}

/// `FileDiff` (§4.2.4).
#[derive(Clone, Debug)]
pub struct FileDiffConfig {
    pub no_cleanup: bool,
    pub whitespace_ignore: bool,
    pub timeout_ms: u64,
    pub workers: usize,
}

impl Default for FileDiffConfig {
    fn default() -> Self {
        Self {
            no_cleanup: false,
            whitespace_ignore: false,
            timeout_ms: 1_000,
            workers: 1,
        }
    }
}

/// `TicksSinceStart` (§4.2.2).
#[derive(Clone, Copy, Debug)]
pub struct TicksSinceStartConfig {
    pub tick_size_hours: u32,
}

impl Default for TicksSinceStartConfig {
    fn default() -> Self {
        Self { tick_size_hours: 24 }
    }
}

/// `TemporalAnomaly` (§4.5).
#[derive(Clone, Copy, Debug)]
pub struct TemporalAnomalyConfig {
    pub threshold: f64,
    pub window_size: usize,
}

impl Default for TemporalAnomalyConfig {
    fn default() -> Self {
        Self {
            threshold: 2.0,
            window_size: 20,
        }
    }
}

/// `CommentSentiment` (§4.6). `gap` is the length-weight ratio cap
/// (`max_weight_ratio`), valid in `[0, 1)`.
#[derive(Clone, Copy, Debug)]
pub struct CommentSentimentConfig {
    pub min_comment_length: usize,
    pub gap: f64,
}

impl Default for CommentSentimentConfig {
    fn default() -> Self {
        Self {
            min_comment_length: 20,
            gap: 0.5,
        }
    }
}

/// `Couples` — spec supplement (SPEC_FULL §4.7).
#[derive(Clone, Copy, Debug)]
pub struct CouplesConfig {
    /// Commits touching more files than this are skipped entirely: an
    /// O(files^2) coupling update on a 5,000-file commit is not worth
    /// the signal it produces (S6).
    pub max_changes: usize,
}

impl Default for CouplesConfig {
    fn default() -> Self {
        Self { max_changes: 1000 }
    }
}

/// Read a scalar default back out of a `ConfigurationOption`'s
/// `ConfigValue`, for analyzers that build their typed config struct from
/// `list_configuration_options()` defaults plus CLI overrides.
pub fn as_bool(value: &ConfigValue) -> Option<bool> {
    match value {
        ConfigValue::Bool(b) => Some(*b),
        _ => None,
    }
}

pub fn as_int(value: &ConfigValue) -> Option<i64> {
    match value {
        ConfigValue::Int(i) => Some(*i),
        _ => None,
    }
}

pub fn as_float(value: &ConfigValue) -> Option<f64> {
    match value {
        ConfigValue::Float(f) => Some(*f),
        _ => None,
    }
}

pub fn as_string(value: &ConfigValue) -> Option<&str> {
    match value {
        ConfigValue::String(s) => Some(s.as_str()),
        _ => None,
    }
}
