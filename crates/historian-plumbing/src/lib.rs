//! # historian-plumbing
//!
//! The eight plumbing analyzers that expand each commit into derived facts
//! (tree changes, author identity, ticks, blob content, line diffs, line
//! stats, detected languages, UAST change pairs) ahead of the leaf
//! analyzers that consume them.

#![allow(dead_code)]

pub mod blob_cache;
pub mod file_diff;
pub mod identity;
pub mod languages;
pub mod lines_stats;
pub mod tree_diff;
pub mod ticks;
pub mod uast_changes;

pub use blob_cache::BlobCacheAnalyzer;
pub use file_diff::FileDiffAnalyzer;
pub use identity::IdentityDetectorAnalyzer;
pub use languages::LanguagesDetectionAnalyzer;
pub use lines_stats::LinesStatsAnalyzer;
pub use tree_diff::TreeDiffAnalyzer;
pub use ticks::TicksSinceStartAnalyzer;
pub use uast_changes::UastChangesAnalyzer;

/// Stable `flag()` strings, collected here so the runner can wire the DAG
/// without importing every analyzer's module directly.
pub mod flags {
    pub const TREE_DIFF: &str = "tree-diff";
    pub const IDENTITY: &str = "identity";
    pub const TICKS: &str = "ticks";
    pub const BLOB_CACHE: &str = "blob-cache";
    pub const FILE_DIFF: &str = "file-diff";
    pub const LINES_STATS: &str = "lines-stats";
    pub const LANGUAGES: &str = "languages";
    pub const UAST_CHANGES: &str = "uast-changes";
}
