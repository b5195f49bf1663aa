//! `Snapshot` — the value-typed capture of one commit's plumbing output.
//!
//! Produced by the runner's producer thread after walking a commit through
//! the plumbing core; handed across the dispatch channel to a leaf worker
//! (`apply_snapshot`), and released exactly once (`release_snapshot`) when
//! the worker is done with it. Cloning a `Snapshot` is intentionally cheap —
//! the blob cache and UAST trees are `Arc`-shared — but ownership of "who
//! must call release" is tracked by the runner, not by `Arc` refcounting
//! alone, because `UastNode` release needs to be observable for the
//! `state_growth_per_commit` bookkeeping.

use std::sync::Arc;

use crate::types::blob::CachedBlob;
use crate::types::change::Change;
use crate::types::diff::FileDiffEntry;
use crate::types::ids::{AuthorId, CommitHash, Tick};
use crate::types::lines::LineStats;
use crate::types::uast_change::UastChangePair;

use crate::types::collections::FxHashMap;

/// All plumbing outputs for a single commit.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub commit: CommitHash,
    pub changes: Arc<Vec<Change>>,
    pub blobs: Arc<FxHashMap<[u8; 20], CachedBlob>>,
    /// Indexed the same way as `changes` — `file_diffs[i]` is `None` unless
    /// `changes[i]` is a `Modify`.
    pub file_diffs: Arc<Vec<Option<FileDiffEntry>>>,
    /// Indexed the same way as `changes`.
    pub line_stats: Arc<Vec<LineStats>>,
    /// blob hash → detected language.
    pub languages: Arc<FxHashMap<[u8; 20], String>>,
    pub tick: Tick,
    pub author_id: AuthorId,
    pub uast_changes: Arc<Vec<UastChangePair>>,
    released: bool,
}

impl Snapshot {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        commit: CommitHash,
        changes: Vec<Change>,
        blobs: FxHashMap<[u8; 20], CachedBlob>,
        file_diffs: Vec<Option<FileDiffEntry>>,
        line_stats: Vec<LineStats>,
        languages: FxHashMap<[u8; 20], String>,
        tick: Tick,
        author_id: AuthorId,
        uast_changes: Vec<UastChangePair>,
    ) -> Self {
        Self {
            commit,
            changes: Arc::new(changes),
            blobs: Arc::new(blobs),
            file_diffs: Arc::new(file_diffs),
            line_stats: Arc::new(line_stats),
            languages: Arc::new(languages),
            tick,
            author_id,
            uast_changes: Arc::new(uast_changes),
            released: false,
        }
    }

    /// Release the UAST subtrees this snapshot owns. Idempotent: a second
    /// call is a no-op rather than a double-free, since `Arc` already makes
    /// the underlying trees safe to drop more than once — but callers
    /// should still call it exactly once per the contract so
    /// `state_growth_per_commit` bookkeeping stays accurate.
    pub fn release(&mut self) {
        self.released = true;
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}
