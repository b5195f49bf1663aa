//! The producer: walks one batch of commits sequentially through the
//! topologically-ordered plumbing analyzers, producing one
//! [`Snapshot`] per commit (§4.3 point 1).
//!
//! Plumbing always runs on a single thread — `TreeDiff`'s `previous_tree`
//! and `TicksSinceStart`/`IdentityDetector`'s running state require strict
//! commit-order continuity, which only a single producer can give them
//! without its own internal locking. Parallelism inside an individual
//! plumbing analyzer (`BlobCache`'s per-change shard load, `FileDiff`'s
//! per-file LCS) is orthogonal and handled inside those analyzers via
//! `rayon`, not here.

use std::any::Any;
use std::sync::Arc;

use historian_core::analyzer::{Analyzer, ConsumeContext};
use historian_core::cancellation::CancellationToken;
use historian_core::types::blob::CachedBlob;
use historian_core::types::change::Change;
use historian_core::types::collections::FxHashMap;
use historian_core::types::diff::FileDiffEntry;
use historian_core::types::ids::{AuthorId, Tick, AUTHOR_MISSING};
use historian_core::types::lines::LineStats;
use historian_core::types::uast_change::UastChangePair;
use historian_core::types::Snapshot;
use historian_core::vcs::Commit;

use historian_plumbing::flags;

use crate::error::RunnerError;

fn downcast_or_default<T: Clone + Default + 'static>(
    deps: &FxHashMap<&'static str, Box<dyn Any + Send + Sync>>,
    flag: &str,
) -> T {
    deps.get(flag)
        .and_then(|b| b.downcast_ref::<T>())
        .cloned()
        .unwrap_or_default()
}

/// Walks `commits` through `plumbing` (already topologically sorted) and
/// returns one `(offset, Snapshot)` per successfully-processed commit, in
/// input order. `offset` is the commit's position within `commits` —
/// callers must key off it rather than assume the result is the same
/// length as `commits`, since a commit whose plumbing fails outright is
/// skipped (§7 "Analyzer" failure) and leaves a gap in the sequence.
///
/// `start_index` is the global index of `commits[0]` in the overall run,
/// passed through to `ConsumeContext::index`.
pub fn produce_snapshots(
    plumbing: &mut [Box<dyn Analyzer>],
    commits: &[Arc<dyn Commit>],
    start_index: usize,
    cancellation: &CancellationToken,
) -> Result<Vec<(usize, Snapshot)>, RunnerError> {
    let mut snapshots = Vec::with_capacity(commits.len());

    'commits: for (offset, commit) in commits.iter().enumerate() {
        if cancellation.is_cancelled() {
            return Err(RunnerError::Cancelled);
        }

        let mut deps: FxHashMap<&'static str, Box<dyn Any + Send + Sync>> = FxHashMap::default();
        let index = start_index + offset;
        let is_merge = commit.is_merge();

        for analyzer in plumbing.iter_mut() {
            let ctx = ConsumeContext {
                commit: commit.as_ref(),
                is_merge,
                index,
                cancellation,
                deps: &deps,
            };
            match analyzer.consume(&ctx) {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => return Err(RunnerError::Cancelled),
                Err(e) => {
                    // A plumbing failure is fatal to this commit only: per
                    // §7 "Transient" failures (a missing blob, a single
                    // file's diff) are absorbed inside the analyzer itself.
                    // An error surfacing this far means the analyzer could
                    // not produce *any* output for the commit, which the
                    // spec treats as an Analyzer-kind failure — we record
                    // it and skip the commit rather than propagate it as
                    // fatal to the whole run.
                    tracing::warn!(
                        analyzer = analyzer.name(),
                        commit = %commit.hash(),
                        error = %e,
                        "plumbing consume failed, skipping commit"
                    );
                    continue 'commits;
                }
            }
            if let Some(output) = analyzer.plumbing_output() {
                deps.insert(analyzer.flag(), output);
            }
        }

        let changes: Vec<Change> = downcast_or_default(&deps, flags::TREE_DIFF);
        let blobs: FxHashMap<[u8; 20], CachedBlob> = downcast_or_default(&deps, flags::BLOB_CACHE);
        let file_diffs: Vec<Option<FileDiffEntry>> = downcast_or_default(&deps, flags::FILE_DIFF);
        let line_stats: Vec<LineStats> = downcast_or_default(&deps, flags::LINES_STATS);
        let languages: FxHashMap<[u8; 20], String> = downcast_or_default(&deps, flags::LANGUAGES);
        let tick = deps
            .get(flags::TICKS)
            .and_then(|b| b.downcast_ref::<Tick>())
            .copied()
            .unwrap_or(Tick(0));
        let author_id = deps
            .get(flags::IDENTITY)
            .and_then(|b| b.downcast_ref::<AuthorId>())
            .copied()
            .unwrap_or(AUTHOR_MISSING);
        let uast_changes: Vec<UastChangePair> = downcast_or_default(&deps, flags::UAST_CHANGES);

        snapshots.push((
            offset,
            Snapshot::new(
                commit.hash(),
                changes,
                blobs,
                file_diffs,
                line_stats,
                languages,
                tick,
                author_id,
                uast_changes,
            ),
        ));
    }

    Ok(snapshots)
}
