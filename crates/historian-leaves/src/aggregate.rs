//! Commit → tick aggregation (§4.4).
//!
//! The canonical per-commit-then-aggregate path (SPEC_FULL §9 Open
//! Question #1): every leaf that needs per-tick series first accumulates
//! one `PerCommit` record per consumed commit, then calls [`aggregate`]
//! once in `finalize` against the shared `commitsByTick` fact. This is
//! the fork/merge-safe path — merging two leaf clones is just unioning
//! their `commit_metrics` maps (commit hashes are distinct across
//! clones), and `aggregate` is deterministic over the merged map's key
//! order because every per-tick reducer below is commutative.

use historian_core::types::collections::{FxHashMap, FxHashSet};
use historian_core::types::{AuthorId, Tick};
use serde::{Deserialize, Serialize};

use historian_core::config::facts::CommitsByTick;

/// Per-commit facts a leaf accumulates during `consume`, keyed by commit
/// hash so merging clones is a plain map union. `Serialize`/`Deserialize`
/// are derived so leaves can checkpoint their accumulated `PerCommit`
/// table directly (§4.8).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PerCommit {
    pub author: AuthorId,
    pub lines_added: u32,
    pub lines_removed: u32,
    pub files_changed: u32,
    pub languages: FxHashSet<String>,
}

/// One tick's aggregated metrics, produced by [`aggregate`].
#[derive(Clone, Debug, Default)]
pub struct PerTick {
    pub lines_added: u32,
    pub lines_removed: u32,
    pub files_changed: u32,
    pub net_churn: i64,
    pub language_histogram: FxHashMap<String, u32>,
    pub authors: FxHashSet<AuthorId>,
}

impl PerTick {
    pub fn language_diversity(&self) -> u32 {
        self.language_histogram.len() as u32
    }

    pub fn author_count(&self) -> u32 {
        self.authors.len() as u32
    }
}

/// Aggregates `commit_metrics` into one `PerTick` per bucket in
/// `commits_by_tick`. Missing hashes (a commit recorded in `commitsByTick`
/// but absent from `commit_metrics`, e.g. skipped by a transient error)
/// are silently skipped, not fatal.
pub fn aggregate(
    commit_metrics: &FxHashMap<[u8; 20], PerCommit>,
    commits_by_tick: &CommitsByTick,
) -> FxHashMap<Tick, PerTick> {
    let mut ticks: FxHashMap<Tick, PerTick> = FxHashMap::default();

    for (&tick, hashes) in commits_by_tick {
        let entry = ticks.entry(tick).or_default();
        for hash in hashes {
            let Some(metrics) = commit_metrics.get(hash) else {
                continue;
            };
            entry.lines_added += metrics.lines_added;
            entry.lines_removed += metrics.lines_removed;
            entry.files_changed += metrics.files_changed;
            entry.authors.insert(metrics.author);
            for lang in &metrics.languages {
                *entry.language_histogram.entry(lang.clone()).or_insert(0) += 1;
            }
        }
        entry.net_churn = entry.lines_added as i64 - entry.lines_removed as i64;
    }

    ticks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(byte: u8) -> [u8; 20] {
        let mut h = [0u8; 20];
        h[0] = byte;
        h
    }

    #[test]
    fn aggregation_is_commutative_under_hash_permutation() {
        let mut metrics = FxHashMap::default();
        metrics.insert(
            hash(1),
            PerCommit {
                author: AuthorId(1),
                lines_added: 10,
                lines_removed: 2,
                files_changed: 1,
                languages: FxHashSet::from_iter(["Go".to_string()]),
            },
        );
        metrics.insert(
            hash(2),
            PerCommit {
                author: AuthorId(2),
                lines_added: 5,
                lines_removed: 1,
                files_changed: 2,
                languages: FxHashSet::from_iter(["Rust".to_string()]),
            },
        );

        let mut by_tick_a: CommitsByTick = FxHashMap::default();
        by_tick_a.insert(Tick(0), vec![hash(1), hash(2)]);
        let mut by_tick_b: CommitsByTick = FxHashMap::default();
        by_tick_b.insert(Tick(0), vec![hash(2), hash(1)]);

        let a = aggregate(&metrics, &by_tick_a);
        let b = aggregate(&metrics, &by_tick_b);

        assert_eq!(a[&Tick(0)].lines_added, b[&Tick(0)].lines_added);
        assert_eq!(a[&Tick(0)].net_churn, b[&Tick(0)].net_churn);
        assert_eq!(a[&Tick(0)].authors.len(), b[&Tick(0)].authors.len());
    }

    #[test]
    fn missing_hash_is_skipped_not_fatal() {
        let metrics = FxHashMap::default();
        let mut by_tick: CommitsByTick = FxHashMap::default();
        by_tick.insert(Tick(0), vec![hash(9)]);
        let ticks = aggregate(&metrics, &by_tick);
        assert_eq!(ticks[&Tick(0)].lines_added, 0);
    }

    proptest::proptest! {
        /// Testable property 2: aggregating a tick's bucket is commutative
        /// under any permutation of the commit hashes inside it — merging
        /// two fork clones (which concatenates their `commit_metrics` in
        /// arbitrary order) must not change the resulting `PerTick` sums.
        #[test]
        fn aggregation_is_commutative_under_arbitrary_permutation(
            seed in proptest::collection::vec(0u8..20, 1..12),
            perm_seed in 0u64..10_000,
        ) {
            let mut metrics = FxHashMap::default();
            for (i, &lines) in seed.iter().enumerate() {
                metrics.insert(
                    hash(i as u8),
                    PerCommit {
                        author: AuthorId(i as i64),
                        lines_added: lines as u32,
                        lines_removed: (lines / 2) as u32,
                        files_changed: 1,
                        languages: FxHashSet::from_iter([if i % 2 == 0 { "Go" } else { "Rust" }.to_string()]),
                    },
                );
            }

            let mut hashes: Vec<[u8; 20]> = (0..seed.len() as u8).map(hash).collect();
            let baseline = {
                let mut by_tick: CommitsByTick = FxHashMap::default();
                by_tick.insert(Tick(0), hashes.clone());
                aggregate(&metrics, &by_tick)
            };

            // Fisher-Yates using `perm_seed` as a deterministic PRNG state,
            // avoiding `rand`/`Math.random`-style nondeterminism.
            let mut state = perm_seed.wrapping_add(1);
            for i in (1..hashes.len()).rev() {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
                let j = (state >> 33) as usize % (i + 1);
                hashes.swap(i, j);
            }
            let permuted = {
                let mut by_tick: CommitsByTick = FxHashMap::default();
                by_tick.insert(Tick(0), hashes);
                aggregate(&metrics, &by_tick)
            };

            proptest::prop_assert_eq!(
                baseline[&Tick(0)].lines_added,
                permuted[&Tick(0)].lines_added
            );
            proptest::prop_assert_eq!(
                baseline[&Tick(0)].net_churn,
                permuted[&Tick(0)].net_churn
            );
            proptest::prop_assert_eq!(
                baseline[&Tick(0)].authors.len(),
                permuted[&Tick(0)].authors.len()
            );
            proptest::prop_assert_eq!(
                baseline[&Tick(0)].language_histogram.len(),
                permuted[&Tick(0)].language_histogram.len()
            );
        }
    }
}
