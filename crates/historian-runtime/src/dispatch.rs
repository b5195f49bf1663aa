//! Parallel leaf dispatch over one streaming chunk (§4.3 points 2-3, §5
//! ordering guarantees).
//!
//! Each leaf is forked into `W` independent clones for the chunk. A
//! dedicated worker thread owns clone `i` of every leaf and receives, over
//! a bounded `crossbeam-channel`, every `Snapshot` whose commit's index in
//! the chunk is `≡ i (mod W)` — the "stable modulo-index" assignment the
//! spec calls out so `merge` stays deterministic regardless of wall-clock
//! scheduling. After the producer has sent every snapshot and dropped its
//! senders, workers drain their queues, join, and the runner folds the `W`
//! branches for each leaf back into the canonical instance via `merge`.

use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, Sender};

use historian_core::analyzer::{downcast_branch, Analyzer, ConsumeContext};
use historian_core::cancellation::CancellationToken;
use historian_core::types::Snapshot;
use historian_core::vcs::Commit;

use crate::error::RunnerError;
use crate::snapshot_deps::deps_from_snapshot;

const CHANNEL_BOUND: usize = 256;

struct DispatchItem {
    commit: Arc<dyn Commit>,
    index: usize,
    snapshot: Snapshot,
}

/// Runs one chunk's worth of snapshots through `leaves`, mutating each
/// entry in place to hold the chunk's merged result. `workers` is clamped
/// to at least 1; a single worker degrades to fully sequential leaf
/// consumption, which is still correct (fork/merge identity holds for
/// `n = 1` trivially).
pub fn dispatch_chunk(
    leaves: &mut [Box<dyn Analyzer>],
    snapshots: Vec<(usize, Snapshot)>,
    commits: &[Arc<dyn Commit>],
    start_index: usize,
    workers: usize,
    cancellation: &CancellationToken,
) -> Result<(), RunnerError> {
    let workers = workers.max(1);

    // fork(workers) per leaf; transpose so worker `w` owns clone `w` of
    // every leaf, in leaf-declaration order.
    let mut per_worker_leaves: Vec<Vec<Box<dyn Analyzer>>> =
        (0..workers).map(|_| Vec::with_capacity(leaves.len())).collect();
    for leaf in leaves.iter() {
        let clones = leaf.fork(workers);
        for (w, clone) in clones.into_iter().enumerate() {
            per_worker_leaves[w].push(clone);
        }
    }

    let (senders, handles): (Vec<Sender<DispatchItem>>, Vec<thread::JoinHandle<Result<Vec<Box<dyn Analyzer>>, RunnerError>>>) =
        per_worker_leaves
            .into_iter()
            .map(|worker_leaves| {
                let (tx, rx) = bounded::<DispatchItem>(CHANNEL_BOUND);
                let cancellation = cancellation.clone();
                let handle = thread::spawn(move || -> Result<Vec<Box<dyn Analyzer>>, RunnerError> {
                    let mut worker_leaves = worker_leaves;
                    while let Ok(item) = rx.recv() {
                        if cancellation.is_cancelled() {
                            return Err(RunnerError::Cancelled);
                        }
                        let deps = deps_from_snapshot(&item.snapshot);
                        let ctx = ConsumeContext {
                            commit: item.commit.as_ref(),
                            is_merge: item.commit.is_merge(),
                            index: item.index,
                            cancellation: &cancellation,
                            deps: &deps,
                        };
                        for leaf in worker_leaves.iter_mut() {
                            match leaf.consume(&ctx) {
                                Ok(()) => {}
                                Err(e) if e.is_cancelled() => return Err(RunnerError::Cancelled),
                                Err(e) => {
                                    return Err(RunnerError::analyzer(leaf.name(), e));
                                }
                            }
                        }
                    }
                    Ok(worker_leaves)
                });
                (tx, handle)
            })
            .unzip();

    for (offset, snapshot) in snapshots.into_iter() {
        if cancellation.is_cancelled() {
            drop(senders);
            for handle in handles {
                let _ = handle.join();
            }
            return Err(RunnerError::Cancelled);
        }
        // `offset` is the commit's position in `commits`, not its position
        // among successfully-produced snapshots — a skipped commit (its
        // plumbing failed outright, §7) leaves a gap, and indexing by
        // enumeration position here would silently pair this snapshot with
        // the wrong commit for every commit after the gap.
        let index = start_index + offset;
        let worker = offset % workers;
        let item = DispatchItem {
            commit: Arc::clone(&commits[offset]),
            index,
            snapshot,
        };
        // A send error means the worker thread already exited (it hit a
        // fatal error and dropped its receiver); that error is surfaced
        // below when we join the handle.
        let _ = senders[worker].send(item);
    }
    drop(senders);

    let mut branches_per_leaf: Vec<Vec<Box<dyn Analyzer>>> =
        (0..leaves.len()).map(|_| Vec::with_capacity(workers)).collect();
    let mut first_err: Option<RunnerError> = None;
    for handle in handles {
        match handle.join() {
            Ok(Ok(worker_leaves)) => {
                for (i, leaf) in worker_leaves.into_iter().enumerate() {
                    branches_per_leaf[i].push(leaf);
                }
            }
            Ok(Err(e)) => {
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
            Err(_panic) => {
                if first_err.is_none() {
                    first_err = Some(RunnerError::Input(
                        "leaf worker thread panicked".to_string(),
                    ));
                }
            }
        }
    }

    for (leaf, branches) in leaves.iter_mut().zip(branches_per_leaf.into_iter()) {
        if !branches.is_empty() {
            leaf.merge(branches);
        }
    }

    if let Some(e) = first_err {
        return Err(e);
    }
    Ok(())
}

/// Recovers a leaf's concrete type from a merged branch, for analyzers
/// that need to inspect a sibling's internal state in tests. Re-exported
/// convenience wrapper around [`downcast_branch`].
pub fn downcast_leaf<T: Analyzer>(branch: Box<dyn Analyzer>) -> Box<T> {
    downcast_branch(branch)
}
