//! `Runner` — owns the ordered analyzer DAG and the commit stream, and
//! drives `initialize` → repeated `process_chunk` → `finalize` (§4.3).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use historian_core::analyzer::{Analyzer, ConfigFacts, ConsumeContext};
use historian_core::cancellation::CancellationToken;
use historian_core::types::collections::FxHashMap;
use historian_core::types::Report;
use historian_core::vcs::Commit;
use historian_storage::{JsonCodec, Metadata, Persister, StreamingState, METADATA_VERSION};

use historian_plumbing::flags as plumbing_flags;

use crate::dag::topological_order;
use crate::dispatch::dispatch_chunk;
use crate::error::RunnerError;
use crate::producer::produce_snapshots;

/// Default streaming chunk size, matching the CLI surface's `--limit`
/// default (§6).
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

fn streaming_state_persister() -> Persister<StreamingState, JsonCodec<StreamingState>> {
    Persister::new("streaming_state", JsonCodec::new())
}

fn metadata_persister() -> Persister<Metadata, JsonCodec<Metadata>> {
    Persister::new("metadata", JsonCodec::new())
}

pub struct Runner {
    plumbing: Vec<Box<dyn Analyzer>>,
    leaves: Vec<Box<dyn Analyzer>>,
    commits: Vec<Arc<dyn Commit>>,
    cancellation: CancellationToken,
    workers: usize,
    chunk_size: usize,
    processed: usize,
    chunk_index: usize,
    /// Set once a chunk fails with a fatal (non-cancel) analyzer error;
    /// finalize still runs and returns whatever the surviving analyzers
    /// produced, per §7 "other analyzers continue".
    failed_analyzers: Vec<(String, String)>,
    /// `--resume <dir>` (§6). When set, `process_chunk` writes every
    /// analyzer's checkpoint plus `streaming_state.json`/`metadata.json`
    /// at each chunk boundary (§4.3 "the runner calls save_checkpoint at
    /// chunk boundaries"); `resume` reads them back on cold start.
    checkpoint_dir: Option<PathBuf>,
}

impl Runner {
    pub fn new(
        plumbing: Vec<Box<dyn Analyzer>>,
        leaves: Vec<Box<dyn Analyzer>>,
        commits: Vec<Arc<dyn Commit>>,
        workers: usize,
        chunk_size: usize,
    ) -> Result<Self, RunnerError> {
        let plumbing = topological_order(plumbing)?;
        Ok(Self {
            plumbing,
            leaves,
            commits,
            cancellation: CancellationToken::new(),
            workers: workers.max(1),
            chunk_size: chunk_size.max(1),
            processed: 0,
            chunk_index: 0,
            failed_analyzers: Vec::new(),
            checkpoint_dir: None,
        })
    }

    /// Enables chunk-boundary checkpointing to `dir` (§6 `--resume`).
    pub fn with_checkpoint_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.checkpoint_dir = Some(dir.into());
        self
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn total_commits(&self) -> usize {
        self.commits.len()
    }

    pub fn processed_commits(&self) -> usize {
        self.processed
    }

    pub fn is_done(&self) -> bool {
        self.processed >= self.commits.len()
    }

    /// Runs the full-stream pre-pass for `TicksSinceStart`/`IdentityDetector`
    /// (precompute mode), publishes `commitsByTick`/`peopleDict` into
    /// `facts`, then calls `configure` and `initialize` on every analyzer
    /// in DAG order. Must run before the first `process_chunk`.
    pub fn initialize(&mut self, mut facts: ConfigFacts) -> Result<(), RunnerError> {
        self.prepass_export_facts(&mut facts)?;

        for analyzer in self.plumbing.iter_mut().chain(self.leaves.iter_mut()) {
            analyzer
                .configure(&facts)
                .map_err(|e| RunnerError::analyzer(analyzer.name(), e))?;
        }
        for analyzer in self.plumbing.iter_mut().chain(self.leaves.iter_mut()) {
            analyzer
                .initialize()
                .map_err(|e| RunnerError::analyzer(analyzer.name(), e))?;
        }
        Ok(())
    }

    /// Drives a throwaway clone of `TicksSinceStart` (and, if configured
    /// for precompute, `IdentityDetector`) across the entire commit list
    /// before any `configure` call, per the "precomputed from the full
    /// commit list before streaming" contract (§4.2).
    fn prepass_export_facts(&mut self, facts: &mut ConfigFacts) -> Result<(), RunnerError> {
        let prepass_flags = [plumbing_flags::TICKS, plumbing_flags::IDENTITY];
        for flag in prepass_flags {
            let Some(original) = self.plumbing.iter().find(|a| a.flag() == flag) else {
                continue;
            };
            let mut scratch = original
                .fork(1)
                .into_iter()
                .next()
                .expect("fork(1) yields exactly one clone");
            scratch.configure(facts).map_err(|e| RunnerError::analyzer(flag, e))?;
            scratch
                .initialize()
                .map_err(|e| RunnerError::analyzer(flag, e))?;

            let empty_deps: FxHashMap<&'static str, Box<dyn std::any::Any + Send + Sync>> =
                FxHashMap::default();
            for (index, commit) in self.commits.iter().enumerate() {
                let ctx = ConsumeContext {
                    commit: commit.as_ref(),
                    is_merge: commit.is_merge(),
                    index,
                    cancellation: &self.cancellation,
                    deps: &empty_deps,
                };
                scratch
                    .consume(&ctx)
                    .map_err(|e| RunnerError::analyzer(flag, e))?;
            }
            scratch.export_facts(facts);
        }
        Ok(())
    }

    /// Processes the next streaming chunk. Returns `true` if there are
    /// more commits left to process.
    pub fn process_chunk(&mut self) -> Result<bool, RunnerError> {
        if self.is_done() {
            return Ok(false);
        }
        if self.cancellation.is_cancelled() {
            return Err(RunnerError::Cancelled);
        }

        if self.chunk_index > 0 {
            for analyzer in self.plumbing.iter_mut().chain(self.leaves.iter_mut()) {
                analyzer.boot();
            }
        }

        let end = (self.processed + self.chunk_size).min(self.commits.len());
        let chunk = self.commits[self.processed..end].to_vec();
        let start_index = self.processed;

        let result = produce_snapshots(&mut self.plumbing, &chunk, start_index, &self.cancellation)
            .and_then(|snapshots| {
                let last = snapshots.last().map(|(_, s)| (s.commit, s.tick));
                dispatch_chunk(
                    &mut self.leaves,
                    snapshots,
                    &chunk,
                    start_index,
                    self.workers,
                    &self.cancellation,
                )
                .map(|()| last)
            });

        let last_snapshot = match result {
            Ok(last) => last,
            Err(RunnerError::Cancelled) => return Err(RunnerError::Cancelled),
            Err(RunnerError::Analyzer { analyzer, source }) => {
                // Fatal to that analyzer only; keep processing the rest of
                // the run with the remaining analyzers (§7).
                self.failed_analyzers.push((analyzer, source.to_string()));
                None
            }
            Err(e) => return Err(e),
        };

        self.processed = end;
        self.chunk_index += 1;

        if let Some(dir) = self.checkpoint_dir.clone() {
            self.save_checkpoint(&dir, last_snapshot)?;
        }

        for analyzer in self.plumbing.iter_mut().chain(self.leaves.iter_mut()) {
            analyzer.hibernate();
        }

        Ok(!self.is_done())
    }

    /// Writes every analyzer's checkpoint plus the streaming-state/metadata
    /// envelope to `dir` (§4.3 "the runner calls save_checkpoint at chunk
    /// boundaries", §6 persisted-state layout). A single analyzer's save
    /// failure is logged and suppressed per §7 "checkpoint write failure
    /// logs and continues (next chunk retries)" — it does not abort the run.
    fn save_checkpoint(
        &self,
        dir: &Path,
        last_snapshot: Option<(historian_core::CommitHash, historian_core::Tick)>,
    ) -> Result<(), RunnerError> {
        for analyzer in self.plumbing.iter().chain(self.leaves.iter()) {
            if let Err(e) = analyzer.save_checkpoint(dir) {
                tracing::warn!(
                    analyzer = analyzer.name(),
                    error = %e,
                    "checkpoint write failed, will retry next chunk"
                );
            }
        }

        let (last_commit_hash, last_tick) = last_snapshot
            .map(|(hash, tick)| (hash.to_hex(), tick.0))
            .unwrap_or_default();
        let total_chunks =
            (self.commits.len() + self.chunk_size - 1) / self.chunk_size.max(1);
        let streaming_state = StreamingState {
            total_commits: self.commits.len() as u64,
            processed_commits: self.processed as u64,
            current_chunk: self.chunk_index as u64,
            total_chunks: total_chunks as u64,
            last_commit_hash,
            last_tick,
        };
        streaming_state_persister()
            .save(dir, || streaming_state.clone())
            .map_err(|e| RunnerError::Input(format!("streaming_state checkpoint: {e}")))?;

        let analyzers: Vec<String> = self
            .plumbing
            .iter()
            .chain(self.leaves.iter())
            .map(|a| a.name().to_string())
            .collect();
        let metadata = Metadata {
            version: METADATA_VERSION,
            repo_path: String::new(),
            repo_hash: String::new(),
            analyzers,
            streaming_state,
            checksums: Default::default(),
            created_at: String::new(),
        };
        metadata_persister()
            .save(dir, || metadata.clone())
            .map_err(|e| RunnerError::Input(format!("metadata checkpoint: {e}")))?;

        Ok(())
    }

    /// Cold-start resume (§6 `--resume <dir>`, §7 "load failure aborts
    /// resume and falls back to a cold start"). Reads `streaming_state`,
    /// restores `processed`/`chunk_index`, and calls `load_checkpoint` on
    /// every analyzer. Must run after `initialize`. Returns `Ok(false)`
    /// (cold start, caller proceeds from the top) if no streaming state
    /// exists yet at `dir`; propagates the first load error otherwise.
    pub fn resume(&mut self, dir: &Path) -> Result<bool, RunnerError> {
        if !streaming_state_persister().path(dir).exists() {
            self.checkpoint_dir = Some(dir.to_path_buf());
            return Ok(false);
        }

        let state = streaming_state_persister()
            .load(dir, |s| s)
            .map_err(|e| RunnerError::Input(format!("streaming_state resume: {e}")))?;

        for analyzer in self.plumbing.iter_mut().chain(self.leaves.iter_mut()) {
            analyzer
                .load_checkpoint(dir)
                .map_err(|e| RunnerError::analyzer(analyzer.name(), e))?;
        }

        self.processed = state.processed_commits as usize;
        self.chunk_index = state.current_chunk as usize;
        self.checkpoint_dir = Some(dir.to_path_buf());
        Ok(true)
    }

    /// Finalizes every leaf that did not fail fatally this run, keyed by
    /// `flag()`. Failed analyzers are omitted with their error recorded
    /// under [`historian_core::types::report::ERROR_KEY`] instead (§7).
    pub fn finalize(&mut self) -> FxHashMap<String, Report> {
        let mut reports = FxHashMap::default();
        let failed: FxHashMap<&str, &str> = self
            .failed_analyzers
            .iter()
            .map(|(name, msg)| (name.as_str(), msg.as_str()))
            .collect();

        for leaf in self.leaves.iter_mut() {
            if let Some(msg) = failed.get(leaf.name()) {
                let mut report = Report::new();
                report.set(
                    historian_core::types::report::ERROR_KEY,
                    msg.to_string(),
                );
                reports.insert(leaf.flag().to_string(), report);
                continue;
            }
            reports.insert(leaf.flag().to_string(), leaf.finalize());
        }
        reports
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use historian_core::vcs::Signature;
    use historian_core::CommitHash;

    struct FixtureCommit {
        hash: CommitHash,
        author: Signature,
        time: i64,
        parents: Vec<CommitHash>,
    }

    impl Commit for FixtureCommit {
        fn hash(&self) -> CommitHash {
            self.hash
        }
        fn author(&self) -> &Signature {
            &self.author
        }
        fn committer(&self) -> &Signature {
            &self.author
        }
        fn committer_time(&self) -> i64 {
            self.time
        }
        fn parents(&self) -> &[CommitHash] {
            &self.parents
        }
    }

    fn fixture_commits(n: u8) -> Vec<Arc<dyn Commit>> {
        (0..n)
            .map(|i| {
                let mut hash = [0u8; 20];
                hash[0] = i;
                Arc::new(FixtureCommit {
                    hash: CommitHash(hash),
                    author: Signature {
                        name: "dev".to_string(),
                        email: "dev@example.com".to_string(),
                    },
                    time: 1_700_000_000 + i as i64 * 3600,
                    parents: Vec::new(),
                }) as Arc<dyn Commit>
            })
            .collect()
    }

    #[test]
    fn empty_plumbing_and_leaves_run_to_completion() {
        let commits = fixture_commits(5);
        let mut runner = Runner::new(Vec::new(), Vec::new(), commits, 2, 2).unwrap();
        runner.initialize(ConfigFacts::default()).unwrap();
        let mut chunks = 0;
        while runner.process_chunk().unwrap() {
            chunks += 1;
        }
        chunks += 1;
        assert!(chunks >= 1);
        assert_eq!(runner.processed_commits(), 5);
        assert!(runner.finalize().is_empty());
    }

    #[test]
    fn cancellation_stops_further_chunks() {
        let commits = fixture_commits(10);
        let mut runner = Runner::new(Vec::new(), Vec::new(), commits, 1, 2).unwrap();
        runner.initialize(ConfigFacts::default()).unwrap();
        runner.cancellation().cancel();
        assert!(runner.process_chunk().is_err());
    }

    /// Testable property 6 at the runner level: a run interrupted after
    /// some chunks, resumed from the checkpoint directory, finishes with
    /// the same `processed_commits` as an uninterrupted run over the same
    /// stream (§4.3 "runner calls save_checkpoint at chunk boundaries").
    #[test]
    fn resume_continues_from_the_last_checkpointed_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let commits = fixture_commits(6);

        let plumbing: Vec<Box<dyn Analyzer>> =
            vec![Box::new(historian_plumbing::TicksSinceStartAnalyzer::new())];
        let mut runner = Runner::new(plumbing, Vec::new(), commits.clone(), 1, 2)
            .unwrap()
            .with_checkpoint_dir(dir.path());
        runner.initialize(ConfigFacts::default()).unwrap();
        assert!(runner.process_chunk().unwrap());
        assert_eq!(runner.processed_commits(), 2);
        // Simulate a crash: drop `runner` without finishing the run.
        drop(runner);

        let plumbing: Vec<Box<dyn Analyzer>> =
            vec![Box::new(historian_plumbing::TicksSinceStartAnalyzer::new())];
        let mut resumed = Runner::new(plumbing, Vec::new(), commits, 1, 2).unwrap();
        resumed.initialize(ConfigFacts::default()).unwrap();
        let was_resumed = resumed.resume(dir.path()).unwrap();
        assert!(was_resumed);
        assert_eq!(resumed.processed_commits(), 2);

        while resumed.process_chunk().unwrap() {}
        assert_eq!(resumed.processed_commits(), 6);
    }

    #[test]
    fn resume_on_an_empty_directory_is_a_cold_start() {
        let dir = tempfile::tempdir().unwrap();
        let commits = fixture_commits(3);
        let mut runner = Runner::new(Vec::new(), Vec::new(), commits, 1, 2).unwrap();
        runner.initialize(ConfigFacts::default()).unwrap();
        assert!(!runner.resume(dir.path()).unwrap());
        assert_eq!(runner.processed_commits(), 0);
    }
}
