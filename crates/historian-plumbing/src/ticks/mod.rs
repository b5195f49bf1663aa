//! `TicksSinceStart` (§4.2): buckets commits into fixed-width time ticks
//! and publishes `commitsByTick` as a shared fact for downstream
//! aggregation.

use std::any::Any;
use std::path::Path;

use historian_core::analyzer::{
    downcast_branch, Analyzer, ConfigFacts, ConfigurationOption, ConsumeContext, Descriptor, Mode,
    OptionType, SerializeFormat,
};
use historian_core::config::facts::CommitsByTick;
use historian_core::config::TicksSinceStartConfig;
use historian_core::errors::AnalyzerError;
use historian_core::types::collections::FxHashMap;
use historian_core::types::{Report, Tick};
use historian_storage::{JsonCodec, Persister};
use serde::{Deserialize, Serialize};

use crate::flags;

const TAIL_DEDUP_WINDOW: usize = 8;

/// POD checkpoint state (§4.8): `commitsByTick` is flattened to a
/// `Vec<(tick, hex hashes)>` rather than keyed by `Tick` directly, since
/// `Tick`'s derived `Serialize` writes a bare number and JSON object keys
/// must be strings.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
struct TicksCheckpointState {
    tick0: Option<i64>,
    previous_tick: u32,
    commits_by_tick: Vec<(u32, Vec<String>)>,
}

pub struct TicksSinceStartAnalyzer {
    config: TicksSinceStartConfig,
    tick0: Option<i64>,
    previous_tick: u32,
    commits_by_tick: CommitsByTick,
    current_tick: Tick,
}

impl TicksSinceStartAnalyzer {
    pub fn new() -> Self {
        Self {
            config: TicksSinceStartConfig::default(),
            tick0: None,
            previous_tick: 0,
            commits_by_tick: FxHashMap::default(),
            current_tick: Tick(0),
        }
    }

    fn tick_size_seconds(&self) -> i64 {
        self.config.tick_size_hours as i64 * 3600
    }

    fn build_checkpoint_state(&self) -> TicksCheckpointState {
        let mut commits_by_tick: Vec<(u32, Vec<String>)> = self
            .commits_by_tick
            .iter()
            .map(|(tick, hashes)| {
                (
                    tick.0,
                    hashes.iter().map(|h| hex_encode(h)).collect(),
                )
            })
            .collect();
        commits_by_tick.sort_by_key(|(tick, _)| *tick);
        TicksCheckpointState {
            tick0: self.tick0,
            previous_tick: self.previous_tick,
            commits_by_tick,
        }
    }

    fn restore_from_checkpoint(&mut self, state: TicksCheckpointState) {
        self.tick0 = state.tick0;
        self.previous_tick = state.previous_tick;
        self.commits_by_tick = state
            .commits_by_tick
            .into_iter()
            .map(|(tick, hashes)| (Tick(tick), hashes.iter().map(|h| hex_decode(h)).collect()))
            .collect();
        self.current_tick = Tick(self.previous_tick);
    }

    fn checkpoint_persister(&self) -> Persister<TicksCheckpointState, JsonCodec<TicksCheckpointState>> {
        Persister::new("ticks_state", JsonCodec::new())
    }
}

fn hex_encode(bytes: &[u8; 20]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn hex_decode(s: &str) -> [u8; 20] {
    let mut out = [0u8; 20];
    for (i, byte) in out.iter_mut().enumerate() {
        if let Some(hex_pair) = s.get(i * 2..i * 2 + 2) {
            *byte = u8::from_str_radix(hex_pair, 16).unwrap_or(0);
        }
    }
    out
}

impl Analyzer for TicksSinceStartAnalyzer {
    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn descriptor(&self) -> Descriptor {
        Descriptor {
            id: "TicksSinceStart",
            mode: Mode::History,
            description: "Buckets commits into fixed-width committer-time ticks",
        }
    }

    fn name(&self) -> &str {
        "TicksSinceStart"
    }

    fn flag(&self) -> &'static str {
        flags::TICKS
    }

    fn list_configuration_options(&self) -> Vec<ConfigurationOption> {
        use historian_core::analyzer::ConfigValue;
        vec![ConfigurationOption {
            name: "tick_size_hours",
            description: "Width of one tick bucket, in hours",
            cli_flag: "tick-size",
            option_type: OptionType::Int,
            default: ConfigValue::Int(24),
        }]
    }

    fn configure(&mut self, facts: &ConfigFacts) -> Result<(), AnalyzerError> {
        if let Some(cfg) = historian_core::config::facts::get::<TicksSinceStartConfig>(
            facts,
            "ticks.config",
        ) {
            self.config = *cfg;
        }
        if self.config.tick_size_hours == 0 {
            return Err(AnalyzerError::configuration(
                self.name(),
                "tick_size_hours must be > 0",
            ));
        }
        Ok(())
    }

    fn initialize(&mut self) -> Result<(), AnalyzerError> {
        self.tick0 = None;
        self.previous_tick = 0;
        self.commits_by_tick.clear();
        self.current_tick = Tick(0);
        Ok(())
    }

    fn consume(&mut self, ctx: &ConsumeContext) -> Result<(), AnalyzerError> {
        if ctx.cancellation.is_cancelled() {
            return Err(AnalyzerError::Cancelled);
        }

        let time = ctx.commit.committer_time();
        let tick_size = self.tick_size_seconds();
        let tick0 = *self.tick0.get_or_insert_with(|| time - time.rem_euclid(tick_size));

        let raw_tick = ((time - tick0) / tick_size).max(0) as u32;
        let tick = raw_tick.max(self.previous_tick);
        self.previous_tick = tick;
        self.current_tick = Tick(tick);

        let hash = ctx.commit.hash().0;
        let bucket = self.commits_by_tick.entry(Tick(tick)).or_default();
        let dedup_from = bucket.len().saturating_sub(TAIL_DEDUP_WINDOW);
        if !bucket[dedup_from..].contains(&hash) {
            bucket.push(hash);
        }

        Ok(())
    }

    fn finalize(&mut self) -> Report {
        Report::new()
    }

    fn plumbing_output(&self) -> Option<Box<dyn Any + Send + Sync>> {
        Some(Box::new(self.current_tick))
    }

    fn export_facts(&self, facts: &mut ConfigFacts) {
        historian_core::config::facts::insert(
            facts,
            historian_core::config::facts::COMMITS_BY_TICK,
            self.commits_by_tick.clone(),
        );
        historian_core::config::facts::insert(
            facts,
            historian_core::config::facts::TICK_SIZE_SECONDS,
            self.tick_size_seconds(),
        );
    }

    fn fork(&self, n: usize) -> Vec<Box<dyn Analyzer>> {
        (0..n)
            .map(|_| {
                Box::new(TicksSinceStartAnalyzer {
                    config: self.config,
                    tick0: self.tick0,
                    previous_tick: self.previous_tick,
                    commits_by_tick: FxHashMap::default(),
                    current_tick: Tick(0),
                }) as Box<dyn Analyzer>
            })
            .collect()
    }

    fn merge(&mut self, branches: Vec<Box<dyn Analyzer>>) {
        for branch in branches {
            let mut other = downcast_branch::<TicksSinceStartAnalyzer>(branch);
            for (tick, hashes) in other.commits_by_tick.drain() {
                let bucket = self.commits_by_tick.entry(tick).or_default();
                for hash in hashes {
                    if !bucket.contains(&hash) {
                        bucket.push(hash);
                    }
                }
            }
            self.previous_tick = self.previous_tick.max(other.previous_tick);
        }
    }

    fn sequential_only(&self) -> bool {
        true
    }

    fn save_checkpoint(&self, dir: &Path) -> Result<(), AnalyzerError> {
        self.checkpoint_persister()
            .save(dir, || self.build_checkpoint_state())
            .map_err(|e| AnalyzerError::checkpoint(self.name(), e))
    }

    fn load_checkpoint(&mut self, dir: &Path) -> Result<(), AnalyzerError> {
        let state = self
            .checkpoint_persister()
            .load(dir, |s| s)
            .map_err(|e| AnalyzerError::checkpoint(self.name(), e))?;
        self.restore_from_checkpoint(state);
        Ok(())
    }

    fn checkpoint_size(&self) -> usize {
        // Base overhead plus ~24 bytes per (tick, hash-count) entry plus
        // 40 hex bytes per commit hash (§4.8's "base overhead + per-entry
        // constants + payload bytes" estimate).
        let entries: usize = self.commits_by_tick.values().map(|v| v.len()).sum();
        64 + self.commits_by_tick.len() * 24 + entries * 40
    }

    fn serialize(
        &self,
        _report: &Report,
        _format: SerializeFormat,
        _writer: &mut dyn std::io::Write,
    ) -> Result<(), AnalyzerError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_never_regress_even_if_timestamps_do() {
        let mut a = TicksSinceStartAnalyzer::new();
        a.config.tick_size_hours = 24;
        let tick_size = a.tick_size_seconds();
        let t0 = 1_700_000_000i64;
        a.tick0 = Some(t0 - t0.rem_euclid(tick_size));

        let compute = |a: &mut TicksSinceStartAnalyzer, time: i64| -> u32 {
            let tick0 = a.tick0.unwrap();
            let raw = ((time - tick0) / tick_size).max(0) as u32;
            let tick = raw.max(a.previous_tick);
            a.previous_tick = tick;
            tick
        };

        let first = compute(&mut a, t0 + tick_size * 5);
        let second = compute(&mut a, t0 + tick_size * 2); // earlier timestamp
        assert!(second >= first);
    }

    /// Testable property 6: `load(save(state)) == state`.
    #[test]
    fn checkpoint_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = TicksSinceStartAnalyzer::new();
        a.tick0 = Some(1_700_000_000);
        a.previous_tick = 3;
        a.current_tick = Tick(3);
        a.commits_by_tick.insert(Tick(0), vec![[1u8; 20]]);
        a.commits_by_tick.insert(Tick(3), vec![[2u8; 20], [3u8; 20]]);

        a.save_checkpoint(dir.path()).unwrap();

        let mut b = TicksSinceStartAnalyzer::new();
        b.load_checkpoint(dir.path()).unwrap();

        assert_eq!(a.build_checkpoint_state(), b.build_checkpoint_state());
    }

    struct FixtureCommit {
        time: i64,
    }

    impl historian_core::vcs::Commit for FixtureCommit {
        fn hash(&self) -> historian_core::CommitHash {
            historian_core::CommitHash([0u8; 20])
        }
        fn author(&self) -> &historian_core::vcs::Signature {
            unreachable!("not exercised by tick assignment")
        }
        fn committer(&self) -> &historian_core::vcs::Signature {
            unreachable!("not exercised by tick assignment")
        }
        fn committer_time(&self) -> i64 {
            self.time
        }
        fn parents(&self) -> &[historian_core::CommitHash] {
            &[]
        }
    }

    proptest::proptest! {
        /// Testable property 1: ticks assigned to a commit stream never
        /// regress, even when committer timestamps arrive out of order
        /// (clock skew, rebased history) — `current_tick` is clamped to
        /// `previous_tick`'s high-water mark on every `consume`.
        #[test]
        fn ticks_are_monotonic_under_arbitrary_timestamp_order(
            times in proptest::collection::vec(1_600_000_000i64..1_800_000_000i64, 1..50),
        ) {
            let mut analyzer = TicksSinceStartAnalyzer::new();
            let cancellation = historian_core::cancellation::CancellationToken::new();
            let deps = FxHashMap::default();
            let mut last_tick = 0u32;
            for time in times {
                let commit = FixtureCommit { time };
                let ctx = historian_core::analyzer::ConsumeContext {
                    commit: &commit,
                    is_merge: false,
                    index: 0,
                    cancellation: &cancellation,
                    deps: &deps,
                };
                analyzer.consume(&ctx).unwrap();
                let tick = analyzer.current_tick.0;
                proptest::prop_assert!(tick >= last_tick);
                last_tick = tick;
            }
        }
    }
}
