//! `TemporalAnomaly` (§4.5): flags ticks whose per-tick metrics deviate
//! sharply from their own recent trailing window.

use std::any::Any;
use std::path::Path;
use std::sync::Arc;

use historian_core::analyzer::{
    downcast_branch, Analyzer, ConfigFacts, ConfigurationOption, ConsumeContext, Descriptor, Mode,
    OptionType, SerializeFormat,
};
use historian_core::config::facts::{self, CommitsByTick};
use historian_core::config::TemporalAnomalyConfig;
use historian_core::errors::AnalyzerError;
use historian_core::types::collections::FxHashMap;
use historian_core::types::{AuthorId, Change, LineStats, Report, ReportValue, Tick};
use historian_storage::{write_report, JsonCodec, Persister};
use serde::{Deserialize, Serialize};

use historian_plumbing::flags as plumbing_flags;

use crate::aggregate::{aggregate, PerCommit, PerTick};
use crate::zscore::sliding_window_zscores;

pub const FLAG: &str = "anomaly";

/// POD checkpoint state (§4.8): commit hashes hex-encoded, ticks flattened
/// to `Vec<(tick, files)>`, for the same JSON-map-key reasons as the
/// plumbing checkpoints.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
struct AnomalyCheckpointState {
    commit_metrics: Vec<(String, PerCommit)>,
    files_by_tick: Vec<(u32, Vec<String>)>,
}

struct Anomaly {
    tick: Tick,
    max_abs_z: f64,
    files: Vec<String>,
}

pub struct TemporalAnomalyAnalyzer {
    config: TemporalAnomalyConfig,
    commits_by_tick: Arc<CommitsByTick>,
    commit_metrics: FxHashMap<[u8; 20], PerCommit>,
    /// File paths touched in each tick, for surfacing in the report
    /// alongside an anomalous tick (not part of the six scored series).
    files_by_tick: FxHashMap<Tick, Vec<String>>,
}

impl TemporalAnomalyAnalyzer {
    pub fn new() -> Self {
        Self {
            config: TemporalAnomalyConfig::default(),
            commits_by_tick: Arc::new(FxHashMap::default()),
            commit_metrics: FxHashMap::default(),
            files_by_tick: FxHashMap::default(),
        }
    }

    fn effective_config(&self) -> TemporalAnomalyConfig {
        TemporalAnomalyConfig {
            threshold: if self.config.threshold < 0.1 {
                2.0
            } else {
                self.config.threshold
            },
            window_size: if self.config.window_size < 2 {
                20
            } else {
                self.config.window_size
            },
        }
    }

    fn build_checkpoint_state(&self) -> AnomalyCheckpointState {
        let mut commit_metrics: Vec<(String, PerCommit)> = self
            .commit_metrics
            .iter()
            .map(|(hash, metrics)| (hex_encode(hash), metrics.clone()))
            .collect();
        commit_metrics.sort_by(|a, b| a.0.cmp(&b.0));
        let mut files_by_tick: Vec<(u32, Vec<String>)> = self
            .files_by_tick
            .iter()
            .map(|(tick, files)| (tick.0, files.clone()))
            .collect();
        files_by_tick.sort_by_key(|(tick, _)| *tick);
        AnomalyCheckpointState {
            commit_metrics,
            files_by_tick,
        }
    }

    fn restore_from_checkpoint(&mut self, state: AnomalyCheckpointState) {
        self.commit_metrics = state
            .commit_metrics
            .into_iter()
            .map(|(hash, metrics)| (hex_decode(&hash), metrics))
            .collect();
        self.files_by_tick = state
            .files_by_tick
            .into_iter()
            .map(|(tick, files)| (Tick(tick), files))
            .collect();
    }

    fn checkpoint_persister(
        &self,
    ) -> Persister<AnomalyCheckpointState, JsonCodec<AnomalyCheckpointState>> {
        Persister::new("anomaly_state", JsonCodec::new())
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

impl Analyzer for TemporalAnomalyAnalyzer {
    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn descriptor(&self) -> Descriptor {
        Descriptor {
            id: "TemporalAnomaly",
            mode: Mode::History,
            description: "Sliding-window Z-score anomaly detection over per-tick metrics",
        }
    }

    fn name(&self) -> &str {
        "TemporalAnomaly"
    }

    fn flag(&self) -> &'static str {
        FLAG
    }

    fn depends_on(&self) -> &'static [&'static str] {
        &[
            plumbing_flags::TREE_DIFF,
            plumbing_flags::LINES_STATS,
            plumbing_flags::LANGUAGES,
            plumbing_flags::IDENTITY,
            plumbing_flags::TICKS,
        ]
    }

    fn list_configuration_options(&self) -> Vec<ConfigurationOption> {
        use historian_core::analyzer::ConfigValue;
        vec![
            ConfigurationOption {
                name: "threshold",
                description: "Minimum max|z| across the six scored series to flag a tick",
                cli_flag: "anomaly-threshold",
                option_type: OptionType::Float,
                default: ConfigValue::Float(2.0),
            },
            ConfigurationOption {
                name: "window_size",
                description: "Trailing window length for the Z-score baseline",
                cli_flag: "anomaly-window",
                option_type: OptionType::Int,
                default: ConfigValue::Int(20),
            },
        ]
    }

    fn configure(&mut self, facts_map: &ConfigFacts) -> Result<(), AnalyzerError> {
        if let Some(cfg) =
            facts::get::<TemporalAnomalyConfig>(facts_map, "temporal_anomaly.config")
        {
            self.config = *cfg;
        }
        if let Some(by_tick) = facts::get::<CommitsByTick>(facts_map, facts::COMMITS_BY_TICK) {
            self.commits_by_tick = Arc::new(by_tick.clone());
        }
        Ok(())
    }

    fn initialize(&mut self) -> Result<(), AnalyzerError> {
        self.commit_metrics.clear();
        self.files_by_tick.clear();
        Ok(())
    }

    fn consume(&mut self, ctx: &ConsumeContext) -> Result<(), AnalyzerError> {
        if ctx.cancellation.is_cancelled() {
            return Err(AnalyzerError::Cancelled);
        }

        let changes = ctx
            .dep::<Vec<Change>>(plumbing_flags::TREE_DIFF)
            .ok_or_else(|| AnalyzerError::consume(self.name(), "missing TreeDiff dependency"))?;
        let line_stats = ctx.dep::<Vec<LineStats>>(plumbing_flags::LINES_STATS);
        let languages = ctx.dep::<FxHashMap<[u8; 20], String>>(plumbing_flags::LANGUAGES);
        let author = ctx
            .dep::<AuthorId>(plumbing_flags::IDENTITY)
            .copied()
            .unwrap_or(historian_core::types::AUTHOR_MISSING);
        let tick = ctx
            .dep::<Tick>(plumbing_flags::TICKS)
            .copied()
            .unwrap_or(Tick(0));

        let mut metrics = PerCommit {
            author,
            files_changed: changes.len() as u32,
            ..Default::default()
        };

        if let Some(stats) = line_stats {
            for s in stats {
                metrics.lines_added += s.added;
                metrics.lines_removed += s.removed;
            }
        }

        if let Some(languages) = languages {
            for change in changes {
                for hash in [change.from.hash, change.to.hash].into_iter().flatten() {
                    if let Some(lang) = languages.get(&hash) {
                        metrics.languages.insert(lang.clone());
                    }
                }
            }
        }

        self.commit_metrics.insert(ctx.commit.hash().0, metrics);

        let files = self.files_by_tick.entry(tick).or_default();
        for change in changes {
            let name = if !change.to.name.is_empty() {
                &change.to.name
            } else {
                &change.from.name
            };
            if !files.contains(name) {
                files.push(name.clone());
            }
        }

        Ok(())
    }

    fn finalize(&mut self) -> Report {
        let cfg = self.effective_config();
        let per_tick = aggregate(&self.commit_metrics, &self.commits_by_tick);

        let mut ticks: Vec<Tick> = per_tick.keys().copied().collect();
        ticks.sort_by_key(|t| t.0);

        let series = |extract: &dyn Fn(&PerTick) -> f64| -> Vec<f64> {
            ticks
                .iter()
                .map(|t| per_tick.get(t).map(extract).unwrap_or(0.0))
                .collect()
        };

        let net_churn = series(&|t| t.net_churn as f64);
        let files_changed = series(&|t| t.files_changed as f64);
        let lines_added = series(&|t| t.lines_added as f64);
        let lines_removed = series(&|t| t.lines_removed as f64);
        let language_diversity = series(&|t| t.language_diversity() as f64);
        let author_count = series(&|t| t.author_count() as f64);

        let all_scores = [
            sliding_window_zscores(&net_churn, cfg.window_size),
            sliding_window_zscores(&files_changed, cfg.window_size),
            sliding_window_zscores(&lines_added, cfg.window_size),
            sliding_window_zscores(&lines_removed, cfg.window_size),
            sliding_window_zscores(&language_diversity, cfg.window_size),
            sliding_window_zscores(&author_count, cfg.window_size),
        ];

        let mut anomalies: Vec<Anomaly> = Vec::new();
        for (idx, &tick) in ticks.iter().enumerate() {
            let max_abs_z = all_scores
                .iter()
                .map(|series| series[idx].abs())
                .fold(0.0_f64, f64::max);
            if max_abs_z > cfg.threshold {
                anomalies.push(Anomaly {
                    tick,
                    max_abs_z,
                    files: self.files_by_tick.get(&tick).cloned().unwrap_or_default(),
                });
            }
        }
        anomalies.sort_by(|a, b| b.max_abs_z.partial_cmp(&a.max_abs_z).unwrap());

        let mut report = Report::new();
        let records: Vec<ReportValue> = anomalies
            .iter()
            .map(|a| {
                let mut fields = std::collections::BTreeMap::new();
                fields.insert("tick".to_string(), ReportValue::Int(a.tick.0 as i64));
                fields.insert("max_abs_z".to_string(), ReportValue::Float(a.max_abs_z));
                fields.insert(
                    "files".to_string(),
                    ReportValue::Seq(a.files.iter().cloned().map(ReportValue::Str).collect()),
                );
                ReportValue::Record(fields)
            })
            .collect();
        report.set("anomalies", ReportValue::Seq(records));
        report
    }

    fn plumbing_output(&self) -> Option<Box<dyn Any + Send + Sync>> {
        None
    }

    fn fork(&self, n: usize) -> Vec<Box<dyn Analyzer>> {
        (0..n)
            .map(|_| {
                Box::new(TemporalAnomalyAnalyzer {
                    config: self.config,
                    commits_by_tick: Arc::clone(&self.commits_by_tick),
                    commit_metrics: FxHashMap::default(),
                    files_by_tick: FxHashMap::default(),
                }) as Box<dyn Analyzer>
            })
            .collect()
    }

    fn merge(&mut self, branches: Vec<Box<dyn Analyzer>>) {
        for branch in branches {
            let mut other = downcast_branch::<TemporalAnomalyAnalyzer>(branch);
            for (hash, metrics) in other.commit_metrics.drain() {
                self.commit_metrics.insert(hash, metrics);
            }
            for (tick, files) in other.files_by_tick.drain() {
                let entry = self.files_by_tick.entry(tick).or_default();
                for f in files {
                    if !entry.contains(&f) {
                        entry.push(f);
                    }
                }
            }
        }
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
        let files_bytes: usize = self
            .files_by_tick
            .values()
            .map(|files| files.iter().map(|f| f.len()).sum::<usize>())
            .sum();
        64 + self.commit_metrics.len() * 96 + files_bytes
    }

    fn serialize(
        &self,
        report: &Report,
        format: SerializeFormat,
        writer: &mut dyn std::io::Write,
    ) -> Result<(), AnalyzerError> {
        write_report(self.name(), report, format, writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(byte: u8) -> [u8; 20] {
        let mut h = [0u8; 20];
        h[0] = byte;
        h
    }

    /// Ten ticks, one commit each, identical churn — a stable history with
    /// nothing for the detector to flag.
    fn stable_history(ticks: u32) -> (FxHashMap<[u8; 20], PerCommit>, CommitsByTick) {
        let mut commit_metrics = FxHashMap::default();
        let mut commits_by_tick: CommitsByTick = FxHashMap::default();
        for t in 0..ticks {
            let h = hash(t as u8);
            commit_metrics.insert(
                h,
                PerCommit {
                    author: AuthorId(1),
                    lines_added: 10,
                    lines_removed: 0,
                    files_changed: 1,
                    languages: lang_set("Rust"),
                },
            );
            commits_by_tick.insert(Tick(t), vec![h]);
        }
        (commit_metrics, commits_by_tick)
    }

    fn lang_set(lang: &str) -> historian_core::types::collections::FxHashSet<String> {
        std::iter::once(lang.to_string()).collect()
    }

    fn analyzer_with(
        commit_metrics: FxHashMap<[u8; 20], PerCommit>,
        commits_by_tick: CommitsByTick,
        files_by_tick: FxHashMap<Tick, Vec<String>>,
    ) -> TemporalAnomalyAnalyzer {
        let mut analyzer = TemporalAnomalyAnalyzer::new();
        analyzer.config = TemporalAnomalyConfig {
            threshold: 2.0,
            window_size: 5,
        };
        analyzer.commit_metrics = commit_metrics;
        analyzer.commits_by_tick = Arc::new(commits_by_tick);
        analyzer.files_by_tick = files_by_tick;
        analyzer
    }

    fn anomaly_ticks(report: &Report) -> Vec<i64> {
        let Some(ReportValue::Seq(records)) = report.fields.get("anomalies") else {
            panic!("missing anomalies field");
        };
        records
            .iter()
            .map(|r| {
                let ReportValue::Record(fields) = r else {
                    panic!("anomaly record is not a Record");
                };
                let ReportValue::Int(tick) = fields["tick"] else {
                    panic!("tick is not an Int");
                };
                tick
            })
            .collect()
    }

    #[test]
    fn stable_history_has_no_anomalies() {
        let (commit_metrics, commits_by_tick) = stable_history(10);
        let mut analyzer = analyzer_with(commit_metrics, commits_by_tick, FxHashMap::default());
        let report = analyzer.finalize();
        assert!(anomaly_ticks(&report).is_empty());
    }

    #[test]
    fn spike_after_stable_history_is_flagged() {
        let (mut commit_metrics, mut commits_by_tick) = stable_history(10);
        let spike_hash = hash(99);
        commit_metrics.insert(
            spike_hash,
            PerCommit {
                author: AuthorId(1),
                lines_added: 4950,
                lines_removed: 0,
                files_changed: 1,
                languages: lang_set("Rust"),
            },
        );
        commits_by_tick.insert(Tick(10), vec![spike_hash]);
        let mut files_by_tick = FxHashMap::default();
        files_by_tick.insert(Tick(10), vec!["spike.rs".to_string()]);

        let mut analyzer = analyzer_with(commit_metrics, commits_by_tick, files_by_tick);
        let report = analyzer.finalize();

        let ticks = anomaly_ticks(&report);
        assert_eq!(ticks, vec![10]);

        let Some(ReportValue::Seq(records)) = report.fields.get("anomalies") else {
            panic!("missing anomalies field");
        };
        let ReportValue::Record(fields) = &records[0] else {
            panic!("anomaly record is not a Record");
        };
        let ReportValue::Float(max_abs_z) = fields["max_abs_z"] else {
            panic!("max_abs_z is not a Float");
        };
        assert!(max_abs_z >= 2.0);
        let ReportValue::Seq(files) = &fields["files"] else {
            panic!("files is not a Seq");
        };
        assert_eq!(files, &vec![ReportValue::Str("spike.rs".to_string())]);
    }

    /// Forking into independent branches, feeding each branch a disjoint
    /// half of the same history, then merging back must produce the same
    /// flagged ticks as running the whole history through one instance —
    /// the fork/merge identity property (commit hashes are distinct across
    /// branches, so merge is a plain map union).
    #[test]
    fn fork_then_merge_matches_single_threaded_run() {
        let (commit_metrics, commits_by_tick) = stable_history(10);
        let spike_hash = hash(99);
        let mut merged_metrics = commit_metrics.clone();
        merged_metrics.insert(
            spike_hash,
            PerCommit {
                author: AuthorId(1),
                lines_added: 4950,
                lines_removed: 0,
                files_changed: 1,
                languages: lang_set("Rust"),
            },
        );
        let mut merged_by_tick = commits_by_tick.clone();
        merged_by_tick.insert(Tick(10), vec![spike_hash]);

        let baseline = analyzer_with(merged_metrics.clone(), merged_by_tick.clone(), {
            let mut f = FxHashMap::default();
            f.insert(Tick(10), vec!["spike.rs".to_string()]);
            f
        })
        .finalize();

        let mut analyzer = TemporalAnomalyAnalyzer::new();
        analyzer.config = TemporalAnomalyConfig {
            threshold: 2.0,
            window_size: 5,
        };
        analyzer.commits_by_tick = Arc::new(merged_by_tick);

        let mut clones = analyzer.fork(2);
        let mut c0 = downcast_branch::<TemporalAnomalyAnalyzer>(clones.remove(0));
        let mut c1 = downcast_branch::<TemporalAnomalyAnalyzer>(clones.remove(0));

        for (i, (hash, metrics)) in merged_metrics.into_iter().enumerate() {
            if i % 2 == 0 {
                c0.commit_metrics.insert(hash, metrics);
            } else {
                c1.commit_metrics.insert(hash, metrics);
            }
        }
        c1.files_by_tick.insert(Tick(10), vec!["spike.rs".to_string()]);

        analyzer.merge(vec![c0 as Box<dyn Analyzer>, c1 as Box<dyn Analyzer>]);
        let merged_report = analyzer.finalize();

        assert_eq!(anomaly_ticks(&merged_report), anomaly_ticks(&baseline));
    }

    #[test]
    fn checkpoint_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let (commit_metrics, commits_by_tick) = stable_history(3);
        let mut files_by_tick = FxHashMap::default();
        files_by_tick.insert(Tick(0), vec!["a.rs".to_string()]);
        let a = analyzer_with(commit_metrics, commits_by_tick, files_by_tick);

        a.save_checkpoint(dir.path()).unwrap();

        let mut b = TemporalAnomalyAnalyzer::new();
        b.load_checkpoint(dir.path()).unwrap();

        assert_eq!(a.build_checkpoint_state(), b.build_checkpoint_state());
    }
}
