//! `LinesStats` (§4.2): per-change-entry added/removed/changed line
//! counts, derived from `FileDiff`'s edit script (or the raw line counts
//! for pure Inserts/Deletes, which `FileDiff` never touches).

use std::any::Any;

use historian_core::analyzer::{
    downcast_branch, Analyzer, ConfigFacts, ConfigurationOption, ConsumeContext, Descriptor, Mode,
    SerializeFormat,
};
use historian_core::errors::AnalyzerError;
use historian_core::types::collections::FxHashMap;
use historian_core::types::{CachedBlob, Change, ChangeAction, EditOp, FileDiffEntry, LineStats, Report};

use crate::flags;

pub struct LinesStatsAnalyzer {
    current_output: Vec<LineStats>,
}

impl LinesStatsAnalyzer {
    pub fn new() -> Self {
        Self {
            current_output: Vec::new(),
        }
    }

    fn stats_for(
        change: &Change,
        diff: Option<&FileDiffEntry>,
        blobs: &FxHashMap<[u8; 20], CachedBlob>,
    ) -> LineStats {
        match change.action {
            ChangeAction::Insert => {
                let lines = change
                    .to
                    .hash
                    .and_then(|h| blobs.get(&h))
                    .map(|b| b.line_count)
                    .unwrap_or(0);
                LineStats {
                    added: lines,
                    removed: 0,
                    changed: 0,
                }
            }
            ChangeAction::Delete => {
                let lines = change
                    .from
                    .hash
                    .and_then(|h| blobs.get(&h))
                    .map(|b| b.line_count)
                    .unwrap_or(0);
                LineStats {
                    added: 0,
                    removed: lines,
                    changed: 0,
                }
            }
            ChangeAction::Modify => {
                let Some(diff) = diff else {
                    return LineStats::default();
                };
                let mut stats = LineStats::default();
                for edit in &diff.edits {
                    match edit.op {
                        EditOp::Insert => stats.added += edit.new_end - edit.new_start,
                        EditOp::Delete => stats.removed += edit.old_end - edit.old_start,
                        EditOp::Equal => {}
                    }
                }
                stats.changed = stats.added.min(stats.removed);
                stats
            }
        }
    }
}

impl Analyzer for LinesStatsAnalyzer {
    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn descriptor(&self) -> Descriptor {
        Descriptor {
            id: "LinesStats",
            mode: Mode::History,
            description: "Added/removed/changed line counts per change entry",
        }
    }

    fn name(&self) -> &str {
        "LinesStats"
    }

    fn flag(&self) -> &'static str {
        flags::LINES_STATS
    }

    fn depends_on(&self) -> &'static [&'static str] {
        &[flags::TREE_DIFF, flags::BLOB_CACHE, flags::FILE_DIFF]
    }

    fn list_configuration_options(&self) -> Vec<ConfigurationOption> {
        Vec::new()
    }

    fn configure(&mut self, _facts: &ConfigFacts) -> Result<(), AnalyzerError> {
        Ok(())
    }

    fn initialize(&mut self) -> Result<(), AnalyzerError> {
        self.current_output.clear();
        Ok(())
    }

    fn consume(&mut self, ctx: &ConsumeContext) -> Result<(), AnalyzerError> {
        if ctx.cancellation.is_cancelled() {
            return Err(AnalyzerError::Cancelled);
        }

        let changes = ctx
            .dep::<Vec<Change>>(flags::TREE_DIFF)
            .ok_or_else(|| AnalyzerError::consume(self.name(), "missing TreeDiff dependency"))?;
        let blobs = ctx
            .dep::<FxHashMap<[u8; 20], CachedBlob>>(flags::BLOB_CACHE)
            .ok_or_else(|| AnalyzerError::consume(self.name(), "missing BlobCache dependency"))?;
        let file_diffs = ctx.dep::<Vec<Option<FileDiffEntry>>>(flags::FILE_DIFF);

        self.current_output = changes
            .iter()
            .enumerate()
            .map(|(idx, change)| {
                let diff = file_diffs.and_then(|v| v.get(idx)).and_then(|d| d.as_ref());
                Self::stats_for(change, diff, blobs)
            })
            .collect();

        Ok(())
    }

    fn finalize(&mut self) -> Report {
        Report::new()
    }

    fn plumbing_output(&self) -> Option<Box<dyn Any + Send + Sync>> {
        Some(Box::new(self.current_output.clone()))
    }

    fn fork(&self, n: usize) -> Vec<Box<dyn Analyzer>> {
        (0..n)
            .map(|_| Box::new(LinesStatsAnalyzer::new()) as Box<dyn Analyzer>)
            .collect()
    }

    fn merge(&mut self, branches: Vec<Box<dyn Analyzer>>) {
        for branch in branches {
            let _ = downcast_branch::<LinesStatsAnalyzer>(branch);
        }
    }

    fn sequential_only(&self) -> bool {
        true
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
