//! `FileDiff` (§4.2): line-oriented LCS diff for every `Modify` change,
//! bounded by a per-file wall-clock timeout.

mod lcs;

use std::any::Any;
use std::time::{Duration, Instant};

use historian_core::analyzer::{
    downcast_branch, Analyzer, ConfigFacts, ConfigurationOption, ConsumeContext, Descriptor, Mode,
    OptionType, SerializeFormat,
};
use historian_core::config::FileDiffConfig;
use historian_core::errors::AnalyzerError;
use historian_core::types::collections::FxHashMap;
use historian_core::types::{CachedBlob, Change, ChangeAction, FileDiffEntry, Report};

use crate::flags;

pub struct FileDiffAnalyzer {
    config: FileDiffConfig,
    current_output: Vec<Option<FileDiffEntry>>,
}

impl FileDiffAnalyzer {
    pub fn new() -> Self {
        Self {
            config: FileDiffConfig::default(),
            current_output: Vec::new(),
        }
    }

    fn diff_one(&self, old: &CachedBlob, new: &CachedBlob) -> FileDiffEntry {
        let deadline = Instant::now() + Duration::from_millis(self.config.timeout_ms.max(1));
        lcs::diff_lines(
            old.as_bytes(),
            new.as_bytes(),
            deadline,
            !self.config.no_cleanup,
            self.config.whitespace_ignore,
        )
    }
}

impl Analyzer for FileDiffAnalyzer {
    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn descriptor(&self) -> Descriptor {
        Descriptor {
            id: "FileDiff",
            mode: Mode::History,
            description: "Line-oriented diff for every Modify change in the current commit",
        }
    }

    fn name(&self) -> &str {
        "FileDiff"
    }

    fn flag(&self) -> &'static str {
        flags::FILE_DIFF
    }

    fn depends_on(&self) -> &'static [&'static str] {
        &[flags::TREE_DIFF, flags::BLOB_CACHE]
    }

    fn list_configuration_options(&self) -> Vec<ConfigurationOption> {
        use historian_core::analyzer::ConfigValue;
        vec![
            ConfigurationOption {
                name: "no_cleanup",
                description: "Disable semantic-lossless cleanup of the raw LCS edit script",
                cli_flag: "no-cleanup",
                option_type: OptionType::Bool,
                default: ConfigValue::Bool(false),
            },
            ConfigurationOption {
                name: "whitespace_ignore",
                description: "Strip leading/trailing whitespace from each line before diffing",
                cli_flag: "whitespace-ignore",
                option_type: OptionType::Bool,
                default: ConfigValue::Bool(false),
            },
            ConfigurationOption {
                name: "timeout_ms",
                description: "Per-file wall-clock diff timeout",
                cli_flag: "diff-timeout-ms",
                option_type: OptionType::Int,
                default: ConfigValue::Int(1000),
            },
            ConfigurationOption {
                name: "workers",
                description: "Parallel diff workers, used when a commit touches >= 50 files",
                cli_flag: "goroutines",
                option_type: OptionType::Int,
                default: ConfigValue::Int(1),
            },
        ]
    }

    fn configure(&mut self, facts: &ConfigFacts) -> Result<(), AnalyzerError> {
        if let Some(cfg) =
            historian_core::config::facts::get::<FileDiffConfig>(facts, "file_diff.config")
        {
            self.config = cfg.clone();
        }
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

        let compute = |change: &Change| -> Option<FileDiffEntry> {
            if change.action != ChangeAction::Modify {
                return None;
            }
            let from_hash = change.from.hash?;
            let to_hash = change.to.hash?;
            let old = blobs.get(&from_hash)?;
            let new = blobs.get(&to_hash)?;
            if old.is_binary() || new.is_binary() {
                return None;
            }
            Some(self.diff_one(old, new))
        };

        self.current_output = if changes.len() >= 50 && self.config.workers > 1 {
            use rayon::prelude::*;
            changes.par_iter().map(compute).collect()
        } else {
            changes.iter().map(compute).collect()
        };

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
            .map(|_| {
                Box::new(FileDiffAnalyzer {
                    config: self.config.clone(),
                    current_output: Vec::new(),
                }) as Box<dyn Analyzer>
            })
            .collect()
    }

    fn merge(&mut self, branches: Vec<Box<dyn Analyzer>>) {
        for branch in branches {
            let _ = downcast_branch::<FileDiffAnalyzer>(branch);
        }
    }

    fn sequential_only(&self) -> bool {
        true
    }

    fn cpu_heavy(&self) -> bool {
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
