//! `Couples` (SPEC_FULL §4.7): file/author co-occurrence coupling.
//!
//! Supplements the distilled spec, which names Couples only in a
//! testable-properties edge case (S6) and an Open Question about its
//! `Fork` bug (§9 Open Question #2, resolved here: independent per-clone
//! maps merged by union, not struct-value copying).

use std::any::Any;
use std::sync::Arc;

use lasso::{Key, ThreadedRodeo};

use historian_core::analyzer::{
    downcast_branch, Analyzer, ConfigFacts, ConfigurationOption, ConsumeContext, Descriptor, Mode,
    OptionType, SerializeFormat,
};
use historian_core::config::facts;
use historian_core::config::CouplesConfig;
use historian_core::errors::AnalyzerError;
use historian_core::types::collections::{FxHashMap, FxHashSet};
use historian_core::types::{AuthorId, Change, FileId, Report, ReportValue};
use historian_storage::write_report;

use historian_plumbing::flags as plumbing_flags;

pub const FLAG: &str = "couples";

const TOP_N: usize = 50;

fn file_id_of(interner: &ThreadedRodeo, path: &str) -> FileId {
    let spur = interner.get_or_intern(path);
    FileId(spur.into_usize() as u32)
}

pub struct CouplesAnalyzer {
    config: CouplesConfig,
    interner: Arc<ThreadedRodeo>,
    /// Unordered file pair -> co-occurrence count, keyed by `(min, max)`
    /// so each pair has one canonical key regardless of touch order.
    co_occurrence: FxHashMap<(FileId, FileId), u32>,
    author_files: FxHashMap<AuthorId, FxHashSet<FileId>>,
}

impl CouplesAnalyzer {
    pub fn new() -> Self {
        Self {
            config: CouplesConfig::default(),
            interner: Arc::new(ThreadedRodeo::new()),
            co_occurrence: FxHashMap::default(),
            author_files: FxHashMap::default(),
        }
    }

    fn record_commit(&mut self, author: AuthorId, changes: &[Change]) {
        if changes.len() > self.config.max_changes {
            return;
        }

        let mut touched: Vec<FileId> = Vec::with_capacity(changes.len());
        for change in changes {
            let name = if !change.to.name.is_empty() {
                &change.to.name
            } else {
                &change.from.name
            };
            if name.is_empty() {
                continue;
            }
            touched.push(file_id_of(&self.interner, name));
        }
        touched.sort_unstable();
        touched.dedup();

        for i in 0..touched.len() {
            for j in (i + 1)..touched.len() {
                let key = (touched[i], touched[j]);
                *self.co_occurrence.entry(key).or_insert(0) += 1;
            }
        }

        let entry = self.author_files.entry(author).or_default();
        for file in touched {
            entry.insert(file);
        }
    }

    fn resolve(&self, id: FileId) -> String {
        // Safety of the unwrap: every `FileId` in these maps was produced
        // by `file_id_of` against this same interner.
        let spur = lasso::Spur::try_from_usize(id.0 as usize)
            .expect("FileId always round-trips through lasso::Spur");
        self.interner.resolve(&spur).to_string()
    }
}

impl Analyzer for CouplesAnalyzer {
    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn descriptor(&self) -> Descriptor {
        Descriptor {
            id: "Couples",
            mode: Mode::History,
            description: "File and author co-occurrence coupling",
        }
    }

    fn name(&self) -> &str {
        "Couples"
    }

    fn flag(&self) -> &'static str {
        FLAG
    }

    fn depends_on(&self) -> &'static [&'static str] {
        &[plumbing_flags::TREE_DIFF, plumbing_flags::IDENTITY]
    }

    fn list_configuration_options(&self) -> Vec<ConfigurationOption> {
        use historian_core::analyzer::ConfigValue;
        vec![ConfigurationOption {
            name: "max_changes",
            description: "Skip coupling updates for commits touching more files than this",
            cli_flag: "coupling-max-changes",
            option_type: OptionType::Int,
            default: ConfigValue::Int(1000),
        }]
    }

    fn configure(&mut self, facts_map: &ConfigFacts) -> Result<(), AnalyzerError> {
        if let Some(cfg) = facts::get::<CouplesConfig>(facts_map, "couples.config") {
            self.config = *cfg;
        }
        Ok(())
    }

    fn initialize(&mut self) -> Result<(), AnalyzerError> {
        self.co_occurrence.clear();
        self.author_files.clear();
        Ok(())
    }

    fn consume(&mut self, ctx: &ConsumeContext) -> Result<(), AnalyzerError> {
        if ctx.cancellation.is_cancelled() {
            return Err(AnalyzerError::Cancelled);
        }

        let changes = ctx
            .dep::<Vec<Change>>(plumbing_flags::TREE_DIFF)
            .ok_or_else(|| AnalyzerError::consume(self.name(), "missing TreeDiff dependency"))?;
        let author = ctx
            .dep::<AuthorId>(plumbing_flags::IDENTITY)
            .copied()
            .unwrap_or(historian_core::types::AUTHOR_MISSING);

        self.record_commit(author, changes);
        Ok(())
    }

    fn finalize(&mut self) -> Report {
        let mut pairs: Vec<(&(FileId, FileId), &u32)> = self.co_occurrence.iter().collect();
        pairs.sort_by(|a, b| b.1.cmp(a.1));
        pairs.truncate(TOP_N);

        let top_pairs: Vec<ReportValue> = pairs
            .into_iter()
            .map(|((a, b), count)| {
                let mut fields = std::collections::BTreeMap::new();
                fields.insert("file_a".to_string(), ReportValue::Str(self.resolve(*a)));
                fields.insert("file_b".to_string(), ReportValue::Str(self.resolve(*b)));
                fields.insert("count".to_string(), ReportValue::Int(*count as i64));
                ReportValue::Record(fields)
            })
            .collect();

        let mut author_touch_counts: std::collections::BTreeMap<String, f64> =
            std::collections::BTreeMap::new();
        for (author, files) in &self.author_files {
            author_touch_counts.insert(format!("{}", author.0), files.len() as f64);
        }

        let mut report = Report::new();
        report.set("top_file_pairs", ReportValue::Seq(top_pairs));
        report.set("author_file_counts", ReportValue::NumMap(author_touch_counts));
        report
    }

    fn plumbing_output(&self) -> Option<Box<dyn Any + Send + Sync>> {
        None
    }

    fn fork(&self, n: usize) -> Vec<Box<dyn Analyzer>> {
        (0..n)
            .map(|_| {
                Box::new(CouplesAnalyzer {
                    config: self.config,
                    interner: Arc::clone(&self.interner),
                    co_occurrence: FxHashMap::default(),
                    author_files: FxHashMap::default(),
                }) as Box<dyn Analyzer>
            })
            .collect()
    }

    fn merge(&mut self, branches: Vec<Box<dyn Analyzer>>) {
        for branch in branches {
            let mut other = downcast_branch::<CouplesAnalyzer>(branch);
            for (key, count) in other.co_occurrence.drain() {
                *self.co_occurrence.entry(key).or_insert(0) += count;
            }
            for (author, files) in other.author_files.drain() {
                let entry = self.author_files.entry(author).or_default();
                for file in files {
                    entry.insert(file);
                }
            }
        }
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
    use historian_core::types::ChangeAction;

    fn change(path: &str) -> Change {
        Change {
            action: ChangeAction::Modify,
            from: historian_core::types::change::ChangeSide {
                name: path.to_string(),
                hash: Some([0u8; 20]),
            },
            to: historian_core::types::change::ChangeSide {
                name: path.to_string(),
                hash: Some([1u8; 20]),
            },
        }
    }

    #[test]
    fn commit_touching_two_files_increments_one_pair() {
        let mut analyzer = CouplesAnalyzer::new();
        analyzer.record_commit(AuthorId(1), &[change("a.rs"), change("b.rs")]);
        assert_eq!(analyzer.co_occurrence.len(), 1);
        assert_eq!(*analyzer.co_occurrence.values().next().unwrap(), 1);
    }

    #[test]
    fn commit_over_max_changes_is_skipped() {
        let mut analyzer = CouplesAnalyzer::new();
        analyzer.config.max_changes = 1;
        analyzer.record_commit(AuthorId(1), &[change("a.rs"), change("b.rs")]);
        assert!(analyzer.co_occurrence.is_empty());
    }

    #[test]
    fn merge_unions_independent_clone_maps() {
        let mut analyzer = CouplesAnalyzer::new();
        let mut clones = analyzer.fork(2);
        let mut c0 = downcast_branch::<CouplesAnalyzer>(clones.remove(0));
        let mut c1 = downcast_branch::<CouplesAnalyzer>(clones.remove(0));
        c0.record_commit(AuthorId(1), &[change("a.rs"), change("b.rs")]);
        c1.record_commit(AuthorId(2), &[change("a.rs"), change("b.rs")]);
        analyzer.merge(vec![c0 as Box<dyn Analyzer>, c1 as Box<dyn Analyzer>]);
        assert_eq!(analyzer.co_occurrence.len(), 1);
        assert_eq!(*analyzer.co_occurrence.values().next().unwrap(), 2);
        assert_eq!(analyzer.author_files.len(), 2);
    }
}
