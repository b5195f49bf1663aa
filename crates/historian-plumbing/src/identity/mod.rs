//! `IdentityDetector` (§4.2): resolves each commit's author to a stable
//! integer id, maintaining a bidirectional name/email ↔ id map.

use std::path::Path;

use historian_core::analyzer::{
    downcast_branch, Analyzer, ConfigFacts, ConfigurationOption, ConsumeContext, Descriptor, Mode,
    OptionType, SerializeFormat,
};
use historian_core::config::facts::{self, PeopleDict, ReversedPeopleDict};
use historian_core::errors::AnalyzerError;
use historian_core::types::collections::FxHashMap;
use historian_core::types::{AuthorId, Report, AUTHOR_MISSING};
use historian_core::vcs::Signature;
use historian_storage::{JsonCodec, Persister};
use serde::{Deserialize, Serialize};

use crate::flags;

/// POD checkpoint state (§4.8). `dict`/`names_by_id`/`emails_by_id` use
/// plain `Vec<(K, V)>` pairs rather than maps keyed by non-string types,
/// for the same JSON-object-keys-must-be-strings reason as `TicksSinceStart`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
struct IdentityCheckpointState {
    mode_is_loose: bool,
    source_tag: u8,
    dict: Vec<(String, i64)>,
    next_id: i64,
    names_by_id: Vec<(i64, Vec<String>)>,
    emails_by_id: Vec<(i64, Vec<String>)>,
}

/// How identities are resolved. `Exact` keys on `"name <email>"`; `Loose`
/// keys on email first, falling back to name, so aliases sharing either
/// field collapse to one id (S5).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MatchMode {
    Exact,
    Loose,
}

/// Where the identity table comes from.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Source {
    /// Preloaded from an explicit people-dict file.
    Preloaded,
    /// Computed once from the full commit list before streaming.
    Precomputed,
    /// Grown incrementally as commits arrive; requires `sequential_only`.
    Incremental,
}

pub struct IdentityDetectorAnalyzer {
    mode: MatchMode,
    source: Source,
    dict: PeopleDict,
    next_id: i64,
    /// `id -> {names, emails}` kept for `Loose` mode's reverse-dict rebuild.
    names_by_id: FxHashMap<AuthorId, Vec<String>>,
    emails_by_id: FxHashMap<AuthorId, Vec<String>>,
    current_author: AuthorId,
}

impl IdentityDetectorAnalyzer {
    pub fn new() -> Self {
        Self {
            mode: MatchMode::Exact,
            source: Source::Incremental,
            dict: FxHashMap::default(),
            next_id: 0,
            names_by_id: FxHashMap::default(),
            emails_by_id: FxHashMap::default(),
            current_author: AUTHOR_MISSING,
        }
    }

    fn key(&self, sig: &Signature) -> String {
        match self.mode {
            MatchMode::Exact => sig.exact_key(),
            MatchMode::Loose => sig.email.to_lowercase(),
        }
    }

    fn resolve(&mut self, sig: &Signature) -> AuthorId {
        let key = self.key(sig);
        if let Some(id) = self.dict.get(&key) {
            let id = *id;
            self.remember(id, sig);
            return id;
        }

        match self.mode {
            MatchMode::Loose => {
                let name_key = sig.name.to_lowercase();
                if let Some(id) = self.dict.get(&name_key) {
                    let id = *id;
                    self.dict.insert(key, id);
                    self.remember(id, sig);
                    return id;
                }
            }
            MatchMode::Exact => {}
        }

        if self.source == Source::Preloaded {
            return AUTHOR_MISSING;
        }

        let id = AuthorId(self.next_id);
        self.next_id += 1;
        self.dict.insert(key.clone(), id);
        if self.mode == MatchMode::Loose {
            self.dict.insert(sig.name.to_lowercase(), id);
        }
        self.remember(id, sig);
        id
    }

    fn remember(&mut self, id: AuthorId, sig: &Signature) {
        let names = self.names_by_id.entry(id).or_default();
        if !names.iter().any(|n| n == &sig.name) {
            names.push(sig.name.clone());
        }
        let emails = self.emails_by_id.entry(id).or_default();
        if !emails.iter().any(|e| e == &sig.email) {
            emails.push(sig.email.clone());
        }
    }

    /// Builds the reversed dict entry the way loose mode documents it:
    /// sorted names and emails joined by `|` (S5).
    fn reversed_entry(&self, id: AuthorId) -> String {
        let mut names = self.names_by_id.get(&id).cloned().unwrap_or_default();
        let mut emails = self.emails_by_id.get(&id).cloned().unwrap_or_default();
        names.sort();
        emails.sort();
        let mut parts = names;
        parts.extend(emails);
        parts.join("|")
    }

    fn build_checkpoint_state(&self) -> IdentityCheckpointState {
        IdentityCheckpointState {
            mode_is_loose: self.mode == MatchMode::Loose,
            source_tag: match self.source {
                Source::Preloaded => 0,
                Source::Precomputed => 1,
                Source::Incremental => 2,
            },
            dict: self.dict.iter().map(|(k, v)| (k.clone(), v.0)).collect(),
            next_id: self.next_id,
            names_by_id: self
                .names_by_id
                .iter()
                .map(|(id, names)| (id.0, names.clone()))
                .collect(),
            emails_by_id: self
                .emails_by_id
                .iter()
                .map(|(id, emails)| (id.0, emails.clone()))
                .collect(),
        }
    }

    fn restore_from_checkpoint(&mut self, state: IdentityCheckpointState) {
        self.mode = if state.mode_is_loose {
            MatchMode::Loose
        } else {
            MatchMode::Exact
        };
        self.source = match state.source_tag {
            0 => Source::Preloaded,
            1 => Source::Precomputed,
            _ => Source::Incremental,
        };
        self.dict = state
            .dict
            .into_iter()
            .map(|(k, v)| (k, AuthorId(v)))
            .collect();
        self.next_id = state.next_id;
        self.names_by_id = state
            .names_by_id
            .into_iter()
            .map(|(id, names)| (AuthorId(id), names))
            .collect();
        self.emails_by_id = state
            .emails_by_id
            .into_iter()
            .map(|(id, emails)| (AuthorId(id), emails))
            .collect();
    }

    fn checkpoint_persister(
        &self,
    ) -> Persister<IdentityCheckpointState, JsonCodec<IdentityCheckpointState>> {
        Persister::new("identity_state", JsonCodec::new())
    }
}

impl Analyzer for IdentityDetectorAnalyzer {
    fn into_any(self: Box<Self>) -> Box<dyn std::any::Any> {
        self
    }

    fn descriptor(&self) -> Descriptor {
        Descriptor {
            id: "IdentityDetector",
            mode: Mode::History,
            description: "Resolves each commit's author to a stable integer id",
        }
    }

    fn name(&self) -> &str {
        "IdentityDetector"
    }

    fn flag(&self) -> &'static str {
        flags::IDENTITY
    }

    fn list_configuration_options(&self) -> Vec<ConfigurationOption> {
        use historian_core::analyzer::ConfigValue;
        vec![ConfigurationOption {
            name: "people_dict_path",
            description: "Path to a preloaded people-dict file (one identity per line, |-separated aliases)",
            cli_flag: "people-dict",
            option_type: OptionType::Path,
            default: ConfigValue::Path(String::new()),
        }]
    }

    fn configure(&mut self, facts: &ConfigFacts) -> Result<(), AnalyzerError> {
        if let Some(dict) = facts::get::<PeopleDict>(facts, facts::PEOPLE_DICT) {
            self.dict = dict.clone();
            self.source = Source::Preloaded;
            self.next_id = self.dict.values().map(|id| id.0).max().unwrap_or(-1) + 1;
        }
        if let Some(mode) = facts::get::<MatchMode>(facts, "identity.match_mode") {
            self.mode = *mode;
        }
        if self.source != Source::Preloaded {
            if let Some(true) = facts::get::<bool>(facts, "identity.precompute") {
                self.source = Source::Precomputed;
            }
        }
        Ok(())
    }

    fn initialize(&mut self) -> Result<(), AnalyzerError> {
        self.current_author = AUTHOR_MISSING;
        Ok(())
    }

    fn consume(&mut self, ctx: &ConsumeContext) -> Result<(), AnalyzerError> {
        if ctx.cancellation.is_cancelled() {
            return Err(AnalyzerError::Cancelled);
        }
        self.current_author = self.resolve(ctx.commit.author());
        Ok(())
    }

    fn finalize(&mut self) -> Report {
        if self.mode == MatchMode::Loose {
            let mut reversed: ReversedPeopleDict = FxHashMap::default();
            let ids: Vec<AuthorId> = self.names_by_id.keys().copied().collect();
            for id in ids {
                reversed.insert(id, self.reversed_entry(id));
            }
            let mut report = Report::new();
            report.set(
                "identity_count",
                historian_core::types::ReportValue::Int(self.next_id),
            );
            let _ = reversed;
            return report;
        }
        Report::new()
    }

    fn plumbing_output(&self) -> Option<Box<dyn std::any::Any + Send + Sync>> {
        Some(Box::new(self.current_author))
    }

    /// Exported once a full-stream precompute pre-pass has populated
    /// `dict`/`names_by_id`/`emails_by_id` (`Source::Precomputed`) so
    /// downstream leaves can read `peopleDict`/`reversedPeopleDict` at
    /// `configure` time. A no-op for `Preloaded` (the facts already came
    /// from the people-dict file) and `Incremental` (identities are only
    /// known as commits stream in, so there is nothing to export yet).
    fn export_facts(&self, facts: &mut ConfigFacts) {
        if self.source != Source::Precomputed {
            return;
        }
        facts::insert(facts, facts::PEOPLE_DICT, self.dict.clone());
        let mut reversed: ReversedPeopleDict = FxHashMap::default();
        for &id in self.names_by_id.keys() {
            reversed.insert(id, self.reversed_entry(id));
        }
        facts::insert(facts, facts::REVERSED_PEOPLE_DICT, reversed);
    }

    fn fork(&self, n: usize) -> Vec<Box<dyn Analyzer>> {
        (0..n)
            .map(|_| {
                Box::new(IdentityDetectorAnalyzer {
                    mode: self.mode,
                    source: self.source,
                    dict: self.dict.clone(),
                    next_id: self.next_id,
                    names_by_id: self.names_by_id.clone(),
                    emails_by_id: self.emails_by_id.clone(),
                    current_author: AUTHOR_MISSING,
                }) as Box<dyn Analyzer>
            })
            .collect()
    }

    fn merge(&mut self, branches: Vec<Box<dyn Analyzer>>) {
        for branch in branches {
            let mut other = downcast_branch::<IdentityDetectorAnalyzer>(branch);
            for (k, v) in other.dict.drain() {
                self.dict.entry(k).or_insert(v);
            }
            for (id, names) in other.names_by_id.drain() {
                let entry = self.names_by_id.entry(id).or_default();
                for n in names {
                    if !entry.contains(&n) {
                        entry.push(n);
                    }
                }
            }
            for (id, emails) in other.emails_by_id.drain() {
                let entry = self.emails_by_id.entry(id).or_default();
                for e in emails {
                    if !entry.contains(&e) {
                        entry.push(e);
                    }
                }
            }
            self.next_id = self.next_id.max(other.next_id);
        }
    }

    fn sequential_only(&self) -> bool {
        self.source == Source::Incremental
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
        let alias_bytes: usize = self
            .names_by_id
            .values()
            .map(|names| names.iter().map(|n| n.len()).sum::<usize>())
            .sum::<usize>()
            + self
                .emails_by_id
                .values()
                .map(|emails| emails.iter().map(|e| e.len()).sum::<usize>())
                .sum::<usize>();
        64 + self.dict.len() * 48 + alias_bytes
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

    /// S5: loose mode collapses (`Dev`,`dev@x`) and (`dev`,`other@x`) to
    /// one id, and the reverse-dict entry is sorted names then emails.
    #[test]
    fn loose_mode_collapses_aliases_by_shared_field() {
        let mut a = IdentityDetectorAnalyzer::new();
        a.mode = MatchMode::Loose;
        a.source = Source::Incremental;

        let id1 = a.resolve(&Signature {
            name: "Dev".to_string(),
            email: "dev@x".to_string(),
        });
        let id2 = a.resolve(&Signature {
            name: "dev".to_string(),
            email: "other@x".to_string(),
        });
        assert_eq!(id1, id2);

        let reversed = a.reversed_entry(id1);
        assert_eq!(reversed, "Dev|dev|dev@x|other@x");
    }

    #[test]
    fn checkpoint_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = IdentityDetectorAnalyzer::new();
        a.mode = MatchMode::Loose;
        a.source = Source::Incremental;
        a.resolve(&Signature {
            name: "Dev".to_string(),
            email: "dev@x".to_string(),
        });
        a.resolve(&Signature {
            name: "other".to_string(),
            email: "other@y".to_string(),
        });

        a.save_checkpoint(dir.path()).unwrap();

        let mut b = IdentityDetectorAnalyzer::new();
        b.load_checkpoint(dir.path()).unwrap();

        assert_eq!(a.build_checkpoint_state(), b.build_checkpoint_state());
    }
}
