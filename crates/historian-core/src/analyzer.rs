//! The analyzer contract (§4.1).
//!
//! One trait is shared by every plumbing and leaf analyzer, mirroring the
//! unified interface the engine's data-flow diagram implies (plumbing
//! analyzers are just analyzers whose "report" downstream consumers read is
//! their per-commit output rather than a finalized `Report`). Cross-analyzer
//! facts (`commitsByTick`, `peopleDict`) and dependency outputs are both
//! passed as type-erased values, matching the distilled spec's own
//! `configure(facts: map<string, dyn>)` signature.

use std::any::Any;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use crate::cancellation::CancellationToken;
use crate::errors::AnalyzerError;
use crate::types::collections::FxHashMap;
use crate::types::report::Report;
use crate::vcs::Commit;

/// Execution mode a descriptor declares. Only `History` exists today; a
/// future `Snapshot` mode (point-in-time analysis, not a commit stream) is
/// anticipated by the enum but unimplemented.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Mode {
    History,
}

#[derive(Clone, Copy, Debug)]
pub struct Descriptor {
    pub id: &'static str,
    pub mode: Mode,
    pub description: &'static str,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum OptionType {
    Bool,
    Int,
    Float,
    String,
    Strings,
    Path,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Strings(Vec<String>),
    Path(String),
}

#[derive(Clone, Debug)]
pub struct ConfigurationOption {
    pub name: &'static str,
    pub description: &'static str,
    pub cli_flag: &'static str,
    pub option_type: OptionType,
    pub default: ConfigValue,
}

/// Type-erased cross-analyzer facts absorbed in `configure` (e.g.
/// `commitsByTick`, `peopleDict`) and, during `consume`, the current
/// commit's already-computed plumbing outputs keyed by producing
/// analyzer's `flag()`.
pub type ConfigFacts = FxHashMap<String, Arc<dyn Any + Send + Sync>>;

/// Per-commit metadata and dependency access handed to `consume`.
pub struct ConsumeContext<'a> {
    pub commit: &'a dyn Commit,
    pub is_merge: bool,
    pub index: usize,
    pub cancellation: &'a CancellationToken,
    /// Outputs of this commit's plumbing dependencies, keyed by the
    /// producing analyzer's `flag()`. Populated by the runner in
    /// topological order before this analyzer's `consume` runs.
    pub deps: &'a FxHashMap<&'static str, Box<dyn Any + Send + Sync>>,
}

impl<'a> ConsumeContext<'a> {
    /// Fetch and downcast a named dependency's output.
    pub fn dep<T: 'static>(&self, flag: &str) -> Option<&T> {
        self.deps.get(flag).and_then(|b| b.downcast_ref::<T>())
    }
}

/// Serialization target format (§4.1, §6).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SerializeFormat {
    Json,
    Yaml,
    Binary,
    Plot,
    Text,
}

/// The shared contract every plumbing and leaf analyzer implements.
pub trait Analyzer: Send + Sync + 'static {
    /// Upcasts to `Box<dyn Any>` so `merge` can recover a fork sibling's
    /// concrete type via [`downcast_branch`]. Every implementor writes
    /// `{ self }` — the coercion only type-checks at a concrete, `Sized`
    /// impl site, not generically over `Self`.
    fn into_any(self: Box<Self>) -> Box<dyn Any>;

    fn descriptor(&self) -> Descriptor;
    fn name(&self) -> &str;
    fn flag(&self) -> &'static str;
    fn list_configuration_options(&self) -> Vec<ConfigurationOption>;

    /// Flags of the plumbing analyzers this one reads from `ConsumeContext`.
    /// The runner topologically sorts the DAG from these declarations
    /// (§4.2, §4.3) and rejects a wiring where a dependency is not
    /// scheduled ahead of its consumer as a `Configuration` error at
    /// `initialize`. Plumbing roots (`TreeDiff`, `IdentityDetector`,
    /// `TicksSinceStart`) and analyzers that only read commit/index data
    /// return the default empty slice.
    fn depends_on(&self) -> &'static [&'static str] {
        &[]
    }

    /// Install configuration and absorb cross-analyzer facts. Validates
    /// eagerly — an unknown flag or out-of-range value is a `Configuration`
    /// error, not deferred to `consume`.
    fn configure(&mut self, facts: &ConfigFacts) -> Result<(), AnalyzerError>;

    /// Reset internal state for a fresh run.
    fn initialize(&mut self) -> Result<(), AnalyzerError>;

    fn consume(&mut self, ctx: &ConsumeContext) -> Result<(), AnalyzerError>;

    fn finalize(&mut self) -> Report;

    /// This commit's plumbing output, to be inserted into the next
    /// analyzer's `ConsumeContext::deps` under this analyzer's `flag()`.
    /// Leaf analyzers (which have no downstream consumers) return `None`.
    fn plumbing_output(&self) -> Option<Box<dyn Any + Send + Sync>> {
        None
    }

    /// Produce `n` clones with independent mutable state but shared
    /// configuration and shared read-only reference data.
    fn fork(&self, n: usize) -> Vec<Box<dyn Analyzer>>;

    /// Fold `branches`' accumulated state into `self`. Must be associative
    /// and commutative over the set of commit hashes processed.
    fn merge(&mut self, branches: Vec<Box<dyn Analyzer>>);

    /// True if this analyzer must run on a single thread (e.g. an
    /// incrementally-built identity dictionary under serialized access).
    fn sequential_only(&self) -> bool {
        false
    }

    fn cpu_heavy(&self) -> bool {
        false
    }

    /// Hand off this commit's plumbing state for cross-thread transport.
    /// Only plumbing analyzers with expensive-to-recompute state override
    /// this; leaves never snapshot.
    fn snapshot_plumbing(&self) -> Option<crate::types::Snapshot> {
        None
    }

    fn apply_snapshot(&mut self, _snapshot: &crate::types::Snapshot) {}

    fn release_snapshot(&mut self, snapshot: &mut crate::types::Snapshot) {
        snapshot.release();
    }

    /// Publish cross-analyzer facts this analyzer owns (e.g.
    /// `commitsByTick`, `peopleDict`) into the shared fact bag. Called by
    /// the runner once a dedicated full-stream pre-pass has populated this
    /// analyzer's internal state, before `configure` runs on the rest of
    /// the DAG (§4.2 `TicksSinceStart`/`IdentityDetector` contracts,
    /// §5 "commitsByTick is written only by TicksSinceStart"). Analyzers
    /// with no facts to share leave the default no-op.
    fn export_facts(&self, _facts: &mut ConfigFacts) {}

    /// Drop large short-lived indices between streaming chunks.
    fn hibernate(&mut self) {}

    /// Re-allocate whatever `hibernate` dropped.
    fn boot(&mut self) {}

    /// Cheap estimate of per-commit memory growth, for chunk sizing.
    fn state_growth_per_commit(&self) -> usize {
        0
    }

    fn save_checkpoint(&self, _dir: &Path) -> Result<(), AnalyzerError> {
        Ok(())
    }

    fn load_checkpoint(&mut self, _dir: &Path) -> Result<(), AnalyzerError> {
        Ok(())
    }

    fn checkpoint_size(&self) -> usize {
        0
    }

    fn serialize(
        &self,
        report: &Report,
        format: SerializeFormat,
        writer: &mut dyn Write,
    ) -> Result<(), AnalyzerError>;
}

/// Recovers a fork sibling's concrete type inside `merge`. Panics if
/// `branch` is not a `T` — a real violation of the fork/merge contract
/// (the runner never merges branches produced by a different analyzer),
/// not a condition callers are expected to recover from.
pub fn downcast_branch<T: Analyzer>(branch: Box<dyn Analyzer>) -> Box<T> {
    branch
        .into_any()
        .downcast::<T>()
        .expect("merge: fork sibling must be the same concrete analyzer type")
}
