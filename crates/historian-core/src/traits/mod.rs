//! Capability traits decomposed out of the monolithic [`crate::Analyzer`]
//! contract (§9, REDESIGN FLAGS: "polymorphism over analyzers").
//!
//! `Analyzer` stays one trait because the runner needs a single
//! `Box<dyn Analyzer>` per pipeline node. These narrower traits exist so
//! code that only cares about one concern — the checkpoint writer, the
//! hibernation scheduler — can depend on that concern alone instead of the
//! full contract. Every `Analyzer` gets them for free via the blanket impls
//! below.

use std::path::Path;

use crate::analyzer::{Analyzer, ConfigurationOption};
use crate::config::ConfigFacts;
use crate::errors::AnalyzerError;
use crate::types::Snapshot;

pub trait Configurable {
    fn list_configuration_options(&self) -> Vec<ConfigurationOption>;
    fn configure(&mut self, facts: &ConfigFacts) -> Result<(), AnalyzerError>;
}

impl<A: Analyzer + ?Sized> Configurable for A {
    fn list_configuration_options(&self) -> Vec<ConfigurationOption> {
        Analyzer::list_configuration_options(self)
    }

    fn configure(&mut self, facts: &ConfigFacts) -> Result<(), AnalyzerError> {
        Analyzer::configure(self, facts)
    }
}

/// Analyzers whose per-commit state is worth moving across a channel
/// instead of recomputing in the consuming worker.
pub trait Snapshotting {
    fn snapshot_plumbing(&self) -> Option<Snapshot>;
    fn apply_snapshot(&mut self, snapshot: &Snapshot);
    fn release_snapshot(&mut self, snapshot: &mut Snapshot);
}

impl<A: Analyzer + ?Sized> Snapshotting for A {
    fn snapshot_plumbing(&self) -> Option<Snapshot> {
        Analyzer::snapshot_plumbing(self)
    }

    fn apply_snapshot(&mut self, snapshot: &Snapshot) {
        Analyzer::apply_snapshot(self, snapshot)
    }

    fn release_snapshot(&mut self, snapshot: &mut Snapshot) {
        Analyzer::release_snapshot(self, snapshot)
    }
}

pub trait Checkpointable {
    fn save_checkpoint(&self, dir: &Path) -> Result<(), AnalyzerError>;
    fn load_checkpoint(&mut self, dir: &Path) -> Result<(), AnalyzerError>;
    fn checkpoint_size(&self) -> usize;
}

impl<A: Analyzer + ?Sized> Checkpointable for A {
    fn save_checkpoint(&self, dir: &Path) -> Result<(), AnalyzerError> {
        Analyzer::save_checkpoint(self, dir)
    }

    fn load_checkpoint(&mut self, dir: &Path) -> Result<(), AnalyzerError> {
        Analyzer::load_checkpoint(self, dir)
    }

    fn checkpoint_size(&self) -> usize {
        Analyzer::checkpoint_size(self)
    }
}

/// Memory-pressure hooks the runner calls between streaming chunks.
pub trait Hibernatable {
    fn hibernate(&mut self);
    fn boot(&mut self);
    fn state_growth_per_commit(&self) -> usize;
}

impl<A: Analyzer + ?Sized> Hibernatable for A {
    fn hibernate(&mut self) {
        Analyzer::hibernate(self)
    }

    fn boot(&mut self) {
        Analyzer::boot(self)
    }

    fn state_growth_per_commit(&self) -> usize {
        Analyzer::state_growth_per_commit(self)
    }
}
