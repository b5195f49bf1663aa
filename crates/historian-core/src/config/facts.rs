//! Well-known fact keys published into `ConfigFacts` before a run starts,
//! and the typed accessors analyzers use to read them back.

use std::sync::Arc;

use crate::analyzer::ConfigFacts;
use crate::types::collections::FxHashMap;
use crate::types::ids::{AuthorId, Tick};

pub const COMMITS_BY_TICK: &str = "commitsByTick";
pub const PEOPLE_DICT: &str = "peopleDict";
pub const REVERSED_PEOPLE_DICT: &str = "reversedPeopleDict";
pub const TICK_SIZE_SECONDS: &str = "tickSizeSeconds";

/// `tick -> commit hashes landing in that tick`, published by
/// `TicksSinceStart` once the full commit list is known and consumed by
/// leaf analyzers that aggregate per-tick (§4.4).
pub type CommitsByTick = FxHashMap<Tick, Vec<[u8; 20]>>;

/// `author identity key -> AuthorId`, published by `IdentityDetector`.
pub type PeopleDict = FxHashMap<String, AuthorId>;

/// `AuthorId -> display name`, the inverse of `PeopleDict`, used by
/// serializers that print human-readable author names.
pub type ReversedPeopleDict = FxHashMap<AuthorId, String>;

pub fn insert<T: Send + Sync + 'static>(facts: &mut ConfigFacts, key: &str, value: T) {
    facts.insert(key.to_string(), Arc::new(value));
}

pub fn get<'a, T: Send + Sync + 'static>(facts: &'a ConfigFacts, key: &str) -> Option<&'a T> {
    facts.get(key).and_then(|v| v.downcast_ref::<T>())
}
