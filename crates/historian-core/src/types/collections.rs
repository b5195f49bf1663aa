//! Fast, non-adversarial hash containers used throughout the engine.
//!
//! Commit hashes and interned path/identity ids are trusted keys (they come
//! from content addressing or interning, not untrusted network input), so we
//! trade SipHash's DoS resistance for `rustc_hash::FxHash`'s speed.

use rustc_hash::FxHasher;
use std::collections::{HashMap, HashSet};
use std::hash::BuildHasherDefault;

pub type FxHashMap<K, V> = HashMap<K, V, BuildHasherDefault<FxHasher>>;
pub type FxHashSet<T> = HashSet<T, BuildHasherDefault<FxHasher>>;
