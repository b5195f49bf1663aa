//! # historian-runtime
//!
//! The execution runner (§4.3): topologically orders the plumbing DAG,
//! drives a single producer sequentially through it to build per-commit
//! `Snapshot`s, fans those out to `W` parallel leaf workers over
//! `crossbeam-channel`s with a stable modulo clone assignment, and folds
//! worker branches back into the canonical leaf state via `merge` at each
//! chunk boundary.

#![allow(dead_code)]

pub mod dag;
pub mod dispatch;
pub mod error;
pub mod producer;
pub mod runner;
pub mod snapshot_deps;

pub use dag::topological_order;
pub use error::RunnerError;
pub use runner::{Runner, DEFAULT_CHUNK_SIZE};
