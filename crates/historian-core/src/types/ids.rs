//! Identifier newtypes threaded through the plumbing DAG and leaf analyzers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 20-byte commit object hash (SHA-1 sized; the engine never interprets
/// the bytes, it only compares and hashes them).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CommitHash(pub [u8; 20]);

impl CommitHash {
    pub fn zero() -> Self {
        Self([0u8; 20])
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl fmt::Debug for CommitHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CommitHash({})", self.to_hex())
    }
}

impl fmt::Display for CommitHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// A stable integer identity assigned by `IdentityDetector`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct AuthorId(pub i64);

/// Sentinel for commits whose author identity cannot be resolved.
pub const AUTHOR_MISSING: AuthorId = AuthorId(-1);

/// A non-decreasing tick bucket index, assigned by `TicksSinceStart`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct Tick(pub u32);

/// An interned file path identity, used by coupling/co-occurrence analyzers
/// to keep map keys cheap instead of hashing full path strings repeatedly.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct FileId(pub u32);
