//! The version-control boundary.
//!
//! Per the engine's PURPOSE & SCOPE, the underlying object store (commits,
//! trees, blobs, diffs) is an external collaborator: this module defines
//! only the interfaces the plumbing core consumes. A concrete adapter (e.g.
//! over `git2`) is supplied by the embedder; see the `vcs_adapter` feature
//! on `historian-plumbing` for one such adapter used by this workspace's own
//! tests.

use crate::types::{Change, CommitHash};

/// An author or committer identity as recorded on a commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pub email: String,
}

impl Signature {
    /// The "exact" identity key: `"name <email>"`, lowercased.
    pub fn exact_key(&self) -> String {
        format!("{} <{}>", self.name, self.email).to_lowercase()
    }
}

/// One commit in the ordered stream the engine is handed. Read-only.
pub trait Commit: Send + Sync {
    fn hash(&self) -> CommitHash;
    fn author(&self) -> &Signature;
    fn committer(&self) -> &Signature;
    /// Unix seconds.
    fn committer_time(&self) -> i64;
    fn parents(&self) -> &[CommitHash];
    fn is_merge(&self) -> bool {
        self.parents().len() > 1
    }
}

/// A tree handle opaque to the engine; `ObjectStore::diff_tree` is the only
/// thing that inspects it.
pub trait Tree: Send + Sync {}

/// The read-only object store each plumbing worker holds its own handle to.
///
/// Implementations must be cheap to clone (e.g. an `Arc` around a
/// repository handle) since the runner opens one handle per worker.
pub trait ObjectStore: Send + Sync {
    /// Diff `from` (the previous commit's tree, or `None` for the very
    /// first commit, whose diff is the whole tree as Inserts) against `to`.
    fn diff_tree(&self, from: Option<&dyn Tree>, to: &dyn Tree) -> Vec<Change>;

    /// The tree object for a commit.
    fn tree_of(&self, commit: CommitHash) -> Option<Box<dyn Tree>>;

    /// Read blob content by hash. Returns `None` if the object cannot be
    /// found — `BlobCache` substitutes an empty blob in that case rather
    /// than failing the commit.
    fn read_blob(&self, hash: [u8; 20]) -> Option<Vec<u8>>;

    /// Best-effort binary classification, consulted before falling back to
    /// content sniffing.
    fn is_binary(&self, hash: [u8; 20]) -> Option<bool> {
        let _ = hash;
        None
    }
}
