//! `Change` — a single tree entry mutation between two commits.

use serde::{Deserialize, Serialize};

/// The kind of mutation a `Change` represents.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum ChangeAction {
    Insert,
    Delete,
    Modify,
}

/// One side (from/to) of a `Change`: a path name and the blob hash it
/// resolved to at that side (absent for Inserts' `from` and Deletes' `to`).
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct ChangeSide {
    pub name: String,
    pub hash: Option<[u8; 20]>,
}

impl ChangeSide {
    pub fn empty() -> Self {
        Self {
            name: String::new(),
            hash: None,
        }
    }
}

/// A single entry in a `TreeDiff` output.
///
/// A `Modify` whose `from.name != to.name` is a rename.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Change {
    pub action: ChangeAction,
    pub from: ChangeSide,
    pub to: ChangeSide,
}

impl Change {
    pub fn is_rename(&self) -> bool {
        self.action == ChangeAction::Modify && self.from.name != self.to.name
    }

    pub fn insert(to_name: impl Into<String>, to_hash: [u8; 20]) -> Self {
        Self {
            action: ChangeAction::Insert,
            from: ChangeSide::empty(),
            to: ChangeSide {
                name: to_name.into(),
                hash: Some(to_hash),
            },
        }
    }

    pub fn delete(from_name: impl Into<String>, from_hash: [u8; 20]) -> Self {
        Self {
            action: ChangeAction::Delete,
            from: ChangeSide {
                name: from_name.into(),
                hash: Some(from_hash),
            },
            to: ChangeSide::empty(),
        }
    }

    pub fn modify(
        from_name: impl Into<String>,
        from_hash: [u8; 20],
        to_name: impl Into<String>,
        to_hash: [u8; 20],
    ) -> Self {
        Self {
            action: ChangeAction::Modify,
            from: ChangeSide {
                name: from_name.into(),
                hash: Some(from_hash),
            },
            to: ChangeSide {
                name: to_name.into(),
                hash: Some(to_hash),
            },
        }
    }
}
