//! Per-file diff output produced by `FileDiff` and consumed by `LinesStats`
//! and `UASTChanges`.

use serde::{Deserialize, Serialize};

/// One edit operation in a line-oriented diff.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum EditOp {
    Equal,
    Insert,
    Delete,
}

/// A single hunk: an edit op plus the line ranges (end-exclusive) it covers
/// in the old and new file.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct LineEdit {
    pub op: EditOp,
    pub old_start: u32,
    pub old_end: u32,
    pub new_start: u32,
    pub new_end: u32,
}

/// The line-oriented diff for one modified file.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FileDiffEntry {
    pub old_lines: u32,
    pub new_lines: u32,
    pub edits: Vec<LineEdit>,
    /// Set when the LCS timeout fired before the algorithm converged; the
    /// edits present are whatever partial script it had accumulated so far.
    pub timed_out: bool,
}
