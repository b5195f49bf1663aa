//! Per-change-entry line statistics produced by `LinesStats`.

use serde::{Deserialize, Serialize};

/// Added/removed/changed line counts (in runes, i.e. Unicode scalar values)
/// for one `Change` entry.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct LineStats {
    pub added: u32,
    pub removed: u32,
    pub changed: u32,
}

impl LineStats {
    pub fn net_churn(&self) -> i64 {
        self.added as i64 - self.removed as i64
    }
}

impl std::ops::Add for LineStats {
    type Output = LineStats;

    fn add(self, rhs: Self) -> Self::Output {
        LineStats {
            added: self.added + rhs.added,
            removed: self.removed + rhs.removed,
            changed: self.changed + rhs.changed,
        }
    }
}

impl std::ops::AddAssign for LineStats {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}
