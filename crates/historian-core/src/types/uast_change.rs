//! Output of the `UASTChanges` plumbing analyzer.

use crate::types::change::Change;
use crate::uast::UastNode;
use serde::{Deserialize, Serialize};

/// One file's before/after UAST pair for a single `Change`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UastChangePair {
    pub change: Change,
    pub before: Option<UastNode>,
    pub after: Option<UastNode>,
}
