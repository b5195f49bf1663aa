//! Value types shared across the plumbing DAG, the runner, and leaf
//! analyzers.

pub mod blob;
pub mod change;
pub mod collections;
pub mod diff;
pub mod ids;
pub mod lines;
pub mod report;
pub mod snapshot;
pub mod uast_change;

pub use blob::{BlobContent, CachedBlob};
pub use change::{Change, ChangeAction, ChangeSide};
pub use diff::{EditOp, FileDiffEntry, LineEdit};
pub use ids::{AuthorId, CommitHash, FileId, Tick, AUTHOR_MISSING};
pub use lines::LineStats;
pub use report::{Report, ReportValue, ERROR_KEY};
pub use snapshot::Snapshot;
pub use uast_change::UastChangePair;
