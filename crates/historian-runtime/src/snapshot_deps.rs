//! Rehydrates a [`historian_core::types::Snapshot`] into the same
//! `ConsumeContext::deps` shape the producer builds live during its own
//! sequential walk, so a leaf worker on another thread sees an identical
//! dependency view regardless of whether it is consuming straight off the
//! producer or off a transported `Snapshot` (§4.3 snapshot/apply).

use std::any::Any;

use historian_core::types::collections::FxHashMap;
use historian_core::types::Snapshot;

use historian_plumbing::flags;

pub fn deps_from_snapshot(snapshot: &Snapshot) -> FxHashMap<&'static str, Box<dyn Any + Send + Sync>> {
    let mut deps: FxHashMap<&'static str, Box<dyn Any + Send + Sync>> = FxHashMap::default();
    deps.insert(flags::TREE_DIFF, Box::new((*snapshot.changes).clone()));
    deps.insert(flags::BLOB_CACHE, Box::new((*snapshot.blobs).clone()));
    deps.insert(
        flags::FILE_DIFF,
        Box::new((*snapshot.file_diffs).clone()),
    );
    deps.insert(flags::LINES_STATS, Box::new((*snapshot.line_stats).clone()));
    deps.insert(flags::LANGUAGES, Box::new((*snapshot.languages).clone()));
    deps.insert(flags::TICKS, Box::new(snapshot.tick));
    deps.insert(flags::IDENTITY, Box::new(snapshot.author_id));
    deps.insert(
        flags::UAST_CHANGES,
        Box::new((*snapshot.uast_changes).clone()),
    );
    deps
}
