//! `Persister<T>` binds a basename to a [`Codec`]. `save` builds a value
//! and writes `<dir>/<basename><ext>` atomically; `load` reads the file
//! back and hands the decoded value to a caller-supplied restoration
//! closure (§4.8).

use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use crate::codec::Codec;
use crate::error::PersistError;

pub struct Persister<T, C: Codec<T>> {
    basename: String,
    codec: C,
    _marker: PhantomData<T>,
}

impl<T, C: Codec<T>> Persister<T, C> {
    pub fn new(basename: impl Into<String>, codec: C) -> Self {
        Self {
            basename: basename.into(),
            codec,
            _marker: PhantomData,
        }
    }

    pub fn path(&self, dir: &Path) -> PathBuf {
        dir.join(format!("{}{}", self.basename, self.codec.extension()))
    }

    /// Builds `T` via `build_state`, then writes it to a temp file in
    /// `dir` and renames it into place so a reader never observes a
    /// partially-written checkpoint (create-or-truncate semantics at the
    /// final path).
    pub fn save(&self, dir: &Path, build_state: impl FnOnce() -> T) -> Result<(), PersistError> {
        std::fs::create_dir_all(dir)?;
        let value = build_state();
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        self.codec.encode(&value, &mut tmp)?;
        tmp.persist(self.path(dir))
            .map_err(|e| PersistError::encode(&self.basename, e))?;
        Ok(())
    }

    /// Reads `<dir>/<basename><ext>`, decodes it, and hands the value to
    /// `restore_state`. Errors propagate unchanged per §4.8 — the runner
    /// decides whether a load failure falls back to a cold start.
    pub fn load<R>(
        &self,
        dir: &Path,
        restore_state: impl FnOnce(T) -> R,
    ) -> Result<R, PersistError> {
        let mut file = std::fs::File::open(self.path(dir))?;
        let value = self.codec.decode(&mut file)?;
        Ok(restore_state(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::JsonCodec;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
    struct CheckpointState {
        processed: u64,
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let persister = Persister::new("anomaly", JsonCodec::<CheckpointState>::new());

        persister
            .save(dir.path(), || CheckpointState { processed: 42 })
            .unwrap();

        let restored = persister
            .load(dir.path(), |state| state.processed)
            .unwrap();
        assert_eq!(restored, 42);
        assert!(persister.path(dir.path()).exists());
    }

    #[test]
    fn save_overwrites_an_existing_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let persister = Persister::new("anomaly", JsonCodec::<CheckpointState>::new());

        persister
            .save(dir.path(), || CheckpointState { processed: 1 })
            .unwrap();
        persister
            .save(dir.path(), || CheckpointState { processed: 2 })
            .unwrap();

        let restored = persister.load(dir.path(), |s| s).unwrap();
        assert_eq!(restored, CheckpointState { processed: 2 });
    }

    #[test]
    fn load_without_a_prior_save_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let persister = Persister::new("missing", JsonCodec::<CheckpointState>::new());
        assert!(persister.load(dir.path(), |s| s).is_err());
    }
}
