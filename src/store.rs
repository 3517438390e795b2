//! Sorted unit storage.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log;

use crate::chunk::{ChunkError, ExternalChunk};
use crate::unit::UnitId;

/// Temporary directory holding the sorted units of a single pipeline run.
pub struct UnitStore {
    dir: tempfile::TempDir,
    rw_buf_size: Option<usize>,
}

impl UnitStore {
    /// Creates a new store.
    ///
    /// # Arguments
    /// * `tmp_path` - Directory the store is created in. If the parameter is [`None`] default OS temporary
    ///   directory will be used.
    /// * `rw_buf_size` - Unit file read/write buffer size.
    pub fn new(tmp_path: Option<&Path>, rw_buf_size: Option<usize>) -> io::Result<Self> {
        let dir = if let Some(tmp_path) = tmp_path {
            tempfile::tempdir_in(tmp_path)
        } else {
            tempfile::tempdir()
        }?;

        log::info!("using {} as a temporary directory", dir.path().display());

        return Ok(UnitStore { dir, rw_buf_size });
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn rw_buf_size(&self) -> Option<usize> {
        self.rw_buf_size
    }

    /// Returns the file path of a unit.
    pub fn path(&self, id: UnitId) -> PathBuf {
        self.dir.path().join(id.to_string())
    }

    /// Writes a new unit.
    pub fn create<C, I>(&self, id: UnitId, items: I) -> Result<(), ChunkError>
    where
        C: ExternalChunk,
        I: IntoIterator<Item = Result<i64, ChunkError>>,
    {
        C::build(&self.path(id), items, self.rw_buf_size)
    }

    /// Opens a unit for reading.
    pub fn open<C: ExternalChunk>(&self, id: UnitId) -> Result<C, ChunkError> {
        C::open(&self.path(id), self.rw_buf_size)
    }

    /// Removes a consumed unit.
    pub fn remove(&self, id: UnitId) -> io::Result<()> {
        fs::remove_file(self.path(id))
    }
}

#[cfg(test)]
mod test {
    use rstest::*;

    use super::UnitStore;
    use crate::chunk::{ChunkError, TextExternalChunk};
    use crate::unit::UnitId;

    #[fixture]
    fn store() -> UnitStore {
        UnitStore::new(None, None).unwrap()
    }

    #[rstest]
    fn test_unit_lifecycle(store: UnitStore) {
        let id = UnitId::Merged { seq: 3 };
        store.create::<TextExternalChunk, _>(id, vec![Ok(1), Ok(2)]).unwrap();

        assert_eq!(store.path(id), store.dir().join("-3"));
        let restored: Result<Vec<i64>, ChunkError> = store.open::<TextExternalChunk>(id).unwrap().collect();
        assert_eq!(restored.unwrap(), vec![1, 2]);

        store.remove(id).unwrap();
        assert!(!store.path(id).exists());
    }

    #[test]
    fn test_stores_are_isolated() {
        let parent = tempfile::tempdir().unwrap();
        let first = UnitStore::new(Some(parent.path()), None).unwrap();
        let second = UnitStore::new(Some(parent.path()), None).unwrap();

        let id = UnitId::Chunk { offset: 0 };
        assert_ne!(first.path(id), second.path(id));
    }
}
