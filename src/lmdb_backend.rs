use lmdb::{Database, DatabaseFlags, Environment, EnvironmentFlags, Transaction, WriteFlags};
use std::path::Path;

use crate::error::{Error, Result};
use crate::store::Backend;

const DEFAULT_MAP_SIZE: usize = 1024 * 1024 * 1024; // 1GB, matches the teacher's storage layer.

/// LMDB-backed [`Backend`]. A single flat database holds every key, tagged
/// per [`crate::store::NodeStore`]'s key encoding; LMDB itself provides the
/// single-writer/multi-reader guarantees the core relies on (§5).
#[derive(Debug)]
pub struct LmdbBackend {
    env: Environment,
    db: Database,
}

impl LmdbBackend {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_map_size(path, DEFAULT_MAP_SIZE)
    }

    pub fn with_map_size<P: AsRef<Path>>(path: P, map_size: usize) -> Result<Self> {
        let env = Environment::new()
            .set_flags(EnvironmentFlags::NO_SUB_DIR)
            .set_max_dbs(1)
            .set_map_size(map_size)
            .open(path.as_ref())
            .map_err(|e| Error::StorageError(Box::new(e)))?;

        let db = env
            .create_db(Some("smt"), DatabaseFlags::empty())
            .map_err(|e| Error::StorageError(Box::new(e)))?;

        Ok(LmdbBackend { env, db })
    }

    pub fn sync(&self) -> Result<()> {
        self.env.sync(true).map_err(|e| Error::StorageError(Box::new(e)))
    }
}

impl Backend for LmdbBackend {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let txn = self
            .env
            .begin_ro_txn()
            .map_err(|e| Error::StorageError(Box::new(e)))?;
        match txn.get(self.db, &key) {
            Ok(data) => Ok(Some(data.to_vec())),
            Err(lmdb::Error::NotFound) => Ok(None),
            Err(e) => Err(Error::StorageError(Box::new(e))),
        }
    }

    fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut txn = self
            .env
            .begin_rw_txn()
            .map_err(|e| Error::StorageError(Box::new(e)))?;
        txn.put(self.db, &key, &value, WriteFlags::empty())
            .map_err(|e| Error::StorageError(Box::new(e)))?;
        txn.commit().map_err(|e| Error::StorageError(Box::new(e)))
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        let mut txn = self
            .env
            .begin_rw_txn()
            .map_err(|e| Error::StorageError(Box::new(e)))?;
        match txn.del(self.db, &key, None) {
            Ok(()) => txn.commit().map_err(|e| Error::StorageError(Box::new(e))),
            Err(lmdb::Error::NotFound) => {
                txn.commit().map_err(|e| Error::StorageError(Box::new(e)))
            }
            Err(e) => Err(Error::StorageError(Box::new(e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_backend() -> (LmdbBackend, TempDir) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.db");
        let backend = LmdbBackend::new(&path).unwrap();
        (backend, dir)
    }

    #[test]
    fn round_trips_bytes() {
        let (backend, _dir) = temp_backend();
        backend.set(b"k", b"value").unwrap();
        assert_eq!(backend.get(b"k").unwrap(), Some(b"value".to_vec()));
    }

    #[test]
    fn missing_key_is_none() {
        let (backend, _dir) = temp_backend();
        assert_eq!(backend.get(b"nope").unwrap(), None);
    }

    #[test]
    fn delete_is_idempotent() {
        let (backend, _dir) = temp_backend();
        backend.set(b"k", b"v").unwrap();
        backend.delete(b"k").unwrap();
        backend.delete(b"k").unwrap();
        assert_eq!(backend.get(b"k").unwrap(), None);
    }

    #[test]
    fn persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.db");
        {
            let backend = LmdbBackend::new(&path).unwrap();
            backend.set(b"k", b"v").unwrap();
            backend.sync().unwrap();
        }
        let backend = LmdbBackend::new(&path).unwrap();
        assert_eq!(backend.get(b"k").unwrap(), Some(b"v".to_vec()));
    }
}
