//! LMDB-backed sample store.
//!
//! One unnamed database maps key bytes to container bytes. Writes happen
//! in whole-chunk transactions with no-overwrite puts; an existing key
//! aborts the transaction so nothing from the chunk is kept.
//!
//! LMDB orders keys bytewise regardless of insertion order. The pipeline
//! still inserts in sorted sample order so that page allocation, and with
//! it `data.mdb`, is reproducible.

use std::fs;
use std::path::{Path, PathBuf};

use heed::types::Bytes;
use heed::{Database, Env, EnvFlags, EnvOpenOptions, MdbError, PutFlags};
use tracing::{debug, error};

use crate::{ConvertError, ConvertResult};

/// Default LMDB map size (1 TiB of address space, not disk).
pub const DEFAULT_MAP_SIZE: usize = 1 << 40;

/// Name of the LMDB data file inside a store directory.
pub const DATA_FILE: &str = "data.mdb";

/// One pending insert.
#[derive(Debug, Clone, Copy)]
pub struct StoreEntry<'a> {
    /// Key bytes.
    pub key: &'a [u8],
    /// Container bytes.
    pub value: &'a [u8],
    /// Sample the entry came from, for error reports.
    pub source: &'a Path,
}

/// An open store.
pub struct Store {
    env: Env,
    db: Database<Bytes, Bytes>,
    path: PathBuf,
}

impl Drop for Store {
    // heed keeps every opened environment in a global registry, so the
    // last handle going away does not close it. Removing the entry lets
    // the environment close when `env` is dropped and the path be
    // reopened with other flags in the same process.
    fn drop(&mut self) {
        let _closing = self.env.clone().prepare_for_closing();
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").field("path", &self.path).finish()
    }
}

impl Store {
    /// Opens `path` for writing, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Fails if the directory cannot be created or LMDB refuses to open it.
    pub fn create<P: AsRef<Path>>(path: P, map_size: usize) -> ConvertResult<Self> {
        let path = path.as_ref();
        fs::create_dir_all(path)?;

        let mut options = EnvOpenOptions::new();
        options.map_size(map_size);
        // SAFETY: a store directory is written by a single process per run.
        let env = unsafe { options.open(path)? };

        let mut wtxn = env.write_txn()?;
        let db: Database<Bytes, Bytes> = env.create_database(&mut wtxn, None)?;
        wtxn.commit()?;

        debug!(path = %path.display(), map_size, "opened store for writing");
        Ok(Self {
            env,
            db,
            path: path.to_path_buf(),
        })
    }

    /// Opens an existing store read-only.
    ///
    /// # Errors
    ///
    /// Fails if `path` is not an LMDB directory.
    pub fn open_read_only<P: AsRef<Path>>(path: P) -> ConvertResult<Self> {
        let path = path.as_ref();
        if !path.join(DATA_FILE).is_file() {
            return Err(ConvertError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} is not a store", path.display()),
            )));
        }

        let mut options = EnvOpenOptions::new();
        // SAFETY: the environment is only read through this handle.
        let env = unsafe {
            options.flags(EnvFlags::READ_ONLY);
            options.open(path)?
        };

        let rtxn = env.read_txn()?;
        let db = env
            .open_database::<Bytes, Bytes>(&rtxn, None)?
            .ok_or(ConvertError::Store(heed::Error::Mdb(MdbError::NotFound)))?;
        drop(rtxn);

        Ok(Self {
            env,
            db,
            path: path.to_path_buf(),
        })
    }

    /// Store directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the LMDB data file.
    pub fn data_file(&self) -> PathBuf {
        self.path.join(DATA_FILE)
    }

    /// Inserts all `entries` in order inside one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::KeyCollision`] if any key already exists,
    /// either from an earlier commit or earlier in `entries`. The
    /// transaction is aborted and the store keeps its previous content.
    pub fn commit(&self, entries: &[StoreEntry<'_>]) -> ConvertResult<()> {
        let mut wtxn = self.env.write_txn()?;
        for entry in entries {
            match self
                .db
                .put_with_flags(&mut wtxn, PutFlags::NO_OVERWRITE, entry.key, entry.value)
            {
                Ok(()) => {}
                Err(heed::Error::Mdb(MdbError::KeyExist)) => {
                    wtxn.abort();
                    let key = String::from_utf8_lossy(entry.key).into_owned();
                    error!(key = %key, source = %entry.source.display(), "key collision");
                    return Err(ConvertError::KeyCollision {
                        key,
                        path: entry.source.to_path_buf(),
                    });
                }
                Err(e) => {
                    wtxn.abort();
                    return Err(e.into());
                }
            }
        }
        wtxn.commit()?;
        Ok(())
    }

    /// Value stored under `key`.
    pub fn get(&self, key: &[u8]) -> ConvertResult<Option<Vec<u8>>> {
        let rtxn = self.env.read_txn()?;
        Ok(self.db.get(&rtxn, key)?.map(<[u8]>::to_vec))
    }

    /// All keys, bytewise ascending.
    pub fn keys(&self) -> ConvertResult<Vec<Vec<u8>>> {
        self.keys_with_prefix(b"")
    }

    /// Keys starting with `prefix`, bytewise ascending.
    pub fn keys_with_prefix(&self, prefix: &[u8]) -> ConvertResult<Vec<Vec<u8>>> {
        let rtxn = self.env.read_txn()?;
        let mut keys = Vec::new();
        // LMDB rejects a zero-length key as cursor position.
        if prefix.is_empty() {
            for item in self.db.iter(&rtxn)? {
                let (key, _) = item?;
                keys.push(key.to_vec());
            }
        } else {
            for item in self.db.prefix_iter(&rtxn, prefix)? {
                let (key, _) = item?;
                keys.push(key.to_vec());
            }
        }
        Ok(keys)
    }

    /// Number of stored samples.
    pub fn len(&self) -> ConvertResult<u64> {
        let rtxn = self.env.read_txn()?;
        Ok(self.db.len(&rtxn)?)
    }

    /// True if the store holds no samples.
    pub fn is_empty(&self) -> ConvertResult<bool> {
        Ok(self.len()? == 0)
    }
}
