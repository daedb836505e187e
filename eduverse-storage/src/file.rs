//! Directory-backed cache: one file per key.
//!
//! Writes go to a temporary sibling first and are renamed into place, so a
//! crash mid-write leaves the previous value intact rather than a torn file.

use crate::{DurableCache, StorageError, StorageResult};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const VALUE_EXTENSION: &str = "json";

/// A cache that stores each key as a file inside `root`.
#[derive(Debug, Clone)]
pub struct FileCache {
    root: PathBuf,
}

impl FileCache {
    /// Opens (or creates) a cache rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        if !root.exists() {
            fs::create_dir_all(&root)?;
            info!("Created cache directory: {:?}", root);
        }
        Ok(Self { root })
    }

    /// The directory holding the cache files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a key to its file path. Keys are restricted to
    /// `[A-Za-z0-9_.-]` so they cannot escape the root.
    fn path_for(&self, key: &str) -> StorageResult<PathBuf> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(format!("{key}.{VALUE_EXTENSION}")))
    }
}

impl DurableCache for FileCache {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension(format!("{VALUE_EXTENSION}.tmp"));

        if let Err(e) = write_and_replace(&tmp, &path, value) {
            if let Err(cleanup) = fs::remove_file(&tmp) {
                if cleanup.kind() != ErrorKind::NotFound {
                    warn!("Failed to remove {:?}: {}", tmp, cleanup);
                }
            }
            return Err(e.into());
        }

        debug!("Wrote cache key {} ({} bytes)", key, value.len());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn write_and_replace(tmp: &Path, path: &Path, value: &str) -> std::io::Result<()> {
    let mut file = fs::File::create(tmp)?;
    file.write_all(value.as_bytes())?;
    file.sync_all()?;
    drop(file);
    fs::rename(tmp, path)
}
