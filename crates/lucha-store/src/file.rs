//! # File Storage
//!
//! Durable medium: one file per key under a directory.
//!
//! ## Layout
//! ```text
//! <data_dir>/
//! ├── local/                      ← durable + shared (wrapped by SharedMedium)
//! │   └── lucha_cart_v1.json
//! └── sessions/
//!     └── <session-id>/           ← durable + private, one per session
//!         └── lucha_cart_v1.json
//! ```
//!
//! Writes go to a uniquely named temp file first and are renamed into place,
//! so a reader never sees a half-written blob and concurrent writers of the
//! same key never share a temp file.
//!
//! Key characters outside `[A-Za-z0-9_-]` are written as `%XX` per byte, so
//! distinct keys always map to distinct files.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};

#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Opens (and creates) a directory-backed medium.
    ///
    /// ## Errors
    /// `Unavailable` when the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            StorageError::Unavailable(format!("cannot create {}: {}", dir.display(), e))
        })?;
        debug!(dir = %dir.display(), "File storage opened");
        Ok(FileStorage { dir })
    }

    /// Opens the private medium for one session under `root/sessions/`.
    pub fn session(root: &Path, session_id: &str) -> StorageResult<Self> {
        Self::open(root.join("sessions").join(encode_name(session_id)))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", encode_name(key)))
    }
}

/// Maps a key onto a safe file name, one-to-one.
fn encode_name(key: &str) -> String {
    let mut name = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            name.push(char::from(byte));
        } else {
            name.push_str(&format!("%{:02X}", byte));
        }
    }
    name
}

impl StorageBackend for FileStorage {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::ReadFailed {
                key: key.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let write_failed = |e: std::io::Error| StorageError::WriteFailed {
            key: key.to_string(),
            reason: e.to_string(),
        };

        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(write_failed)?;
        tmp.write_all(value.as_bytes()).map_err(write_failed)?;
        tmp.persist(self.path_for(key))
            .map_err(|e| write_failed(e.error))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::WriteFailed {
                key: key.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    fn medium_id(&self) -> String {
        format!("file:{}", self.dir.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStorage::open(tmp.path().join("local")).unwrap();

        assert_eq!(store.get("lucha_cart_v1").unwrap(), None);
        store.set("lucha_cart_v1", "{\"items\":[]}").unwrap();
        assert_eq!(
            store.get("lucha_cart_v1").unwrap().as_deref(),
            Some("{\"items\":[]}")
        );

        store.remove("lucha_cart_v1").unwrap();
        store.remove("lucha_cart_v1").unwrap();
        assert_eq!(store.get("lucha_cart_v1").unwrap(), None);
    }

    #[test]
    fn test_survives_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        FileStorage::open(tmp.path()).unwrap().set("k", "v").unwrap();

        let reopened = FileStorage::open(tmp.path()).unwrap();
        assert_eq!(reopened.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_sessions_are_private() {
        let tmp = tempfile::tempdir().unwrap();
        let a = FileStorage::session(tmp.path(), "tab-a").unwrap();
        let b = FileStorage::session(tmp.path(), "tab-b").unwrap();

        a.set("k", "from a").unwrap();
        assert_eq!(b.get("k").unwrap(), None);
        assert_ne!(a.medium_id(), b.medium_id());

        let a_again = FileStorage::session(tmp.path(), "tab-a").unwrap();
        assert_eq!(a_again.get("k").unwrap().as_deref(), Some("from a"));
        assert_eq!(a.medium_id(), a_again.medium_id());
    }

    #[test]
    fn test_keys_stay_inside_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStorage::open(tmp.path()).unwrap();
        store.set("../escape", "v").unwrap();
        assert!(tmp.path().join("%2E%2E%2Fescape.json").exists());
        assert_eq!(store.get("../escape").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_distinct_keys_get_distinct_files() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStorage::open(tmp.path()).unwrap();

        store.set("a.b", "dot").unwrap();
        store.set("a_b", "underscore").unwrap();
        store.set("a/b", "slash").unwrap();

        assert_eq!(store.get("a.b").unwrap().as_deref(), Some("dot"));
        assert_eq!(store.get("a_b").unwrap().as_deref(), Some("underscore"));
        assert_eq!(store.get("a/b").unwrap().as_deref(), Some("slash"));
    }

    #[test]
    fn test_concurrent_writers_of_one_key() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStorage::open(tmp.path()).unwrap();

        std::thread::scope(|scope| {
            for writer in 0..4 {
                let store = store.clone();
                scope.spawn(move || {
                    for i in 0..50 {
                        store.set("lucha_cart_v1", &format!("{writer}:{i}")).unwrap();
                    }
                });
            }
        });

        let last = store.get("lucha_cart_v1").unwrap().unwrap();
        assert!(last.ends_with(":49"));
        // No temp files left behind.
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_open_fails_on_file_path() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("blocker");
        std::fs::write(&blocker, "not a dir").unwrap();

        let err = FileStorage::open(blocker.join("nested")).unwrap_err();
        assert!(err.is_environmental());
    }
}
