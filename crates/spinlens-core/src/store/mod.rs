//! Bounded on-disk artifact retention.
//!
//! Generated images are persisted to a single rolling directory as a
//! convenience for the presentation layer; the store is explicitly not a
//! durability layer. Writes use per-request unique names so concurrent
//! requests never collide, and pruning works on a directory-listing
//! snapshot, tolerating files that vanish between the listing and the
//! delete (a concurrent prune or an unflushed write).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use thiserror::Error;
use uuid::Uuid;

/// Errors for artifact persistence.
///
/// Callers are expected to log and swallow these: persisted artifacts are
/// not required for returning a pipeline result.
#[derive(Debug, Error)]
pub enum PersistError {
    /// The artifact directory could not be created or read.
    #[error("Artifact directory unavailable: {0}")]
    Directory(String),

    /// Writing an artifact failed.
    #[error("Artifact write failed: {0}")]
    Write(String),
}

/// One persisted artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRecord {
    /// Path of the stored file.
    pub path: PathBuf,
    /// Modification time at persist/listing time; eviction order key.
    pub modified: SystemTime,
}

/// A bounded-size rolling artifact directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Open (creating if necessary) the artifact directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, PersistError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| PersistError::Directory(e.to_string()))?;
        Ok(Self { root })
    }

    /// The directory this store writes into.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist bytes under a collision-free name built from `stem` and a
    /// per-request unique identifier.
    pub fn persist(
        &self,
        bytes: &[u8],
        stem: &str,
        extension: &str,
    ) -> Result<ArtifactRecord, PersistError> {
        let name = format!("{stem}-{}.{extension}", Uuid::new_v4());
        let path = self.root.join(name);

        fs::write(&path, bytes).map_err(|e| PersistError::Write(e.to_string()))?;

        let modified = fs::metadata(&path)
            .and_then(|m| m.modified())
            .unwrap_or_else(|_| SystemTime::now());

        tracing::debug!(path = %path.display(), bytes = bytes.len(), "artifact persisted");

        Ok(ArtifactRecord { path, modified })
    }

    /// Snapshot the current contents, sorted by modification time ascending
    /// (oldest first). Entries that vanish mid-listing are skipped.
    pub fn list(&self) -> Vec<ArtifactRecord> {
        let Ok(entries) = fs::read_dir(&self.root) else {
            return Vec::new();
        };

        let mut records: Vec<ArtifactRecord> = entries
            .flatten()
            .filter_map(|entry| {
                let meta = entry.metadata().ok()?;
                if !meta.is_file() {
                    return None;
                }
                Some(ArtifactRecord {
                    path: entry.path(),
                    modified: meta.modified().ok()?,
                })
            })
            .collect();

        records.sort_by_key(|r| r.modified);
        records
    }

    /// Evict the oldest artifacts beyond `max_count`, returning how many
    /// were removed.
    ///
    /// Works on a listing snapshot; files already deleted by a concurrent
    /// prune are counted as removed rather than treated as failures. Other
    /// deletion failures are logged and swallowed.
    pub fn prune(&self, max_count: usize) -> usize {
        let records = self.list();
        if records.len() <= max_count {
            return 0;
        }

        let excess = records.len() - max_count;
        let mut removed = 0;

        for record in records.into_iter().take(excess) {
            match fs::remove_file(&record.path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    // Vanished between snapshot and delete; already gone.
                    removed += 1;
                }
                Err(e) => {
                    tracing::warn!(path = %record.path.display(), error = %e, "artifact eviction failed");
                }
            }
        }

        if removed > 0 {
            tracing::debug!(removed, cap = max_count, "artifact directory pruned");
        }

        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{File, FileTimes};
    use std::time::Duration;

    /// Persist with a deterministic modification time so eviction order is
    /// stable regardless of filesystem timestamp granularity.
    fn persist_at(store: &ArtifactStore, stem: &str, age_secs: u64) -> ArtifactRecord {
        let record = store.persist(b"data", stem, "jpg").unwrap();
        let mtime = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000 + age_secs);
        let file = File::options().write(true).open(&record.path).unwrap();
        file.set_times(FileTimes::new().set_modified(mtime)).unwrap();
        record
    }

    #[test]
    fn test_persist_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();

        let record = store.persist(b"hello", "original", "jpg").unwrap();

        assert!(record.path.exists());
        assert_eq!(fs::read(&record.path).unwrap(), b"hello");
        assert!(record
            .path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("original-"));
        assert_eq!(record.path.extension().unwrap(), "jpg");
    }

    #[test]
    fn test_persist_names_never_collide() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();

        let a = store.persist(b"a", "rotated", "jpg").unwrap();
        let b = store.persist(b"b", "rotated", "jpg").unwrap();

        assert_ne!(a.path, b.path);
        assert_eq!(fs::read(&a.path).unwrap(), b"a");
        assert_eq!(fs::read(&b.path).unwrap(), b"b");
    }

    #[test]
    fn test_open_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("uploads").join("images");

        let store = ArtifactStore::open(&nested).unwrap();
        assert!(nested.is_dir());
        assert_eq!(store.root(), nested);
    }

    #[test]
    fn test_prune_keeps_newest() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();

        // 12 artifacts, oldest first
        let records: Vec<_> = (0..12)
            .map(|i| persist_at(&store, &format!("art{i:02}"), i))
            .collect();

        let removed = store.prune(10);

        assert_eq!(removed, 2);
        let survivors = store.list();
        assert_eq!(survivors.len(), 10);

        // The two oldest are gone, the ten newest remain
        assert!(!records[0].path.exists());
        assert!(!records[1].path.exists());
        for record in &records[2..] {
            assert!(record.path.exists());
        }
    }

    #[test]
    fn test_prune_under_cap_removes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();

        for i in 0..3 {
            persist_at(&store, "art", i);
        }

        assert_eq!(store.prune(10), 0);
        assert_eq!(store.list().len(), 3);
    }

    #[test]
    fn test_prune_exact_cap_removes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();

        for i in 0..5 {
            persist_at(&store, "art", i);
        }

        assert_eq!(store.prune(5), 0);
        assert_eq!(store.list().len(), 5);
    }

    #[test]
    fn test_prune_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();

        assert_eq!(store.prune(10), 0);
        assert!(store.list().is_empty());
    }

    #[test]
    fn test_prune_zero_cap_clears_all() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();

        for i in 0..4 {
            persist_at(&store, "art", i);
        }

        assert_eq!(store.prune(0), 4);
        assert!(store.list().is_empty());
    }

    #[test]
    fn test_prune_tolerates_vanished_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();

        for i in 0..6 {
            persist_at(&store, "art", i);
        }

        // Simulate a concurrent consumer deleting the oldest file between
        // the snapshot and the delete: removing it first must not break
        // pruning of the rest.
        let oldest = store.list().into_iter().next().unwrap();
        fs::remove_file(&oldest.path).unwrap();

        store.prune(2);
        assert_eq!(store.list().len(), 2);
    }

    #[test]
    fn test_list_sorted_oldest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();

        persist_at(&store, "newer", 100);
        persist_at(&store, "oldest", 0);
        persist_at(&store, "middle", 50);

        let listed = store.list();
        assert_eq!(listed.len(), 3);
        assert!(listed[0].modified <= listed[1].modified);
        assert!(listed[1].modified <= listed[2].modified);
        assert!(listed[0]
            .path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("oldest-"));
    }

    #[test]
    fn test_list_ignores_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();

        fs::create_dir(dir.path().join("nested")).unwrap();
        persist_at(&store, "art", 0);

        assert_eq!(store.list().len(), 1);
    }
}
