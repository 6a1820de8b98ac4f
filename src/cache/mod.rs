mod link;

pub use link::SymlinkPointerMap;

use std::{fs, path::PathBuf};

use log::debug;
use thiserror::Error;

use crate::{
    flock::{self, FileLock},
    model::{CommitId, StorePath},
    store::{ArtifactStore, StoreError},
};

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache lock cannot be acquired")]
    Lock(#[from] flock::Error),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
}

/// Persistent map from commit to artifact path. `put` must replace
/// atomically so a reader never observes a half-written pointer.
pub trait PointerMap: Send + Sync {
    fn get(&self, commit: &CommitId) -> Result<Option<StorePath>, CacheError>;
    fn put(&self, commit: &CommitId, path: &StorePath) -> Result<(), CacheError>;
}

/// Per-commit artifact cache. Holds the only lock a fetch ever takes: an
/// exclusive OS file lock per commit, so concurrent fetches of the same
/// commit produce exactly one export between them.
pub struct ArtifactCache {
    dir: PathBuf,
    pointers: Box<dyn PointerMap>,
}

pub enum CacheLookup<'a> {
    /// A valid artifact already exists. The lock has been released.
    Hit(StorePath),
    /// No usable pointer. The slot keeps the lock until published or dropped.
    Miss(CacheSlot<'a>),
}

/// Write side of a cache miss. While a slot is alive no other fetch of this
/// commit can get past [`ArtifactCache::lookup_or_reserve`].
pub struct CacheSlot<'a> {
    cache: &'a ArtifactCache,
    commit: CommitId,
    _lock: FileLock,
}

impl ArtifactCache {
    /// Cache with on-disk symlink pointers next to the lock files, one pair
    /// per commit.
    pub fn new(dir: PathBuf) -> ArtifactCache {
        let pointers = Box::new(SymlinkPointerMap::new(dir.clone()));
        ArtifactCache { dir, pointers }
    }

    pub fn with_pointer_map(dir: PathBuf, pointers: Box<dyn PointerMap>) -> ArtifactCache {
        ArtifactCache { dir, pointers }
    }

    /// Takes the commit's lock, then either returns the still-valid cached
    /// artifact or hands back the locked slot for the caller to fill. A
    /// temporary GC root is registered before the validity check so the
    /// store cannot reclaim the artifact in between.
    pub fn lookup_or_reserve(
        &self,
        commit: &CommitId,
        store: &dyn ArtifactStore,
    ) -> Result<CacheLookup<'_>, CacheError> {
        fs::create_dir_all(&self.dir)?;
        let lock = FileLock::acquire(&self.lock_path(commit))?;

        if let Some(path) = self.pointers.get(commit)? {
            store.add_temp_root(&path)?;
            if store.is_valid_path(&path)? {
                debug!("reusing cached artifact {} for commit {}", path, commit);
                return Ok(CacheLookup::Hit(path));
            }
            debug!("cached artifact {} is gone, re-exporting {}", path, commit);
        }

        Ok(CacheLookup::Miss(CacheSlot {
            cache: self,
            commit: commit.clone(),
            _lock: lock,
        }))
    }

    fn lock_path(&self, commit: &CommitId) -> PathBuf {
        self.dir.join(format!("{}.link.lock", commit))
    }
}

impl CacheSlot<'_> {
    /// Atomically points the commit at `path`, then releases the lock.
    pub fn publish(self, path: &StorePath) -> Result<(), CacheError> {
        self.cache.pointers.put(&self.commit, path)
    }
}
