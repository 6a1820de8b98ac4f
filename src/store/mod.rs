mod local;

pub use local::LocalStore;

use std::path::Path;

use thiserror::Error;

use crate::model::StorePath;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store location {location} is not a directory")]
    NotADirectory { location: String },
    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
}

/// Content-addressed artifact store. The fetch pipeline consumes exactly
/// three operations; the hashing scheme, deduplication and garbage collection
/// stay on the store's side of the line.
pub trait ArtifactStore: Send + Sync {
    /// Registers `path` as a temporary GC root so a concurrent collection
    /// cannot reclaim it between the validity check and use.
    fn add_temp_root(&self, path: &StorePath) -> Result<(), StoreError>;

    /// Whether `path` still names a live artifact in this store.
    fn is_valid_path(&self, path: &StorePath) -> Result<bool, StoreError>;

    /// Imports the tree rooted at `tree` under a logical name and returns the
    /// immutable artifact path. Importing a byte-identical tree twice yields
    /// the same path.
    fn import_tree(&self, name: &str, tree: &Path) -> Result<StorePath, StoreError>;
}
