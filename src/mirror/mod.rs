mod git;

pub use git::GitMirror;

use thiserror::Error;

use crate::{
    git::VcsError,
    model::{CommitId, LocalRef, Locator, Revision},
};

#[derive(Error, Debug)]
pub enum MirrorError {
    #[error("mirror location {location} is not a directory")]
    BadLocation { location: String },
    #[error("failed to initialize mirror repository at {location}: {source}")]
    Init { location: String, source: VcsError },
    #[error("failed to fetch '{revision}' from '{locator}': {source}")]
    Fetch {
        locator: Locator,
        revision: Revision,
        source: VcsError,
    },
    #[error("fetch did not produce local ref '{local_ref}'")]
    RefMissing { local_ref: LocalRef },
    #[error("local ref '{local_ref}' does not name a commit: {contents:?}")]
    BadRef { local_ref: LocalRef, contents: String },
    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
}

/// The persistent local mirror shared by every fetch. Each (locator, revision)
/// pair gets its own ref slot, so concurrent fetches never collide on refs;
/// two fetches of the same pair race last-writer-wins, which is harmless
/// because each re-reads the slot after its own fetch.
pub trait MirrorStore: Send + Sync {
    /// Creates and initializes the mirror repository if absent. Idempotent.
    fn ensure(&self) -> Result<(), MirrorError>;

    /// Force-fetches `revision` from `locator` into the given ref slot,
    /// overwriting whatever the slot held before.
    fn sync_ref(
        &self,
        locator: &Locator,
        revision: &Revision,
        local_ref: &LocalRef,
    ) -> Result<(), MirrorError>;

    /// Reads the commit a slot points at after a successful sync.
    fn read_ref(&self, local_ref: &LocalRef) -> Result<CommitId, MirrorError>;
}
