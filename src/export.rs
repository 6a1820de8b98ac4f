use std::{
    io,
    path::{Path, PathBuf},
};

use log::info;
use thiserror::Error;

use crate::{
    git::{VcsClient, VcsError},
    model::{CommitId, StorePath},
    store::{ArtifactStore, StoreError},
};

/// Logical name every exported tree is imported under.
const IMPORT_NAME: &str = "git-export";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("failed to archive commit {commit}: {source}")]
    Archive { commit: CommitId, source: VcsError },
    #[error("failed to extract the tree of commit {commit}: {source}")]
    Extract { commit: CommitId, source: io::Error },
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
}

/// Materializes a commit's tree as an immutable artifact. Reads the mirror
/// and the store only; in particular it never touches the per-commit cache
/// lock its caller is already holding.
pub trait TreeExporter: Send + Sync {
    fn export(
        &self,
        commit: &CommitId,
        store: &dyn ArtifactStore,
    ) -> Result<StorePath, ExportError>;
}

/// Unpacks an archive byte stream into a directory.
pub trait ArchiveExtractor: Send + Sync {
    fn extract(&self, archive: &[u8], dest: &Path) -> Result<(), io::Error>;
}

/// `git archive` emits a plain uncompressed tar stream; unpack it in
/// process.
#[derive(Default)]
pub struct TarExtractor;

impl ArchiveExtractor for TarExtractor {
    fn extract(&self, archive: &[u8], dest: &Path) -> Result<(), io::Error> {
        tar::Archive::new(archive).unpack(dest)
    }
}

/// Production exporter: archive the commit out of the mirror, unpack into a
/// scratch directory, import the tree.
pub struct GitExporter {
    mirror_dir: PathBuf,
    git: Box<dyn VcsClient>,
    extractor: Box<dyn ArchiveExtractor>,
}

impl GitExporter {
    pub fn new(mirror_dir: PathBuf, git: Box<dyn VcsClient>) -> GitExporter {
        GitExporter {
            mirror_dir,
            git,
            extractor: Box::new(TarExtractor),
        }
    }
}

impl TreeExporter for GitExporter {
    fn export(
        &self,
        commit: &CommitId,
        store: &dyn ArtifactStore,
    ) -> Result<StorePath, ExportError> {
        info!("exporting tree of commit {}", commit);
        let archive = self
            .git
            .archive(&self.mirror_dir, commit)
            .map_err(|source| ExportError::Archive {
                commit: commit.clone(),
                source,
            })?;

        // Dropped on every exit path, early failures included.
        let scratch = tempfile::tempdir()?;
        self.extractor
            .extract(&archive, scratch.path())
            .map_err(|source| ExportError::Extract {
                commit: commit.clone(),
                source,
            })?;

        Ok(store.import_tree(IMPORT_NAME, scratch.path())?)
    }
}
