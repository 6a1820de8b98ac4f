use std::{fs, io, path::PathBuf};

use log::{debug, trace};

use super::{MirrorError, MirrorStore};
use crate::{
    git::VcsClient,
    model::{CommitId, LocalRef, Locator, Revision},
};

/// Bare repository at a fixed location, written through an injected
/// version-control client.
pub struct GitMirror {
    dir: PathBuf,
    git: Box<dyn VcsClient>,
}

impl GitMirror {
    /// Does not touch the filesystem; the mirror is created lazily by
    /// [`MirrorStore::ensure`].
    pub fn new(dir: PathBuf, git: Box<dyn VcsClient>) -> GitMirror {
        GitMirror { dir, git }
    }

    fn ref_path(&self, local_ref: &LocalRef) -> PathBuf {
        self.dir.join("refs/heads").join(local_ref.as_str())
    }
}

impl MirrorStore for GitMirror {
    fn ensure(&self) -> Result<(), MirrorError> {
        if self.dir.exists() && !self.dir.is_dir() {
            return Err(MirrorError::BadLocation {
                location: self.dir.display().to_string(),
            });
        }
        // A directory without HEAD counts as uninitialized, so a crash
        // between create and init is repaired on the next run.
        if !self.dir.join("HEAD").exists() {
            fs::create_dir_all(&self.dir)?;
            trace!("initializing bare repository at {}", self.dir.display());
            self.git
                .init_bare(&self.dir)
                .map_err(|source| MirrorError::Init {
                    location: self.dir.display().to_string(),
                    source,
                })?;
        }
        Ok(())
    }

    fn sync_ref(
        &self,
        locator: &Locator,
        revision: &Revision,
        local_ref: &LocalRef,
    ) -> Result<(), MirrorError> {
        debug!("fetching '{}' from '{}' into {}", revision, locator, local_ref);
        self.git
            .fetch_ref(&self.dir, locator, revision, local_ref)
            .map_err(|source| MirrorError::Fetch {
                locator: locator.clone(),
                revision: revision.clone(),
                source,
            })
    }

    fn read_ref(&self, local_ref: &LocalRef) -> Result<CommitId, MirrorError> {
        let path = self.ref_path(local_ref);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                return Err(MirrorError::RefMissing {
                    local_ref: local_ref.clone(),
                })
            }
            Err(error) => return Err(error.into()),
        };
        let contents = contents.trim_end();
        contents.parse().map_err(|_| MirrorError::BadRef {
            local_ref: local_ref.clone(),
            contents: contents.to_owned(),
        })
    }
}
