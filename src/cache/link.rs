use std::{fs, io, os::unix::fs::symlink, path::PathBuf};

use log::trace;

use super::{CacheError, PointerMap};
use crate::model::{CommitId, StorePath};

/// On-disk pointer map: one symlink per commit at `<dir>/<commit>.link`.
/// Replacement links under a scratch name first and renames over the old
/// pointer, so a crash mid-write leaves either the previous target or the
/// new one, never a dangling pointer.
pub struct SymlinkPointerMap {
    dir: PathBuf,
}

impl SymlinkPointerMap {
    pub fn new(dir: PathBuf) -> SymlinkPointerMap {
        SymlinkPointerMap { dir }
    }

    fn pointer_path(&self, commit: &CommitId) -> PathBuf {
        self.dir.join(format!("{}.link", commit))
    }
}

impl PointerMap for SymlinkPointerMap {
    fn get(&self, commit: &CommitId) -> Result<Option<StorePath>, CacheError> {
        match fs::read_link(self.pointer_path(commit)) {
            Ok(target) => Ok(Some(StorePath::new(target))),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    fn put(&self, commit: &CommitId, path: &StorePath) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir)?;
        let pointer = self.pointer_path(commit);
        // Scratch names count up past leftovers of interrupted writers.
        let mut attempt = 0u32;
        loop {
            let scratch = self.dir.join(format!(".{}_{}.link", attempt, commit));
            match symlink(path.as_path(), &scratch) {
                Ok(()) => {
                    fs::rename(&scratch, &pointer)?;
                    trace!("pointed {} at {}", pointer.display(), path);
                    return Ok(());
                }
                Err(error) if error.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
                Err(error) => return Err(error.into()),
            }
        }
    }
}
