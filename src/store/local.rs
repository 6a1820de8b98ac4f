use std::{
    fs,
    io::{self, Write},
    os::unix::fs::{symlink, PermissionsExt},
    path::{Path, PathBuf},
};

use log::{debug, info};
use sha2::{Digest, Sha256};

use super::{ArtifactStore, StoreError};
use crate::model::StorePath;

const TEMP_ROOTS_DIR: &str = ".temp-roots";

/// Minimal on-disk artifact store: one directory per artifact, named by a
/// truncated hash of its contents. Ships so the crate works standalone; an
/// embedding system with a real store injects its own [`ArtifactStore`].
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// Does not touch the filesystem; the root is created on first use.
    pub fn new(root: PathBuf) -> LocalStore {
        LocalStore { root }
    }

    fn ensure_root(&self) -> Result<(), StoreError> {
        if self.root.exists() && !self.root.is_dir() {
            return Err(StoreError::NotADirectory {
                location: self.root.display().to_string(),
            });
        }
        fs::create_dir_all(&self.root)?;
        Ok(())
    }
}

impl ArtifactStore for LocalStore {
    fn add_temp_root(&self, path: &StorePath) -> Result<(), StoreError> {
        self.ensure_root()?;
        let roots = self.root.join(TEMP_ROOTS_DIR);
        fs::create_dir_all(&roots)?;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(roots.join(std::process::id().to_string()))?;
        writeln!(file, "{}", path)?;
        Ok(())
    }

    fn is_valid_path(&self, path: &StorePath) -> Result<bool, StoreError> {
        let path = path.as_path();
        Ok(path.parent() == Some(self.root.as_path()) && path.is_dir())
    }

    fn import_tree(&self, name: &str, tree: &Path) -> Result<StorePath, StoreError> {
        self.ensure_root()?;
        let hash = hash_tree(tree)?;
        let dest = self.root.join(format!("{}-{}", &hash[..32], name));
        if dest.is_dir() {
            debug!("store already holds {}", dest.display());
            return Ok(StorePath::new(dest));
        }

        let staging = tempfile::Builder::new()
            .prefix(".staging-")
            .tempdir_in(&self.root)?;
        let staged = staging.path().join(name);
        copy_tree(tree, &staged)?;
        match fs::rename(&staged, &dest) {
            Ok(()) => info!("added {} to the store", dest.display()),
            // Lost an import race; the winner's tree is byte-identical.
            Err(_) if dest.is_dir() => debug!("store already holds {}", dest.display()),
            Err(error) => return Err(error.into()),
        }
        Ok(StorePath::new(dest))
    }
}

/// Deterministic content hash of a tree: entries visited in sorted order,
/// mixing relative path, entry kind (with the executable bit), and contents
/// or link target.
fn hash_tree(tree: &Path) -> io::Result<String> {
    let mut hasher = Sha256::new();
    hash_entries(&mut hasher, tree, Path::new(""))?;
    Ok(hex::encode(hasher.finalize()))
}

fn hash_entries(hasher: &mut Sha256, root: &Path, rel: &Path) -> io::Result<()> {
    let mut entries = fs::read_dir(root.join(rel))?.collect::<io::Result<Vec<_>>>()?;
    entries.sort_by_key(|entry| entry.file_name());
    for entry in entries {
        let rel = rel.join(entry.file_name());
        let file_type = entry.file_type()?;
        hasher.update(rel.to_string_lossy().as_bytes());
        if file_type.is_dir() {
            hasher.update(b"\0dir\0");
            hash_entries(hasher, root, &rel)?;
        } else if file_type.is_symlink() {
            hasher.update(b"\0link\0");
            hasher.update(fs::read_link(entry.path())?.to_string_lossy().as_bytes());
        } else {
            let executable = entry.metadata()?.permissions().mode() & 0o100 != 0;
            let kind: &[u8] = if executable { b"\0exec\0" } else { b"\0file\0" };
            hasher.update(kind);
            let contents = fs::read(entry.path())?;
            hasher.update((contents.len() as u64).to_le_bytes());
            hasher.update(&contents);
        }
    }
    Ok(())
}

fn copy_tree(src: &Path, dest: &Path) -> io::Result<()> {
    fs::create_dir_all(dest)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let target = dest.join(entry.file_name());
        if file_type.is_dir() {
            copy_tree(&entry.path(), &target)?;
        } else if file_type.is_symlink() {
            symlink(fs::read_link(entry.path())?, &target)?;
        } else {
            // fs::copy carries permissions over, the executable bit included.
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
