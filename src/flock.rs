use std::{fs::File, path::Path};

use fs4::fs_std::FileExt;
use log::debug;
use thiserror::Error;

/// Exclusive advisory lock on a file. Held for the lifetime of the value;
/// dropping it releases the OS lock. The lock file itself is left in place,
/// removing a file another process may be blocked on is racy.
pub struct FileLock {
    _file: File,
}

#[derive(Error, Debug)]
#[error(transparent)]
pub struct Error(#[from] std::io::Error);

impl FileLock {
    /// Blocks until the lock is free. No timeout: liveness depends on every
    /// holder releasing, which the drop guard guarantees short of the process
    /// being killed.
    pub fn acquire(path: &Path) -> Result<Self, Error> {
        let file = File::create(path)?;
        debug!("waiting for lock on '{}'...", path.display());
        file.lock_exclusive()?;
        Ok(Self { _file: file })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_creates_the_lock_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("some.lock");
        let lock = FileLock::acquire(&path).unwrap();
        assert!(path.exists());
        drop(lock);
        assert!(path.exists());
    }

    #[test]
    fn reacquire_after_release() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("some.lock");
        drop(FileLock::acquire(&path).unwrap());
        drop(FileLock::acquire(&path).unwrap());
    }

    #[test]
    fn lock_excludes_other_holders() {
        use std::sync::{
            atomic::{AtomicBool, Ordering},
            Arc,
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("some.lock");
        let held = Arc::new(AtomicBool::new(true));

        let lock = FileLock::acquire(&path).unwrap();
        let handle = {
            let path = path.clone();
            let held = Arc::clone(&held);
            std::thread::spawn(move || {
                let _lock = FileLock::acquire(&path).unwrap();
                // Must not get here until the first holder released.
                assert!(!held.load(Ordering::SeqCst));
            })
        };

        std::thread::sleep(std::time::Duration::from_millis(100));
        held.store(false, Ordering::SeqCst);
        drop(lock);
        handle.join().unwrap();
    }
}
