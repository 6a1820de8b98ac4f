use std::{
    path::Path,
    process::{Command, Output},
};

use log::trace;
use thiserror::Error;

use crate::model::{CommitId, LocalRef, Locator, Revision};

#[derive(Error, Debug)]
pub enum VcsError {
    #[error("failed to run 'git': {source}")]
    Spawn { source: std::io::Error },
    #[error("{command} failed with {status}: {stderr}")]
    Failed {
        command: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
}

/// External version-control client. Kept narrow so the core logic never
/// depends on subprocess mechanics and tests can substitute a fake.
pub trait VcsClient: Send + Sync {
    /// `git init --bare <dir>`
    fn init_bare(&self, dir: &Path) -> Result<(), VcsError>;

    /// `git -C <mirror> fetch --force <locator> <revision>:refs/heads/<localRef>`
    ///
    /// The destination is written fully qualified so the ref lands under
    /// `refs/heads/` regardless of client version.
    fn fetch_ref(
        &self,
        mirror: &Path,
        locator: &Locator,
        revision: &Revision,
        local_ref: &LocalRef,
    ) -> Result<(), VcsError>;

    /// `git -C <mirror> archive <commit>`, returning the archive stream
    /// printed on stdout.
    fn archive(&self, mirror: &Path, commit: &CommitId) -> Result<Vec<u8>, VcsError>;
}

/// Runs the real `git` binary found on PATH.
#[derive(Default)]
pub struct GitCli;

impl GitCli {
    fn git(&self) -> Command {
        Command::new("git")
    }

    fn run(&self, command: &mut Command) -> Result<Output, VcsError> {
        trace!("running {:?}", command);
        let output = command
            .output()
            .map_err(|source| VcsError::Spawn { source })?;
        if output.status.success() {
            Ok(output)
        } else {
            Err(VcsError::Failed {
                command: format!("{:?}", command),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_owned(),
            })
        }
    }
}

impl VcsClient for GitCli {
    fn init_bare(&self, dir: &Path) -> Result<(), VcsError> {
        let mut command = self.git();
        command.args(["init", "--bare"]).arg(dir);
        self.run(&mut command)?;
        Ok(())
    }

    fn fetch_ref(
        &self,
        mirror: &Path,
        locator: &Locator,
        revision: &Revision,
        local_ref: &LocalRef,
    ) -> Result<(), VcsError> {
        let mut command = self.git();
        command
            .arg("-C")
            .arg(mirror)
            .args(["fetch", "--force", locator.as_str()])
            .arg(format!("{}:refs/heads/{}", revision, local_ref));
        self.run(&mut command)?;
        Ok(())
    }

    fn archive(&self, mirror: &Path, commit: &CommitId) -> Result<Vec<u8>, VcsError> {
        let mut command = self.git();
        command
            .arg("-C")
            .arg(mirror)
            .arg("archive")
            .arg(commit.as_str());
        Ok(self.run(&mut command)?.stdout)
    }
}
