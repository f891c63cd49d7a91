// Host-wide run lock

use crate::error::UnitwatchError;
use nix::errno::Errno;
use nix::fcntl::{Flock, FlockArg};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

/// Held for the duration of a run; the flock is released when this is dropped
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
    _file: Flock<File>,
}

impl RunLock {
    /// Try to take the lock without blocking.
    ///
    /// Returns `Ok(None)` when another run holds it. Any other failure to open
    /// or lock the file is an error.
    pub fn try_acquire(path: &Path) -> Result<Option<Self>, UnitwatchError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| UnitwatchError::Lock {
                path: path.to_path_buf(),
                source,
            })?;
        }

        // Do not truncate before holding the lock: the holder's PID lives in there
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .mode(0o644)
            .open(path)
            .map_err(|source| UnitwatchError::Lock {
                path: path.to_path_buf(),
                source,
            })?;

        #[allow(deprecated)]
        let mut locked = match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
            Ok(locked) => locked,
            Err((_file, Errno::EWOULDBLOCK)) => return Ok(None),
            Err((_file, errno)) => {
                return Err(UnitwatchError::Lock {
                    path: path.to_path_buf(),
                    source: std::io::Error::from(errno),
                })
            }
        };

        // Best effort: the PID is for operators, not for correctness
        if locked.set_len(0).is_ok() {
            let _ = writeln!(locked, "{}", std::process::id());
        }

        Ok(Some(Self {
            path: path.to_path_buf(),
            _file: locked,
        }))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
