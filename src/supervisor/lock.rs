// Advisory lock serializing concurrent serverctl invocations

use crate::error::{Result, ServerCtlError};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::Path;
use tracing::debug;

/// Exclusive lock on a sidecar file, released on drop
#[derive(Debug)]
pub struct InvocationLock {
    file: File,
}

impl InvocationLock {
    /// Take the lock without blocking; `LockHeld` if another invocation has it
    pub fn acquire<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        file.try_lock_exclusive().map_err(|e| {
            debug!(path = %path.display(), error = %e, "lock busy");
            ServerCtlError::LockHeld(path.clone())
        })?;

        debug!(path = %path.display(), "lock acquired");
        Ok(Self { file })
    }
}

impl Drop for InvocationLock {
    fn drop(&mut self) {
        // The lock file itself stays; removing it would race other lockers
        let _ = self.file.unlock();
    }
}
