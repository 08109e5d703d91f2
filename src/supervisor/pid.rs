// PID file access for the managed server

use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// The managed server's PID file
///
/// Reads never fail: anything other than a positive integer is treated as
/// "no process" and reported as `0`.
#[derive(Debug, Clone)]
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Read the master PID, `0` when missing or unparseable
    pub fn read_pid(&self) -> i32 {
        match fs::read_to_string(&self.path) {
            Ok(content) => content
                .trim()
                .parse::<i32>()
                .ok()
                .filter(|pid| *pid > 0)
                .unwrap_or(0),
            Err(_) => 0,
        }
    }

    /// Write `pid` as decimal text
    pub fn write_pid(&self, pid: u32) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, pid.to_string())?;
        Ok(())
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Remove the PID file; absent is not an error
    pub fn remove(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
