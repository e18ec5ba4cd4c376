//! Pid file management for the daemon process.

use std::fs;
use std::path::{Path, PathBuf};

use nix::sys::signal::kill;
use nix::unistd::Pid;

/// Pid file with liveness probing; stale files are cleaned up on check.
#[derive(Debug, Clone)]
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record the current process id.
    pub fn write(&self) -> Result<(), String> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|err| format!("create {}: {err}", parent.display()))?;
        }
        fs::write(&self.path, std::process::id().to_string())
            .map_err(|err| format!("write {}: {err}", self.path.display()))
    }

    pub fn read(&self) -> Option<i32> {
        let raw = fs::read_to_string(&self.path).ok()?;
        raw.trim().parse().ok()
    }

    pub fn remove(&self) {
        let _ = fs::remove_file(&self.path);
    }

    /// Whether the recorded process is alive. A dead or unparsable pid
    /// removes the stale file.
    pub fn is_running(&self) -> bool {
        let Some(pid) = self.read() else {
            if self.path.exists() {
                self.remove();
            }
            return false;
        };
        if kill(Pid::from_raw(pid), None).is_ok() {
            true
        } else {
            self.remove();
            false
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
