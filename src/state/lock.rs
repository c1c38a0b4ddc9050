//! Cross-process lock over the state directory
//!
//! Every write to the slots happens while holding this lock, and the holder
//! reloads the slots after taking it. Two CLI invocations (or two factories
//! in one process) therefore never merge into a stale snapshot.
//!
//! The lock is a `.lock` file created with `create_new`, holding the owner's
//! pid and acquisition time. A file older than [`STALE_AFTER_MINUTES`] is
//! treated as left behind by a crashed process and reclaimed.

use crate::error::WorkflowError;
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Lock file name inside the state directory
pub const LOCK_FILE: &str = ".lock";

/// Age in minutes after which a lock file is considered abandoned
pub const STALE_AFTER_MINUTES: i64 = 15;

/// Held lock; the file is removed on drop
#[derive(Debug)]
pub struct StateLock {
    path: PathBuf,
}

impl StateLock {
    /// Take the lock, or fail with [`WorkflowError::Busy`] if another holder has it
    pub fn acquire(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        let path = dir.join(LOCK_FILE);

        match Self::create(&path)? {
            Some(lock) => Ok(lock),
            None if Self::is_stale(&path) => {
                warn!(path = %path.display(), "reclaiming abandoned state lock");
                match fs::remove_file(&path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => {
                        return Err(e)
                            .with_context(|| format!("Failed to remove {}", path.display()))
                    }
                }
                Self::create(&path)?.ok_or_else(|| WorkflowError::Busy.into())
            }
            None => Err(WorkflowError::Busy.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn create(path: &Path) -> Result<Option<Self>> {
        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to create {}", path.display()))
            }
        };
        let lock = Self {
            path: path.to_path_buf(),
        };
        writeln!(file, "{} {}", std::process::id(), Utc::now().to_rfc3339())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        debug!(path = %path.display(), "state lock acquired");
        Ok(Some(lock))
    }

    /// Older than [`STALE_AFTER_MINUTES`] or carrying a garbled stamp.
    /// A file with no stamp yet is still being written and is not stale.
    fn is_stale(path: &Path) -> bool {
        let Ok(content) = fs::read_to_string(path) else {
            return false;
        };
        let Some(stamp) = content.split_whitespace().nth(1) else {
            return false;
        };
        match DateTime::parse_from_rfc3339(stamp) {
            Ok(at) => {
                Utc::now() - at.with_timezone(&Utc) > Duration::minutes(STALE_AFTER_MINUTES)
            }
            Err(_) => true,
        }
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to release state lock");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn is_busy(err: &anyhow::Error) -> bool {
        matches!(err.downcast_ref::<WorkflowError>(), Some(WorkflowError::Busy))
    }

    #[test]
    fn test_second_holder_is_busy() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("state");

        let lock = StateLock::acquire(&dir).unwrap();
        assert!(lock.path().exists());
        let err = StateLock::acquire(&dir).unwrap_err();
        assert!(is_busy(&err));

        drop(lock);
        assert!(!dir.join(LOCK_FILE).exists());
        StateLock::acquire(&dir).unwrap();
    }

    #[test]
    fn test_stale_lock_is_reclaimed() {
        let temp = TempDir::new().unwrap();
        let old = Utc::now() - Duration::minutes(STALE_AFTER_MINUTES + 1);
        fs::write(temp.path().join(LOCK_FILE), format!("4242 {}\n", old.to_rfc3339())).unwrap();

        let lock = StateLock::acquire(temp.path()).unwrap();
        let content = fs::read_to_string(lock.path()).unwrap();
        assert!(content.starts_with(&std::process::id().to_string()));
    }

    #[test]
    fn test_fresh_foreign_lock_blocks() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(LOCK_FILE),
            format!("4242 {}\n", Utc::now().to_rfc3339()),
        )
        .unwrap();

        let err = StateLock::acquire(temp.path()).unwrap_err();
        assert!(is_busy(&err));
        assert!(temp.path().join(LOCK_FILE).exists());
    }

    #[test]
    fn test_garbled_stamp_is_reclaimed() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(LOCK_FILE), "4242 yesterday\n").unwrap();
        assert!(StateLock::acquire(temp.path()).is_ok());
    }
}
