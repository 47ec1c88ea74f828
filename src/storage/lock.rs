//! Advisory file locks shared between processes
//!
//! Every `rota` invocation builds its own [`DocumentStore`](super::DocumentStore),
//! so the in-process mutex alone cannot keep two CLI runs from interleaving
//! their read-modify-write cycles. File-backed units therefore also take an
//! OS lock on a sibling `{unit_id}.lock` file: shared for reads, exclusive
//! for writes.

use fs4::fs_std::FileExt;
use std::fs::{File, OpenOptions};
use std::path::PathBuf;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

/// A held unit lock, released when dropped
#[derive(Debug, Default)]
pub struct UnitLock {
    file: Option<File>,
}

impl UnitLock {
    /// A guard that holds nothing, for backends confined to one process
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    /// Wait for an OS lock on `path`, creating the file when missing
    pub async fn acquire(path: PathBuf, mode: LockMode) -> Result<Self> {
        tokio::task::spawn_blocking(move || {
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(&path)
                .map_err(|e| Error::storage(format!("open {}", path.display()), e))?;

            let locked = match mode {
                LockMode::Shared => FileExt::lock_shared(&file),
                LockMode::Exclusive => FileExt::lock_exclusive(&file),
            };
            locked.map_err(|e| Error::storage(format!("lock {}", path.display()), e))?;

            tracing::trace!(path = %path.display(), ?mode, "Unit lock acquired");
            Ok(Self { file: Some(file) })
        })
        .await
        .map_err(|e| Error::storage("lock unit", e))?
    }
}

impl Drop for UnitLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            // Closing the handle releases the lock as well
            if let Err(e) = FileExt::unlock(&file) {
                tracing::warn!(error = %e, "Failed to release unit lock");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_shared_locks_coexist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("u.lock");

        let first = UnitLock::acquire(path.clone(), LockMode::Shared).await.unwrap();
        let second = UnitLock::acquire(path.clone(), LockMode::Shared).await.unwrap();
        assert!(first.is_held() && second.is_held());
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_exclusive_lock_waits_for_release() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("u.lock");

        let held = UnitLock::acquire(path.clone(), LockMode::Exclusive).await.unwrap();
        let waiter = tokio::spawn(UnitLock::acquire(path, LockMode::Exclusive));

        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        drop(held);
        assert!(waiter.await.unwrap().unwrap().is_held());
    }

    #[test]
    fn test_none_holds_nothing() {
        assert!(!UnitLock::none().is_held());
    }
}
