//! Host-wide exclusive access to the state file.
//!
//! The registry only needs "hold this named thing exclusively until the guard
//! drops", so that is the whole interface ([`ExclusiveAccess`]). On Unix the
//! adapter is an advisory `flock(LOCK_EX)` on a zero-length sibling file: the
//! kernel releases it when the descriptor closes, which covers crashes while
//! holding the lock. Other platforms fall back to an atomically created marker
//! file. The operating system does not remove that marker if its holder
//! crashes, so a marker older than `ABANDONED_MARKER_AGE` is treated as
//! abandoned and taken over. Only unix gets the crash guarantee.
//!
//! Acquisition blocks until the lock is free. There is no timeout.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::error::{Result, TapError};

/// Scoped exclusive access to a named resource.
pub trait ExclusiveAccess {
    type Guard;

    /// Blocks until access is granted. Access ends when the guard drops.
    fn acquire(&self) -> Result<Self::Guard>;
}

/// A held lock only spans one read-modify-write, far shorter than this.
#[cfg(not(unix))]
pub const ABANDONED_MARKER_AGE: std::time::Duration = std::time::Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct FileLock {
    path: PathBuf,
}

impl FileLock {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileLock { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn unavailable(&self, source: std::io::Error) -> TapError {
        TapError::LockUnavailable {
            path: self.path.clone(),
            source,
        }
    }
}

#[derive(Debug)]
pub struct FileLockGuard {
    file: File,
    #[cfg(not(unix))]
    marker: PathBuf,
}

#[cfg(unix)]
impl ExclusiveAccess for FileLock {
    type Guard = FileLockGuard;

    fn acquire(&self) -> Result<FileLockGuard> {
        use std::os::unix::io::AsRawFd;

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.path)
            .map_err(|e| self.unavailable(e))?;

        loop {
            // SAFETY: the descriptor is owned by `file`, which outlives the call.
            let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX) };
            if rc == 0 {
                break;
            }
            let err = std::io::Error::last_os_error();
            if err.kind() != std::io::ErrorKind::Interrupted {
                return Err(self.unavailable(err));
            }
        }

        tracing::debug!(path = %self.path.display(), "State lock acquired");
        Ok(FileLockGuard { file })
    }
}

#[cfg(unix)]
impl Drop for FileLockGuard {
    fn drop(&mut self) {
        use std::os::unix::io::AsRawFd;

        // SAFETY: the descriptor is still owned by `self.file`.
        unsafe {
            libc::flock(self.file.as_raw_fd(), libc::LOCK_UN);
        }
        tracing::debug!("State lock released");
    }
}

#[cfg(not(unix))]
impl ExclusiveAccess for FileLock {
    type Guard = FileLockGuard;

    fn acquire(&self) -> Result<FileLockGuard> {
        use std::io::ErrorKind;
        use std::time::Duration;

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.path)
            .map_err(|e| self.unavailable(e))?;

        let mut marker = self.path.clone().into_os_string();
        marker.push(".held");
        let marker = PathBuf::from(marker);

        loop {
            match OpenOptions::new().write(true).create_new(true).open(&marker) {
                Ok(_) => break,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if marker_abandoned(&marker) {
                        tracing::warn!(marker = %marker.display(), "Removing abandoned state lock marker");
                        let _ = std::fs::remove_file(&marker);
                        continue;
                    }
                    std::thread::sleep(Duration::from_millis(25));
                }
                Err(e) => return Err(self.unavailable(e)),
            }
        }

        tracing::debug!(path = %self.path.display(), "State lock acquired");
        Ok(FileLockGuard { file, marker })
    }
}

#[cfg(not(unix))]
fn marker_abandoned(marker: &Path) -> bool {
    std::fs::metadata(marker)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| modified.elapsed().ok())
        .is_some_and(|age| age > ABANDONED_MARKER_AGE)
}

#[cfg(not(unix))]
impl Drop for FileLockGuard {
    fn drop(&mut self) {
        let _ = &self.file;
        let _ = std::fs::remove_file(&self.marker);
        tracing::debug!("State lock released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn acquire_creates_zero_length_lock_file() {
        let temp = tempdir().unwrap();
        let lock = FileLock::new(temp.path().join("state.lock"));
        let guard = lock.acquire().unwrap();
        let len = std::fs::metadata(lock.path()).unwrap().len();
        assert_eq!(len, 0);
        drop(guard);
    }

    #[test]
    fn lock_can_be_reacquired_after_release() {
        let temp = tempdir().unwrap();
        let lock = FileLock::new(temp.path().join("state.lock"));
        drop(lock.acquire().unwrap());
        drop(lock.acquire().unwrap());
    }

    #[test]
    fn second_holder_waits_for_first() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("state.lock");
        let released = Arc::new(AtomicBool::new(false));

        let guard = FileLock::new(&path).acquire().unwrap();

        let waiter = {
            let path = path.clone();
            let released = Arc::clone(&released);
            thread::spawn(move || {
                let _guard = FileLock::new(path).acquire().unwrap();
                released.load(Ordering::SeqCst)
            })
        };

        thread::sleep(Duration::from_millis(100));
        released.store(true, Ordering::SeqCst);
        drop(guard);

        assert!(waiter.join().unwrap(), "waiter acquired before release");
    }

    #[test]
    fn missing_directory_is_lock_unavailable() {
        let temp = tempdir().unwrap();
        let lock = FileLock::new(temp.path().join("missing").join("state.lock"));
        let err = lock.acquire().unwrap_err();
        assert!(matches!(err, TapError::LockUnavailable { .. }));
    }

    #[cfg(not(unix))]
    #[test]
    fn abandoned_marker_is_taken_over() {
        use std::time::SystemTime;

        let temp = tempdir().unwrap();
        let path = temp.path().join("state.lock");
        let marker = temp.path().join("state.lock.held");
        let leftover = std::fs::File::create(&marker).unwrap();
        leftover
            .set_modified(SystemTime::now() - ABANDONED_MARKER_AGE - Duration::from_secs(60))
            .unwrap();
        drop(leftover);

        let guard = FileLock::new(&path).acquire().unwrap();
        drop(guard);
        assert!(!marker.exists());
    }
}
