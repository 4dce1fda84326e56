//! Cross-process write lock.
//!
//! Writers hold an exclusive advisory lock on the single byte at
//! [`LOCK_BYTE_OFFSET`] for the whole session. Readers never lock.
//! Acquisition retries with linear backoff and gives up with
//! [`Error::LockTimeout`].
//!
//! On Linux the lock is an open-file-description record lock, so two
//! handles conflict even inside one process; it also conflicts with
//! classic `fcntl` range locks held by other processes. Other Unix systems
//! use classic `F_SETLK`. Elsewhere the whole file is locked through `fs2`.

use std::fs::File;
use std::thread;
use std::time::Duration;

use tracing::{trace, warn};

use crate::common::{Error, Result};
#[cfg(unix)]
use crate::common::config::LOCK_BYTE_OFFSET;

/// Take the exclusive lock on `file`.
///
/// Makes up to `attempts` tries. After failed try `n` (1-based) it sleeps
/// `n × delay` before trying again. Only contention is retried; any other
/// locking failure is returned as [`Error::Io`] immediately.
pub(crate) fn acquire(file: &File, attempts: u32, delay: Duration) -> Result<()> {
    let attempts = attempts.max(1);

    for attempt in 1..=attempts {
        if sys::try_lock(file)? {
            trace!(attempt, "write lock acquired");
            return Ok(());
        }
        warn!(attempt, attempts, "store file locked by another writer");
        if attempt < attempts {
            thread::sleep(delay * attempt);
        }
    }

    Err(Error::LockTimeout { attempts })
}

/// Release the lock taken by [`acquire`].
pub(crate) fn release(file: &File) -> Result<()> {
    sys::unlock(file)?;
    trace!("write lock released");
    Ok(())
}

// ============================================================================
// Platform locking
// ============================================================================

#[cfg(unix)]
mod sys {
    use std::fs::File;
    use std::io;
    use std::os::unix::io::AsRawFd;

    use super::LOCK_BYTE_OFFSET;

    #[cfg(target_os = "linux")]
    const SET_LOCK: libc::c_int = libc::F_OFD_SETLK;
    #[cfg(not(target_os = "linux"))]
    const SET_LOCK: libc::c_int = libc::F_SETLK;

    /// `Ok(false)` if another holder has the byte.
    pub(super) fn try_lock(file: &File) -> io::Result<bool> {
        match set_lock(file, libc::F_WRLCK) {
            Ok(()) => Ok(true),
            Err(e) if matches!(e.raw_os_error(), Some(libc::EACCES) | Some(libc::EAGAIN)) => {
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    pub(super) fn unlock(file: &File) -> io::Result<()> {
        set_lock(file, libc::F_UNLCK)
    }

    #[allow(clippy::unnecessary_cast)]
    fn set_lock(file: &File, lock_type: libc::c_int) -> io::Result<()> {
        // SAFETY: `flock` is a plain C struct; all-zero is a valid value and
        // leaves `l_pid` at 0 as open-file-description locks require.
        let mut region: libc::flock = unsafe { std::mem::zeroed() };
        region.l_type = lock_type as libc::c_short;
        region.l_whence = libc::SEEK_SET as libc::c_short;
        region.l_start = LOCK_BYTE_OFFSET as libc::off_t;
        region.l_len = 1;

        // SAFETY: the descriptor is open for the lifetime of `file` and
        // `region` outlives the call.
        let ret = unsafe { libc::fcntl(file.as_raw_fd(), SET_LOCK, &mut region) };
        if ret == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

#[cfg(not(unix))]
mod sys {
    use std::fs::File;
    use std::io;

    use fs2::FileExt;

    pub(super) fn try_lock(file: &File) -> io::Result<bool> {
        match file.try_lock_exclusive() {
            Ok(()) => Ok(true),
            Err(e) if is_contended(&e) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub(super) fn unlock(file: &File) -> io::Result<()> {
        FileExt::unlock(file)
    }

    fn is_contended(err: &io::Error) -> bool {
        let contended = fs2::lock_contended_error();
        match (err.raw_os_error(), contended.raw_os_error()) {
            (Some(found), Some(expected)) => found == expected,
            _ => err.kind() == contended.kind(),
        }
    }
}
