//! Process resource limits.

use tracing::debug;

use crate::error::{Result, SiftError};

/// Ensures the soft open-file limit is at least `limit`.
///
/// Returns the resulting limit. Failure is reported so the caller can skip
/// the pass that needed the descriptors; it is never fatal to the process.
#[cfg(unix)]
pub fn raise_open_files(limit: u64) -> Result<u64> {
    let mut rlim = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };

    // SAFETY: getrlimit writes into the rlimit struct we own.
    if unsafe { libc::getrlimit(libc::RLIMIT_NOFILE, &mut rlim) } != 0 {
        return Err(SiftError::OpenFileLimit(limit));
    }

    if rlim.rlim_cur as u64 >= limit {
        return Ok(rlim.rlim_cur as u64);
    }

    rlim.rlim_cur = limit as libc::rlim_t;
    debug!("Raising open file limit to {limit}");

    // SAFETY: setrlimit reads the rlimit struct we own.
    if unsafe { libc::setrlimit(libc::RLIMIT_NOFILE, &rlim) } != 0 {
        return Err(SiftError::OpenFileLimit(limit));
    }

    Ok(limit)
}

/// Ensures the soft open-file limit is at least `limit`.
///
/// Non-Unix hosts have no rlimit interface; the request always succeeds.
#[cfg(not(unix))]
pub fn raise_open_files(limit: u64) -> Result<u64> {
    Ok(limit)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_current_limit_is_enough() {
        // Asking for a tiny limit never lowers the current one.
        let limit = raise_open_files(8).unwrap();
        assert!(limit >= 8);
    }
}
