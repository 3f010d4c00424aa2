//! Bounded waits on readiness descriptors.

use std::io;
use std::os::fd::{AsRawFd, BorrowedFd};
use std::time::Duration;

/// Outcome of a bounded readiness wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// The descriptor is readable
    Ready,
    /// The timeout elapsed first (or the wait was interrupted by a signal)
    TimedOut,
}

/// Block until `fd` is readable or `timeout` elapses.
///
/// An interrupted wait (`EINTR`) reports [`Readiness::TimedOut`] so the caller
/// simply retries on its next turn. `POLLERR` and `POLLNVAL` are errors.
#[allow(unsafe_code)]
pub fn wait_readable(fd: BorrowedFd<'_>, timeout: Duration) -> io::Result<Readiness> {
    let mut pfd = libc::pollfd {
        fd: fd.as_raw_fd(),
        events: libc::POLLIN,
        revents: 0,
    };
    let ts = libc::timespec {
        tv_sec: timeout.as_secs().min(libc::time_t::MAX as u64) as libc::time_t,
        tv_nsec: timeout.subsec_nanos() as _,
    };

    // SAFETY: `pfd` and `ts` are valid for the duration of the call, nfds is 1
    // and a null sigmask leaves the signal mask unchanged.
    let ret = unsafe { libc::ppoll(&mut pfd, 1, &ts, std::ptr::null()) };

    if ret < 0 {
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::Interrupted {
            return Ok(Readiness::TimedOut);
        }
        return Err(err);
    }
    if ret == 0 {
        return Ok(Readiness::TimedOut);
    }
    if pfd.revents & (libc::POLLERR | libc::POLLNVAL) != 0 {
        return Err(io::Error::other(format!(
            "readiness descriptor {} reported revents {:#x}",
            pfd.fd, pfd.revents
        )));
    }
    Ok(Readiness::Ready)
}
