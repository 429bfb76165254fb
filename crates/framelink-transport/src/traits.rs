use std::io::{ErrorKind, Read, Write};
use std::os::fd::{AsRawFd, RawFd};
use std::time::{Duration, Instant};

use crate::error::{Result, TransportError};

/// A byte-stream transport a session can drive.
///
/// Reads are expected to be non-blocking: when no data is available the
/// transport returns `ErrorKind::WouldBlock` rather than suspending, so a
/// caller can drain available input and then block in [`wait_ready`]
/// (bounded by a timeout) instead of in `read`.
///
/// [`wait_ready`]: Transport::wait_ready
pub trait Transport: Read + Write + AsRawFd {
    /// Block until the transport has bytes available to read.
    ///
    /// `None` waits indefinitely, `Some(Duration::ZERO)` polls. Returns
    /// `Ok(false)` if the timeout expired without readiness.
    fn wait_ready(&self, timeout: Option<Duration>) -> Result<bool> {
        poll_readable(self.as_raw_fd(), timeout)
    }
}

/// Wait for `fd` to become readable via `poll(2)`.
///
/// Interrupted waits are retried against the original deadline.
pub fn poll_readable(fd: RawFd, timeout: Option<Duration>) -> Result<bool> {
    let deadline = timeout.map(|t| Instant::now() + t);

    loop {
        let timeout_ms: libc::c_int = match deadline {
            None => -1,
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                remaining.as_millis().min(libc::c_int::MAX as u128) as libc::c_int
            }
        };

        let mut pfd = libc::pollfd {
            fd,
            events: libc::POLLIN,
            revents: 0,
        };

        // SAFETY: `pfd` is a valid, writable pollfd for the duration of
        // the call and `fd` is owned by the caller.
        let rc = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };

        match rc {
            0 => return Ok(false),
            n if n > 0 => return Ok(true),
            _ => {
                let err = std::io::Error::last_os_error();
                if err.kind() == ErrorKind::Interrupted {
                    continue;
                }
                return Err(TransportError::Io(err));
            }
        }
    }
}

/// Unix domain sockets make a convenient loopback transport for tests and
/// same-host links; callers should put them in non-blocking mode.
impl Transport for std::os::unix::net::UnixStream {}
