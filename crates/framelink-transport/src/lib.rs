//! Non-blocking transport abstraction for framelink.
//!
//! Provides the [`Transport`] trait consumed by the session layer — a
//! non-blocking `Read + Write` stream with a poll-based readiness wait —
//! together with the POSIX [`SerialPort`] implementation. Unix domain
//! socket streams also implement [`Transport`] for loopback use.

pub mod error;
pub mod traits;

#[cfg(unix)]
pub mod serial;

pub use error::{Result, TransportError};
pub use traits::{poll_readable, Transport};

#[cfg(unix)]
pub use serial::{Baudrate, SerialConfig, SerialPort};
