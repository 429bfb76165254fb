use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::mem::MaybeUninit;
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::Transport;

/// Line speeds supported by the serial transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Baudrate {
    B1200,
    B2400,
    B4800,
    B9600,
    B19200,
    B38400,
    B57600,
    #[default]
    B115200,
}

impl Baudrate {
    fn speed(self) -> libc::speed_t {
        match self {
            Baudrate::B1200 => libc::B1200,
            Baudrate::B2400 => libc::B2400,
            Baudrate::B4800 => libc::B4800,
            Baudrate::B9600 => libc::B9600,
            Baudrate::B19200 => libc::B19200,
            Baudrate::B38400 => libc::B38400,
            Baudrate::B57600 => libc::B57600,
            Baudrate::B115200 => libc::B115200,
        }
    }
}

/// Serial line configuration.
///
/// Applied best-effort: devices that are not ttys reject it with
/// [`TransportError::NotSupported`], which callers may treat as non-fatal.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialConfig {
    pub baudrate: Baudrate,
    /// Enable input parity checking.
    pub parity: bool,
    /// Enable XON/XOFF output flow control.
    pub flow_control: bool,
}

/// A serial device opened in non-blocking mode.
///
/// If the device is a tty it is switched to raw mode at 115200 baud on
/// open; use [`set_config`](SerialPort::set_config) to change the line
/// parameters afterwards.
pub struct SerialPort {
    file: File,
    path: PathBuf,
}

impl SerialPort {
    /// Open the serial device at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NONBLOCK | libc::O_NOCTTY)
            .open(&path)
            .map_err(|e| TransportError::Open {
                path: path.clone(),
                source: e,
            })?;

        let port = Self { file, path };

        if port.is_tty() {
            let mut term = port.line_attrs()?;
            // SAFETY: `term` was initialized by tcgetattr and is a valid
            // termios for the duration of the call.
            unsafe {
                libc::cfmakeraw(&mut term);
                libc::cfsetispeed(&mut term, libc::B115200);
                libc::cfsetospeed(&mut term, libc::B115200);
            }
            port.apply_line_attrs(&term)?;
        }

        info!(path = ?port.path, tty = port.is_tty(), "opened serial device");
        Ok(port)
    }

    /// Apply line configuration to the device.
    ///
    /// Returns [`TransportError::NotSupported`] if the device is not a tty.
    pub fn set_config(&self, config: SerialConfig) -> Result<()> {
        if !self.is_tty() {
            return Err(TransportError::NotSupported);
        }

        let mut term = self.line_attrs()?;
        let speed = config.baudrate.speed();
        // SAFETY: `term` is a valid termios initialized by tcgetattr.
        unsafe {
            libc::cfsetispeed(&mut term, speed);
            libc::cfsetospeed(&mut term, speed);
        }

        if config.parity {
            term.c_iflag |= libc::INPCK;
        } else {
            term.c_iflag &= !libc::INPCK;
        }

        if config.flow_control {
            term.c_iflag |= libc::IXON;
        } else {
            term.c_iflag &= !libc::IXON;
        }

        self.apply_line_attrs(&term)?;
        debug!(path = ?self.path, ?config, "applied serial config");
        Ok(())
    }

    /// The path this device was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn is_tty(&self) -> bool {
        // SAFETY: the fd is open for the lifetime of `self.file`.
        unsafe { libc::isatty(self.file.as_raw_fd()) == 1 }
    }

    fn line_attrs(&self) -> Result<libc::termios> {
        let mut term = MaybeUninit::<libc::termios>::uninit();
        // SAFETY: `term` points to writable storage for one termios and
        // the fd is open.
        let rc = unsafe { libc::tcgetattr(self.file.as_raw_fd(), term.as_mut_ptr()) };
        if rc != 0 {
            return Err(TransportError::Config(std::io::Error::last_os_error()));
        }
        // SAFETY: tcgetattr succeeded, so `term` is initialized.
        Ok(unsafe { term.assume_init() })
    }

    fn apply_line_attrs(&self, term: &libc::termios) -> Result<()> {
        // SAFETY: `term` is a valid, initialized termios and the fd is open.
        let rc = unsafe { libc::tcsetattr(self.file.as_raw_fd(), libc::TCSANOW, term) };
        if rc != 0 {
            return Err(TransportError::Config(std::io::Error::last_os_error()));
        }
        Ok(())
    }
}

impl Read for SerialPort {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for SerialPort {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.file.flush()
    }
}

impl AsRawFd for SerialPort {
    fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

impl Transport for SerialPort {}

impl Drop for SerialPort {
    fn drop(&mut self) {
        debug!(path = ?self.path, "closing serial device");
    }
}

impl std::fmt::Debug for SerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialPort")
            .field("path", &self.path)
            .field("fd", &self.file.as_raw_fd())
            .finish()
    }
}
