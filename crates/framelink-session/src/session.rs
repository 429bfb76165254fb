use std::io::{ErrorKind, Read, Write};
use std::os::fd::{AsRawFd, RawFd};
use std::path::Path;
use std::time::Duration;

use bytes::BytesMut;
use tracing::{debug, trace};

use framelink_frame::{encode, Decoder, DEFAULT_BUFFER_SIZE};
use framelink_transport::{SerialConfig, SerialPort, Transport};

use crate::codec::MessageCodec;
use crate::error::{Result, SessionError};
use crate::handler::EventHandler;

/// Session construction parameters.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Decode buffer capacity in bytes. Bounds the largest receivable
    /// payload (plus one checksum byte).
    pub buffer_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

/// Drives a frame [`Decoder`] over a [`Transport`] and dispatches decoded
/// messages and errors to an [`EventHandler`].
///
/// A session is created closed, can be opened and closed any number of
/// times, and keeps its decoder (and decode buffer) for its whole life.
/// Single-threaded by design: decoder state and buffer are mutated in
/// place, so one thread drives a given session at a time.
pub struct Session<T, C, H> {
    transport: Option<T>,
    decoder: Decoder<'static>,
    codec: C,
    handler: H,
}

impl<T, C, H> Session<T, C, H>
where
    T: Transport,
    C: MessageCodec,
    H: EventHandler<C::Message>,
{
    /// Create a closed session with the default configuration.
    pub fn new(codec: C, handler: H) -> Self {
        Self::with_config(codec, handler, SessionConfig::default())
    }

    /// Create a closed session with an explicit configuration.
    pub fn with_config(codec: C, handler: H, config: SessionConfig) -> Self {
        Self {
            transport: None,
            decoder: Decoder::new(config.buffer_size),
            codec,
            handler,
        }
    }

    /// Whether the session currently owns an open transport.
    pub fn is_open(&self) -> bool {
        self.transport.is_some()
    }

    /// Attach an open transport to the session.
    pub fn open(&mut self, transport: T) -> Result<()> {
        if self.transport.is_some() {
            return Err(SessionError::AlreadyOpen);
        }
        self.transport = Some(transport);
        Ok(())
    }

    /// Detach and return the transport, closing the session.
    ///
    /// Dropping the returned transport releases the underlying device.
    /// Idempotent: returns `None` if the session was already closed.
    pub fn close(&mut self) -> Option<T> {
        self.transport.take()
    }

    /// Borrow the event handler, e.g. to inspect state it accumulated.
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Mutably borrow the event handler.
    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    /// Raw fd of the open transport, for external event loop integration.
    pub fn native_fd(&self) -> Result<RawFd> {
        let transport = self.transport.as_ref().ok_or(SessionError::NotOpen)?;
        Ok(transport.as_raw_fd())
    }

    /// Serialize, frame, and write a message to the transport.
    ///
    /// The frame is written with a single `write` call; a short write is
    /// a hard error here, with no partial-write retry at this layer.
    pub fn send(&mut self, msg: &C::Message) -> Result<()> {
        let transport = self.transport.as_mut().ok_or(SessionError::NotOpen)?;

        let mut payload = BytesMut::new();
        self.codec.encode(msg, &mut payload)?;

        let mut wire = BytesMut::new();
        let wire_len = encode(&payload, &mut wire);

        let written = transport.write(&wire)?;
        if written != wire_len {
            return Err(SessionError::ShortWrite {
                written,
                expected: wire_len,
            });
        }

        trace!(payload = payload.len(), wire = wire_len, "sent frame");
        Ok(())
    }

    /// Drain and decode all bytes currently available on the transport.
    ///
    /// Reads one byte at a time until the transport reports `WouldBlock`
    /// (a clean stop, not an error) or end-of-stream. Decoder errors and
    /// deserialization failures go to [`EventHandler::on_error`]; decoded
    /// messages go to [`EventHandler::on_message`]. Both are invoked
    /// synchronously before the next byte is read, because a completed
    /// frame only borrows the decode buffer until then.
    ///
    /// Transport errors abort the call and are returned directly.
    pub fn process_available_input(&mut self) -> Result<()> {
        let transport = self.transport.as_mut().ok_or(SessionError::NotOpen)?;

        loop {
            let mut byte = [0u8; 1];
            match transport.read(&mut byte) {
                Ok(0) => return Ok(()),
                Ok(_) => {}
                Err(err) if err.kind() == ErrorKind::WouldBlock => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(SessionError::Io(err)),
            }

            match self.decoder.process_byte(byte[0]) {
                Ok(None) => {}
                Ok(Some(frame)) => match self.codec.decode(frame) {
                    Ok(msg) => self.handler.on_message(msg),
                    Err(err) => {
                        debug!(frame_len = frame.len(), "failed to deserialize frame");
                        self.handler.on_error(err);
                    }
                },
                Err(err) => {
                    debug!(%err, "decode error");
                    self.handler.on_error(err.into());
                }
            }
        }
    }

    /// Block until the transport is readable, then process available input.
    ///
    /// `None` waits indefinitely, `Some(Duration::ZERO)` polls. Returns
    /// `Ok(false)` if the timeout expired before any data arrived.
    pub fn wait_and_process(&mut self, timeout: Option<Duration>) -> Result<bool> {
        let transport = self.transport.as_ref().ok_or(SessionError::NotOpen)?;
        if !transport.wait_ready(timeout)? {
            return Ok(false);
        }
        self.process_available_input()?;
        Ok(true)
    }
}

impl<C, H> Session<SerialPort, C, H>
where
    C: MessageCodec,
    H: EventHandler<C::Message>,
{
    /// Open the serial device at `path` and attach it to the session.
    pub fn open_path(&mut self, path: impl AsRef<Path>) -> Result<()> {
        if self.transport.is_some() {
            return Err(SessionError::AlreadyOpen);
        }
        let port = SerialPort::open(path)?;
        self.open(port)
    }

    /// Apply serial line configuration to the open device.
    ///
    /// [`TransportError::NotSupported`] means the device has no line
    /// configuration (e.g. a pipe) and is safe to ignore.
    ///
    /// [`TransportError::NotSupported`]: framelink_transport::TransportError::NotSupported
    pub fn set_serial_config(&self, config: SerialConfig) -> Result<()> {
        let port = self.transport.as_ref().ok_or(SessionError::NotOpen)?;
        port.set_config(config)?;
        Ok(())
    }
}
