//! Session layer for framelink.
//!
//! A [`Session`] composes a frame decoder with a transport: it pulls
//! bytes from the transport, feeds them to the decoder one at a time,
//! and dispatches decoded messages or errors to an [`EventHandler`]. On
//! the outgoing side it serializes a message through a [`MessageCodec`],
//! frames it, and writes it to the transport.

pub mod codec;
pub mod error;
pub mod handler;
pub mod session;

pub use codec::{JsonCodec, MessageCodec, RawCodec};
pub use error::{Result, SessionError};
pub use handler::{EventHandler, NullHandler};
pub use session::{Session, SessionConfig};
