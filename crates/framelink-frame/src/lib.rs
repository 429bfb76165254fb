//! Byte-stuffed framing for unreliable byte streams.
//!
//! This is the wire layer of framelink. Every frame is delimited with:
//! - A START byte (0x10) and an END byte (0xFF)
//! - Escape-stuffing (0x1B) for payload bytes colliding with delimiters
//! - A trailing XOR checksum over the unstuffed payload
//!
//! No length prefix is needed, so the [`Decoder`] can be driven one byte
//! at a time from non-blocking I/O and resynchronize on the next START
//! byte after corruption.

pub mod codec;
pub mod decoder;
pub mod error;

pub use codec::{
    checksum, encode, encode_into, encoded_len, DEFAULT_BUFFER_SIZE, END_BYTE, ESC_BYTE,
    START_BYTE,
};
pub use decoder::Decoder;
pub use error::{FrameError, Result};
