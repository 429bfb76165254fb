use bytes::{BufMut, BytesMut};

use crate::error::{FrameError, Result};

/// Marks the beginning of a frame.
pub const START_BYTE: u8 = 0x10;
/// Marks the end of a frame.
pub const END_BYTE: u8 = 0xFF;
/// Prefixes any payload or checksum byte equal to a reserved value.
pub const ESC_BYTE: u8 = 0x1B;

/// Default decoder buffer size when none is specified.
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

pub(crate) fn is_magic_byte(byte: u8) -> bool {
    byte == START_BYTE || byte == END_BYTE || byte == ESC_BYTE
}

/// XOR checksum over a payload.
///
/// Kept as a plain XOR rather than a CRC for wire compatibility with
/// existing deployments of this protocol.
pub fn checksum(payload: &[u8]) -> u8 {
    payload.iter().fold(0, |acc, b| acc ^ b)
}

/// Exact wire size of the frame `encode` would produce for `payload`.
///
/// START + END + checksum account for three bytes; every payload or
/// checksum byte colliding with a reserved value costs one extra escape
/// byte.
pub fn encoded_len(payload: &[u8]) -> usize {
    let escapes = payload.iter().filter(|&&b| is_magic_byte(b)).count();
    let checksum_escape = usize::from(is_magic_byte(checksum(payload)));
    payload.len() + 3 + escapes + checksum_escape
}

fn put_stuffed(dst: &mut BytesMut, byte: u8) {
    if is_magic_byte(byte) {
        dst.put_u8(ESC_BYTE);
    }
    dst.put_u8(byte);
}

/// Encode a payload into the wire format, appending to `dst`.
///
/// Wire format:
/// ```text
/// ┌────────┬──────────────────┬───────────────────┬────────┐
/// │ START  │ stuffed payload  │ stuffed checksum  │ END    │
/// │ 0x10   │                  │ (XOR of payload)  │ 0xFF   │
/// └────────┴──────────────────┴───────────────────┴────────┘
/// ```
///
/// Returns the number of bytes appended (always `encoded_len(payload)`).
pub fn encode(payload: &[u8], dst: &mut BytesMut) -> usize {
    let wire_len = encoded_len(payload);
    dst.reserve(wire_len);

    dst.put_u8(START_BYTE);
    for &byte in payload {
        put_stuffed(dst, byte);
    }
    put_stuffed(dst, checksum(payload));
    dst.put_u8(END_BYTE);

    wire_len
}

/// Encode a payload into a caller-supplied slice (no allocation).
///
/// Fails with [`FrameError::Overflow`] and writes nothing if `dst` cannot
/// hold the full frame. Returns the number of bytes written on success.
pub fn encode_into(payload: &[u8], dst: &mut [u8]) -> Result<usize> {
    let wire_len = encoded_len(payload);
    if dst.len() < wire_len {
        return Err(FrameError::Overflow {
            needed: wire_len,
            available: dst.len(),
        });
    }

    let mut offset = 0;
    dst[offset] = START_BYTE;
    offset += 1;
    for &byte in payload {
        offset = write_stuffed(dst, offset, byte);
    }
    offset = write_stuffed(dst, offset, checksum(payload));
    dst[offset] = END_BYTE;
    offset += 1;

    Ok(offset)
}

/// Write one byte at `offset`, prefixing an escape if it collides with a
/// reserved value. Returns the new offset.
fn write_stuffed(dst: &mut [u8], mut offset: usize, byte: u8) -> usize {
    if is_magic_byte(byte) {
        dst[offset] = ESC_BYTE;
        offset += 1;
    }
    dst[offset] = byte;
    offset + 1
}
