use tracing::trace;

use crate::codec::{checksum, DEFAULT_BUFFER_SIZE, END_BYTE, ESC_BYTE, START_BYTE};
use crate::error::{FrameError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Discarding bytes until a START byte arrives.
    WaitStart,
    /// Accumulating payload bytes.
    InFrame,
    /// Previous byte was an escape; the next byte is taken literally.
    InFrameEscaped,
}

/// Decode buffer storage: heap-allocated by the decoder, or supplied by
/// the caller for no-allocation use. Only the `Owned` variant is freed
/// when the decoder is dropped.
enum Storage<'a> {
    Owned(Box<[u8]>),
    Borrowed(&'a mut [u8]),
}

impl Storage<'_> {
    fn as_slice(&self) -> &[u8] {
        match self {
            Storage::Owned(buf) => buf,
            Storage::Borrowed(buf) => buf,
        }
    }

    fn as_mut_slice(&mut self) -> &mut [u8] {
        match self {
            Storage::Owned(buf) => buf,
            Storage::Borrowed(buf) => buf,
        }
    }
}

/// Incremental frame decoder.
///
/// Fed one byte at a time via [`process_byte`](Decoder::process_byte); a
/// completed frame is returned as a view into the decoder's buffer, valid
/// only until the next byte is processed. The buffer is reused across
/// frames without reallocation.
///
/// Not safe for concurrent use: state and buffer are mutated in place, so
/// a single caller must drive a given decoder.
pub struct Decoder<'a> {
    state: State,
    buf: Storage<'a>,
    offset: usize,
}

impl Decoder<'static> {
    /// Create a decoder with a self-allocated buffer.
    ///
    /// A `bufsize` of 0 selects [`DEFAULT_BUFFER_SIZE`].
    pub fn new(bufsize: usize) -> Self {
        let bufsize = if bufsize == 0 {
            DEFAULT_BUFFER_SIZE
        } else {
            bufsize
        };
        Self {
            state: State::WaitStart,
            buf: Storage::Owned(vec![0u8; bufsize].into_boxed_slice()),
            offset: 0,
        }
    }
}

impl Default for Decoder<'static> {
    fn default() -> Self {
        Self::new(0)
    }
}

impl<'a> Decoder<'a> {
    /// Create a decoder backed by a caller-supplied buffer.
    ///
    /// Nothing is allocated; the decoder must not outlive the buffer.
    pub fn with_buffer(buf: &'a mut [u8]) -> Self {
        Self {
            state: State::WaitStart,
            buf: Storage::Borrowed(buf),
            offset: 0,
        }
    }

    /// Capacity of the decode buffer in bytes.
    pub fn capacity(&self) -> usize {
        self.buf.as_slice().len()
    }

    /// Feed one byte from the wire into the decoder.
    ///
    /// Returns `Ok(Some(payload))` when the byte completes a checksum-valid
    /// frame. The returned slice borrows the decoder's buffer and is
    /// invalidated by the next call.
    ///
    /// Errors report malformed input but leave the decoder able to
    /// resynchronize on a later START byte:
    /// - [`FrameError::BadMessage`] for a checksum mismatch, an END byte
    ///   with no buffered checksum, or a START byte arriving mid-frame
    ///   (the frame in progress is dropped and decoding restarts).
    /// - [`FrameError::TooBig`] when the buffer is full. The decoder state
    ///   is deliberately left unchanged, so an oversized frame reports one
    ///   error per excess byte until the next START or END forces a
    ///   transition. Callers counting errors should expect the burst.
    pub fn process_byte(&mut self, byte: u8) -> Result<Option<&[u8]>> {
        match self.state {
            State::WaitStart => {
                if byte == START_BYTE {
                    self.state = State::InFrame;
                    self.offset = 0;
                }
                Ok(None)
            }
            State::InFrame => self.process_byte_in_frame(byte),
            State::InFrameEscaped => {
                self.push(byte)?;
                self.state = State::InFrame;
                Ok(None)
            }
        }
    }

    fn process_byte_in_frame(&mut self, byte: u8) -> Result<Option<&[u8]>> {
        match byte {
            START_BYTE => {
                // Frame in progress never saw its END byte. Resync on the
                // new START.
                trace!(dropped = self.offset, "mid-frame start byte, resyncing");
                self.offset = 0;
                Err(FrameError::BadMessage)
            }
            ESC_BYTE => {
                self.state = State::InFrameEscaped;
                Ok(None)
            }
            END_BYTE => {
                self.state = State::WaitStart;

                // The last buffered byte is the checksum.
                if self.offset < 1 {
                    return Err(FrameError::BadMessage);
                }
                let len = self.offset - 1;
                let buf = self.buf.as_slice();
                if checksum(&buf[..len]) != buf[len] {
                    trace!(len, "checksum mismatch");
                    return Err(FrameError::BadMessage);
                }
                Ok(Some(&buf[..len]))
            }
            _ => {
                self.push(byte)?;
                Ok(None)
            }
        }
    }

    fn push(&mut self, byte: u8) -> Result<()> {
        if self.offset >= self.capacity() {
            return Err(FrameError::TooBig {
                capacity: self.capacity(),
            });
        }
        self.buf.as_mut_slice()[self.offset] = byte;
        self.offset += 1;
        Ok(())
    }
}

impl std::fmt::Debug for Decoder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decoder")
            .field("state", &self.state)
            .field("offset", &self.offset)
            .field("capacity", &self.capacity())
            .field(
                "storage",
                match &self.buf {
                    Storage::Owned(_) => &"owned",
                    Storage::Borrowed(_) => &"borrowed",
                },
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;

    use super::*;
    use crate::codec::encode;

    /// Drive a full wire sequence through the decoder, collecting every
    /// frame and error in arrival order.
    fn run(decoder: &mut Decoder<'_>, wire: &[u8]) -> (Vec<Vec<u8>>, Vec<FrameError>) {
        let mut frames = Vec::new();
        let mut errors = Vec::new();
        for &byte in wire {
            match decoder.process_byte(byte) {
                Ok(Some(frame)) => frames.push(frame.to_vec()),
                Ok(None) => {}
                Err(err) => errors.push(err),
            }
        }
        (frames, errors)
    }

    fn encode_vec(payload: &[u8]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        encode(payload, &mut buf);
        buf.to_vec()
    }

    #[test]
    fn decode_simple_frame() {
        let mut decoder = Decoder::new(0);
        let (frames, errors) = run(&mut decoder, &encode_vec(&[0x01, 0x02, 0x03]));

        assert!(errors.is_empty());
        assert_eq!(frames, vec![vec![0x01, 0x02, 0x03]]);
    }

    #[test]
    fn decode_known_vector() {
        let mut decoder = Decoder::new(0);
        let wire = [0x10, 0x01, 0x1B, 0x10, 0x02, 0x13, 0xFF];
        let (frames, errors) = run(&mut decoder, &wire);

        assert!(errors.is_empty());
        assert_eq!(frames, vec![vec![0x01, 0x10, 0x02]]);
    }

    #[test]
    fn roundtrip_payloads_with_magic_bytes() {
        let cases: &[&[u8]] = &[
            &[],
            &[0x00],
            &[START_BYTE],
            &[END_BYTE],
            &[ESC_BYTE],
            &[START_BYTE, END_BYTE, ESC_BYTE],
            &[0x01, 0x10, 0x02],
            b"hello framelink",
        ];

        let mut decoder = Decoder::new(0);
        for &payload in cases {
            let (frames, errors) = run(&mut decoder, &encode_vec(payload));
            assert!(errors.is_empty(), "payload {payload:02X?}");
            assert_eq!(frames, vec![payload.to_vec()]);
        }
    }

    #[test]
    fn roundtrip_every_byte_value() {
        let payload: Vec<u8> = (0u8..=255).collect();
        let mut decoder = Decoder::new(0);
        let (frames, errors) = run(&mut decoder, &encode_vec(&payload));

        assert!(errors.is_empty());
        assert_eq!(frames, vec![payload]);
    }

    #[test]
    fn garbage_before_start_is_ignored() {
        let mut wire = vec![0x00, 0x42, 0x7F];
        wire.extend(encode_vec(b"ok"));

        let mut decoder = Decoder::new(0);
        let (frames, errors) = run(&mut decoder, &wire);

        assert!(errors.is_empty());
        assert_eq!(frames, vec![b"ok".to_vec()]);
    }

    #[test]
    fn checksum_mismatch_reports_bad_message() {
        let mut wire = encode_vec(&[0x01, 0x02, 0x03]);
        // Corrupt a payload byte without touching the framing.
        wire[1] ^= 0x40;

        let mut decoder = Decoder::new(0);
        let (frames, errors) = run(&mut decoder, &wire);

        assert!(frames.is_empty());
        assert_eq!(errors, vec![FrameError::BadMessage]);
    }

    #[test]
    fn single_bit_flips_never_false_accept() {
        let payload = [0x21, 0x42, 0x63];
        let wire = encode_vec(&payload);

        // Flip each bit of each non-delimiter byte in turn. Restuffing is
        // not needed because no flipped value is fed as framing here: a
        // flip that produces a magic byte changes the structure, which
        // must also never yield a false accept of the original payload.
        for i in 1..wire.len() - 1 {
            for bit in 0..8 {
                let mut corrupted = wire.clone();
                corrupted[i] ^= 1 << bit;

                let mut decoder = Decoder::new(0);
                let (frames, _errors) = run(&mut decoder, &corrupted);
                assert_ne!(
                    frames,
                    vec![payload.to_vec()],
                    "byte {i} bit {bit} accepted as the original payload"
                );
            }
        }
    }

    #[test]
    fn premature_start_resyncs_onto_new_frame() {
        // START a b START c cs END: first frame aborted, second decodes.
        let wire = [0x10, 0x0A, 0x0B, 0x10, 0x0C, 0x0C, 0xFF];

        let mut decoder = Decoder::new(0);
        let (frames, errors) = run(&mut decoder, &wire);

        assert_eq!(errors, vec![FrameError::BadMessage]);
        assert_eq!(frames, vec![vec![0x0C]]);
    }

    #[test]
    fn end_without_checksum_is_bad_message() {
        let wire = [START_BYTE, END_BYTE];

        let mut decoder = Decoder::new(0);
        let (frames, errors) = run(&mut decoder, &wire);

        assert!(frames.is_empty());
        assert_eq!(errors, vec![FrameError::BadMessage]);

        // Decoder is back to waiting; a good frame still decodes.
        let (frames, errors) = run(&mut decoder, &encode_vec(b"next"));
        assert!(errors.is_empty());
        assert_eq!(frames, vec![b"next".to_vec()]);
    }

    #[test]
    fn oversized_frame_reports_too_big_per_excess_byte() {
        let mut decoder = Decoder::new(4);

        // 8-byte payload into a 4-byte buffer: 4 appended payload bytes
        // fill the buffer, the remaining 4 payload bytes plus the checksum
        // each report TooBig, END then reports BadMessage (stored
        // checksum no longer matches).
        let wire = encode_vec(&[1, 2, 3, 4, 5, 6, 7, 8]);
        let (frames, errors) = run(&mut decoder, &wire);

        assert!(frames.is_empty());
        assert_eq!(errors.len(), 6);
        assert!(errors[..5]
            .iter()
            .all(|e| matches!(e, FrameError::TooBig { capacity: 4 })));
        assert_eq!(errors[5], FrameError::BadMessage);

        // Next well-formed frame is accepted after resync.
        let (frames, errors) = run(&mut decoder, &encode_vec(&[9]));
        assert!(errors.is_empty());
        assert_eq!(frames, vec![vec![9]]);
    }

    #[test]
    fn overflow_in_escaped_state_stays_escaped() {
        let mut decoder = Decoder::new(1);

        assert!(matches!(decoder.process_byte(START_BYTE), Ok(None)));
        assert!(matches!(decoder.process_byte(0x01), Ok(None)));
        assert!(matches!(decoder.process_byte(ESC_BYTE), Ok(None)));

        // Buffer full: the escaped byte cannot be stored and the escaped
        // state persists, so a following data byte is also taken literally
        // and also rejected.
        assert_eq!(
            decoder.process_byte(0x10),
            Err(FrameError::TooBig { capacity: 1 })
        );
        assert_eq!(
            decoder.process_byte(0x02),
            Err(FrameError::TooBig { capacity: 1 })
        );
    }

    #[test]
    fn borrowed_buffer_decodes_without_allocation() {
        let mut storage = [0u8; 32];
        let mut decoder = Decoder::with_buffer(&mut storage);
        assert_eq!(decoder.capacity(), 32);

        let (frames, errors) = run(&mut decoder, &encode_vec(b"static"));
        assert!(errors.is_empty());
        assert_eq!(frames, vec![b"static".to_vec()]);
    }

    #[test]
    fn buffer_reused_across_frames() {
        let mut decoder = Decoder::new(0);

        for i in 0..10u8 {
            let payload = vec![i; (i as usize % 5) + 1];
            let (frames, errors) = run(&mut decoder, &encode_vec(&payload));
            assert!(errors.is_empty());
            assert_eq!(frames, vec![payload]);
        }
    }

    #[test]
    fn zero_bufsize_selects_default() {
        let decoder = Decoder::new(0);
        assert_eq!(decoder.capacity(), DEFAULT_BUFFER_SIZE);
    }
}
