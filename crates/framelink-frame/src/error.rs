/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// The frame failed validation: checksum mismatch, an END byte with no
    /// checksum, or a START byte arriving mid-frame.
    #[error("bad message (checksum mismatch or malformed frame)")]
    BadMessage,

    /// The decoded frame exceeds the decoder's buffer capacity.
    #[error("frame too big for decode buffer ({capacity} bytes)")]
    TooBig { capacity: usize },

    /// The supplied output buffer is too small for the encoded frame.
    #[error("output buffer too small ({available} bytes, need {needed})")]
    Overflow { needed: usize, available: usize },
}

pub type Result<T> = std::result::Result<T, FrameError>;
