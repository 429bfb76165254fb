use std::marker::PhantomData;

use bytes::{BufMut, Bytes, BytesMut};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

/// Converts between application messages and the opaque frame payload.
///
/// The frame layer never inspects payload contents; this trait is the
/// seam where an application plugs in its message representation.
pub trait MessageCodec {
    type Message;

    /// Serialize a message, appending the payload bytes to `dst`.
    fn encode(&self, msg: &Self::Message, dst: &mut BytesMut) -> Result<()>;

    /// Deserialize a message from a received frame payload.
    ///
    /// `payload` borrows the decoder's buffer and is only valid for the
    /// duration of the call; implementations must copy what they keep.
    fn decode(&self, payload: &[u8]) -> Result<Self::Message>;
}

/// Pass-through codec: messages are raw byte buffers.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawCodec;

impl MessageCodec for RawCodec {
    type Message = Bytes;

    fn encode(&self, msg: &Bytes, dst: &mut BytesMut) -> Result<()> {
        dst.put_slice(msg);
        Ok(())
    }

    fn decode(&self, payload: &[u8]) -> Result<Bytes> {
        Ok(Bytes::copy_from_slice(payload))
    }
}

/// JSON codec for any serde-serializable message type.
#[derive(Debug, Clone, Copy)]
pub struct JsonCodec<M> {
    _marker: PhantomData<M>,
}

impl<M> Default for JsonCodec<M> {
    fn default() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<M> JsonCodec<M> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<M: Serialize + DeserializeOwned> MessageCodec for JsonCodec<M> {
    type Message = M;

    fn encode(&self, msg: &M, dst: &mut BytesMut) -> Result<()> {
        let encoded = serde_json::to_vec(msg)?;
        dst.put_slice(&encoded);
        Ok(())
    }

    fn decode(&self, payload: &[u8]) -> Result<M> {
        Ok(serde_json::from_slice(payload)?)
    }
}
