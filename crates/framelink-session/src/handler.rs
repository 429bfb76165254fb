use crate::error::SessionError;

/// Receives session events.
///
/// Both methods default to no-ops, so a handler may observe only the
/// events it cares about. Handlers are invoked synchronously and
/// re-entrantly from within [`Session::process_available_input`]: the
/// read loop does not continue until the handler returns, and any state
/// the handler needs lives in the handler itself.
///
/// [`Session::process_available_input`]: crate::session::Session::process_available_input
pub trait EventHandler<M> {
    /// A frame was decoded and deserialized into a message.
    fn on_message(&mut self, msg: M) {
        let _ = msg;
    }

    /// Decoding or deserialization of incoming data failed. The session
    /// keeps processing the remaining input after this returns.
    fn on_error(&mut self, err: SessionError) {
        let _ = err;
    }
}

/// Handler that discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHandler;

impl<M> EventHandler<M> for NullHandler {}
