use crate::ComError;

/// Lifecycle and data notifications from a transport session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The handshake completed; `send` is accepted from now on.
    Opened,
    /// One complete binary message from the peer.
    MessageReceived(Vec<u8>),
    /// The connection is gone. Delivered exactly once, always last.
    ///
    /// `clean` is true when the closing handshake completed, whichever side
    /// started it. Connect failures arrive here with `clean: false`.
    Closed {
        clean: bool,
        code: Option<u16>,
        reason: String,
    },
}

impl TransportEvent {
    pub(crate) fn unclean(reason: impl Into<String>) -> Self {
        TransportEvent::Closed {
            clean: false,
            code: None,
            reason: reason.into(),
        }
    }
}

/// A persistent, message-oriented, bidirectional connection.
///
/// Single-flight is the caller's job: `send` queues whatever it is given.
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Queue one binary message. Fails with `ComError::NotConnected` unless open.
    fn send(&mut self, payload: Vec<u8>) -> Result<(), ComError>;

    /// Start a clean shutdown. Only the first call has an effect.
    fn close(&mut self);

    /// Wait for the next event; `None` once `Closed` has been delivered.
    ///
    /// Cancel-safe.
    async fn next_event(&mut self) -> Option<TransportEvent>;
}
