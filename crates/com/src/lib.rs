//! Message transport between the relay and the remote frame processor.
//!
//! One WebSocket binary message carries one complete encoded image in
//! either direction; there is no framing beyond that.

pub mod error;
pub mod transport;
pub mod ws;

pub use error::ComError;
pub use transport::{Transport, TransportEvent};
pub use ws::{FrameProcessor, WsServer, WsSession};

/// Largest payload accepted in either direction.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024 * 1024; // 64 MB
