//! The live frame relay.
//!
//! A [`RelayController`] pulls frames from a [`video::CaptureSource`],
//! encodes them with a [`FrameEncoder`], sends them over a
//! [`com::Transport`] to a remote processor and hands every reply to a
//! [`FrameSink`]. Only one frame is ever in flight, so the processor's
//! throughput paces the camera.

mod config;
pub use config::*;

mod controller;
pub use controller::*;

mod encoder;
pub use encoder::*;

mod error;
pub use error::*;

mod sink;
pub use sink::*;

mod state;
pub use state::*;
