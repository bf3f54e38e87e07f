//! Image buffers and codecs for the relay.
//!
//! Raw camera buffers are carried as [`Image`] (size, pixel format, bytes).
//! JPEG is the wire format in both directions; the conversions here turn
//! camera formats into RGB for compression and decoded payloads back into
//! RGB or packed `u32` pixels for display.

mod error;
pub use error::*;

mod image;
pub use image::*;

mod jpeg;
pub use jpeg::*;

mod pixelformat;
pub use pixelformat::*;

mod rgb;
pub use rgb::*;

mod u32;
pub use u32::*;
