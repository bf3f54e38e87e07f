//! Video capture for the relay.
//!
//! [`CaptureSource`] is the contract the relay pulls frames through.
//! [`VideoIn`] implements it on top of a device driven by a blocking worker
//! thread, with a synthetic test pattern and (behind the `v4l2` feature) a
//! V4L2 camera as devices.

mod error;
pub use error::*;

mod source;
pub use source::*;

mod videoframe;
pub use videoframe::*;

pub mod videoin;
pub use videoin::*;
