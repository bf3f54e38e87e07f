use crate::*;

/// Something the relay can pull frames from.
#[allow(async_fn_in_trait)]
pub trait CaptureSource {
    /// Wait for the next frame.
    ///
    /// The relay races this against connection events and drops the future
    /// when it loses, so implementations must not lose a frame when cancelled.
    async fn capture(&mut self) -> Result<VideoFrame, VideoError>;

    /// Stop the device and free its resources. Calling it again is a no-op.
    fn release(&mut self);
}
