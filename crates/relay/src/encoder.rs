use {
    crate::RelayError,
    std::time::Instant,
    video::VideoFrame,
};

/// A compressed frame ready for the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedFrame {
    pub data: Vec<u8>,
    /// Capture instant of the frame this was encoded from.
    pub timestamp: Instant,
    /// Assigned by the controller; only used for logs and stats.
    pub sequence: u64,
}

impl EncodedFrame {
    pub fn new(data: Vec<u8>, timestamp: Instant) -> Self {
        Self {
            data,
            timestamp,
            sequence: 0,
        }
    }
}

/// Turns one raw frame into a transmittable payload.
pub trait FrameEncoder {
    fn encode(&mut self, frame: VideoFrame) -> Result<EncodedFrame, RelayError>;
}

/// Compresses frames to JPEG at a fixed quality.
#[derive(Debug, Clone, Copy)]
pub struct JpegEncoder {
    quality: u8,
}

impl JpegEncoder {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }
}

impl Default for JpegEncoder {
    fn default() -> Self {
        Self::new(80)
    }
}

impl FrameEncoder for JpegEncoder {
    fn encode(&mut self, frame: VideoFrame) -> Result<EncodedFrame, RelayError> {
        let data = image::encode_jpeg(&frame.image, self.quality)?;
        Ok(EncodedFrame::new(data, frame.timestamp))
    }
}
