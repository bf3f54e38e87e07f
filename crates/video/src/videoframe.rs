use {
    base::Vec2,
    image::{Image, PixelFormat},
    std::time::Instant,
};

/// One captured frame and the instant it was taken.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub image: Image,
    pub timestamp: Instant,
}

impl VideoFrame {
    /// Stamp `image` with the current instant.
    pub fn new(image: Image) -> Self {
        Self::with_timestamp(image, Instant::now())
    }

    pub fn with_timestamp(image: Image, timestamp: Instant) -> Self {
        Self { image, timestamp }
    }

    pub fn size(&self) -> Vec2<usize> {
        self.image.size
    }

    pub fn format(&self) -> PixelFormat {
        self.image.format
    }
}
