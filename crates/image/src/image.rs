use {crate::*, base::Vec2};

/// A single image buffer as produced by a camera or a decoder.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub size: Vec2<usize>,
    pub data: Vec<u8>,
    pub format: PixelFormat,
}

impl Image {
    pub fn new(size: Vec2<usize>, data: Vec<u8>, format: PixelFormat) -> Self {
        Self { size, data, format }
    }

    pub fn width(&self) -> usize {
        self.size.x
    }

    pub fn height(&self) -> usize {
        self.size.y
    }

    /// Check that the buffer length matches the size for uncompressed formats.
    ///
    /// JPEG buffers are only checked for being non-empty.
    pub fn validate(&self) -> Result<(), ImageError> {
        if self.size.is_degenerate() {
            return Err(ImageError::Encode(format!("degenerate image size {}", self.size)));
        }
        match self.format.bytes_per_pixel() {
            Some(bpp) => {
                let expected = self.size.area() * bpp;
                if self.data.len() != expected {
                    return Err(ImageError::Encode(format!(
                        "{:?} buffer for {} should be {} bytes, got {}",
                        self.format,
                        self.size,
                        expected,
                        self.data.len()
                    )));
                }
                // YUYV packs two pixels per macropixel
                if self.format == PixelFormat::Yuyv && self.size.x % 2 != 0 {
                    return Err(ImageError::Encode(format!(
                        "YUYV width must be even, got {}",
                        self.size
                    )));
                }
            }
            None => {
                if self.data.is_empty() {
                    return Err(ImageError::Encode("empty JPEG buffer".to_string()));
                }
            }
        }
        Ok(())
    }
}
