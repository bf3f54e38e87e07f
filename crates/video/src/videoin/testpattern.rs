use {
    super::{StreamInfo, VideoInConfig, VideoInDevice},
    crate::*,
    base::Vec2,
    image::{Image, PixelFormat},
    std::time::{Duration, Instant},
};

/// A synthetic RGB source: a diagonal gradient that scrolls one pixel per frame.
#[derive(Debug, Clone)]
pub struct TestPatternConfig {
    pub size: Vec2<usize>,
    pub frame_rate: f32,
}

impl Default for TestPatternConfig {
    fn default() -> Self {
        Self {
            size: Vec2::new(640, 360),
            frame_rate: 30.0,
        }
    }
}

pub(crate) struct TestPattern {
    info: Option<StreamInfo>,
    frame_index: u64,
    next_frame_at: Instant,
}

impl TestPattern {
    pub fn new() -> Self {
        Self {
            info: None,
            frame_index: 0,
            next_frame_at: Instant::now(),
        }
    }

    fn render(size: Vec2<usize>, frame_index: u64) -> Vec<u8> {
        let shift = frame_index as usize;
        let mut data = Vec::with_capacity(size.area() * 3);
        for y in 0..size.y {
            for x in 0..size.x {
                data.push(((x + shift) % 256) as u8);
                data.push(((y + shift) % 256) as u8);
                data.push(((x + y) % 256) as u8);
            }
        }
        data
    }
}

impl VideoInDevice for TestPattern {
    fn open(&mut self, config: &VideoInConfig) -> Result<StreamInfo, VideoError> {
        #[allow(irrefutable_let_patterns)]
        let VideoInConfig::TestPattern(config) = config else {
            return Err(VideoError::Device(
                "TestPattern::open should be called with VideoInConfig::TestPattern".to_string(),
            ));
        };
        if config.size.is_degenerate() {
            return Err(VideoError::Device(format!(
                "invalid test pattern size {}",
                config.size
            )));
        }
        if !(config.frame_rate > 0.0) {
            return Err(VideoError::Device(format!(
                "invalid test pattern frame rate {}",
                config.frame_rate
            )));
        }

        let info = StreamInfo {
            size: config.size,
            format: PixelFormat::Rgb8,
            frame_rate: config.frame_rate,
        };
        self.info = Some(info);
        self.next_frame_at = Instant::now();
        Ok(info)
    }

    fn close(&mut self) {
        self.info = None;
    }

    fn blocking_capture(&mut self) -> Result<VideoFrame, VideoError> {
        let Some(info) = self.info else {
            return Err(VideoError::Stream("test pattern not open".to_string()));
        };

        let now = Instant::now();
        if self.next_frame_at > now {
            std::thread::sleep(self.next_frame_at - now);
        }
        self.next_frame_at += Duration::from_secs_f32(1.0 / info.frame_rate);

        let data = Self::render(info.size, self.frame_index);
        self.frame_index += 1;
        Ok(VideoFrame::new(Image::new(info.size, data, PixelFormat::Rgb8)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_scrolls() {
        let size = Vec2::new(4, 2);
        let first = TestPattern::render(size, 0);
        let second = TestPattern::render(size, 1);
        assert_eq!(first.len(), size.area() * 3);
        assert_ne!(first, second);
        assert_eq!(second[0], first[3]);
    }

    #[test]
    fn test_capture_requires_open() {
        let mut device = TestPattern::new();
        assert!(device.blocking_capture().is_err());

        let config = VideoInConfig::TestPattern(TestPatternConfig {
            size: Vec2::new(8, 8),
            frame_rate: 1000.0,
        });
        let info = device.open(&config).unwrap();
        assert_eq!(info.size, Vec2::new(8, 8));

        let frame = device.blocking_capture().unwrap();
        assert_eq!(frame.size(), Vec2::new(8, 8));
        assert_eq!(frame.format(), PixelFormat::Rgb8);

        device.close();
        assert!(device.blocking_capture().is_err());
    }

    #[test]
    fn test_open_rejects_zero_size() {
        let mut device = TestPattern::new();
        let config = VideoInConfig::TestPattern(TestPatternConfig {
            size: Vec2::new(0, 8),
            frame_rate: 30.0,
        });
        assert!(device.open(&config).is_err());
    }
}
