use {
    super::{StreamInfo, VideoInConfig, VideoInDevice},
    crate::*,
    base::Vec2,
    image::{Image, PixelFormat},
    std::path::PathBuf,
    v4l::{
        Device, Format, FourCC, buffer::Type, io::mmap::Stream as MmapStream,
        io::traits::CaptureStream, video::Capture,
    },
};

const BUFFER_COUNT: u32 = 4;

#[derive(Debug, Clone)]
pub struct V4l2Config {
    pub path: Option<PathBuf>,
    pub size: Option<Vec2<usize>>,
    pub format: Option<PixelFormat>,
    pub frame_rate: Option<f32>,
}

impl Default for V4l2Config {
    fn default() -> Self {
        Self {
            path: None,
            size: Some(Vec2::new(640, 360)),
            format: Some(PixelFormat::Jpeg),
            frame_rate: None,
        }
    }
}

pub(crate) struct V4l2 {
    stream: Option<MmapStream<'static>>,
    size: Vec2<usize>,
    format: PixelFormat,
}

impl V4l2 {
    pub fn new() -> Self {
        Self {
            stream: None,
            size: Vec2::new(0, 0),
            format: PixelFormat::Yuyv,
        }
    }
}

impl VideoInDevice for V4l2 {
    fn open(&mut self, config: &VideoInConfig) -> Result<StreamInfo, VideoError> {
        self.stream.take();

        let VideoInConfig::V4l2(config) = config else {
            return Err(VideoError::Device(
                "V4l2::open should be called with VideoInConfig::V4l2".to_string(),
            ));
        };

        let device = match &config.path {
            Some(path) => Device::with_path(path)?,
            None => Device::new(0)?,
        };
        let device_format = Capture::format(&device)?;

        let desired_size = config.size.unwrap_or(Vec2::new(
            device_format.width as usize,
            device_format.height as usize,
        ));
        let desired_fourcc = match config.format {
            Some(PixelFormat::Jpeg) => FourCC::new(b"MJPG"),
            Some(PixelFormat::Yuyv) => FourCC::new(b"YUYV"),
            Some(other) => {
                return Err(VideoError::Device(format!(
                    "{:?} capture is not supported by V4L2 devices",
                    other
                )));
            }
            None => device_format.fourcc,
        };

        let actual_format = Capture::set_format(
            &device,
            &Format::new(desired_size.x as u32, desired_size.y as u32, desired_fourcc),
        )?;
        self.size = Vec2::new(actual_format.width as usize, actual_format.height as usize);
        self.format = match &actual_format.fourcc.repr {
            b"YUYV" => PixelFormat::Yuyv,
            b"MJPG" => PixelFormat::Jpeg,
            _ => {
                return Err(VideoError::Device(format!(
                    "unsupported pixel format: {}",
                    actual_format.fourcc
                )));
            }
        };

        let desired_frame_rate = match config.frame_rate {
            Some(frame_rate) => frame_rate,
            None => {
                let params = Capture::params(&device)?;
                params.interval.denominator as f32 / params.interval.numerator as f32
            }
        };
        let actual_params = Capture::set_params(
            &device,
            &v4l::video::capture::Parameters::with_fps(desired_frame_rate as u32),
        )?;
        let frame_rate =
            actual_params.interval.denominator as f32 / actual_params.interval.numerator as f32;

        let stream = MmapStream::with_buffers(&device, Type::VideoCapture, BUFFER_COUNT)
            .map_err(|error| VideoError::Stream(error.to_string()))?;
        self.stream = Some(stream);

        Ok(StreamInfo {
            size: self.size,
            format: self.format,
            frame_rate,
        })
    }

    fn close(&mut self) {
        self.stream.take();
    }

    fn blocking_capture(&mut self) -> Result<VideoFrame, VideoError> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(VideoError::Stream("no stream".to_string()));
        };
        let (data, _metadata) =
            CaptureStream::next(stream).map_err(|error| VideoError::Stream(error.to_string()))?;
        Ok(VideoFrame::new(Image::new(
            self.size,
            data.to_vec(),
            self.format,
        )))
    }
}
