use std::fmt;

#[derive(Debug)]
pub enum VideoError {
    Device(String),
    Stream(String),
    /// No frame was ready; the caller may retry.
    Unavailable(String),
    Channel(String),
}

impl VideoError {
    /// True for errors worth retrying the capture for.
    pub fn is_transient(&self) -> bool {
        matches!(self, VideoError::Unavailable(_) | VideoError::Stream(_))
    }
}

impl fmt::Display for VideoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VideoError::Device(msg) => write!(f, "device error: {msg}"),
            VideoError::Stream(msg) => write!(f, "stream error: {msg}"),
            VideoError::Unavailable(msg) => write!(f, "capture unavailable: {msg}"),
            VideoError::Channel(msg) => write!(f, "channel error: {msg}"),
        }
    }
}

impl std::error::Error for VideoError {}

impl From<std::io::Error> for VideoError {
    fn from(err: std::io::Error) -> Self {
        VideoError::Device(err.to_string())
    }
}
