use {com::ComError, image::ImageError, std::fmt, video::VideoError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    /// The connection could not be established.
    Connect(String),
    /// A send was attempted while the transport was not open.
    NotConnected,
    /// The peer or the network dropped the connection.
    TransportClosedUnclean { code: Option<u16>, reason: String },
    Encode(String),
    Decode(String),
    CaptureUnavailable(String),
    /// Waiting for the named event took too long.
    Timeout(&'static str),
}

impl RelayError {
    /// Per-frame errors that never end a session.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            RelayError::Encode(_) | RelayError::Decode(_) | RelayError::CaptureUnavailable(_)
        )
    }
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayError::Connect(msg) => write!(f, "could not connect: {msg}"),
            RelayError::NotConnected => write!(f, "not connected"),
            // close codes stay in logs, consumers only see the reason
            RelayError::TransportClosedUnclean { reason, .. } => write!(f, "connection lost: {reason}"),
            RelayError::Encode(msg) => write!(f, "encode error: {msg}"),
            RelayError::Decode(msg) => write!(f, "decode error: {msg}"),
            RelayError::CaptureUnavailable(msg) => write!(f, "camera unavailable: {msg}"),
            RelayError::Timeout(what) => write!(f, "timed out waiting for {what}"),
        }
    }
}

impl std::error::Error for RelayError {}

impl From<ComError> for RelayError {
    fn from(err: ComError) -> Self {
        match err {
            ComError::NotConnected => RelayError::NotConnected,
            ComError::MessageTooLarge(_) => RelayError::Encode(err.to_string()),
            ComError::InvalidUri(_) => RelayError::Connect(err.to_string()),
            other => RelayError::TransportClosedUnclean {
                code: None,
                reason: other.to_string(),
            },
        }
    }
}

impl From<ImageError> for RelayError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::Encode(msg) => RelayError::Encode(msg),
            ImageError::Decode(msg) => RelayError::Decode(msg),
        }
    }
}

impl From<VideoError> for RelayError {
    fn from(err: VideoError) -> Self {
        RelayError::CaptureUnavailable(err.to_string())
    }
}
