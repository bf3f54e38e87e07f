use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "ws://127.0.0.1:8000/ws_stream";

/// Configuration for one relay session.
#[derive(Clone, Debug)]
pub struct RelayConfig {
    endpoint: String,
    jpeg_quality: u8,
    connect_timeout: Duration,
    ack_timeout: Duration,
    close_timeout: Duration,
    capture_timeout: Duration,
    capture_retry_interval: Duration,
    max_capture_retries: u32,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            jpeg_quality: 80,
            connect_timeout: Duration::from_secs(10),
            ack_timeout: Duration::from_secs(5),
            close_timeout: Duration::from_secs(2),
            capture_timeout: Duration::from_secs(1),
            capture_retry_interval: Duration::from_millis(20),
            max_capture_retries: 250,
        }
    }
}

impl RelayConfig {
    /// Set the processor endpoint (e.g., "ws://127.0.0.1:8000/ws_stream").
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the JPEG quality, clamped to 1-100.
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    /// Set how long to wait for the connection to open.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set how long to wait for the reply to an in-flight frame.
    pub fn with_ack_timeout(mut self, timeout: Duration) -> Self {
        self.ack_timeout = timeout;
        self
    }

    /// Set how long to wait for the transport to confirm a close.
    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }

    /// Set how long one capture attempt may take before it counts as a failure.
    pub fn with_capture_timeout(mut self, timeout: Duration) -> Self {
        self.capture_timeout = timeout;
        self
    }

    /// Set the delay between failed capture attempts.
    pub fn with_capture_retry_interval(mut self, interval: Duration) -> Self {
        self.capture_retry_interval = interval;
        self
    }

    /// Set how many consecutive capture failures are tolerated.
    pub fn with_max_capture_retries(mut self, retries: u32) -> Self {
        self.max_capture_retries = retries;
        self
    }

    // Getters
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn jpeg_quality(&self) -> u8 {
        self.jpeg_quality
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn ack_timeout(&self) -> Duration {
        self.ack_timeout
    }

    pub fn close_timeout(&self) -> Duration {
        self.close_timeout
    }

    pub fn capture_timeout(&self) -> Duration {
        self.capture_timeout
    }

    pub fn capture_retry_interval(&self) -> Duration {
        self.capture_retry_interval
    }

    pub fn max_capture_retries(&self) -> u32 {
        self.max_capture_retries
    }
}
