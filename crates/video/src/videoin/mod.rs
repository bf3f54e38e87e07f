use {
    crate::*,
    base::Vec2,
    image::PixelFormat,
    std::{
        sync::{
            Arc,
            atomic::{AtomicBool, Ordering},
        },
        time::Duration,
    },
    tokio::{
        sync::{mpsc, oneshot},
        task::{JoinHandle, spawn_blocking},
    },
};

// small so a slow consumer only ever sees a couple of stale frames
const CHANNEL_CAPACITY: usize = 2;

// delay before reopening the device after a capture failure
const WAIT_BEFORE_RECONNECT_MS: u64 = 100;

mod testpattern;
pub use testpattern::TestPatternConfig;

#[cfg(feature = "v4l2")]
pub mod v4l2;

#[derive(Debug, Clone)]
pub enum VideoInConfig {
    TestPattern(TestPatternConfig),
    #[cfg(feature = "v4l2")]
    V4l2(v4l2::V4l2Config),
}

impl Default for VideoInConfig {
    fn default() -> Self {
        #[cfg(feature = "v4l2")]
        return VideoInConfig::V4l2(v4l2::V4l2Config::default());
        #[cfg(not(feature = "v4l2"))]
        return VideoInConfig::TestPattern(TestPatternConfig::default());
    }
}

/// What a device actually negotiated when it was opened.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamInfo {
    pub size: Vec2<usize>,
    pub format: PixelFormat,
    pub frame_rate: f32,
}

pub(crate) trait VideoInDevice: Send {
    fn open(&mut self, config: &VideoInConfig) -> Result<StreamInfo, VideoError>;
    fn close(&mut self);
    fn blocking_capture(&mut self) -> Result<VideoFrame, VideoError>;
}

/// A camera driven by a blocking worker that pushes frames into a small channel.
///
/// When the channel is full the newest frame is dropped, so a consumer that
/// falls behind never builds up a backlog.
pub struct VideoIn {
    receiver: mpsc::Receiver<VideoFrame>,
    cancel: Arc<AtomicBool>,
    info: StreamInfo,
    join_handle: Option<JoinHandle<()>>,
}

impl VideoIn {
    fn create_device(config: &VideoInConfig) -> Box<dyn VideoInDevice> {
        match config {
            VideoInConfig::TestPattern(_) => Box::new(testpattern::TestPattern::new()),
            #[cfg(feature = "v4l2")]
            VideoInConfig::V4l2(_) => Box::new(v4l2::V4l2::new()),
        }
    }

    async fn spawn_worker(
        sender: mpsc::Sender<VideoFrame>,
        config: VideoInConfig,
        cancel: Arc<AtomicBool>,
    ) -> Result<(JoinHandle<()>, StreamInfo), VideoError> {
        let mut device = Self::create_device(&config);

        // open() runs on the worker thread because some drivers want the
        // capturing thread to be the one that opened the device
        let (init_tx, init_rx) = oneshot::channel::<Result<StreamInfo, VideoError>>();

        let join_handle = spawn_blocking(move || {
            match device.open(&config) {
                Ok(info) => {
                    let _ = init_tx.send(Ok(info));
                }
                Err(error) => {
                    let _ = init_tx.send(Err(error));
                    return;
                }
            }

            'worker: while !cancel.load(Ordering::Relaxed) {
                log::debug!("video worker: starting capture loop");
                while !cancel.load(Ordering::Relaxed) {
                    match device.blocking_capture() {
                        Ok(frame) => match sender.try_send(frame) {
                            Ok(()) => {}
                            Err(mpsc::error::TrySendError::Full(_)) => {
                                log::trace!("video worker: consumer busy, frame dropped");
                            }
                            Err(mpsc::error::TrySendError::Closed(_)) => break 'worker,
                        },
                        Err(error) => {
                            log::warn!("video worker: capture failed: {}", error);
                            break;
                        }
                    }
                }

                // close, wait, and reopen the device
                while !cancel.load(Ordering::Relaxed) {
                    log::info!("video worker: reopening device");
                    device.close();
                    std::thread::sleep(Duration::from_millis(WAIT_BEFORE_RECONNECT_MS));
                    if device.open(&config).is_ok() {
                        break;
                    }
                }
            }
            device.close();
            log::debug!("video worker: stopped");
        });

        let info = init_rx
            .await
            .map_err(|_| VideoError::Device("worker thread died during init".to_string()))??;

        Ok((join_handle, info))
    }

    /// Open a device and start capturing. `None` picks the platform default.
    pub async fn open(config: Option<VideoInConfig>) -> Result<Self, VideoError> {
        let config = config.unwrap_or_default();
        let (sender, receiver) = mpsc::channel::<VideoFrame>(CHANNEL_CAPACITY);
        let cancel = Arc::new(AtomicBool::new(false));

        let (join_handle, info) =
            Self::spawn_worker(sender, config, Arc::clone(&cancel)).await?;
        log::info!(
            "video input opened: {} {:?} @ {:.1} fps",
            info.size,
            info.format,
            info.frame_rate
        );

        Ok(Self {
            receiver,
            cancel,
            info,
            join_handle: Some(join_handle),
        })
    }

    pub fn size(&self) -> Vec2<usize> {
        self.info.size
    }

    pub fn format(&self) -> PixelFormat {
        self.info.format
    }

    pub fn frame_rate(&self) -> f32 {
        self.info.frame_rate
    }

    pub fn is_released(&self) -> bool {
        self.join_handle.is_none()
    }
}

impl CaptureSource for VideoIn {
    async fn capture(&mut self) -> Result<VideoFrame, VideoError> {
        match self.receiver.recv().await {
            Some(frame) => Ok(frame),
            None => Err(VideoError::Stream("video input channel closed".to_string())),
        }
    }

    fn release(&mut self) {
        if let Some(join_handle) = self.join_handle.take() {
            log::debug!("releasing video input");
            self.cancel.store(true, Ordering::Relaxed);
            // the worker notices the closed channel on its next frame
            self.receiver.close();
            drop(join_handle);
        }
    }
}

impl Drop for VideoIn {
    fn drop(&mut self) {
        self.release();
    }
}
