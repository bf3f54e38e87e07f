use {
    crate::RelayError,
    image::Image,
    tokio::sync::watch,
};

/// Displays processed frames as they come back.
pub trait FrameSink {
    fn render(&mut self, payload: &[u8]) -> Result<(), RelayError>;
}

/// Decodes each payload and publishes it as the latest image on a watch channel.
///
/// Whatever draws the picture subscribes with [`WatchSink::subscribe`] and
/// only ever sees the newest frame.
pub struct WatchSink {
    sender: watch::Sender<Option<Image>>,
}

impl WatchSink {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self { sender }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Image>> {
        self.sender.subscribe()
    }
}

impl Default for WatchSink {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSink for WatchSink {
    fn render(&mut self, payload: &[u8]) -> Result<(), RelayError> {
        let image = image::decode_image(payload)?;
        self.sender.send_replace(Some(image));
        Ok(())
    }
}
