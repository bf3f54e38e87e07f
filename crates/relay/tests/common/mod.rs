#![allow(dead_code)]

use {
    base::Vec2,
    com::{ComError, Transport, TransportEvent},
    image::{Image, PixelFormat},
    relay::{EncodedFrame, FrameEncoder, FrameSink, RelayError},
    std::{
        collections::VecDeque,
        sync::{Arc, Mutex},
        time::Instant,
    },
    video::{CaptureSource, VideoError, VideoFrame},
};

/// What the scripted transport saw, shared with the test body.
#[derive(Debug, Default)]
pub struct TransportProbe {
    pub sent: Vec<Vec<u8>>,
    pub delivered: usize,
    /// Messages delivered while no send was outstanding.
    pub unsolicited: usize,
    pub in_flight: usize,
    pub max_in_flight: usize,
    pub close_calls: usize,
}

type Responder = Box<dyn FnMut(usize, &[u8]) -> Vec<TransportEvent>>;

/// An in-memory transport that answers sends from a script.
///
/// `next_event` hands out queued events one at a time and pends forever
/// once the queue is empty.
pub struct ScriptedTransport {
    queue: VecDeque<TransportEvent>,
    responder: Responder,
    probe: Arc<Mutex<TransportProbe>>,
    open: bool,
    closed: bool,
    answer_close: bool,
    max_message_size: Option<usize>,
}

impl ScriptedTransport {
    pub fn new(
        opening: Vec<TransportEvent>,
        responder: impl FnMut(usize, &[u8]) -> Vec<TransportEvent> + 'static,
    ) -> (Self, Arc<Mutex<TransportProbe>>) {
        let probe = Arc::new(Mutex::new(TransportProbe::default()));
        let transport = Self {
            queue: opening.into(),
            responder: Box::new(responder),
            probe: Arc::clone(&probe),
            open: false,
            closed: false,
            answer_close: true,
            max_message_size: None,
        };
        (transport, probe)
    }

    /// Opens, then echoes every payload back.
    pub fn echo() -> (Self, Arc<Mutex<TransportProbe>>) {
        Self::new(vec![TransportEvent::Opened], |_, payload| {
            vec![TransportEvent::MessageReceived(payload.to_vec())]
        })
    }

    /// Never confirm a close.
    pub fn ignore_close(mut self) -> Self {
        self.answer_close = false;
        self
    }

    /// Refuse payloads longer than `size` bytes.
    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = Some(size);
        self
    }
}

impl Transport for ScriptedTransport {
    fn send(&mut self, payload: Vec<u8>) -> Result<(), ComError> {
        if !self.open || self.closed {
            return Err(ComError::NotConnected);
        }
        if self.max_message_size.is_some_and(|max| payload.len() > max) {
            return Err(ComError::MessageTooLarge(payload.len()));
        }
        let index = {
            let mut probe = self.probe.lock().unwrap();
            probe.in_flight += 1;
            probe.max_in_flight = probe.max_in_flight.max(probe.in_flight);
            probe.sent.push(payload.clone());
            probe.sent.len() - 1
        };
        let replies = (self.responder)(index, &payload);
        self.queue.extend(replies);
        Ok(())
    }

    fn close(&mut self) {
        self.probe.lock().unwrap().close_calls += 1;
        if self.answer_close && !self.closed {
            self.queue.push_back(TransportEvent::Closed {
                clean: true,
                code: Some(1000),
                reason: String::new(),
            });
        }
    }

    async fn next_event(&mut self) -> Option<TransportEvent> {
        if self.closed {
            return None;
        }
        match self.queue.pop_front() {
            Some(event) => {
                match &event {
                    TransportEvent::Opened => self.open = true,
                    TransportEvent::MessageReceived(_) => {
                        let mut probe = self.probe.lock().unwrap();
                        probe.delivered += 1;
                        match probe.in_flight.checked_sub(1) {
                            Some(in_flight) => probe.in_flight = in_flight,
                            None => probe.unsolicited += 1,
                        }
                    }
                    TransportEvent::Closed { .. } => self.closed = true,
                }
                Some(event)
            }
            None => std::future::pending().await,
        }
    }
}

/// One scripted capture result.
pub enum Step {
    /// A 1x1 frame whose pixel bytes are all `marker`, stamped when captured.
    Fresh(u8),
    /// A 4x1 frame whose pixel bytes are all `marker`.
    Wide(u8),
    /// A frame stamped in advance, e.g. before the session went live.
    Stale(VideoFrame),
    Degenerate,
    Fail,
}

#[derive(Debug, Default)]
pub struct CaptureProbe {
    pub captures: usize,
    pub release_calls: usize,
}

/// A capture source that plays a script, then either keeps producing fresh
/// frames (`endless`) or pends forever.
pub struct ScriptedCapture {
    steps: VecDeque<Step>,
    endless: Option<u8>,
    probe: Arc<Mutex<CaptureProbe>>,
}

impl ScriptedCapture {
    pub fn new(steps: Vec<Step>) -> (Self, Arc<Mutex<CaptureProbe>>) {
        let probe = Arc::new(Mutex::new(CaptureProbe::default()));
        let capture = Self {
            steps: steps.into(),
            endless: None,
            probe: Arc::clone(&probe),
        };
        (capture, probe)
    }

    /// After the script, keep producing fresh frames marked `marker`.
    pub fn endless(mut self, marker: u8) -> Self {
        self.endless = Some(marker);
        self
    }
}

pub fn marked_frame(marker: u8) -> VideoFrame {
    VideoFrame::new(Image::new(Vec2::new(1, 1), vec![marker; 3], PixelFormat::Rgb8))
}

pub fn stale_frame(marker: u8) -> Step {
    Step::Stale(VideoFrame::with_timestamp(
        Image::new(Vec2::new(1, 1), vec![marker; 3], PixelFormat::Rgb8),
        Instant::now(),
    ))
}

impl CaptureSource for ScriptedCapture {
    async fn capture(&mut self) -> Result<VideoFrame, VideoError> {
        let step = match self.steps.pop_front() {
            Some(step) => step,
            None => match self.endless {
                Some(marker) => Step::Fresh(marker),
                None => std::future::pending().await,
            },
        };
        self.probe.lock().unwrap().captures += 1;
        match step {
            Step::Fresh(marker) => Ok(marked_frame(marker)),
            Step::Wide(marker) => Ok(VideoFrame::new(Image::new(
                Vec2::new(4, 1),
                vec![marker; 12],
                PixelFormat::Rgb8,
            ))),
            Step::Stale(frame) => Ok(frame),
            Step::Degenerate => Ok(VideoFrame::new(Image::new(
                Vec2::new(0, 1),
                Vec::new(),
                PixelFormat::Rgb8,
            ))),
            Step::Fail => Err(VideoError::Unavailable("no frame".to_string())),
        }
    }

    fn release(&mut self) {
        self.probe.lock().unwrap().release_calls += 1;
    }
}

/// Sends raw pixel bytes, so payloads identify their frame.
pub struct RawEncoder;

impl FrameEncoder for RawEncoder {
    fn encode(&mut self, frame: VideoFrame) -> Result<EncodedFrame, RelayError> {
        Ok(EncodedFrame::new(frame.image.data, frame.timestamp))
    }
}

/// Like `RawEncoder`, but fails on the listed call numbers (0-based).
pub struct FlakyEncoder {
    calls: usize,
    failing: Vec<usize>,
}

impl FlakyEncoder {
    pub fn failing_on(failing: Vec<usize>) -> Self {
        Self { calls: 0, failing }
    }
}

impl FrameEncoder for FlakyEncoder {
    fn encode(&mut self, frame: VideoFrame) -> Result<EncodedFrame, RelayError> {
        let call = self.calls;
        self.calls += 1;
        if self.failing.contains(&call) {
            return Err(RelayError::Encode(format!("call {} rejected", call)));
        }
        Ok(EncodedFrame::new(frame.image.data, frame.timestamp))
    }
}

/// Fails every frame with a non-recoverable error.
pub struct BrokenEncoder;

impl FrameEncoder for BrokenEncoder {
    fn encode(&mut self, _frame: VideoFrame) -> Result<EncodedFrame, RelayError> {
        Err(RelayError::NotConnected)
    }
}

/// Records the first byte of every rendered payload; empty payloads fail to decode.
#[derive(Clone, Default)]
pub struct RecordingSink {
    pub rendered: Arc<Mutex<Vec<u8>>>,
}

impl FrameSink for RecordingSink {
    fn render(&mut self, payload: &[u8]) -> Result<(), RelayError> {
        match payload.first() {
            Some(marker) => {
                self.rendered.lock().unwrap().push(*marker);
                Ok(())
            }
            None => Err(RelayError::Decode("empty payload".to_string())),
        }
    }
}
