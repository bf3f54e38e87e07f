use {
    crate::*,
    com::{Transport, TransportEvent},
    std::{sync::Arc, time::Instant},
    tokio::{
        sync::watch,
        time::{self, Instant as Deadline},
    },
    video::{CaptureSource, VideoError, VideoFrame},
};

/// Everything the controller reacts to.
#[derive(Debug)]
pub enum RelayEvent {
    Transport(TransportEvent),
    Captured(VideoFrame),
    CaptureFailed(VideoError),
    StopRequested,
    /// The deadline of the current state passed.
    TimedOut,
}

impl RelayEvent {
    fn from_transport(event: Option<TransportEvent>) -> Self {
        RelayEvent::Transport(event.unwrap_or_else(|| TransportEvent::Closed {
            clean: false,
            code: None,
            reason: "transport ended without a close event".to_string(),
        }))
    }
}

/// Counters for one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    pub frames_captured: u64,
    /// Stale or degenerate frames that were never encoded.
    pub frames_discarded: u64,
    pub frames_sent: u64,
    pub frames_rendered: u64,
    pub encode_failures: u64,
    pub decode_failures: u64,
    pub capture_failures: u64,
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub state: SessionState,
    pub stats: RelayStats,
}

/// Asks a running session to wind down. Cloneable, usable from anywhere.
#[derive(Clone, Debug)]
pub struct StopHandle {
    sender: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.sender.borrow()
    }
}

struct InFlight {
    sequence: u64,
    sent_at: Instant,
}

/// Runs one relay session: capture, encode, send, wait for the reply, render, repeat.
///
/// At most one frame is in flight. Every state change goes through
/// [`RelayController::handle`], and the capture source and transport are
/// torn down on every way out of the session.
pub struct RelayController<C, E, S> {
    config: RelayConfig,
    capture: C,
    encoder: E,
    sink: S,
    state: SessionState,
    status: watch::Sender<RelayStatus>,
    stop: Arc<watch::Sender<bool>>,
    stop_requested: bool,
    stats: RelayStats,
    // frames captured before this instant predate the current Live period
    live_since: Option<Instant>,
    in_flight: Option<InFlight>,
    next_sequence: u64,
    deadline: Option<Deadline>,
    retry_at: Option<Deadline>,
    consecutive_capture_failures: u32,
    transport_closed: bool,
    close_sent: bool,
    capture_released: bool,
}

impl<C: CaptureSource, E: FrameEncoder, S: FrameSink> RelayController<C, E, S> {
    pub fn new(config: RelayConfig, capture: C, encoder: E, sink: S) -> Self {
        let (status, _) = watch::channel(RelayStatus::Offline(None));
        let (stop, _) = watch::channel(false);
        Self {
            config,
            capture,
            encoder,
            sink,
            state: SessionState::Idle,
            status,
            stop: Arc::new(stop),
            stop_requested: false,
            stats: RelayStats::default(),
            live_since: None,
            in_flight: None,
            next_sequence: 0,
            deadline: None,
            retry_at: None,
            consecutive_capture_failures: 0,
            transport_closed: false,
            close_sent: false,
            capture_released: false,
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            sender: Arc::clone(&self.stop),
        }
    }

    pub fn status(&self) -> watch::Receiver<RelayStatus> {
        self.status.subscribe()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn stats(&self) -> RelayStats {
        self.stats
    }

    /// Open a transport with `open` and drive the session until it is idle or failed.
    ///
    /// `open` receives the configured endpoint; in production it is
    /// `com::WsSession::open`.
    pub async fn run<T, F>(mut self, open: F) -> SessionReport
    where
        T: Transport,
        F: FnOnce(&str) -> T,
    {
        log::info!("relay session starting: {}", self.config.endpoint());
        self.transition(SessionState::Connecting);
        let mut transport = open(self.config.endpoint());

        while !self.state.is_finished() {
            let event = self.next_event(&mut transport).await;
            self.handle(event, &mut transport);
        }

        // dropping the transport releases the connection
        drop(transport);
        self.release_capture();

        match &self.state {
            SessionState::Failed(reason) => log::warn!("relay session failed: {}", reason),
            _ => log::info!(
                "relay session stopped: {} frames rendered",
                self.stats.frames_rendered
            ),
        }
        SessionReport {
            state: self.state,
            stats: self.stats,
        }
    }

    // Wait at the suspension point of the current state.
    async fn next_event<T: Transport>(&mut self, transport: &mut T) -> RelayEvent {
        let mut stop = self.stop.subscribe();
        let watch_stop = !self.stop_requested;

        if self.state == SessionState::Live {
            let retry_at = self.retry_at;
            let capture_timeout = self.config.capture_timeout();
            let capture = &mut self.capture;
            let frame = async move {
                if let Some(retry_at) = retry_at {
                    time::sleep_until(retry_at).await;
                }
                time::timeout(capture_timeout, capture.capture()).await
            };

            tokio::select! {
                biased;
                _ = stop.wait_for(|stopped| *stopped), if watch_stop => RelayEvent::StopRequested,
                event = transport.next_event() => RelayEvent::from_transport(event),
                result = frame => match result {
                    Ok(Ok(frame)) => RelayEvent::Captured(frame),
                    Ok(Err(error)) => RelayEvent::CaptureFailed(error),
                    Err(_) => RelayEvent::CaptureFailed(VideoError::Unavailable(format!(
                        "no frame within {:?}",
                        capture_timeout
                    ))),
                },
            }
        } else {
            let deadline = self.deadline;
            let timer = async move {
                match deadline {
                    Some(deadline) => time::sleep_until(deadline).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                biased;
                _ = stop.wait_for(|stopped| *stopped), if watch_stop => RelayEvent::StopRequested,
                event = transport.next_event(), if !self.transport_closed => RelayEvent::from_transport(event),
                _ = timer => RelayEvent::TimedOut,
            }
        }
    }

    /// Apply one event to the session. This is the only place the state changes.
    pub fn handle<T: Transport>(&mut self, event: RelayEvent, transport: &mut T) {
        if let RelayEvent::Transport(TransportEvent::Closed { .. }) = &event {
            self.transport_closed = true;
        }

        let state = self.state.clone();
        match (state, event) {
            (_, RelayEvent::StopRequested) if self.stop_requested => {}
            (SessionState::Connecting, RelayEvent::Transport(TransportEvent::Opened)) => {
                self.enter_live();
            }
            (SessionState::Connecting, RelayEvent::Transport(TransportEvent::Closed { reason, .. })) => {
                self.fail(RelayError::Connect(reason), transport);
            }
            (SessionState::Connecting, RelayEvent::StopRequested) => {
                self.stop_requested = true;
                self.start_closing(transport);
            }
            (SessionState::Connecting, RelayEvent::TimedOut) => {
                self.fail(RelayError::Timeout("the connection to open"), transport);
            }

            (SessionState::Live, RelayEvent::Captured(frame)) => {
                self.on_captured(frame, transport);
            }
            (SessionState::Live, RelayEvent::CaptureFailed(error)) => {
                self.stats.capture_failures += 1;
                log::debug!("capture failed: {}", error);
                self.on_capture_miss(RelayError::from(error), transport);
            }
            (SessionState::Live, RelayEvent::StopRequested) => {
                self.stop_requested = true;
                self.start_closing(transport);
            }

            (SessionState::AwaitingAck, RelayEvent::Transport(TransportEvent::MessageReceived(payload))) => {
                self.render(&payload);
                self.enter_live();
            }
            (SessionState::AwaitingAck, RelayEvent::StopRequested) => {
                // the in-flight reply is still rendered if it arrives in time
                self.stop_requested = true;
                self.start_closing(transport);
            }
            (SessionState::AwaitingAck, RelayEvent::TimedOut) => {
                self.fail(RelayError::Timeout("the processed frame"), transport);
            }

            (
                SessionState::Live | SessionState::AwaitingAck,
                RelayEvent::Transport(TransportEvent::Closed { clean, code, reason }),
            ) => {
                if let Some(in_flight) = self.in_flight.take() {
                    log::debug!("discarding in-flight frame #{}", in_flight.sequence);
                }
                if clean {
                    log::info!("processor closed the connection: {}", reason);
                    self.start_closing(transport);
                } else {
                    if let Some(code) = code {
                        log::warn!("connection lost with close code {}", code);
                    }
                    self.fail(RelayError::TransportClosedUnclean { code, reason }, transport);
                }
            }
            (SessionState::Live, RelayEvent::Transport(TransportEvent::MessageReceived(payload))) => {
                log::warn!("dropping unsolicited {} byte message", payload.len());
            }

            (SessionState::Closing, RelayEvent::Transport(TransportEvent::MessageReceived(payload))) => {
                if self.in_flight.is_some() {
                    self.render(&payload);
                    self.close_transport(transport);
                } else {
                    log::debug!("dropping {} byte message while closing", payload.len());
                }
            }
            (SessionState::Closing, RelayEvent::Transport(TransportEvent::Closed { clean, reason, .. })) => {
                if !clean {
                    log::debug!("connection closed uncleanly while closing: {}", reason);
                }
                self.in_flight = None;
                self.transition(SessionState::Idle);
            }
            (SessionState::Closing, RelayEvent::TimedOut) => {
                if let Some(in_flight) = self.in_flight.take() {
                    log::warn!("no reply to frame #{} before closing", in_flight.sequence);
                    self.close_transport(transport);
                } else {
                    log::warn!("transport did not confirm the close in time");
                    self.transition(SessionState::Idle);
                }
            }

            (state, RelayEvent::Captured(_)) => {
                // only reachable if a source hands out frames outside Live
                self.stats.frames_captured += 1;
                self.stats.frames_discarded += 1;
                log::trace!("discarding frame captured while {}", state);
            }
            (state, event) => {
                log::trace!("ignoring {:?} while {}", event, state);
            }
        }
    }

    fn on_captured<T: Transport>(&mut self, frame: VideoFrame, transport: &mut T) {
        self.stats.frames_captured += 1;
        self.retry_at = None;

        if self.live_since.is_some_and(|live_since| frame.timestamp < live_since) {
            self.stats.frames_discarded += 1;
            log::trace!("discarding frame captured before the session was live");
            return;
        }
        if frame.size().is_degenerate() {
            self.stats.frames_discarded += 1;
            self.on_capture_miss(
                RelayError::CaptureUnavailable(format!("degenerate frame {}", frame.size())),
                transport,
            );
            return;
        }
        self.consecutive_capture_failures = 0;

        let mut encoded = match self.encoder.encode(frame) {
            Ok(encoded) => encoded,
            Err(error) if error.is_recoverable() => {
                self.stats.encode_failures += 1;
                log::warn!("dropping frame: {}", error);
                return;
            }
            Err(error) => {
                self.fail(error, transport);
                return;
            }
        };
        encoded.sequence = self.next_sequence;
        self.next_sequence += 1;

        let size = encoded.data.len();
        match transport.send(encoded.data) {
            Ok(()) => {
                self.stats.frames_sent += 1;
                log::trace!("sent frame #{} ({} bytes)", encoded.sequence, size);
                self.in_flight = Some(InFlight {
                    sequence: encoded.sequence,
                    sent_at: Instant::now(),
                });
                self.transition(SessionState::AwaitingAck);
            }
            Err(error) => match RelayError::from(error) {
                // an oversized frame only loses that frame
                error if error.is_recoverable() => {
                    self.stats.encode_failures += 1;
                    log::warn!("dropping frame #{}: {}", encoded.sequence, error);
                }
                error => self.fail(error, transport),
            },
        }
    }

    // A capture that produced nothing usable. Retries are rate limited and bounded.
    fn on_capture_miss<T: Transport>(&mut self, error: RelayError, transport: &mut T) {
        self.consecutive_capture_failures += 1;
        if self.consecutive_capture_failures > self.config.max_capture_retries() {
            self.fail(error, transport);
        } else {
            self.retry_at = Some(Deadline::now() + self.config.capture_retry_interval());
        }
    }

    fn render(&mut self, payload: &[u8]) {
        if let Some(in_flight) = self.in_flight.take() {
            log::trace!(
                "reply to frame #{} after {:?}",
                in_flight.sequence,
                in_flight.sent_at.elapsed()
            );
        }
        match self.sink.render(payload) {
            Ok(()) => self.stats.frames_rendered += 1,
            Err(error) => {
                self.stats.decode_failures += 1;
                log::warn!("could not render processed frame: {}", error);
            }
        }
    }

    fn enter_live(&mut self) {
        self.live_since = Some(Instant::now());
        self.transition(SessionState::Live);
    }

    fn start_closing<T: Transport>(&mut self, transport: &mut T) {
        self.transition(SessionState::Closing);
        self.release_capture();
        if self.transport_closed {
            self.transition(SessionState::Idle);
        } else if self.in_flight.is_none() {
            self.close_transport(transport);
        }
    }

    fn fail<T: Transport>(&mut self, error: RelayError, transport: &mut T) {
        self.in_flight = None;
        self.transition(SessionState::Failed(error.to_string()));
        self.release_capture();
        if !self.transport_closed {
            self.close_transport(transport);
        }
    }

    fn close_transport<T: Transport>(&mut self, transport: &mut T) {
        if !self.close_sent {
            self.close_sent = true;
            transport.close();
        }
        self.deadline = Some(Deadline::now() + self.config.close_timeout());
    }

    fn release_capture(&mut self) {
        if !self.capture_released {
            self.capture_released = true;
            self.capture.release();
        }
    }

    fn transition(&mut self, next: SessionState) {
        if !self.state.can_transition_to(&next) {
            log::error!("illegal transition {} -> {}", self.state, next);
            debug_assert!(false, "illegal transition {} -> {}", self.state, next);
            return;
        }
        log::debug!("relay: {} -> {}", self.state, next);

        self.deadline = match next {
            SessionState::Connecting => Some(Deadline::now() + self.config.connect_timeout()),
            SessionState::AwaitingAck | SessionState::Closing => {
                Some(Deadline::now() + self.config.ack_timeout())
            }
            _ => None,
        };
        if next != SessionState::Live {
            self.retry_at = None;
        }

        let status = RelayStatus::from(&next);
        self.status.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
        self.state = next;
    }
}
