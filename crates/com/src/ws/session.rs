use {
    crate::{ComError, MAX_MESSAGE_SIZE, Transport, TransportEvent},
    futures_util::{SinkExt, StreamExt},
    std::{
        sync::{
            Arc,
            atomic::{AtomicU8, Ordering},
        },
        time::Duration,
    },
    tokio::{
        net::TcpStream,
        sync::mpsc,
        task::JoinHandle,
        time::timeout,
    },
    tokio_websockets::{ClientBuilder, CloseCode, MaybeTlsStream, Message, WebSocketStream},
};

type Stream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const CONNECTING: u8 = 0;
const OPEN: u8 = 1;
const CLOSED: u8 = 2;

// upper bound on waiting for the peer to answer our close frame
const CLOSE_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

enum Command {
    Send(Vec<u8>),
    Close,
}

/// Client side of one WebSocket connection to a frame processor.
///
/// `open` returns immediately; the handshake and all socket I/O happen on a
/// connection task that reports back through [`Transport::next_event`]. The
/// task owns the socket and releases it when it finishes, after sending the
/// one and only `Closed` event. Dropping the session aborts the task.
pub struct WsSession {
    commands: mpsc::UnboundedSender<Command>,
    events: mpsc::UnboundedReceiver<TransportEvent>,
    state: Arc<AtomicU8>,
    close_requested: bool,
    task: JoinHandle<()>,
}

impl WsSession {
    /// Start connecting to `endpoint` (e.g. `ws://127.0.0.1:8000/ws_stream`).
    ///
    /// Must be called from within a tokio runtime. An unparseable endpoint or
    /// a failed handshake is reported as an unclean `Closed` event.
    pub fn open(endpoint: &str) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let state = Arc::new(AtomicU8::new(CONNECTING));

        let task = tokio::spawn(run_connection(
            endpoint.to_string(),
            command_rx,
            event_tx,
            Arc::clone(&state),
        ));

        Self {
            commands: command_tx,
            events: event_rx,
            state,
            close_requested: false,
            task,
        }
    }

    /// True between `Opened` and `Closed`.
    pub fn is_open(&self) -> bool {
        self.state.load(Ordering::Acquire) == OPEN
    }
}

impl Transport for WsSession {
    fn send(&mut self, payload: Vec<u8>) -> Result<(), ComError> {
        if self.close_requested || !self.is_open() {
            return Err(ComError::NotConnected);
        }
        if payload.len() > MAX_MESSAGE_SIZE {
            return Err(ComError::MessageTooLarge(payload.len()));
        }
        self.commands
            .send(Command::Send(payload))
            .map_err(|_| ComError::NotConnected)
    }

    fn close(&mut self) {
        if !self.close_requested {
            self.close_requested = true;
            // fails only when the task is already gone
            let _ = self.commands.send(Command::Close);
        }
    }

    async fn next_event(&mut self) -> Option<TransportEvent> {
        self.events.recv().await
    }
}

impl Drop for WsSession {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run_connection(
    endpoint: String,
    mut commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedSender<TransportEvent>,
    state: Arc<AtomicU8>,
) {
    let closed = connect_and_pump(&endpoint, &mut commands, &events, &state).await;
    state.store(CLOSED, Ordering::Release);
    if let TransportEvent::Closed { clean, code, reason } = &closed {
        log::debug!(
            "connection to {} closed (clean: {}, code: {:?}, reason: {:?})",
            endpoint,
            clean,
            code,
            reason
        );
    }
    let _ = events.send(closed);
}

// Returns the Closed event to deliver; every exit of the connection goes through here.
async fn connect_and_pump(
    endpoint: &str,
    commands: &mut mpsc::UnboundedReceiver<Command>,
    events: &mpsc::UnboundedSender<TransportEvent>,
    state: &AtomicU8,
) -> TransportEvent {
    let uri: http::Uri = match endpoint.parse() {
        Ok(uri) => uri,
        Err(error) => {
            return TransportEvent::unclean(ComError::InvalidUri(format!("{endpoint}: {error}")).to_string());
        }
    };

    log::debug!("connecting to {}", endpoint);
    let builder = ClientBuilder::from_uri(uri);
    let mut stream: Stream = tokio::select! {
        result = builder.connect() => match result {
            Ok((stream, _response)) => stream,
            Err(error) => {
                return TransportEvent::unclean(format!(
                    "connection to {endpoint} failed: {}",
                    ComError::from(error)
                ));
            }
        },
        // nothing can be sent before Opened, so any command here is a close
        _ = commands.recv() => {
            return TransportEvent::Closed {
                clean: true,
                code: None,
                reason: "closed before the connection opened".to_string(),
            };
        }
    };

    state.store(OPEN, Ordering::Release);
    let _ = events.send(TransportEvent::Opened);

    let mut close_frame: Option<(u16, String)> = None;
    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Send(payload)) => {
                    if let Err(error) = stream.send(Message::binary(payload)).await {
                        return TransportEvent::unclean(format!("send failed: {}", ComError::from(error)));
                    }
                }
                Some(Command::Close) | None => {
                    return close_gracefully(&mut stream, events).await;
                }
            },
            message = stream.next() => match message {
                Some(Ok(message)) => {
                    if message.is_binary() {
                        let payload = message.into_payload();
                        if payload.len() > MAX_MESSAGE_SIZE {
                            log::warn!("dropping oversized message: {} bytes", payload.len());
                            continue;
                        }
                        let _ = events.send(TransportEvent::MessageReceived(payload.to_vec()));
                    } else if let Some((code, reason)) = message.as_close() {
                        close_frame = Some((u16::from(code), reason.to_string()));
                    }
                    // text, ping and pong carry nothing for us
                }
                Some(Err(error)) => {
                    let code = close_frame.map(|(code, _)| code);
                    return TransportEvent::Closed {
                        clean: false,
                        code,
                        reason: ComError::from(error).to_string(),
                    };
                }
                None => {
                    return match close_frame {
                        Some((code, reason)) => TransportEvent::Closed {
                            clean: true,
                            code: Some(code),
                            reason,
                        },
                        None => TransportEvent::unclean("connection lost"),
                    };
                }
            }
        }
    }
}

async fn close_gracefully(
    stream: &mut Stream,
    events: &mpsc::UnboundedSender<TransportEvent>,
) -> TransportEvent {
    if let Err(error) = stream
        .send(Message::close(Some(CloseCode::NORMAL_CLOSURE), ""))
        .await
    {
        return TransportEvent::unclean(format!("close failed: {}", ComError::from(error)));
    }

    // wait for the peer's close reply; late frames are still delivered
    let drain = async {
        while let Some(message) = stream.next().await {
            let message = message?;
            if message.is_binary() {
                let _ = events.send(TransportEvent::MessageReceived(
                    message.into_payload().to_vec(),
                ));
            }
        }
        Ok::<(), tokio_websockets::Error>(())
    };

    match timeout(CLOSE_HANDSHAKE_TIMEOUT, drain).await {
        Ok(Ok(())) => TransportEvent::Closed {
            clean: true,
            code: Some(u16::from(CloseCode::NORMAL_CLOSURE)),
            reason: String::new(),
        },
        Ok(Err(error)) => TransportEvent::unclean(format!(
            "close handshake failed: {}",
            ComError::from(error)
        )),
        Err(_) => TransportEvent::unclean("close handshake timed out"),
    }
}
