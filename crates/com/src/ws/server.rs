use {
    crate::{ComError, MAX_MESSAGE_SIZE},
    futures_util::{SinkExt, StreamExt},
    std::{
        collections::HashMap,
        net::SocketAddr,
        sync::{Arc, Mutex},
        time::Duration,
    },
    tokio::{
        net::{TcpListener, TcpStream, ToSocketAddrs},
        task::{AbortHandle, JoinHandle, spawn_blocking},
    },
    tokio_websockets::{Message, ServerBuilder},
};

const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Turns one received image into the image sent back, or `None` to skip the reply.
pub trait FrameProcessor: Send + Sync + 'static {
    fn process(&self, payload: Vec<u8>) -> Option<Vec<u8>>;
}

impl<F> FrameProcessor for F
where
    F: Fn(Vec<u8>) -> Option<Vec<u8>> + Send + Sync + 'static,
{
    fn process(&self, payload: Vec<u8>) -> Option<Vec<u8>> {
        self(payload)
    }
}

type Clients = Arc<Mutex<HashMap<SocketAddr, AbortHandle>>>;

/// The processing side of the relay: accepts WebSocket clients and answers
/// every binary message with the processor's output.
///
/// Messages of one client are processed strictly in arrival order. Dropping
/// the server tears down the listener and every client connection without a
/// closing handshake.
pub struct WsServer {
    clients: Clients,
    accept_task: JoinHandle<()>,
    local_addr: SocketAddr,
}

impl WsServer {
    /// Bind a TCP listener and start accepting WebSocket connections.
    pub async fn bind(
        addr: impl ToSocketAddrs,
        processor: impl FrameProcessor,
    ) -> Result<Self, ComError> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        let processor: Arc<dyn FrameProcessor> = Arc::new(processor);
        let clients: Clients = Arc::new(Mutex::new(HashMap::new()));

        let accept_task = tokio::spawn(accept_loop(listener, processor, Arc::clone(&clients)));
        log::info!("frame processor listening on {}", local_addr);

        Ok(Self {
            clients,
            accept_task,
            local_addr,
        })
    }

    /// Return the local address the server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Return the number of currently connected clients.
    pub fn client_count(&self) -> usize {
        match self.clients.lock() {
            Ok(clients) => clients.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}

impl Drop for WsServer {
    fn drop(&mut self) {
        self.accept_task.abort();
        let clients = match self.clients.lock() {
            Ok(mut clients) => std::mem::take(&mut *clients),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        for (_, handle) in clients {
            handle.abort();
        }
    }
}

async fn accept_loop(listener: TcpListener, processor: Arc<dyn FrameProcessor>, clients: Clients) {
    loop {
        match listener.accept().await {
            Ok((tcp_stream, addr)) => {
                let processor = Arc::clone(&processor);
                let cleanup = Arc::clone(&clients);
                // hold the lock across spawn so the task can't remove itself first
                let mut lock = match clients.lock() {
                    Ok(lock) => lock,
                    Err(poisoned) => poisoned.into_inner(),
                };
                let task = tokio::spawn(async move {
                    serve_client(tcp_stream, addr, processor).await;
                    match cleanup.lock() {
                        Ok(mut clients) => clients.remove(&addr),
                        Err(poisoned) => poisoned.into_inner().remove(&addr),
                    };
                });
                lock.insert(addr, task.abort_handle());
            }
            Err(error) => {
                log::warn!("accept error: {}", error);
                tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
            }
        }
    }
}

async fn serve_client(tcp_stream: TcpStream, addr: SocketAddr, processor: Arc<dyn FrameProcessor>) {
    let mut stream = match ServerBuilder::new().accept(tcp_stream).await {
        Ok((_request, stream)) => stream,
        Err(error) => {
            log::warn!("websocket handshake failed for {}: {}", addr, error);
            return;
        }
    };
    log::info!("client {} connected", addr);

    loop {
        match stream.next().await {
            Some(Ok(message)) => {
                if !message.is_binary() {
                    // close replies and pongs are handled by the stream itself
                    continue;
                }
                let payload = message.into_payload();
                if payload.len() > MAX_MESSAGE_SIZE {
                    log::warn!("message from {} too large: {} bytes", addr, payload.len());
                    continue;
                }
                let payload = payload.to_vec();
                let processor = Arc::clone(&processor);
                let reply = match spawn_blocking(move || processor.process(payload)).await {
                    Ok(reply) => reply,
                    Err(error) => {
                        log::warn!("processor failed for {}: {}", addr, error);
                        None
                    }
                };
                if let Some(reply) = reply {
                    if let Err(error) = stream.send(Message::binary(reply)).await {
                        log::warn!("failed to reply to {}: {}", addr, error);
                        break;
                    }
                }
            }
            Some(Err(error)) => {
                log::warn!("client {} error: {}", addr, error);
                break;
            }
            None => {
                log::info!("client {} disconnected", addr);
                break;
            }
        }
    }
}
