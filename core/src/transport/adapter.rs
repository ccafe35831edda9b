/// Client-side transport adapter
///
/// Owns the TCP channel to the chat server: authenticates with the user id
/// on connect, decodes inbound frames into an event queue, and pushes
/// outbound events fire-and-forget. On a dropped link it retries the dial
/// a bounded number of times with a fixed delay before parking in a
/// permanent disconnected state; while down, sends fail fast with
/// `NotConnected` instead of queueing.
use crate::config::Config;
use crate::error::{ChatError, Result};
use crate::transport::wire::{Frame, WireEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

/// What the adapter hands to its consumer
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// Channel is up and authenticated (initial connect or reconnect)
    Connected,
    /// An event arrived from the server
    Inbound(WireEvent),
    /// Reconnect budget exhausted; the channel is permanently down
    Disconnected,
}

#[derive(Clone)]
pub struct TransportAdapter {
    config: Config,
    connected: Arc<AtomicBool>,
    shutting_down: Arc<AtomicBool>,
    outbound: Arc<Mutex<Option<mpsc::UnboundedSender<WireEvent>>>>,
}

impl TransportAdapter {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            connected: Arc::new(AtomicBool::new(false)),
            shutting_down: Arc::new(AtomicBool::new(false)),
            outbound: Arc::new(Mutex::new(None)),
        }
    }

    /// Establish the channel and authenticate with `user_id`.
    /// Returns the inbound event queue for the session to drain.
    pub async fn connect(&self, user_id: &str) -> Result<mpsc::UnboundedReceiver<TransportEvent>> {
        let stream = self.dial().await?;
        info!("Connected to chat server at {}", self.config.server_addr);

        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        {
            let mut outbound = self.outbound.lock().await;
            *outbound = Some(outbound_tx);
        }
        self.shutting_down.store(false, Ordering::SeqCst);
        self.connected.store(true, Ordering::SeqCst);

        let adapter = self.clone();
        let user_id = user_id.to_string();
        tokio::spawn(async move {
            adapter.run(stream, user_id, outbound_rx, inbound_tx).await;
        });

        Ok(inbound_rx)
    }

    /// Tear the channel down. No reconnect is attempted; callers must
    /// clear presence and typing state afterwards.
    pub async fn disconnect(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
        let mut outbound = self.outbound.lock().await;
        // Dropping the sender ends the writer loop
        outbound.take();
        info!("Disconnected from chat server");
    }

    /// Fire-and-forget emit. Fails fast when the link is down.
    pub async fn send(&self, event: WireEvent) -> Result<()> {
        if !self.is_connected() {
            return Err(ChatError::NotConnected);
        }
        let outbound = self.outbound.lock().await;
        match outbound.as_ref() {
            Some(tx) => tx.send(event).map_err(|_| ChatError::NotConnected),
            None => Err(ChatError::NotConnected),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst) && !self.shutting_down.load(Ordering::SeqCst)
    }

    async fn dial(&self) -> Result<TcpStream> {
        match timeout(
            self.config.connection_timeout,
            TcpStream::connect(self.config.server_addr),
        )
        .await
        {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(e)) => Err(ChatError::Transport(format!(
                "connect to {} failed: {}",
                self.config.server_addr, e
            ))),
            Err(_) => Err(ChatError::Timeout(format!(
                "connect to {} timed out",
                self.config.server_addr
            ))),
        }
    }

    /// Connection loop: one iteration per connection generation
    async fn run(
        &self,
        mut stream: TcpStream,
        user_id: String,
        mut outbound_rx: mpsc::UnboundedReceiver<WireEvent>,
        inbound_tx: mpsc::UnboundedSender<TransportEvent>,
    ) {
        loop {
            if let Err(e) = Self::authenticate(&mut stream, &user_id).await {
                warn!("Auth frame failed: {}", e);
            } else if !self.shutting_down.load(Ordering::SeqCst) {
                self.connected.store(true, Ordering::SeqCst);
                let _ = inbound_tx.send(TransportEvent::Connected);
            }

            let (read_half, write_half) = stream.into_split();
            let mut reader = {
                let inbound_tx = inbound_tx.clone();
                tokio::spawn(async move { Self::read_loop(read_half, inbound_tx).await })
            };

            let clean_exit = Self::write_loop(write_half, &mut outbound_rx, &mut reader).await;
            reader.abort();
            self.connected.store(false, Ordering::SeqCst);

            if clean_exit || self.shutting_down.load(Ordering::SeqCst) {
                debug!("Transport loop shutting down");
                return;
            }

            match self.reconnect().await {
                Some(new_stream) => {
                    stream = new_stream;
                }
                None => {
                    warn!(
                        "Reconnect budget exhausted after {} attempts",
                        self.config.reconnect_attempts
                    );
                    let mut outbound = self.outbound.lock().await;
                    outbound.take();
                    let _ = inbound_tx.send(TransportEvent::Disconnected);
                    return;
                }
            }
        }
    }

    async fn authenticate(stream: &mut TcpStream, user_id: &str) -> Result<()> {
        let auth = WireEvent::Auth {
            user_id: user_id.to_string(),
        };
        let frame = Frame::from_event(&auth)?;
        stream.write_all(&frame.to_bytes()).await?;
        Ok(())
    }

    /// Decode inbound frames until the link drops
    async fn read_loop(
        mut read_half: OwnedReadHalf,
        inbound_tx: mpsc::UnboundedSender<TransportEvent>,
    ) {
        let mut len_buf = [0u8; 4];
        loop {
            match read_half.read_exact(&mut len_buf).await {
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    debug!("Connection closed by server");
                    return;
                }
                Err(e) => {
                    warn!("Transport read error: {}", e);
                    return;
                }
            }

            let length = u32::from_be_bytes(len_buf) as usize;
            let mut payload = vec![0u8; length];
            if let Err(e) = read_half.read_exact(&mut payload).await {
                warn!("Transport read error: {}", e);
                return;
            }

            match WireEvent::from_bytes(&payload) {
                Ok(event) => {
                    debug!("Inbound {}", event);
                    if inbound_tx.send(TransportEvent::Inbound(event)).is_err() {
                        // Consumer gone; nothing left to deliver to
                        return;
                    }
                }
                Err(e) => warn!("Dropping undecodable frame: {}", e),
            }
        }
    }

    /// Push outbound events until the channel closes or the reader dies.
    /// Returns true on a clean close (sender dropped).
    async fn write_loop(
        mut write_half: OwnedWriteHalf,
        outbound_rx: &mut mpsc::UnboundedReceiver<WireEvent>,
        reader: &mut tokio::task::JoinHandle<()>,
    ) -> bool {
        loop {
            tokio::select! {
                maybe_event = outbound_rx.recv() => {
                    match maybe_event {
                        Some(event) => {
                            let frame = match Frame::from_event(&event) {
                                Ok(f) => f,
                                Err(e) => {
                                    warn!("Failed to encode {}: {}", event, e);
                                    continue;
                                }
                            };
                            if let Err(e) = write_half.write_all(&frame.to_bytes()).await {
                                warn!("Transport write error: {}", e);
                                return false;
                            }
                        }
                        None => return true,
                    }
                }
                _ = &mut *reader => {
                    return false;
                }
            }
        }
    }

    /// Bounded retry with fixed backoff
    async fn reconnect(&self) -> Option<TcpStream> {
        for attempt in 1..=self.config.reconnect_attempts {
            sleep(self.config.reconnect_delay).await;
            if self.shutting_down.load(Ordering::SeqCst) {
                return None;
            }
            match self.dial().await {
                Ok(stream) => {
                    info!("Reconnected on attempt {}", attempt);
                    return Some(stream);
                }
                Err(e) => {
                    warn!(
                        "Reconnect attempt {}/{} failed: {}",
                        attempt, self.config.reconnect_attempts, e
                    );
                }
            }
        }
        None
    }
}
