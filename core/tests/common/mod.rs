/// Shared test support: a minimal in-process chat server speaking the
/// length-prefixed wire protocol, one client connection at a time.
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use vanishlink_core::transport::{Frame, WireEvent};

pub struct MockServer {
    pub addr: SocketAddr,
    /// Events the client sent us
    pub received: mpsc::UnboundedReceiver<WireEvent>,
    push_tx: mpsc::UnboundedSender<WireEvent>,
    handle: JoinHandle<()>,
}

impl MockServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (received_tx, received) = mpsc::unbounded_channel();
        let (push_tx, push_rx) = mpsc::unbounded_channel();
        let push_rx = Arc::new(Mutex::new(push_rx));

        let handle = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                serve(stream, received_tx.clone(), push_rx.clone()).await;
            }
        });

        Self {
            addr,
            received,
            push_tx,
            handle,
        }
    }

    /// Push an event down to the connected client
    pub fn push(&self, event: WireEvent) {
        self.push_tx.send(event).unwrap();
    }

    /// Wait for the next event the client sent
    pub async fn next_received(&mut self) -> WireEvent {
        tokio::time::timeout(std::time::Duration::from_secs(5), self.received.recv())
            .await
            .expect("timed out waiting for client event")
            .expect("server channel closed")
    }

    pub fn stop(self) {
        self.handle.abort();
    }
}

async fn serve(
    stream: TcpStream,
    received_tx: mpsc::UnboundedSender<WireEvent>,
    push_rx: Arc<Mutex<mpsc::UnboundedReceiver<WireEvent>>>,
) {
    let (read_half, write_half) = stream.into_split();
    let mut reader = tokio::spawn(read_frames(read_half, received_tx));
    let mut push_rx = push_rx.lock().await;
    write_frames(write_half, &mut push_rx, &mut reader).await;
    reader.abort();
}

async fn read_frames(mut read_half: OwnedReadHalf, received_tx: mpsc::UnboundedSender<WireEvent>) {
    let mut len_buf = [0u8; 4];
    loop {
        if read_half.read_exact(&mut len_buf).await.is_err() {
            return;
        }
        let length = u32::from_be_bytes(len_buf) as usize;
        let mut payload = vec![0u8; length];
        if read_half.read_exact(&mut payload).await.is_err() {
            return;
        }
        if let Ok(event) = WireEvent::from_bytes(&payload) {
            if received_tx.send(event).is_err() {
                return;
            }
        }
    }
}

async fn write_frames(
    mut write_half: OwnedWriteHalf,
    push_rx: &mut mpsc::UnboundedReceiver<WireEvent>,
    reader: &mut JoinHandle<()>,
) {
    loop {
        tokio::select! {
            maybe_event = push_rx.recv() => {
                match maybe_event {
                    Some(event) => {
                        let frame = Frame::from_event(&event).unwrap();
                        if write_half.write_all(&frame.to_bytes()).await.is_err() {
                            return;
                        }
                    }
                    None => return,
                }
            }
            _ = &mut *reader => {
                return;
            }
        }
    }
}
