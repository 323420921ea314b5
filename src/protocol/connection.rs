//! Socket ownership and frame transport
//!
//! A `Connection` owns both halves of the stream. Reading happens in a
//! background task that pushes one `ConnectionEvent::Message` per frame
//! onto a queue; writing goes through a mutex so frames from concurrent
//! senders never interleave.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use tokio::io::{AsyncBufRead, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;

use crate::common::{Error, Result};

use super::codec;

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Notification from the reader side of a connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// Raw body of one received frame
    Message(String),
    /// The socket closed; sent exactly once
    Closed,
}

/// State shared with the reader task
struct Shared {
    connected: AtomicBool,
    closed: AtomicBool,
    node_version: RwLock<Option<semver::Version>>,
    events: mpsc::UnboundedSender<ConnectionEvent>,
}

impl Shared {
    /// Mark the connection closed and notify the consumer once
    fn signal_closed(&self) {
        self.connected.store(false, Ordering::SeqCst);
        if !self.closed.swap(true, Ordering::SeqCst) {
            tracing::debug!("connection closed");
            let _ = self.events.send(ConnectionEvent::Closed);
        }
    }

    fn record_version(&self, version: semver::Version) {
        if let Ok(mut slot) = self.node_version.write() {
            if slot.is_none() {
                tracing::info!(%version, "engine announced version");
                *slot = Some(version);
            }
        }
    }
}

/// Framed connection to a debugger agent
pub struct Connection {
    shared: Arc<Shared>,
    attached: AtomicBool,
    writer: tokio::sync::Mutex<Option<BoxedWriter>>,
    /// Wakes sends stuck on a peer that stopped reading
    closing: Notify,
    reader: Mutex<Option<JoinHandle<()>>>,
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<ConnectionEvent>>>,
}

impl Connection {
    /// Create an unconnected connection
    pub fn new() -> Self {
        let (events, events_rx) = mpsc::unbounded_channel();
        Self {
            shared: Arc::new(Shared {
                connected: AtomicBool::new(false),
                closed: AtomicBool::new(false),
                node_version: RwLock::new(None),
                events,
            }),
            attached: AtomicBool::new(false),
            writer: tokio::sync::Mutex::new(None),
            closing: Notify::new(),
            reader: Mutex::new(None),
            events_rx: Mutex::new(Some(events_rx)),
        }
    }

    /// Open a TCP connection to `address` and start reading
    ///
    /// Returns once the socket is open; the engine's handshake is picked up
    /// by the reader whenever it arrives.
    pub async fn connect(&self, address: &str) -> Result<()> {
        tracing::info!(address, "connecting to debugger");
        let stream = TcpStream::connect(address)
            .await
            .map_err(|source| Error::ConnectionFailed {
                address: address.to_string(),
                source,
            })?;
        let _ = stream.set_nodelay(true);
        self.attach_stream(stream).await
    }

    /// Take ownership of an already-open stream and start reading
    pub async fn attach_stream<S>(&self, stream: S) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        if self.attached.swap(true, Ordering::SeqCst) {
            return Err(Error::InvalidArgument(
                "connection already has a stream".to_string(),
            ));
        }
        if self.shared.closed.load(Ordering::SeqCst) {
            return Err(Error::ConnectionClosed);
        }

        let (read_half, write_half) = tokio::io::split(stream);
        *self.writer.lock().await = Some(Box::new(write_half));
        self.shared.connected.store(true, Ordering::SeqCst);

        let shared = Arc::clone(&self.shared);
        let handle = tokio::spawn(read_loop(BufReader::new(read_half), shared));
        if let Ok(mut reader) = self.reader.lock() {
            *reader = Some(handle);
        }
        Ok(())
    }

    /// Take the event receiver (can only be called once)
    pub fn take_receiver(&self) -> Option<mpsc::UnboundedReceiver<ConnectionEvent>> {
        self.events_rx.lock().ok().and_then(|mut rx| rx.take())
    }

    /// Send one message as a single frame
    ///
    /// Fails with `ConnectionClosed` if `close` runs while the write is
    /// still waiting on the peer.
    pub async fn send(&self, text: &str) -> Result<()> {
        // Registered before the connected check so a concurrent close
        // cannot slip in between
        let closing = self.closing.notified();
        tokio::pin!(closing);

        if !self.is_connected() {
            return Err(Error::NotConnected);
        }
        let frame = codec::encode_frame(text);

        let mut guard = tokio::select! {
            guard = self.writer.lock() => guard,
            _ = &mut closing => return Err(Error::ConnectionClosed),
        };
        let writer = guard.as_mut().ok_or(Error::NotConnected)?;
        tracing::debug!(body = %text, "send");

        let written = tokio::select! {
            result = write_and_flush(writer, &frame) => result,
            _ = &mut closing => {
                tracing::debug!("send interrupted by close");
                return Err(Error::ConnectionClosed);
            }
        };
        if let Err(e) = written {
            guard.take();
            drop(guard);
            tracing::warn!(error = %e, "write failed");
            self.shared.signal_closed();
            return Err(Error::Io(e));
        }
        Ok(())
    }

    /// Close the connection
    ///
    /// Safe to call any number of times; `Closed` is reported once, before
    /// the writer is released.
    pub async fn close(&self) {
        self.shared.signal_closed();
        self.closing.notify_waiters();
        self.abort_reader();
        let writer = self.writer.lock().await.take();
        if let Some(mut writer) = writer {
            let _ = writer.shutdown().await;
        }
    }

    /// Whether the socket is currently open
    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    /// Engine version from the handshake, once seen
    pub fn node_version(&self) -> Option<semver::Version> {
        self.shared.node_version.read().ok().and_then(|v| v.clone())
    }

    fn abort_reader(&self) {
        if let Some(handle) = self.reader.lock().ok().and_then(|mut h| h.take()) {
            handle.abort();
        }
    }
}

impl Default for Connection {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.abort_reader();
        self.shared.signal_closed();
    }
}

async fn write_and_flush(writer: &mut BoxedWriter, frame: &[u8]) -> std::io::Result<()> {
    writer.write_all(frame).await?;
    writer.flush().await
}

/// Reader task: one frame at a time until the stream ends or breaks
async fn read_loop<R: AsyncBufRead + Unpin>(mut reader: R, shared: Arc<Shared>) {
    loop {
        match codec::read_frame(&mut reader).await {
            Ok(frame) => {
                if let Some(version) = frame.engine_version() {
                    shared.record_version(version);
                }
                // The handshake frame has no body
                if frame.body.is_empty() {
                    continue;
                }
                tracing::debug!(body = %frame.body, "recv");
                if shared.events.send(ConnectionEvent::Message(frame.body)).is_err() {
                    break;
                }
            }
            Err(Error::ConnectionClosed) => {
                tracing::debug!("peer closed the stream");
                break;
            }
            Err(e) => {
                tracing::warn!(error = %e, "reader stopped");
                break;
            }
        }
    }
    shared.signal_closed();
}
