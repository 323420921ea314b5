//! Debugger protocol client
//!
//! Sequences outgoing commands, matches responses to requests by sequence
//! number and turns event frames into typed `DebuggerEvent`s. Correlation
//! runs in a pump task fed by the connection, so a caller awaiting a
//! response never depends on anyone draining the event queue.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::common::{Error, Result};

use super::connection::{Connection, ConnectionEvent};
use super::types::*;

type ResponseSender = oneshot::Sender<Result<ResponseMessage>>;

/// In-flight requests keyed by sequence number
#[derive(Default)]
struct PendingRequests {
    entries: HashMap<u64, (String, ResponseSender)>,
    /// Set once the connection is gone; nothing may register afterwards
    closed: bool,
}

impl PendingRequests {
    fn fail_all(&mut self) {
        self.closed = true;
        for (seq, (command, tx)) in self.entries.drain() {
            tracing::debug!(seq, command = %command, "failing pending request");
            let _ = tx.send(Err(Error::ConnectionLost { command }));
        }
    }
}

fn lock(pending: &Mutex<PendingRequests>) -> MutexGuard<'_, PendingRequests> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle to the response of one request
#[derive(Debug)]
pub struct PendingResponse {
    seq: u64,
    command: String,
    rx: oneshot::Receiver<Result<ResponseMessage>>,
}

impl PendingResponse {
    /// Sequence number assigned to the request
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Wait for the matching response
    ///
    /// Resolves with `ConnectionLost` if the connection closes first.
    pub async fn response(self) -> Result<ResponseMessage> {
        match self.rx.await {
            Ok(result) => result,
            Err(_) => Err(Error::ConnectionLost {
                command: self.command,
            }),
        }
    }
}

/// Client for a V8 debugger agent
pub struct DebuggerClient {
    connection: Arc<Connection>,
    /// Sequence number for requests
    seq: AtomicU64,
    pending: Arc<Mutex<PendingRequests>>,
    /// Last `running` flag reported by the engine
    running: Arc<AtomicBool>,
    /// Receiver for events (given to the session)
    event_rx: Option<mpsc::UnboundedReceiver<DebuggerEvent>>,
    pump: JoinHandle<()>,
}

impl DebuggerClient {
    /// Create a client on top of a connection
    ///
    /// The connection does not have to be open yet. Fails if its message
    /// queue was already claimed by another consumer.
    pub fn new(connection: Arc<Connection>) -> Result<Self> {
        let messages = connection.take_receiver().ok_or_else(|| {
            Error::InvalidArgument("connection messages are already consumed".to_string())
        })?;

        let pending = Arc::new(Mutex::new(PendingRequests::default()));
        let running = Arc::new(AtomicBool::new(false));
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let pump = tokio::spawn(run_pump(
            messages,
            Arc::clone(&pending),
            Arc::clone(&running),
            event_tx,
        ));

        Ok(Self {
            connection,
            seq: AtomicU64::new(1),
            pending,
            running,
            event_rx: Some(event_rx),
            pump,
        })
    }

    /// Take the event receiver (can only be called once)
    pub fn take_event_receiver(&mut self) -> Option<mpsc::UnboundedReceiver<DebuggerEvent>> {
        self.event_rx.take()
    }

    /// The underlying connection
    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    /// Whether the engine last reported the script as running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Number of requests still waiting for a response
    pub fn pending_count(&self) -> usize {
        lock(&self.pending).entries.len()
    }

    /// Get the next sequence number
    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst)
    }

    /// Send a request and return a handle to its response
    pub async fn send_request(
        &self,
        command: &str,
        arguments: Option<Value>,
    ) -> Result<PendingResponse> {
        let seq = self.next_seq();
        let json = serde_json::to_string(&RequestMessage::new(seq, command, arguments))?;

        let (tx, rx) = oneshot::channel();
        {
            let mut pending = lock(&self.pending);
            if pending.closed {
                return Err(Error::ConnectionLost {
                    command: command.to_string(),
                });
            }
            pending.entries.insert(seq, (command.to_string(), tx));
        }

        tracing::debug!(seq, command, "request");
        if let Err(e) = self.connection.send(&json).await {
            lock(&self.pending).entries.remove(&seq);
            return Err(e);
        }

        Ok(PendingResponse {
            seq,
            command: command.to_string(),
            rx,
        })
    }

    /// Send a request and wait for a successful response body
    pub async fn request<T: serde::de::DeserializeOwned>(
        &self,
        command: &str,
        arguments: Option<Value>,
    ) -> Result<T> {
        let response = self.send_request(command, arguments).await?.response().await?;

        if !response.success {
            return Err(Error::request_failed(
                command,
                response.message.as_deref().unwrap_or("Unknown error"),
            ));
        }

        let body = response.body.unwrap_or(Value::Null);
        serde_json::from_value(body).map_err(|e| {
            Error::Protocol(format!("Failed to parse {} response: {}", command, e))
        })
    }

    /// Bind a breakpoint
    pub async fn set_breakpoint(
        &self,
        args: &SetBreakpointArguments,
    ) -> Result<SetBreakpointResponseBody> {
        self.request("setbreakpoint", Some(serde_json::to_value(args)?))
            .await
    }

    /// Send a changebreakpoint request without waiting for the response
    pub async fn change_breakpoint(
        &self,
        args: &ChangeBreakpointArguments,
    ) -> Result<PendingResponse> {
        self.send_request("changebreakpoint", Some(serde_json::to_value(args)?))
            .await
    }

    /// Unbind a breakpoint
    pub async fn clear_breakpoint(&self, id: u32) -> Result<()> {
        let args = ClearBreakpointArguments { breakpoint: id };
        self.request::<Value>("clearbreakpoint", Some(serde_json::to_value(&args)?))
            .await?;
        Ok(())
    }

    /// List all breakpoints known to the engine
    pub async fn list_breakpoints(&self) -> Result<ListBreakpointsResponseBody> {
        self.request("listbreakpoints", None).await
    }

    /// Resume execution
    pub async fn continue_execution(&self) -> Result<()> {
        self.request::<Value>("continue", None).await?;
        Ok(())
    }

    /// Close the underlying connection; outstanding requests fail
    pub async fn close(&self) {
        self.connection.close().await;
    }
}

impl Drop for DebuggerClient {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

/// Route connection messages until the connection closes
async fn run_pump(
    mut messages: mpsc::UnboundedReceiver<ConnectionEvent>,
    pending: Arc<Mutex<PendingRequests>>,
    running: Arc<AtomicBool>,
    events: mpsc::UnboundedSender<DebuggerEvent>,
) {
    while let Some(message) = messages.recv().await {
        match message {
            ConnectionEvent::Message(body) => {
                dispatch_message(&body, &pending, &running, &events);
            }
            ConnectionEvent::Closed => break,
        }
    }
    lock(&pending).fail_all();
    let _ = events.send(DebuggerEvent::Disconnected);
}

fn dispatch_message(
    body: &str,
    pending: &Mutex<PendingRequests>,
    running: &AtomicBool,
    events: &mpsc::UnboundedSender<DebuggerEvent>,
) {
    let msg: Value = match serde_json::from_str(body) {
        Ok(msg) => msg,
        Err(e) => {
            tracing::warn!(error = %e, "dropping message that is not JSON");
            return;
        }
    };

    if let Some(flag) = msg.get("running").and_then(Value::as_bool) {
        running.store(flag, Ordering::SeqCst);
    }

    let msg_type = msg
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();

    match msg_type.as_str() {
        "response" => {
            let response: ResponseMessage = match serde_json::from_value(msg) {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(error = %e, "malformed response");
                    return;
                }
            };
            let entry = lock(pending).entries.remove(&response.request_seq);
            match entry {
                Some((_, tx)) => {
                    let _ = tx.send(Ok(response));
                }
                None => {
                    tracing::warn!(
                        request_seq = response.request_seq,
                        "response for unknown request"
                    );
                }
            }
        }
        "event" => match serde_json::from_value::<EventMessage>(msg) {
            Ok(event_msg) => {
                tracing::debug!(event = %event_msg.event, "event");
                let _ = events.send(DebuggerEvent::from_message(&event_msg));
            }
            Err(e) => tracing::warn!(error = %e, "malformed event"),
        },
        _ => {
            tracing::warn!("Unknown message type: {}", msg_type);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::codec;
    use serde_json::json;
    use tokio::io::{AsyncWriteExt, BufReader, DuplexStream, ReadHalf, WriteHalf};

    struct Peer {
        reader: BufReader<ReadHalf<DuplexStream>>,
        writer: WriteHalf<DuplexStream>,
    }

    impl Peer {
        async fn next_request(&mut self) -> Value {
            let frame = codec::read_frame(&mut self.reader).await.unwrap();
            serde_json::from_str(&frame.body).unwrap()
        }

        async fn send(&mut self, value: Value) {
            let body = value.to_string();
            self.writer
                .write_all(&codec::encode_frame(&body))
                .await
                .unwrap();
        }
    }

    async fn connected() -> (DebuggerClient, Peer) {
        let (local, remote) = tokio::io::duplex(8192);
        let connection = Arc::new(Connection::new());
        let client = DebuggerClient::new(Arc::clone(&connection)).unwrap();
        connection.attach_stream(local).await.unwrap();

        let (read, write) = tokio::io::split(remote);
        (
            client,
            Peer {
                reader: BufReader::new(read),
                writer: write,
            },
        )
    }

    fn response(request_seq: u64, body: Value) -> Value {
        json!({
            "seq": 100 + request_seq, "type": "response", "request_seq": request_seq,
            "command": "test", "success": true, "body": body, "running": false
        })
    }

    #[tokio::test]
    async fn responses_match_their_requests_in_any_order() {
        let (client, mut peer) = connected().await;

        let first = client.send_request("first", None).await.unwrap();
        let second = client.send_request("second", None).await.unwrap();
        assert_eq!(first.seq(), 1);
        assert_eq!(second.seq(), 2);

        assert_eq!(peer.next_request().await["command"], "first");
        assert_eq!(peer.next_request().await["command"], "second");

        peer.send(response(2, json!({ "which": 2 }))).await;
        peer.send(response(1, json!({ "which": 1 }))).await;

        let first = first.response().await.unwrap();
        let second = second.response().await.unwrap();
        assert_eq!(first.body.unwrap()["which"], 1);
        assert_eq!(second.body.unwrap()["which"], 2);
        assert_eq!(client.pending_count(), 0);
    }

    #[tokio::test]
    async fn events_do_not_consume_pending_requests() {
        let (mut client, mut peer) = connected().await;
        let mut events = client.take_event_receiver().unwrap();

        let pending = client.send_request("listbreakpoints", None).await.unwrap();
        peer.next_request().await;

        peer.send(json!({
            "seq": 7, "type": "event", "event": "afterCompile",
            "body": { "script": { "id": 42, "name": "lib.js" } }
        }))
        .await;
        peer.send(response(1, json!({ "breakpoints": [] }))).await;

        assert!(pending.response().await.unwrap().success);
        match events.recv().await.unwrap() {
            DebuggerEvent::AfterCompile(body) => {
                assert_eq!(body.script.name.as_deref(), Some("lib.js"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn failed_response_becomes_request_error() {
        let (client, mut peer) = connected().await;

        let task = tokio::spawn(async move {
            let result = client.request::<Value>("clearbreakpoint", None).await;
            (client, result)
        });
        let request = peer.next_request().await;
        peer.send(json!({
            "seq": 3, "type": "response", "request_seq": request["seq"],
            "command": "clearbreakpoint", "success": false, "message": "Unknown breakpoint"
        }))
        .await;

        let (_client, result) = task.await.unwrap();
        match result {
            Err(Error::RequestFailed { command, message }) => {
                assert_eq!(command, "clearbreakpoint");
                assert_eq!(message, "Unknown breakpoint");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn connection_loss_fails_pending_once() {
        let (mut client, mut peer) = connected().await;
        let mut events = client.take_event_receiver().unwrap();

        let pending = client.send_request("continue", None).await.unwrap();
        peer.next_request().await;

        client.close().await;
        client.close().await;

        assert!(matches!(
            pending.response().await,
            Err(Error::ConnectionLost { .. })
        ));
        assert!(matches!(
            events.recv().await,
            Some(DebuggerEvent::Disconnected)
        ));
        assert!(events.try_recv().is_err());
        assert_eq!(client.pending_count(), 0);

        assert!(client.send_request("continue", None).await.is_err());
    }

    #[tokio::test]
    async fn running_flag_tracks_engine() {
        let (client, mut peer) = connected().await;

        let pending = client.send_request("continue", None).await.unwrap();
        peer.next_request().await;
        peer.send(json!({
            "seq": 9, "type": "response", "request_seq": 1,
            "command": "continue", "success": true, "running": true
        }))
        .await;

        pending.response().await.unwrap();
        assert!(client.is_running());
    }

    #[tokio::test]
    async fn unknown_response_is_ignored() {
        let (client, mut peer) = connected().await;

        let pending = client.send_request("listbreakpoints", None).await.unwrap();
        peer.next_request().await;
        peer.send(response(77, json!({}))).await;
        peer.send(json!("not an envelope")).await;
        peer.send(response(1, json!({}))).await;

        assert!(pending.response().await.unwrap().success);
    }

    #[tokio::test]
    async fn connection_queue_can_only_be_claimed_once() {
        let connection = Arc::new(Connection::new());
        let _client = DebuggerClient::new(Arc::clone(&connection)).unwrap();

        assert!(matches!(
            DebuggerClient::new(connection),
            Err(Error::InvalidArgument(_))
        ));
    }
}
