//! End-to-end tests against a fake V8 debug agent
//!
//! The fake engine speaks the framed protocol over an in-memory duplex
//! stream (or a real TCP socket for the CLI test), keeps its own breakpoint
//! table with V8's counting rules, and is driven by the test: `pass` runs
//! the line a breakpoint sits on once, and the engine decides whether that
//! stops execution.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use nodedebug::protocol::{codec, Connection, DebuggerClient};
use nodedebug::session::SessionState;
use nodedebug::{BreakOn, BreakpointBinding, DebugSession, Error, SessionEvent};
use serde_json::{json, Value};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

const TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
struct EngineBreakpoint {
    script: String,
    /// 0-based
    line: u32,
    enabled: bool,
    ignore_count: u32,
    hit_count: u32,
    condition: Option<String>,
}

#[derive(Default)]
struct EngineState {
    breakpoints: BTreeMap<u32, EngineBreakpoint>,
    next_id: u32,
    seq: u64,
    /// Every request received, in order
    requests: Vec<Value>,
    reject_changes: bool,
}

impl EngineState {
    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    fn commands(&self) -> Vec<String> {
        self.requests
            .iter()
            .filter_map(|r| r["command"].as_str().map(str::to_string))
            .collect()
    }
}

enum Control {
    /// Execute the line breakpoint `id` sits on
    Pass(u32),
    /// Stop without a breakpoint (step, `debugger;`)
    Pause,
    Throw(&'static str),
    Hangup,
}

struct FakeEngine {
    state: Arc<Mutex<EngineState>>,
    control: mpsc::UnboundedSender<Control>,
}

impl FakeEngine {
    fn start<S>(stream: S, node_version: &str) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let state = Arc::new(Mutex::new(EngineState {
            next_id: 1,
            ..Default::default()
        }));
        let (control, control_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_engine(
            stream,
            node_version.to_string(),
            Arc::clone(&state),
            control_rx,
        ));
        Self { state, control }
    }

    fn pass(&self, id: u32) {
        self.control.send(Control::Pass(id)).unwrap();
    }

    fn send(&self, control: Control) {
        self.control.send(control).unwrap();
    }

    fn breakpoint(&self, id: u32) -> EngineBreakpoint {
        self.state.lock().unwrap().breakpoints[&id].clone()
    }

    fn commands(&self) -> Vec<String> {
        self.state.lock().unwrap().commands()
    }

    fn last_request(&self) -> Value {
        self.state.lock().unwrap().requests.last().cloned().unwrap()
    }

    fn reject_changes(&self, reject: bool) {
        self.state.lock().unwrap().reject_changes = reject;
    }

    /// Wait until the engine has seen `command` at least `times` times
    async fn wait_for(&self, command: &str, times: usize) {
        tokio::time::timeout(TIMEOUT, async {
            loop {
                if self.commands().iter().filter(|c| *c == command).count() >= times {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("engine never received {}", command));
    }
}

async fn run_engine<S>(
    stream: S,
    node_version: String,
    state: Arc<Mutex<EngineState>>,
    mut control: mpsc::UnboundedReceiver<Control>,
) where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (read_half, mut writer) = tokio::io::split(stream);

    let handshake = format!(
        "Type: connect\r\nV8-Version: 3.14.5.9\r\nProtocol-Version: 1\r\nEmbedding-Host: node v{}\r\nContent-Length: 0\r\n\r\n",
        node_version
    );
    if writer.write_all(handshake.as_bytes()).await.is_err() {
        return;
    }

    let (frames_tx, mut frames) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut reader = BufReader::new(read_half);
        while let Ok(frame) = codec::read_frame(&mut reader).await {
            if frames_tx.send(frame.body).is_err() {
                break;
            }
        }
    });

    loop {
        let outgoing = tokio::select! {
            Some(body) = frames.recv() => {
                let request: Value = serde_json::from_str(&body).unwrap();
                Some(handle_request(&state, request))
            }
            control = control.recv() => match control {
                Some(Control::Pass(id)) => pass(&state, id),
                Some(Control::Pause) => Some(stop_event(&state, json!({
                    "sourceLine": 9,
                    "sourceColumn": 2,
                    "script": { "id": 42, "name": "app.js" }
                }))),
                Some(Control::Throw(text)) => Some(exception_event(&state, text)),
                Some(Control::Hangup) | None => {
                    let _ = writer.shutdown().await;
                    return;
                }
            },
        };

        if let Some(message) = outgoing {
            if codec::write_frame(&mut writer, &message.to_string()).await.is_err() {
                return;
            }
        }
    }
}

fn stop_event(state: &Mutex<EngineState>, body: Value) -> Value {
    let seq = state.lock().unwrap().next_seq();
    json!({ "seq": seq, "type": "event", "event": "break", "body": body })
}

fn exception_event(state: &Mutex<EngineState>, text: &str) -> Value {
    let seq = state.lock().unwrap().next_seq();
    json!({
        "seq": seq,
        "type": "event",
        "event": "exception",
        "body": {
            "uncaught": true,
            "exception": { "type": "error", "text": text },
            "sourceLine": 4,
            "script": { "id": 42, "name": "app.js" }
        }
    })
}

/// V8 counts every pass of an enabled breakpoint, ignored or not
fn pass(state: &Mutex<EngineState>, id: u32) -> Option<Value> {
    let body = {
        let mut state = state.lock().unwrap();
        let bp = state.breakpoints.get_mut(&id)?;
        if !bp.enabled {
            return None;
        }
        bp.hit_count += 1;
        if bp.ignore_count > 0 {
            bp.ignore_count -= 1;
            return None;
        }
        json!({
            "invocationText": "#<Object>.[anonymous]()",
            "sourceLine": bp.line,
            "sourceColumn": 0,
            "sourceLineText": "  tick();",
            "script": { "id": 42, "name": bp.script, "lineOffset": 0 },
            "breakpoints": [id]
        })
    };
    Some(stop_event(state, body))
}

fn handle_request(state: &Mutex<EngineState>, request: Value) -> Value {
    let mut state = state.lock().unwrap();
    state.requests.push(request.clone());

    let command = request["command"].as_str().unwrap_or_default().to_string();
    let args = &request["arguments"];
    let mut running = false;

    let result: Result<Value, String> = match command.as_str() {
        "setbreakpoint" => {
            let id = state.next_id;
            state.next_id += 1;
            let line = args["line"].as_u64().unwrap_or(0) as u32;
            let column = args["column"].as_u64().unwrap_or(0) as u32;
            let script = args["target"].as_str().unwrap_or_default().to_string();
            state.breakpoints.insert(
                id,
                EngineBreakpoint {
                    script: script.clone(),
                    line,
                    enabled: args["enabled"].as_bool().unwrap_or(true),
                    ignore_count: args["ignoreCount"].as_u64().unwrap_or(0) as u32,
                    hit_count: 0,
                    condition: args["condition"].as_str().map(str::to_string),
                },
            );
            Ok(json!({
                "type": "scriptName",
                "breakpoint": id,
                "script_name": script,
                "line": line,
                "column": column,
                "actual_locations": [{ "line": line, "column": column, "script_id": 42 }]
            }))
        }
        "changebreakpoint" => {
            let id = args["breakpoint"].as_u64().unwrap_or(0) as u32;
            let reject = state.reject_changes;
            match state.breakpoints.get_mut(&id) {
                _ if reject => Err("Breakpoint change rejected".to_string()),
                None => Err(format!("Unknown breakpoint {}", id)),
                Some(bp) => {
                    if let Some(enabled) = args["enabled"].as_bool() {
                        bp.enabled = enabled;
                    }
                    if let Some(condition) = args["condition"].as_str() {
                        bp.condition = (!condition.is_empty()).then(|| condition.to_string());
                    }
                    if let Some(ignore) = args["ignoreCount"].as_u64() {
                        bp.ignore_count = ignore as u32;
                    }
                    Ok(Value::Null)
                }
            }
        }
        "clearbreakpoint" => {
            let id = args["breakpoint"].as_u64().unwrap_or(0) as u32;
            match state.breakpoints.remove(&id) {
                Some(_) => Ok(json!({ "type": "scriptName", "breakpoint": id })),
                None => Err(format!("Unknown breakpoint {}", id)),
            }
        }
        "listbreakpoints" => {
            let breakpoints: Vec<Value> = state
                .breakpoints
                .iter()
                .map(|(id, bp)| {
                    json!({
                        "number": id,
                        "line": bp.line,
                        "column": 0,
                        "hit_count": bp.hit_count,
                        "active": bp.enabled,
                        "ignoreCount": bp.ignore_count,
                        "condition": bp.condition,
                        "script_name": bp.script
                    })
                })
                .collect();
            Ok(json!({
                "breakpoints": breakpoints,
                "breakOnExceptions": false,
                "breakOnUncaughtExceptions": false
            }))
        }
        "continue" => {
            running = true;
            Ok(Value::Null)
        }
        "disconnect" => Ok(Value::Null),
        other => Err(format!("Unknown command \"{}\"", other)),
    };

    let seq = state.next_seq();
    let mut response = json!({
        "seq": seq,
        "type": "response",
        "request_seq": request["seq"],
        "command": command,
        "running": running,
    });
    match result {
        Ok(body) => {
            response["success"] = json!(true);
            response["body"] = body;
        }
        Err(message) => {
            response["success"] = json!(false);
            response["message"] = json!(message);
        }
    }
    response
}

/// Session wired to a fake engine over an in-memory stream
async fn session_with_engine() -> (DebugSession, FakeEngine) {
    let (local, remote) = tokio::io::duplex(64 * 1024);
    let engine = FakeEngine::start(remote, "0.10.48");

    let connection = Arc::new(Connection::new());
    let client = DebuggerClient::new(Arc::clone(&connection)).unwrap();
    connection.attach_stream(local).await.unwrap();
    let session = DebugSession::from_client(client).unwrap();
    (session, engine)
}

async fn next_event(session: &mut DebugSession) -> SessionEvent {
    tokio::time::timeout(TIMEOUT, session.next_event())
        .await
        .expect("timed out waiting for a session event")
}

fn hit_counts(event: &SessionEvent) -> Vec<(u32, u32)> {
    match event {
        SessionEvent::BreakpointHit { hits, .. } => {
            hits.iter().map(|h| (h.id, h.hit_count)).collect()
        }
        other => panic!("expected a breakpoint hit, got {:?}", other),
    }
}

// === Tests ===

#[tokio::test]
async fn test_bind_reports_version_and_location() {
    let (mut session, engine) = session_with_engine().await;

    let id = session
        .add_breakpoint(BreakpointBinding::new("app.js", 12).with_condition(Some("n > 3".into())))
        .await
        .unwrap();

    assert_eq!(id, 1);
    assert_eq!(session.node_version(), Some(semver::Version::new(0, 10, 48)));

    let request = engine.last_request();
    assert_eq!(request["command"], "setbreakpoint");
    assert_eq!(request["arguments"]["type"], "script");
    assert_eq!(request["arguments"]["target"], "app.js");
    assert_eq!(request["arguments"]["line"], 11);
    assert_eq!(request["arguments"]["condition"], "n > 3");
    assert!(request["arguments"].get("ignoreCount").is_none());

    let binding = session.breakpoint(id).unwrap();
    assert!(binding.is_bound());
    assert_eq!(binding.line(), 12);
    assert_eq!(binding.hit_count(), 0);
}

#[tokio::test]
async fn test_always_breakpoint_counts_every_hit() {
    let (mut session, engine) = session_with_engine().await;
    let id = session
        .add_breakpoint(BreakpointBinding::new("app.js", 3))
        .await
        .unwrap();

    for expected in 1..=3 {
        engine.pass(id);
        let event = next_event(&mut session).await;
        assert_eq!(hit_counts(&event), vec![(id, expected)]);
        match event {
            SessionEvent::BreakpointHit { script, line, .. } => {
                assert_eq!(script.as_deref(), Some("app.js"));
                assert_eq!(line, Some(3));
            }
            _ => unreachable!(),
        }
        assert_eq!(session.state(), SessionState::Stopped);
        session.continue_execution().await.unwrap();
        assert_eq!(session.state(), SessionState::Running);
    }

    // Nothing beyond the initial bind and the resumes
    assert_eq!(
        engine.commands(),
        vec!["setbreakpoint", "continue", "continue", "continue"]
    );
}

#[tokio::test]
async fn test_equal_breakpoint_stops_once_then_disables_engine_copy() {
    let (mut session, engine) = session_with_engine().await;
    let id = session
        .add_breakpoint(BreakpointBinding::new("app.js", 5).with_break_on(BreakOn::equal(3)))
        .await
        .unwrap();

    assert_eq!(engine.breakpoint(id).ignore_count, 2);

    for _ in 0..3 {
        engine.pass(id);
    }
    let event = next_event(&mut session).await;
    assert_eq!(hit_counts(&event), vec![(id, 3)]);

    // Exactly one changebreakpoint, turning the engine copy off
    let changes: Vec<_> = engine
        .commands()
        .into_iter()
        .filter(|c| c == "changebreakpoint")
        .collect();
    assert_eq!(changes.len(), 1);
    assert!(!engine.breakpoint(id).enabled);

    let binding = session.breakpoint(id).unwrap();
    assert!(binding.enabled());
    assert!(!binding.engine_enabled());

    session.continue_execution().await.unwrap();
    for _ in 0..5 {
        engine.pass(id);
    }
    engine.send(Control::Hangup);
    assert_eq!(next_event(&mut session).await, SessionEvent::Disconnected);
}

#[tokio::test]
async fn test_mod_breakpoint_rearms_after_each_stop() {
    let (mut session, engine) = session_with_engine().await;
    let id = session
        .add_breakpoint(BreakpointBinding::new("worker.js", 40).with_break_on(BreakOn::modulo(2)))
        .await
        .unwrap();
    assert_eq!(engine.breakpoint(id).ignore_count, 1);

    for expected in [2, 4, 6] {
        engine.pass(id);
        engine.pass(id);
        let event = next_event(&mut session).await;
        assert_eq!(hit_counts(&event), vec![(id, expected)]);
        assert_eq!(engine.breakpoint(id).ignore_count, 1);
        assert_eq!(engine.breakpoint(id).hit_count, expected);
        session.continue_execution().await.unwrap();
    }
}

#[tokio::test]
async fn test_hit_count_edit_accounts_for_ignored_hits() {
    let (mut session, engine) = session_with_engine().await;
    let id = session
        .add_breakpoint(
            BreakpointBinding::new("app.js", 8).with_break_on(BreakOn::greater_than_or_equal(3)),
        )
        .await
        .unwrap();
    assert_eq!(engine.breakpoint(id).ignore_count, 2);

    // One silent pass the session never hears about
    engine.pass(id);
    engine.send(Control::Pause);
    assert!(matches!(
        next_event(&mut session).await,
        SessionEvent::Paused { .. }
    ));

    session.set_breakpoint_hit_count(id, 5).await.unwrap();
    assert!(engine.commands().contains(&"listbreakpoints".to_string()));
    assert_eq!(engine.breakpoint(id).ignore_count, 0);
    assert_eq!(session.breakpoint(id).unwrap().hit_count(), 5);

    session.continue_execution().await.unwrap();
    engine.pass(id);
    let event = next_event(&mut session).await;
    assert_eq!(hit_counts(&event), vec![(id, 6)]);
}

#[tokio::test]
async fn test_disable_and_condition_edits_reach_engine() {
    let (mut session, engine) = session_with_engine().await;
    let id = session
        .add_breakpoint(BreakpointBinding::new("app.js", 20))
        .await
        .unwrap();

    session.set_breakpoint_enabled(id, false).await.unwrap();
    assert!(!engine.breakpoint(id).enabled);
    engine.pass(id);
    engine.send(Control::Pause);
    assert!(matches!(
        next_event(&mut session).await,
        SessionEvent::Paused { .. }
    ));

    session
        .set_breakpoint_condition(id, Some("i === 7".into()))
        .await
        .unwrap();
    assert_eq!(engine.breakpoint(id).condition.as_deref(), Some("i === 7"));

    session.set_breakpoint_condition(id, None).await.unwrap();
    assert_eq!(engine.breakpoint(id).condition, None);

    session.set_breakpoint_enabled(id, true).await.unwrap();
    engine.pass(id);
    let event = next_event(&mut session).await;
    // The pass while disabled never reached the engine's counter
    assert_eq!(hit_counts(&event), vec![(id, 1)]);
}

#[tokio::test]
async fn test_rejected_edits_leave_binding_unchanged() {
    let (mut session, engine) = session_with_engine().await;
    let id = session
        .add_breakpoint(BreakpointBinding::new("app.js", 2).with_break_on(BreakOn::equal(4)))
        .await
        .unwrap();
    engine.reject_changes(true);

    let err = session.set_breakpoint_enabled(id, false).await.unwrap_err();
    assert!(matches!(err, Error::EditRejected { id: rejected, .. } if rejected == id));

    let err = session
        .set_breakpoint_break_on(id, BreakOn::modulo(3))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::EditRejected { .. }));

    let binding = session.breakpoint(id).unwrap();
    assert!(binding.enabled());
    assert_eq!(binding.break_on(), BreakOn::equal(4));
    assert!(engine.breakpoint(id).enabled);
    assert_eq!(engine.breakpoint(id).ignore_count, 3);

    engine.reject_changes(false);
    session
        .set_breakpoint_break_on(id, BreakOn::modulo(3))
        .await
        .unwrap();
    assert_eq!(engine.breakpoint(id).ignore_count, 2);
}

#[tokio::test]
async fn test_ignore_hit_shifts_mod_period() {
    let (mut session, engine) = session_with_engine().await;
    let id = session
        .add_breakpoint(BreakpointBinding::new("worker.js", 7).with_break_on(BreakOn::modulo(3)))
        .await
        .unwrap();

    for _ in 0..3 {
        engine.pass(id);
    }
    let event = next_event(&mut session).await;
    assert_eq!(hit_counts(&event), vec![(id, 3)]);
    assert_eq!(engine.breakpoint(id).ignore_count, 2);

    session.ignore_breakpoint_hit(id).await.unwrap();
    assert_eq!(session.breakpoint(id).unwrap().hit_count(), 4);
    assert_eq!(engine.breakpoint(id).ignore_count, 1);

    session.continue_execution().await.unwrap();
    engine.pass(id);
    engine.pass(id);
    let event = next_event(&mut session).await;
    assert_eq!(hit_counts(&event), vec![(id, 6)]);
}

#[tokio::test]
async fn test_ignore_hit_without_budget_is_rejected() {
    let (mut session, engine) = session_with_engine().await;
    let id = session
        .add_breakpoint(BreakpointBinding::new("app.js", 7))
        .await
        .unwrap();

    let err = session.ignore_breakpoint_hit(id).await.unwrap_err();
    assert!(matches!(err, Error::EditRejected { .. }));
    assert_eq!(engine.commands(), vec!["setbreakpoint"]);

    let err = session.ignore_breakpoint_hit(99).await.unwrap_err();
    assert!(matches!(err, Error::BreakpointNotFound { id: 99 }));
}

#[tokio::test]
async fn test_remove_breakpoint() {
    let (mut session, engine) = session_with_engine().await;
    let id = session
        .add_breakpoint(BreakpointBinding::new("app.js", 2))
        .await
        .unwrap();

    session.remove_breakpoint(id).await.unwrap();
    assert_eq!(engine.last_request()["command"], "clearbreakpoint");
    assert!(session.breakpoint(id).is_none());

    let err = session.remove_breakpoint(id).await.unwrap_err();
    assert!(matches!(err, Error::BreakpointNotFound { id: 1 }));
}

#[tokio::test]
async fn test_bound_breakpoint_cannot_be_added_twice() {
    let (mut session, engine) = session_with_engine().await;
    let id = session
        .add_breakpoint(BreakpointBinding::new("app.js", 2))
        .await
        .unwrap();

    let bound = session.breakpoint(id).unwrap().clone();
    let err = session.add_breakpoint(bound).await.unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
    assert_eq!(engine.commands(), vec!["setbreakpoint"]);
}

#[tokio::test]
async fn test_exception_event() {
    let (mut session, engine) = session_with_engine().await;
    engine.send(Control::Throw("TypeError: x is not a function"));

    match next_event(&mut session).await {
        SessionEvent::Exception {
            uncaught,
            text,
            script,
            line,
        } => {
            assert!(uncaught);
            assert_eq!(text.as_deref(), Some("TypeError: x is not a function"));
            assert_eq!(script.as_deref(), Some("app.js"));
            assert_eq!(line, Some(5));
        }
        other => panic!("expected exception, got {:?}", other),
    }
    assert_eq!(session.state(), SessionState::Stopped);
}

#[tokio::test]
async fn test_disconnect_fails_later_operations() {
    let (mut session, engine) = session_with_engine().await;
    let id = session
        .add_breakpoint(BreakpointBinding::new("app.js", 2))
        .await
        .unwrap();

    engine.send(Control::Hangup);
    assert_eq!(next_event(&mut session).await, SessionEvent::Disconnected);
    assert_eq!(session.state(), SessionState::Exited);
    // The queue stays closed
    assert_eq!(next_event(&mut session).await, SessionEvent::Disconnected);

    let err = session.continue_execution().await.unwrap_err();
    assert!(matches!(err, Error::NotConnected));
    let err = session
        .add_breakpoint(BreakpointBinding::new("app.js", 9))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotConnected));
    assert!(session.breakpoint(id).is_some());
}

#[tokio::test]
async fn test_session_disconnect_tells_engine() {
    let (mut session, engine) = session_with_engine().await;
    session
        .add_breakpoint(BreakpointBinding::new("app.js", 2))
        .await
        .unwrap();

    session.disconnect().await;
    assert_eq!(session.state(), SessionState::Exited);
    engine.wait_for("disconnect", 1).await;
    assert_eq!(engine.commands(), vec!["setbreakpoint", "disconnect"]);
    assert!(!session.client().connection().is_connected());
}

#[tokio::test]
async fn test_cli_attach_reports_hits_and_resumes() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let config_home = tempfile::tempdir().unwrap();

    let port_arg = port.to_string();
    let mut command = tokio::process::Command::new(env!("CARGO_BIN_EXE_nodedebug"));
    command
        .args([
            "attach",
            "--host",
            "127.0.0.1",
            "--port",
            port_arg.as_str(),
            "-b",
            "app.js:3",
            "-b",
            "lib/loop.js:10@mod:2",
            "--resume",
        ])
        .env("XDG_CONFIG_HOME", config_home.path())
        .env("HOME", config_home.path())
        .env("RUST_LOG", "off");
    let cli = tokio::spawn(async move { command.output().await });

    let (stream, _) = tokio::time::timeout(TIMEOUT, listener.accept())
        .await
        .expect("CLI never connected")
        .unwrap();
    let engine = FakeEngine::start(stream, "0.12.7");

    engine.wait_for("setbreakpoint", 2).await;
    engine.pass(1);
    engine.wait_for("continue", 1).await;
    engine.pass(2);
    engine.pass(2);
    engine.wait_for("continue", 2).await;
    engine.send(Control::Hangup);

    let output = tokio::time::timeout(TIMEOUT, cli)
        .await
        .expect("CLI did not exit")
        .unwrap()
        .unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "stdout: {}", stdout);
    assert!(stdout.contains(&format!("Attached to 127.0.0.1:{}", port)));
    assert!(stdout.contains("Breakpoint 1 at app.js:3 (always)"));
    assert!(stdout.contains("Breakpoint 2 at lib/loop.js:10 (mod:2)"));
    assert!(stdout.contains("Engine: node v0.12.7"));
    assert!(stdout.contains("Breakpoint 1 hit at app.js:3 (hit count 1)"));
    assert!(stdout.contains("Breakpoint 2 hit at lib/loop.js:10 (hit count 2)"));
    assert!(stdout.contains("Debugger disconnected"));
}

#[tokio::test]
async fn test_cli_rejects_bad_breakpoint_before_connecting() {
    let config_home = tempfile::tempdir().unwrap();
    let output = tokio::process::Command::new(env!("CARGO_BIN_EXE_nodedebug"))
        .args(["attach", "--port", "1", "-b", "app.js"])
        .env("XDG_CONFIG_HOME", config_home.path())
        .env("HOME", config_home.path())
        .output()
        .await
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("FILE:LINE"), "stderr: {}", stderr);
}
