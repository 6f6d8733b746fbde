//! End-to-end runs against an in-process fake runner.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_stream::stream;
use axum::body::{Body, Bytes};
use axum::extract::{Form, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::stream as fstream;
use futures_util::StreamExt;
use tokio::sync::Notify;

use kode::session::{self, ExecutionSession, SessionError, Transcript};
use kode::transport::{HttpTransport, Runnable, SessionToken, SnapshotId, Transport, TransportError};

type Params = HashMap<String, String>;

#[derive(Default)]
struct Backend {
    registered: Mutex<Vec<Params>>,
    stdin: Mutex<Vec<Params>>,
    stdin_arrived: Notify,
    snapshots: Mutex<HashMap<String, Params>>,
}

type Shared = Arc<Backend>;

async fn register(State(b): State<Shared>, Form(p): Form<Params>) -> Response {
    let lang = p.get("lang").cloned().unwrap_or_default();
    b.registered.lock().unwrap().push(p);
    match lang.as_str() {
        "cobol" => (StatusCode::BAD_REQUEST, "unsupported language\n").into_response(),
        "ruby" => "echo\n".into_response(),
        _ => "hello".into_response(),
    }
}

fn reads(parts: &'static [&'static [u8]]) -> Body {
    let s = stream! {
        for part in parts {
            yield Ok::<_, std::io::Error>(Bytes::from_static(part));
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    };
    Body::from_stream(s)
}

/// Plain stdout bytes, as the runner sends them when `evt` is not set.
async fn run(State(b): State<Shared>, Query(q): Query<Params>) -> Response {
    if q.contains_key("evt") {
        return (StatusCode::BAD_REQUEST, "event framing not expected").into_response();
    }
    match q.get("uuid").map(String::as_str) {
        Some("hello") => reads(&[b"Hello", b", ", b"World\n", b"\n", b"caf\xc3", b"\xa9\n", b"a\nb\n"]).into_response(),
        Some("echo") => {
            let s = stream! {
                yield Ok::<_, std::io::Error>(Bytes::from_static(b"ready\n"));
                loop {
                    let first = b.stdin.lock().unwrap().first().cloned();
                    if let Some(p) = first {
                        let input = p.get("input").cloned().unwrap_or_default();
                        yield Ok(Bytes::from(format!("got {}", input)));
                        break;
                    }
                    b.stdin_arrived.notified().await;
                }
            };
            Body::from_stream(s).into_response()
        }
        _ => (StatusCode::NOT_FOUND, "no such run").into_response(),
    }
}

async fn stdin(State(b): State<Shared>, Form(p): Form<Params>) -> StatusCode {
    b.stdin.lock().unwrap().push(p);
    b.stdin_arrived.notify_one();
    StatusCode::OK
}

async fn save(State(b): State<Shared>, Form(p): Form<Params>) -> String {
    let mut snapshots = b.snapshots.lock().unwrap();
    let id = p
        .get("codeID")
        .cloned()
        .unwrap_or_else(|| format!("snap{}", snapshots.len() + 1));
    snapshots.insert(id.clone(), p);
    id
}

async fn fetch(State(b): State<Shared>, Query(q): Query<Params>) -> Response {
    let id = q.get("codeID").cloned().unwrap_or_default();
    match b.snapshots.lock().unwrap().get(&id) {
        Some(p) => Json(serde_json::json!({
            "lang": p.get("lang"),
            "source": p.get("source"),
            "version": p.get("version").cloned().unwrap_or_default(),
            "timeout": 10,
        }))
        .into_response(),
        None => (StatusCode::NOT_FOUND, "snapshot not found").into_response(),
    }
}

async fn langs() -> &'static str {
    "go      1.22\nruby    2.3.0\n"
}

async fn spawn_backend() -> (Shared, HttpTransport) {
    let backend: Shared = Arc::new(Backend::default());
    let app = Router::new()
        .route("/api/register/", post(register))
        .route("/api/run/", get(run))
        .route("/api/stdin/", post(stdin))
        .route("/api/save/", post(save))
        .route("/api/fetch/", get(fetch))
        .route("/api/langs/", get(langs))
        .with_state(backend.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let transport = HttpTransport::new(
        &format!("http://{}", addr),
        Duration::from_secs(5),
        Duration::from_secs(5),
    )
    .unwrap();
    (backend, transport)
}

#[tokio::test]
async fn register_sends_form_fields() {
    let (backend, transport) = spawn_backend().await;
    let token = transport
        .register(&Runnable::new("go", None, "package main"))
        .await
        .unwrap();
    assert_eq!(token, SessionToken::new("hello"));

    let registered = backend.registered.lock().unwrap();
    assert_eq!(registered[0].get("lang").map(String::as_str), Some("go"));
    assert_eq!(registered[0].get("source").map(String::as_str), Some("package main"));
    assert!(!registered[0].contains_key("version"));
}

#[tokio::test]
async fn token_whitespace_is_trimmed() {
    let (_backend, transport) = spawn_backend().await;
    let token = transport
        .register(&Runnable::new("ruby", Some("2.3.0".into()), "puts gets"))
        .await
        .unwrap();
    assert_eq!(token.as_str(), "echo");
}

#[tokio::test]
async fn rejected_registration_carries_status_and_body() {
    let (_backend, transport) = spawn_backend().await;
    let err = transport
        .register(&Runnable::new("cobol", None, ""))
        .await
        .unwrap_err();
    match err {
        TransportError::Status { status, body } => {
            assert_eq!(status, 400);
            assert_eq!(body, "unsupported language");
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn subscription_yields_raw_output_verbatim() {
    let (_backend, transport) = spawn_backend().await;
    let stream = transport.subscribe(&SessionToken::new("hello")).await.unwrap();
    let chunks: Vec<String> = stream.map(|c| c.unwrap().0).collect().await;
    assert!(chunks.iter().all(|c| !c.is_empty()));
    assert_eq!(chunks.concat(), "Hello, World\n\ncaf\u{e9}\na\nb\n");
}

#[tokio::test]
async fn unknown_run_fails_to_subscribe() {
    let (_backend, transport) = spawn_backend().await;
    let err = transport.subscribe(&SessionToken::new("gone")).await.err().unwrap();
    assert!(matches!(err, TransportError::Status { status: 404, .. }));
}

#[tokio::test]
async fn driver_streams_full_run() {
    let (_backend, transport) = spawn_backend().await;
    let transport: Arc<dyn Transport> = Arc::new(transport);

    let mut session = ExecutionSession::new("go", None);
    let mut sink = Transcript::default();
    let runnable = session.runnable("package main");
    let summary = session::run(&mut session, transport, runnable, &mut sink, fstream::pending())
        .await
        .unwrap();

    assert_eq!(summary.token.as_str(), "hello");
    assert_eq!(sink.text, "Hello, World\n\ncaf\u{e9}\na\nb\n");
    assert!(sink.completed);
    assert!(session.is_idle());
}

#[tokio::test]
async fn driver_forwards_stdin_to_the_live_run() {
    let (backend, transport) = spawn_backend().await;
    let transport: Arc<dyn Transport> = Arc::new(transport);

    let mut session = ExecutionSession::new("ruby", None);
    let mut sink = Transcript::default();
    let runnable = session.runnable("puts gets");
    let input = fstream::iter(vec!["alice".to_string()]);
    let summary = session::run(&mut session, transport, runnable, &mut sink, input)
        .await
        .unwrap();

    assert_eq!(summary.lines_sent, 1);
    assert_eq!(sink.text, "ready\ngot alice\n");
    let sent = backend.stdin.lock().unwrap();
    assert_eq!(sent[0].get("uuid").map(String::as_str), Some("echo"));
    assert_eq!(sent[0].get("input").map(String::as_str), Some("alice\n"));
}

#[tokio::test]
async fn driver_reports_registration_failure() {
    let (_backend, transport) = spawn_backend().await;
    let transport: Arc<dyn Transport> = Arc::new(transport);

    let mut session = ExecutionSession::new("cobol", None);
    let mut sink = Transcript::default();
    let runnable = session.runnable("");
    let err = session::run(&mut session, transport, runnable, &mut sink, fstream::pending()).await;

    assert!(matches!(err, Err(SessionError::Register(_))));
    assert!(session.is_idle());
    assert!(!sink.completed);
}

#[tokio::test]
async fn snapshots_save_update_and_fetch() {
    let (backend, transport) = spawn_backend().await;

    let first = Runnable::new("ruby", Some("2.3.0".into()), "puts 1");
    let id = transport.save(&first, None).await.unwrap();
    assert_eq!(id, SnapshotId::new("snap1"));
    assert!(transport.share_url(&id).ends_with("/#snap1"));

    let second = Runnable::new("ruby", Some("2.3.0".into()), "puts 2");
    let again = transport.save(&second, Some(&id)).await.unwrap();
    assert_eq!(again, id);
    assert_eq!(backend.snapshots.lock().unwrap().len(), 1);

    let fetched = transport.fetch_snapshot(&id).await.unwrap();
    assert_eq!(fetched, second);
}

#[tokio::test]
async fn fetched_snapshot_without_version() {
    let (_backend, transport) = spawn_backend().await;
    let id = transport.save(&Runnable::new("go", None, "package main"), None).await.unwrap();
    let fetched = transport.fetch_snapshot(&id).await.unwrap();
    assert_eq!(fetched.version, None);
    assert_eq!(fetched.language, "go");
}

#[tokio::test]
async fn missing_snapshot_is_status_error() {
    let (_backend, transport) = spawn_backend().await;
    let err = transport.fetch_snapshot(&SnapshotId::new("nope")).await.unwrap_err();
    assert!(matches!(err, TransportError::Status { status: 404, .. }));
}

#[tokio::test]
async fn language_table_is_plain_text() {
    let (_backend, transport) = spawn_backend().await;
    let table = transport.languages().await.unwrap();
    assert!(table.contains("ruby    2.3.0"));
}
