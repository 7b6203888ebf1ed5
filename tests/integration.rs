//! Integration tests for vizlink against a real server
//!
//! An in-process axum server speaks the visualization server's protocol on
//! `/ws` (WebSocket) and `/rpc` (HTTP request/response).

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, post},
    Json, Router,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use vizlink::{
    ErrorCode, EventKind, RpcClient, RpcConfig, RpcError, TransportClient, TransportConfig,
    TransportEvent, TransportMode,
};

#[derive(Clone, Default)]
struct ServerState {
    /// Sec-WebSocket-Protocol offered on each upgrade
    protocols: Arc<Mutex<Vec<Option<String>>>>,
    /// Authorization header on each /rpc request
    authorizations: Arc<Mutex<Vec<Option<String>>>>,
}

/// JSON-RPC and transport replies for one inbound frame
fn respond(frame: &Value) -> Vec<Value> {
    match frame.get("type").and_then(Value::as_str) {
        Some("subscribe") => return vec![json!({"type": "subscribed", "topics": frame["topics"]})],
        Some("ping") => return vec![json!({"type": "pong"})],
        _ => {}
    }

    let method = frame["method"].as_str().unwrap_or_default();
    let Some(id) = frame.get("id") else {
        // Notification: broadcast it back along with a typed event
        return match method {
            "broadcast" => vec![
                json!({"jsonrpc": "2.0", "method": "broadcast", "params": frame["params"]}),
                json!({"type": "model.updated", "timestamp": "2026-01-01T00:00:00Z"}),
            ],
            _ => Vec::new(),
        };
    };

    match method {
        "echo" => vec![json!({"jsonrpc": "2.0", "result": frame["params"], "id": id})],
        "silent" => Vec::new(),
        _ => vec![json!({
            "jsonrpc": "2.0",
            "error": {
                "code": ErrorCode::METHOD_NOT_FOUND,
                "message": format!("Method not found: {}", method),
            },
            "id": id,
        })],
    }
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    State(state): State<ServerState>,
) -> Response {
    let protocol = headers
        .get(header::SEC_WEBSOCKET_PROTOCOL)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    state.protocols.lock().push(protocol.clone());

    // The client requires the offered protocol to be echoed back
    let ws = match protocol {
        Some(protocol) => ws.protocols([protocol]),
        None => ws,
    };
    ws.on_upgrade(handle_socket)
}

async fn handle_socket(mut socket: WebSocket) {
    let greeting = json!({"type": "connected", "version": "1.0.0", "timestamp": "now"});
    if socket.send(Message::Text(greeting.to_string().into())).await.is_err() {
        return;
    }

    while let Some(Ok(msg)) = socket.recv().await {
        let text = match msg {
            Message::Text(text) => text.to_string(),
            Message::Close(_) => break,
            _ => continue,
        };

        let replies = match serde_json::from_str::<Value>(&text) {
            Ok(frame) => respond(&frame),
            Err(_) => vec![json!({
                "jsonrpc": "2.0",
                "error": {"code": ErrorCode::PARSE_ERROR, "message": "Parse error"},
                "id": null,
            })],
        };
        for reply in replies {
            if socket.send(Message::Text(reply.to_string().into())).await.is_err() {
                return;
            }
        }
    }
}

async fn rpc_handler(
    headers: HeaderMap,
    State(state): State<ServerState>,
    Json(frame): Json<Value>,
) -> Response {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    state.authorizations.lock().push(authorization);

    match respond(&frame).into_iter().find(|reply| reply.get("jsonrpc").is_some()) {
        Some(reply) if frame.get("id").is_some() => Json(reply).into_response(),
        _ => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn start_server() -> (SocketAddr, ServerState) {
    let state = ServerState::default();
    let app = Router::new()
        .route("/ws", any(ws_handler))
        .route("/rpc", post(rpc_handler))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, state)
}

/// An address nothing listens on
async fn closed_addr() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

fn quick_detection(config: TransportConfig) -> TransportConfig {
    config.detection(Duration::from_secs(2), Duration::from_millis(50), 3)
}

#[tokio::test]
async fn test_call_over_websocket() {
    let (addr, state) = start_server().await;
    let config = TransportConfig::from_origin(&format!("http://{}", addr))
        .unwrap()
        .token("secret-token");
    assert_eq!(config.url, format!("ws://{}/ws", addr));

    let transport = TransportClient::websocket(config).unwrap();
    let rpc = RpcClient::new(transport.clone(), RpcConfig::default());
    transport.connect();

    let mode = transport.wait_connected(Duration::from_secs(5)).await.unwrap();
    assert_eq!(mode, TransportMode::Duplex);
    assert_eq!(*state.protocols.lock(), vec![Some("secret-token".to_string())]);

    let result = rpc
        .call("echo", Some(json!({"nodes": [1, 2, 3]})))
        .await
        .unwrap();
    assert_eq!(result, json!({"nodes": [1, 2, 3]}));

    transport.disconnect();
}

#[tokio::test]
async fn test_remote_error_over_websocket() {
    let (addr, _state) = start_server().await;
    let transport = TransportClient::websocket(TransportConfig::new(format!("ws://{}/ws", addr))).unwrap();
    let rpc = RpcClient::new(transport.clone(), RpcConfig::default());
    transport.connect();
    transport.wait_connected(Duration::from_secs(5)).await.unwrap();

    let err = rpc.call("graph.layout", None).await.unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::METHOD_NOT_FOUND));
    assert!(err.to_string().contains("Method not found: graph.layout"));

    let err = rpc
        .call_with_timeout("silent", None, Duration::from_millis(200))
        .await
        .unwrap_err();
    assert!(matches!(err, RpcError::Timeout { .. }));
    assert_eq!(rpc.pending_count(), 0);

    transport.disconnect();
}

#[tokio::test]
async fn test_notifications_and_typed_events_over_websocket() {
    let (addr, _state) = start_server().await;
    let transport = TransportClient::websocket(TransportConfig::new(format!("ws://{}/ws", addr))).unwrap();
    let rpc = RpcClient::new(transport.clone(), RpcConfig::default());

    let (tx, mut rx) = mpsc::unbounded_channel();
    let notified = tx.clone();
    let _sub = rpc.subscribe("broadcast", move |params| {
        let _ = notified.send(format!("notification {}", params));
    });
    for kind in ["connected", "subscribed", "model.updated"] {
        let tx = tx.clone();
        transport.on(EventKind::Typed(kind.to_string()), move |event| {
            if let TransportEvent::Typed { kind, .. } = event {
                let _ = tx.send(format!("typed {}", kind));
            }
        });
    }

    transport.subscribe(["model"]);
    transport.connect();
    transport.wait_connected(Duration::from_secs(5)).await.unwrap();

    let mut seen = Vec::new();
    for _ in 0..2 {
        seen.push(timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap());
    }
    assert!(seen.contains(&"typed connected".to_string()));
    assert!(seen.contains(&"typed subscribed".to_string()));

    rpc.notify("broadcast", Some(json!({"text": "hi"})));
    assert_eq!(
        timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap(),
        r#"notification {"text":"hi"}"#
    );
    assert_eq!(
        timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap(),
        "typed model.updated"
    );

    transport.disconnect();
}

#[tokio::test]
async fn test_falls_back_to_http() {
    let (addr, state) = start_server().await;
    let dead = closed_addr().await;

    let config = quick_detection(TransportConfig::new(format!("ws://{}/ws", dead)))
        .token("secret-token")
        .fallback_url(format!("http://{}/rpc", addr));
    let transport = TransportClient::websocket(config).unwrap();
    let rpc = RpcClient::new(transport.clone(), RpcConfig::default());

    let (tx, mut rx) = mpsc::unbounded_channel();
    transport.on(EventKind::RestMode, move |_| {
        let _ = tx.send(());
    });

    transport.connect();
    let mode = transport.wait_connected(Duration::from_secs(10)).await.unwrap();
    assert_eq!(mode, TransportMode::RequestResponse);
    assert!(rx.try_recv().is_ok());

    let result = rpc.call("echo", Some(json!([1, "two"]))).await.unwrap();
    assert_eq!(result, json!([1, "two"]));

    let err = rpc.call("missing", None).await.unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::METHOD_NOT_FOUND));

    assert_eq!(
        state.authorizations.lock().first().cloned().flatten().as_deref(),
        Some("Bearer secret-token")
    );
    assert!(state.protocols.lock().is_empty());
}

#[tokio::test]
async fn test_unreachable_server_without_fallback() {
    let dead = closed_addr().await;
    let transport =
        TransportClient::websocket(quick_detection(TransportConfig::new(format!("ws://{}/ws", dead))))
            .unwrap();
    let rpc = RpcClient::new(transport.clone(), RpcConfig::default());

    transport.connect();
    let mode = transport.wait_connected(Duration::from_secs(10)).await.unwrap();
    assert_eq!(mode, TransportMode::RequestResponse);

    let err = rpc.call("echo", None).await.unwrap_err();
    assert!(matches!(err, RpcError::Transmission { .. }));
}
