//! vizlink - resilient JSON-RPC transport for visualization clients
//!
//! Maintains one logical connection to a visualization server. A duplex
//! channel (WebSocket) is preferred; when it cannot be opened during detection
//! the client falls back to a request/response collaborator for the rest of
//! its life. On top of the transport sits a JSON-RPC 2.0 layer with
//! per-call deadlines and notification fan-out.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use vizlink::{RpcClient, RpcConfig, TransportClient, TransportConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = TransportConfig::from_origin("http://localhost:8765")?.token("your-token");
//!     let transport = TransportClient::websocket(config)?;
//!     let rpc = RpcClient::new(transport.clone(), RpcConfig::default());
//!
//!     transport.subscribe(["model", "annotations"]);
//!     transport.connect();
//!     transport.wait_connected(Duration::from_secs(10)).await?;
//!
//!     // Notifications pushed by the server
//!     let _sub = rpc.subscribe("model.updated", |params| {
//!         println!("Model updated: {}", params);
//!     });
//!
//!     // Calls are correlated by id
//!     let model = rpc.call("model.get", Some(serde_json::json!({"id": "m1"}))).await?;
//!     println!("{}", model);
//!
//!     transport.disconnect();
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod messages;
pub mod rpc;
pub mod sink;
pub mod transport;

pub use config::{RpcConfig, TransportConfig};
pub use error::{Result, RpcError, RpcResult, TransportError};
pub use events::{EventHub, EventKind, ListenerId, TransportEvent};
pub use messages::{ClientFrame, ServerFrame};
pub use rpc::{
    validate_request, validate_response, ErrorCode, Notification, Request, RequestId, Response,
    ResponseOutcome, RpcClient, RpcErrorObject, Subscription,
};
pub use sink::{ErrorId, ErrorSink, TracingSink};
pub use transport::{
    endpoint_from_origin, Admission, Connector, ConnectionState, DuplexChannel, HttpFallback,
    MemoryConnector, MemoryListener, MemoryPeer, RequestResponse, TransportClient,
    TransportClientBuilder, TransportMode, WebSocketConnector,
};
