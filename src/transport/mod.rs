//! Physical channels and the connection lifecycle built on top of them

mod backoff;
mod channel;
mod client;
mod http;
mod memory;
mod websocket;

pub use backoff::reconnect_delay;
pub use channel::{Connector, DuplexChannel, FrameSink, FrameStream, RequestResponse};
pub use client::{ConnectionState, TransportClient, TransportClientBuilder, TransportMode};
pub use http::HttpFallback;
pub use memory::{Admission, MemoryConnector, MemoryListener, MemoryPeer};
pub use websocket::{endpoint_from_origin, WebSocketConnector};
