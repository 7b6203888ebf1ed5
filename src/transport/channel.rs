//! Capabilities the transport client is built from
//!
//! The client never talks to a socket directly. It is handed a [`Connector`]
//! that produces duplex channels and, optionally, a [`RequestResponse`]
//! collaborator for when no duplex channel can be had.

use std::pin::Pin;

use async_trait::async_trait;
use futures::{Sink, Stream};

use crate::error::{Result, TransportError};

/// Outbound half of a duplex channel; one item is one text frame
pub type FrameSink = Pin<Box<dyn Sink<String, Error = TransportError> + Send>>;

/// Inbound half of a duplex channel; ends when the peer closes
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// An open, message-oriented, bidirectional channel
pub struct DuplexChannel {
    pub sink: FrameSink,
    pub stream: FrameStream,
}

impl DuplexChannel {
    pub fn new(sink: FrameSink, stream: FrameStream) -> Self {
        Self { sink, stream }
    }
}

/// Opens duplex channels
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a channel to `endpoint`, presenting `token` during the handshake
    async fn open(&self, endpoint: &str, token: Option<&str>) -> Result<DuplexChannel>;
}

/// Atomic request/response exchange used when no duplex channel is available
#[async_trait]
pub trait RequestResponse: Send + Sync {
    /// Deliver one frame; returns the correlated reply, if the peer sent one
    async fn exchange(&self, frame: String, token: Option<String>) -> Result<Option<String>>;
}
