//! In-process duplex channels
//!
//! [`MemoryConnector`] hands out channels whose far end is a [`MemoryPeer`]
//! delivered through a [`MemoryListener`]. Each open attempt can be scripted to
//! succeed, fail or never complete, which makes every branch of the transport
//! state machine reachable without a network.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use futures::channel::mpsc as fmpsc;
use futures::{future, SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;

use super::channel::{Connector, DuplexChannel};
use crate::error::{Result, TransportError};

/// Outcome of one open attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Open the channel and hand the far end to the listener
    Accept,
    /// Fail the attempt immediately
    Refuse,
    /// Never complete the attempt
    Stall,
}

struct ConnectorState {
    script: VecDeque<Admission>,
    fallback: Admission,
    attempts: usize,
    tokens: Vec<Option<String>>,
}

/// Scriptable in-process connector
#[derive(Clone)]
pub struct MemoryConnector {
    state: Arc<Mutex<ConnectorState>>,
    accepted: mpsc::UnboundedSender<MemoryPeer>,
}

/// Receives the server side of every accepted channel
pub struct MemoryListener {
    accepted: mpsc::UnboundedReceiver<MemoryPeer>,
}

/// Server side of an in-process channel
pub struct MemoryPeer {
    endpoint: String,
    token: Option<String>,
    to_client: Option<fmpsc::UnboundedSender<Result<String>>>,
    from_client: fmpsc::UnboundedReceiver<String>,
}

impl MemoryConnector {
    /// Create a connector that accepts every attempt
    pub fn new() -> (Self, MemoryListener) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connector = Self {
            state: Arc::new(Mutex::new(ConnectorState {
                script: VecDeque::new(),
                fallback: Admission::Accept,
                attempts: 0,
                tokens: Vec::new(),
            })),
            accepted: tx,
        };
        (connector, MemoryListener { accepted: rx })
    }

    /// Queue the outcome of an upcoming attempt; queued outcomes are used in order
    pub fn push(&self, admission: Admission) {
        self.state.lock().script.push_back(admission);
    }

    /// Outcome used once the script runs out
    pub fn set_default(&self, admission: Admission) {
        self.state.lock().fallback = admission;
    }

    /// Number of open attempts so far
    pub fn attempts(&self) -> usize {
        self.state.lock().attempts
    }

    /// Token presented on each attempt, in order
    pub fn tokens(&self) -> Vec<Option<String>> {
        self.state.lock().tokens.clone()
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn open(&self, endpoint: &str, token: Option<&str>) -> Result<DuplexChannel> {
        let admission = {
            let mut state = self.state.lock();
            state.attempts += 1;
            state.tokens.push(token.map(str::to_owned));
            match state.script.pop_front() {
                Some(admission) => admission,
                None => state.fallback,
            }
        };

        match admission {
            Admission::Refuse => Err(TransportError::Connection("connection refused".into())),
            Admission::Stall => future::pending::<Result<DuplexChannel>>().await,
            Admission::Accept => {
                let (client_tx, server_rx) = fmpsc::unbounded::<String>();
                let (server_tx, client_rx) = fmpsc::unbounded::<Result<String>>();

                let peer = MemoryPeer {
                    endpoint: endpoint.to_string(),
                    token: token.map(str::to_owned),
                    to_client: Some(server_tx),
                    from_client: server_rx,
                };
                // A dropped listener closes the channel right away, like a server going away
                let _ = self.accepted.send(peer);

                let sink = client_tx.sink_map_err(|e| TransportError::Closed(e.to_string()));
                Ok(DuplexChannel::new(Box::pin(sink), Box::pin(client_rx)))
            }
        }
    }
}

impl MemoryListener {
    /// Wait for the next accepted channel
    pub async fn accept(&mut self) -> Option<MemoryPeer> {
        self.accepted.recv().await
    }
}

impl MemoryPeer {
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Push a frame to the client. Returns false once the channel is closed.
    pub fn send(&self, frame: impl Into<String>) -> bool {
        match &self.to_client {
            Some(tx) => tx.unbounded_send(Ok(frame.into())).is_ok(),
            None => false,
        }
    }

    pub fn send_json(&self, value: &Value) -> bool {
        self.send(value.to_string())
    }

    /// Fail the client's read side with an error
    pub fn fail(&self, message: &str) -> bool {
        match &self.to_client {
            Some(tx) => tx
                .unbounded_send(Err(TransportError::Closed(message.to_string())))
                .is_ok(),
            None => false,
        }
    }

    /// Next frame from the client, or `None` once the client closed
    pub async fn recv(&mut self) -> Option<String> {
        self.from_client.next().await
    }

    /// Next frame from the client, parsed as JSON
    pub async fn recv_json(&mut self) -> Option<Value> {
        let frame = self.recv().await?;
        serde_json::from_str(&frame).ok()
    }

    /// Close the channel from the server side
    pub fn close(&mut self) {
        self.to_client = None;
    }
}
