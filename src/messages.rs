//! Transport-level frames exchanged alongside JSON-RPC traffic
//!
//! These carry no `jsonrpc` tag; the server tells them apart by their `type`
//! field.

use serde::{Deserialize, Serialize};

/// Frames sent from client to server
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Ask the server to push events for the given topics
    Subscribe { topics: Vec<String> },

    /// Keepalive
    Ping,
}

/// Frames received from the server that the transport understands itself
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Greeting sent right after the channel opens
    Connected {
        #[serde(default)]
        version: Option<String>,
        #[serde(default)]
        timestamp: Option<String>,
    },

    /// Topic subscription confirmed
    Subscribed {
        #[serde(default)]
        topics: Vec<String>,
    },

    /// Keepalive response
    Pong,
}
