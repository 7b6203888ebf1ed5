//! Error types for vizlink

use std::time::Duration;

use thiserror::Error;

/// Errors raised by the transport layer
#[derive(Error, Debug)]
pub enum TransportError {
    /// Opening the physical channel failed
    #[error("Connection error: {0}")]
    Connection(String),

    /// The channel did not open within the allotted time
    #[error("Connection timed out after {0:?}")]
    Timeout(Duration),

    /// The channel closed underneath us
    #[error("Connection closed: {0}")]
    Closed(String),

    /// The endpoint or origin could not be turned into a channel address
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// WebSocket protocol error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// HTTP error from the request/response fallback
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Failed to serialize/deserialize a frame
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Request/response mode is active but no fallback was configured
    #[error("No request/response fallback configured")]
    NoFallback,
}

/// Errors surfaced to the issuer of an RPC call
#[derive(Error, Debug)]
pub enum RpcError {
    /// No response arrived before the deadline
    #[error("Request '{method}' timed out after {timeout:?}")]
    Timeout { method: String, timeout: Duration },

    /// The server answered with an error envelope
    #[error("Remote error {code}: {message}")]
    Remote {
        code: i64,
        message: String,
        data: Option<serde_json::Value>,
    },

    /// The request frame could not be handed to the transport
    #[error("Failed to transmit request '{method}'")]
    Transmission { method: String },

    /// The connection dropped while the call was pending
    #[error("Connection closed")]
    ConnectionClosed,

    /// The result did not match the expected shape
    #[error("Failed to decode result: {0}")]
    Deserialize(#[from] serde_json::Error),
}

impl RpcError {
    /// Returns the server error code for remote errors
    pub fn code(&self) -> Option<i64> {
        match self {
            RpcError::Remote { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;

/// Result type for RPC calls
pub type RpcResult<T> = std::result::Result<T, RpcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_connection() {
        let err = TransportError::Connection("refused".to_string());
        assert_eq!(err.to_string(), "Connection error: refused");
    }

    #[test]
    fn test_error_display_timeout() {
        let err = TransportError::Timeout(Duration::from_secs(3));
        assert_eq!(err.to_string(), "Connection timed out after 3s");
    }

    #[test]
    fn test_error_display_no_fallback() {
        let err = TransportError::NoFallback;
        assert_eq!(err.to_string(), "No request/response fallback configured");
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<String>("not valid json").unwrap_err();
        let err: TransportError = json_err.into();
        assert!(matches!(err, TransportError::Serialization(_)));
        assert!(err.to_string().starts_with("Serialization error:"));
    }

    #[test]
    fn test_rpc_error_display_timeout() {
        let err = RpcError::Timeout {
            method: "model.get".to_string(),
            timeout: Duration::from_millis(50),
        };
        assert_eq!(err.to_string(), "Request 'model.get' timed out after 50ms");
    }

    #[test]
    fn test_rpc_error_remote_keeps_code() {
        let err = RpcError::Remote {
            code: -32601,
            message: "Method 'nope' not found".to_string(),
            data: None,
        };
        assert_eq!(err.code(), Some(-32601));
        assert_eq!(err.to_string(), "Remote error -32601: Method 'nope' not found");
    }

    #[test]
    fn test_rpc_error_code_absent_for_local_errors() {
        assert_eq!(RpcError::ConnectionClosed.code(), None);
        assert_eq!(
            RpcError::Transmission {
                method: "m".to_string()
            }
            .code(),
            None
        );
    }

    #[test]
    fn test_error_debug() {
        let err = TransportError::Closed("by server".to_string());
        let debug = format!("{:?}", err);
        assert!(debug.contains("Closed"));
        assert!(debug.contains("by server"));
    }
}
