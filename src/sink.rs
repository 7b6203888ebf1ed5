//! Error-reporting sink for non-fatal failures
//!
//! Nothing in the transport or RPC layers panics or propagates on a bad frame,
//! a failed send or a misbehaving handler. Those failures are handed to an
//! [`ErrorSink`] instead, which the owning application can route wherever it
//! collects diagnostics.

use std::fmt;

use serde_json::Value;
use tracing::error;

/// Identifies the kind of failure being reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorId {
    /// An inbound frame was not valid JSON
    ParseError,
    /// A frame could not be handed to the channel
    SendFailed,
    /// The duplex channel failed after the transport mode was resolved
    ConnectionError,
    /// Reconnection gave up after the configured number of attempts
    MaxReconnectAttempts,
    /// The request/response fallback failed
    FallbackFailed,
    /// An event listener panicked
    ListenerFailed,
    /// A notification handler panicked or returned an error
    HandlerFailed,
    /// A notification could not be transmitted
    NotifyFailed,
}

impl ErrorId {
    /// Stable identifier used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorId::ParseError => "ws-parse-error",
            ErrorId::SendFailed => "ws-send-failed",
            ErrorId::ConnectionError => "ws-connection-error",
            ErrorId::MaxReconnectAttempts => "ws-max-reconnect-attempts",
            ErrorId::FallbackFailed => "rest-fallback-failed",
            ErrorId::ListenerFailed => "event-listener-failed",
            ErrorId::HandlerFailed => "rpc-handler-failed",
            ErrorId::NotifyFailed => "rpc-notify-failed",
        }
    }
}

impl fmt::Display for ErrorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives every non-fatal failure from the transport and RPC layers
pub trait ErrorSink: Send + Sync {
    fn report(
        &self,
        id: ErrorId,
        message: &str,
        context: Value,
        source: Option<&(dyn std::error::Error + 'static)>,
    );
}

/// Default sink that writes reports to `tracing` at error level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ErrorSink for TracingSink {
    fn report(
        &self,
        id: ErrorId,
        message: &str,
        context: Value,
        source: Option<&(dyn std::error::Error + 'static)>,
    ) {
        match source {
            Some(source) => {
                error!(error_id = %id, %context, source = %source, "{}", message)
            }
            None => error!(error_id = %id, %context, "{}", message),
        }
    }
}

/// Extract a readable message from a caught panic payload
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_id_strings_are_stable() {
        assert_eq!(ErrorId::ParseError.to_string(), "ws-parse-error");
        assert_eq!(ErrorId::SendFailed.to_string(), "ws-send-failed");
        assert_eq!(
            ErrorId::MaxReconnectAttempts.to_string(),
            "ws-max-reconnect-attempts"
        );
        assert_eq!(ErrorId::HandlerFailed.to_string(), "rpc-handler-failed");
    }

    #[test]
    fn test_panic_message_variants() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("static str");
        assert_eq!(panic_message(payload.as_ref()), "static str");

        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");

        let payload: Box<dyn std::any::Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }

    #[test]
    fn test_tracing_sink_does_not_panic() {
        let err = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        TracingSink.report(
            ErrorId::SendFailed,
            "send failed",
            serde_json::json!({"frame_len": 12}),
            Some(&err),
        );
        TracingSink.report(ErrorId::ParseError, "bad frame", Value::Null, None);
    }
}
