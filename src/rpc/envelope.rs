//! JSON-RPC 2.0 envelopes

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Value of the `jsonrpc` field on every envelope
pub const JSONRPC_VERSION: &str = "2.0";

/// Error codes used by the visualization server
pub struct ErrorCode;

impl ErrorCode {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
    /// The server-side SDK backing a method is not available
    pub const SDK_UNAVAILABLE: i64 = -32001;
    pub const OPERATION_CANCELLED: i64 = -32002;
}

/// Request identifier; the client only issues strings but accepts numbers
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    String(String),
}

impl RequestId {
    /// Read an id from an envelope field. Fractional numbers are not usable ids.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(RequestId::String(s.clone())),
            Value::Number(n) => n.as_i64().map(RequestId::Number),
            _ => None,
        }
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::Number(n) => write!(f, "{}", n),
            RequestId::String(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        RequestId::Number(n)
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        RequestId::String(s)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        RequestId::String(s.to_string())
    }
}

/// A call expecting a correlated response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    pub id: RequestId,
}

impl Request {
    pub fn new(id: RequestId, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
            id,
        }
    }
}

/// A one-way message; carries no id and gets no reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl Notification {
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
        }
    }
}

/// Error object carried by an error response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Exactly one of `result` or `error`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseOutcome {
    Result(Value),
    Error(RpcErrorObject),
}

/// Reply to a [`Request`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub jsonrpc: String,
    /// `None` when the server could not tell which request it is answering
    pub id: Option<RequestId>,
    #[serde(flatten)]
    pub outcome: ResponseOutcome,
}

impl Response {
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(id),
            outcome: ResponseOutcome::Result(result),
        }
    }

    pub fn failure(id: Option<RequestId>, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            outcome: ResponseOutcome::Error(RpcErrorObject {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }
}

fn has_version(value: &Value) -> bool {
    value.get("jsonrpc").and_then(Value::as_str) == Some(JSONRPC_VERSION)
}

fn is_id(value: Option<&Value>) -> bool {
    matches!(value, Some(Value::String(_) | Value::Number(_)))
}

/// Whether `value` is a well-formed request envelope
pub fn validate_request(value: &Value) -> bool {
    has_version(value)
        && value.get("method").map_or(false, Value::is_string)
        && is_id(value.get("id"))
}

/// Whether `value` is a well-formed response envelope
pub fn validate_response(value: &Value) -> bool {
    let has_result = value.get("result").is_some();
    let has_error = value.get("error").is_some();
    has_version(value) && is_id(value.get("id")) && (has_result != has_error)
}

/// What an inbound frame turned out to be
#[derive(Debug, PartialEq)]
pub(crate) enum Inbound {
    Response(Response),
    Notification { method: String, params: Option<Value> },
    /// Server-initiated request; the client does not serve any methods
    Request { method: String, id: Value },
    /// `type`-tagged transport frame or broadcast event
    Transport(String),
    Invalid(&'static str),
}

/// Sort an inbound frame into responses, notifications and everything else
pub(crate) fn classify(value: &Value) -> Inbound {
    let Some(object) = value.as_object() else {
        return Inbound::Invalid("not an object");
    };

    if !object.contains_key("jsonrpc") {
        if let Some(kind) = object.get("type").and_then(Value::as_str) {
            return Inbound::Transport(kind.to_string());
        }
    }

    let outcome = match (object.get("result"), object.get("error")) {
        (Some(_), Some(_)) => return Inbound::Invalid("both result and error"),
        (Some(result), None) => Some(ResponseOutcome::Result(result.clone())),
        (None, Some(error)) => match RpcErrorObject::deserialize(error) {
            Ok(error) => Some(ResponseOutcome::Error(error)),
            Err(_) => return Inbound::Invalid("malformed error object"),
        },
        (None, None) => None,
    };

    if let Some(outcome) = outcome {
        let id = match object.get("id") {
            None | Some(Value::Null) => None,
            Some(id) => match RequestId::from_value(id) {
                Some(id) => Some(id),
                None => return Inbound::Invalid("unusable response id"),
            },
        };

        return Inbound::Response(Response {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            outcome,
        });
    }

    match (object.get("method").and_then(Value::as_str), object.get("id")) {
        (Some(method), None) => Inbound::Notification {
            method: method.to_string(),
            params: object.get("params").cloned(),
        },
        (Some(method), Some(id)) => Inbound::Request {
            method: method.to_string(),
            id: id.clone(),
        },
        (None, _) => Inbound::Invalid("neither a response nor a notification"),
    }
}
