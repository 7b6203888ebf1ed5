//! JSON-RPC layer on top of the transport client

mod client;
mod envelope;

pub use client::{RpcClient, Subscription};
pub use envelope::{
    validate_request, validate_response, ErrorCode, Notification, Request, RequestId, Response,
    ResponseOutcome, RpcErrorObject, JSONRPC_VERSION,
};
