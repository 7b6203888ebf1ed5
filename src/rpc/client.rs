//! Request/response correlation and notification dispatch

use std::collections::HashMap;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::oneshot;
use tokio::time::timeout;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use super::envelope::{classify, Inbound, Notification, Request, RequestId, Response, ResponseOutcome};
use crate::config::RpcConfig;
use crate::error::{RpcError, RpcResult};
use crate::events::{EventKind, ListenerId, TransportEvent};
use crate::sink::{panic_message, ErrorId, ErrorSink};
use crate::transport::TransportClient;

type SyncHandler = Arc<dyn Fn(Value) + Send + Sync>;
type AsyncHandler = Arc<dyn Fn(Value) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Callback registered for a notification method
#[derive(Clone)]
enum NotificationHandler {
    Sync(SyncHandler),
    Async(AsyncHandler),
}

/// A call waiting for its response
struct PendingRequest {
    method: String,
    tx: oneshot::Sender<RpcResult<Value>>,
    issued_at: Instant,
}

struct RpcInner {
    transport: TransportClient,
    config: RpcConfig,
    sink: Arc<dyn ErrorSink>,
    pending: Mutex<HashMap<RequestId, PendingRequest>>,
    // method -> list of (handler_id, handler)
    handlers: Mutex<HashMap<String, Vec<(Uuid, NotificationHandler)>>>,
    seq: AtomicU64,
    attached: OnceLock<Vec<(EventKind, ListenerId)>>,
}

/// Handle for a registered notification handler
pub struct Subscription {
    method: String,
    handler_id: Uuid,
    client: Weak<RpcInner>,
}

impl Subscription {
    /// Method this handler is registered for
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Remove exactly this handler. Returns false if it was already gone.
    pub fn unsubscribe(self) -> bool {
        match self.client.upgrade() {
            Some(inner) => inner.remove_handler(&self.method, self.handler_id),
            None => false,
        }
    }
}

/// JSON-RPC client layered over a [`TransportClient`].
///
/// Correlates responses to calls by id, applies per-call deadlines and fans
/// notifications out to registered handlers. Pending calls are rejected with
/// [`RpcError::ConnectionClosed`] whenever the transport closes or is
/// disconnected.
///
/// This struct is cheaply cloneable as it uses an internal Arc.
#[derive(Clone)]
pub struct RpcClient {
    inner: Arc<RpcInner>,
}

impl RpcClient {
    /// Create an RPC client and attach it to `transport`
    pub fn new(transport: TransportClient, config: RpcConfig) -> Self {
        let sink = transport.sink();
        let client = Self {
            inner: Arc::new(RpcInner {
                transport,
                config,
                sink,
                pending: Mutex::new(HashMap::new()),
                handlers: Mutex::new(HashMap::new()),
                seq: AtomicU64::new(0),
                attached: OnceLock::new(),
            }),
        };
        client.attach();
        client
    }

    /// Register the transport listeners. Only the first call has any effect.
    pub fn attach(&self) {
        self.inner.attached.get_or_init(|| {
            let transport = &self.inner.transport;

            let weak = Arc::downgrade(&self.inner);
            let message = transport.on(EventKind::Message, move |event| {
                if let (TransportEvent::Message(value), Some(inner)) = (event, weak.upgrade()) {
                    inner.handle_message(value);
                }
            });

            let weak = Arc::downgrade(&self.inner);
            let undelivered = transport.on(EventKind::Undelivered, move |event| {
                if let (TransportEvent::Undelivered { frame, message }, Some(inner)) =
                    (event, weak.upgrade())
                {
                    inner.fail_undelivered(frame, message);
                }
            });

            let mut ids = vec![
                (EventKind::Message, message),
                (EventKind::Undelivered, undelivered),
            ];
            for kind in [EventKind::Close, EventKind::Disconnect] {
                let weak = Arc::downgrade(&self.inner);
                let id = transport.on(kind.clone(), move |_| {
                    if let Some(inner) = weak.upgrade() {
                        inner.clear_pending_requests();
                    }
                });
                ids.push((kind, id));
            }

            debug!("RPC layer attached to transport");
            ids
        });
    }

    pub fn transport(&self) -> &TransportClient {
        &self.inner.transport
    }

    /// Call `method` and wait for its result, using the default timeout
    pub async fn call(&self, method: &str, params: Option<Value>) -> RpcResult<Value> {
        self.call_with_timeout(method, params, self.inner.config.default_timeout)
            .await
    }

    /// Call `method` and wait at most `limit` for its result
    pub async fn call_with_timeout(
        &self,
        method: &str,
        params: Option<Value>,
        limit: Duration,
    ) -> RpcResult<Value> {
        let id = self.inner.next_id();

        let (tx, rx) = oneshot::channel();
        self.inner.pending.lock().insert(
            id.clone(),
            PendingRequest {
                method: method.to_string(),
                tx,
                issued_at: Instant::now(),
            },
        );
        // Removes the entry however this call ends, including the caller dropping it
        let _pending = PendingGuard {
            inner: &self.inner,
            id: &id,
        };

        let request = Request::new(id.clone(), method, params);
        if let Err(failure) = self.inner.transport.deliver(&request) {
            debug!(%id, method, %failure, "Request not sent");
            return Err(RpcError::Transmission {
                method: method.to_string(),
            });
        }
        trace!(%id, method, "Request sent");

        match timeout(limit, rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(RpcError::ConnectionClosed),
            Err(_) => {
                warn!(%id, method, "Request timed out after {:?}", limit);
                Err(RpcError::Timeout {
                    method: method.to_string(),
                    timeout: limit,
                })
            }
        }
    }

    /// Typed variant of [`call`](Self::call)
    pub async fn request<P, R>(&self, method: &str, params: &P) -> RpcResult<R>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let params = serde_json::to_value(params)?;
        let result = self.call(method, Some(params)).await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Send a notification. Failures go to the error sink, never to the caller.
    pub fn notify(&self, method: &str, params: Option<Value>) {
        if let Err(failure) = self.inner.transport.deliver(&Notification::new(method, params)) {
            self.inner.sink.report(
                ErrorId::NotifyFailed,
                &format!("Failed to send notification '{}': {}", method, failure),
                json!({ "method": method }),
                None,
            );
        }
    }

    /// Register a handler for notifications of `method`.
    ///
    /// The handler receives `params`, or `null` if the notification had none.
    /// Any number of handlers may be registered for the same method.
    pub fn subscribe<F>(&self, method: &str, handler: F) -> Subscription
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        self.add_handler(method, NotificationHandler::Sync(Arc::new(handler)))
    }

    /// Register an async handler; it runs on its own task and its error, if
    /// any, goes to the error sink
    pub fn subscribe_async<F, Fut>(&self, method: &str, handler: F) -> Subscription
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let handler: AsyncHandler = Arc::new(move |params| handler(params).boxed());
        self.add_handler(method, NotificationHandler::Async(handler))
    }

    /// Feed a raw inbound frame to the RPC layer
    pub fn on_message(&self, raw: &str) {
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => self.inner.handle_message(&value),
            Err(e) => self.inner.sink.report(
                ErrorId::ParseError,
                "Failed to parse inbound message",
                json!({ "frame_len": raw.len() }),
                Some(&e),
            ),
        }
    }

    /// Feed an already-parsed inbound frame to the RPC layer
    pub fn handle_message(&self, value: &Value) {
        self.inner.handle_message(value);
    }

    /// Reject every pending call with [`RpcError::ConnectionClosed`].
    /// Returns how many were rejected.
    pub fn clear_pending_requests(&self) -> usize {
        self.inner.clear_pending_requests()
    }

    /// Number of calls waiting for a response
    pub fn pending_count(&self) -> usize {
        self.inner.pending.lock().len()
    }

    /// Number of handlers registered for `method`
    pub fn handler_count(&self, method: &str) -> usize {
        self.inner.handlers.lock().get(method).map_or(0, Vec::len)
    }

    fn add_handler(&self, method: &str, handler: NotificationHandler) -> Subscription {
        let handler_id = Uuid::new_v4();
        self.inner
            .handlers
            .lock()
            .entry(method.to_string())
            .or_default()
            .push((handler_id, handler));

        Subscription {
            method: method.to_string(),
            handler_id,
            client: Arc::downgrade(&self.inner),
        }
    }
}

struct PendingGuard<'a> {
    inner: &'a RpcInner,
    id: &'a RequestId,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.inner.pending.lock().remove(self.id);
    }
}

impl RpcInner {
    fn next_id(&self) -> RequestId {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        RequestId::String(format!("req-{}-{}", millis, seq))
    }

    fn handle_message(&self, value: &Value) {
        match classify(value) {
            Inbound::Response(response) => self.resolve(response),
            Inbound::Notification { method, params } => {
                self.dispatch(&method, params.unwrap_or(Value::Null))
            }
            Inbound::Request { method, id } => {
                warn!(%id, method, "Ignoring server-initiated request")
            }
            Inbound::Transport(kind) => trace!(kind, "Ignoring transport frame"),
            Inbound::Invalid(reason) => warn!(reason, "Discarding malformed message"),
        }
    }

    fn resolve(&self, response: Response) {
        let Some(id) = response.id else {
            debug!(outcome = ?response.outcome, "Discarding response without id");
            return;
        };

        let Some(pending) = self.pending.lock().remove(&id) else {
            debug!(%id, "Discarding response for unknown request");
            return;
        };

        debug!(
            %id,
            method = %pending.method,
            elapsed = ?pending.issued_at.elapsed(),
            "Response received"
        );
        let outcome = match response.outcome {
            ResponseOutcome::Result(result) => Ok(result),
            ResponseOutcome::Error(error) => Err(RpcError::Remote {
                code: error.code,
                message: error.message,
                data: error.data,
            }),
        };
        // The caller may have given up already
        let _ = pending.tx.send(outcome);
    }

    fn dispatch(&self, method: &str, params: Value) {
        let handlers: Vec<NotificationHandler> = match self.handlers.lock().get(method) {
            Some(handlers) => handlers.iter().map(|(_, h)| h.clone()).collect(),
            None => Vec::new(),
        };
        if handlers.is_empty() {
            trace!(method, "No handlers for notification");
            return;
        }

        for handler in handlers {
            match handler {
                NotificationHandler::Sync(handler) => {
                    let params = params.clone();
                    if let Err(panic) = catch_unwind(AssertUnwindSafe(|| handler(params))) {
                        self.report_handler_failure(method, &panic_message(panic.as_ref()), None);
                    }
                }
                NotificationHandler::Async(handler) => {
                    let params = params.clone();
                    let future = match catch_unwind(AssertUnwindSafe(|| handler(params))) {
                        Ok(future) => future,
                        Err(panic) => {
                            self.report_handler_failure(method, &panic_message(panic.as_ref()), None);
                            continue;
                        }
                    };

                    let sink = self.sink.clone();
                    let method = method.to_string();
                    tokio::spawn(async move {
                        match AssertUnwindSafe(future).catch_unwind().await {
                            Ok(Ok(())) => {}
                            Ok(Err(e)) => {
                                let source: &(dyn std::error::Error + 'static) = e.as_ref();
                                sink.report(
                                    ErrorId::HandlerFailed,
                                    &format!("Handler for '{}' failed: {}", method, e),
                                    json!({ "method": method }),
                                    Some(source),
                                );
                            }
                            Err(panic) => sink.report(
                                ErrorId::HandlerFailed,
                                &format!(
                                    "Handler for '{}' panicked: {}",
                                    method,
                                    panic_message(panic.as_ref())
                                ),
                                json!({ "method": method }),
                                None,
                            ),
                        }
                    });
                }
            }
        }
    }

    fn report_handler_failure(
        &self,
        method: &str,
        message: &str,
        source: Option<&(dyn std::error::Error + 'static)>,
    ) {
        self.sink.report(
            ErrorId::HandlerFailed,
            &format!("Handler for '{}' panicked: {}", method, message),
            json!({ "method": method }),
            source,
        );
    }

    fn remove_handler(&self, method: &str, handler_id: Uuid) -> bool {
        let mut handlers = self.handlers.lock();
        let Some(entries) = handlers.get_mut(method) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|(id, _)| *id != handler_id);
        let removed = entries.len() != before;
        if entries.is_empty() {
            handlers.remove(method);
        }
        removed
    }

    /// Fail the call whose request could not be delivered
    fn fail_undelivered(&self, frame: &Value, message: &str) {
        if frame.get("method").is_none() {
            return;
        }
        let Some(id) = frame.get("id").and_then(RequestId::from_value) else {
            return;
        };
        let Some(pending) = self.pending.lock().remove(&id) else {
            return;
        };

        debug!(%id, method = %pending.method, error = message, "Request was not delivered");
        let _ = pending.tx.send(Err(RpcError::Transmission {
            method: pending.method,
        }));
    }

    fn clear_pending_requests(&self) -> usize {
        let drained: Vec<(RequestId, PendingRequest)> = self.pending.lock().drain().collect();
        let count = drained.len();
        for (id, pending) in drained {
            debug!(%id, method = %pending.method, "Rejecting pending request");
            let _ = pending.tx.send(Err(RpcError::ConnectionClosed));
        }
        if count > 0 {
            info!(count, "Rejected pending requests");
        }
        count
    }
}

impl Drop for RpcInner {
    fn drop(&mut self) {
        if let Some(listeners) = self.attached.get() {
            for (kind, id) in listeners {
                self.transport.off(kind, *id);
            }
        }
    }
}
