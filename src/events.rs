//! Typed event registry for transport lifecycle and inbound messages

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::trace;
use uuid::Uuid;

use crate::sink::{panic_message, ErrorId, ErrorSink};
use crate::transport::TransportMode;

/// The closed set of events a listener can register for
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    Connect,
    Disconnect,
    Close,
    Error,
    Reconnecting,
    MaxReconnectAttempts,
    RestMode,
    /// An outbound frame the request/response fallback could not deliver
    Undelivered,
    /// Every inbound JSON frame
    Message,
    /// Inbound frames whose `type` field equals the given name
    Typed(String),
}

/// An event together with its payload
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// A working channel is available (duplex or request/response)
    Connect { mode: TransportMode },
    /// The caller closed the connection
    Disconnect,
    /// The duplex channel closed without the caller asking
    Close { reason: String },
    /// A post-detection connection failure
    Error { message: String },
    /// A reconnection attempt has been scheduled
    Reconnecting { attempt: u32, delay: Duration },
    /// Reconnection gave up
    MaxReconnectAttempts { attempts: u32 },
    /// The duplex channel is unavailable; request/response mode is in effect
    RestMode,
    Undelivered { frame: Arc<Value>, message: String },
    Message(Arc<Value>),
    Typed { kind: String, message: Arc<Value> },
}

impl TransportEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            TransportEvent::Connect { .. } => EventKind::Connect,
            TransportEvent::Disconnect => EventKind::Disconnect,
            TransportEvent::Close { .. } => EventKind::Close,
            TransportEvent::Error { .. } => EventKind::Error,
            TransportEvent::Reconnecting { .. } => EventKind::Reconnecting,
            TransportEvent::MaxReconnectAttempts { .. } => EventKind::MaxReconnectAttempts,
            TransportEvent::RestMode => EventKind::RestMode,
            TransportEvent::Undelivered { .. } => EventKind::Undelivered,
            TransportEvent::Message(_) => EventKind::Message,
            TransportEvent::Typed { kind, .. } => EventKind::Typed(kind.clone()),
        }
    }
}

/// Handle returned by [`EventHub::on`], used to remove the listener again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(Uuid);

/// Listener callback
pub type Listener = Arc<dyn Fn(&TransportEvent) + Send + Sync>;

/// Publish/subscribe registry keyed by [`EventKind`].
///
/// Listeners run outside the registry lock, so a listener may register or
/// remove listeners (including itself) while being called. A panicking
/// listener is reported to the sink and does not stop delivery to the rest.
pub struct EventHub {
    listeners: Mutex<HashMap<EventKind, Vec<(ListenerId, Listener)>>>,
    sink: Arc<dyn ErrorSink>,
}

impl EventHub {
    pub fn new(sink: Arc<dyn ErrorSink>) -> Self {
        Self {
            listeners: Mutex::new(HashMap::new()),
            sink,
        }
    }

    /// Register a listener for one kind of event
    pub fn on<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&TransportEvent) + Send + Sync + 'static,
    {
        let id = ListenerId(Uuid::new_v4());
        self.listeners
            .lock()
            .entry(kind)
            .or_default()
            .push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener. Returns false if it was not registered for `kind`.
    pub fn off(&self, kind: &EventKind, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let Some(entries) = listeners.get_mut(kind) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|(existing, _)| *existing != id);
        let removed = entries.len() != before;
        if entries.is_empty() {
            listeners.remove(kind);
        }
        removed
    }

    /// Deliver an event to every listener registered for its kind.
    ///
    /// Returns the number of listeners that completed without panicking.
    pub fn emit(&self, event: &TransportEvent) -> usize {
        let kind = event.kind();
        let listeners: Vec<Listener> = match self.listeners.lock().get(&kind) {
            Some(entries) => entries.iter().map(|(_, l)| l.clone()).collect(),
            None => return 0,
        };

        trace!(event = ?kind, listeners = listeners.len(), "Emitting event");

        let mut delivered = 0;
        for listener in listeners {
            match catch_unwind(AssertUnwindSafe(|| listener(event))) {
                Ok(()) => delivered += 1,
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    self.sink.report(
                        ErrorId::ListenerFailed,
                        &format!("Listener for {:?} panicked: {}", kind, message),
                        serde_json::json!({ "event": format!("{:?}", kind) }),
                        None,
                    );
                }
            }
        }
        delivered
    }

    pub fn listener_count(&self, kind: &EventKind) -> usize {
        self.listeners.lock().get(kind).map_or(0, Vec::len)
    }

    /// Drop every listener
    pub fn clear(&self) {
        self.listeners.lock().clear();
    }
}
