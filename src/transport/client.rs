//! Transport client implementation

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, trace, warn};

use super::backoff::reconnect_delay;
use super::channel::{Connector, DuplexChannel, RequestResponse};
use super::http::HttpFallback;
use super::websocket::WebSocketConnector;
use crate::config::TransportConfig;
use crate::error::{Result, TransportError};
use crate::events::{EventHub, EventKind, ListenerId, TransportEvent};
use crate::messages::{ClientFrame, ServerFrame};
use crate::sink::{ErrorId, ErrorSink, TracingSink};

/// Connection state of the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// A channel is being opened
    Connecting,
    /// The duplex channel is open
    Connected,
    /// No channel and nothing scheduled
    Disconnected,
    /// A retry is scheduled
    Reconnecting,
}

/// Which kind of channel carries traffic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    /// Still finding out whether a duplex channel can be opened
    Detecting,
    /// Traffic flows over the duplex channel
    Duplex,
    /// Traffic flows through the request/response fallback. Terminal.
    RequestResponse,
}

/// The physical channel, as far as the state machine is concerned
enum Link {
    Idle,
    Opening,
    Open {
        tx: mpsc::Sender<String>,
        cancel: CancellationToken,
    },
}

struct State {
    mode: TransportMode,
    link: Link,
    // Bumped on every open and on disconnect; completions from older
    // generations are ignored
    generation: u64,
    intentionally_closed: bool,
    reconnect_attempts: u32,
    reconnect_delay: Duration,
    detection_attempts: u32,
    reconnect_task: Option<JoinHandle<()>>,
    heartbeat_task: Option<JoinHandle<()>>,
    topics: Vec<String>,
    token: Option<String>,
}

/// Events and reports gathered under the state lock, delivered after it is released
#[derive(Default)]
struct Outbox {
    events: Vec<TransportEvent>,
    reports: Vec<(ErrorId, String, Value)>,
}

impl Outbox {
    fn event(&mut self, event: TransportEvent) {
        self.events.push(event);
    }

    fn report(&mut self, id: ErrorId, message: String, context: Value) {
        self.reports.push((id, message, context));
    }
}

struct TransportInner {
    config: TransportConfig,
    connector: Arc<dyn Connector>,
    fallback: Option<Arc<dyn RequestResponse>>,
    sink: Arc<dyn ErrorSink>,
    hub: EventHub,
    state: Mutex<State>,
    // Connection tasks and fallback exchanges, awaited by `close`
    tasks: TaskTracker,
}

/// Builder for [`TransportClient`]
pub struct TransportClientBuilder {
    config: TransportConfig,
    connector: Arc<dyn Connector>,
    fallback: Option<Arc<dyn RequestResponse>>,
    sink: Option<Arc<dyn ErrorSink>>,
}

impl TransportClientBuilder {
    /// Collaborator used once detection rules out the duplex channel
    pub fn fallback(mut self, fallback: Arc<dyn RequestResponse>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Where non-fatal failures are reported (defaults to [`TracingSink`])
    pub fn sink(mut self, sink: Arc<dyn ErrorSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn build(self) -> TransportClient {
        let sink: Arc<dyn ErrorSink> = self.sink.unwrap_or_else(|| Arc::new(TracingSink));
        let token = self.config.token.clone();
        let reconnect_delay = self.config.reconnect_delay;

        let inner = Arc::new(TransportInner {
            config: self.config,
            connector: self.connector,
            fallback: self.fallback,
            hub: EventHub::new(sink.clone()),
            sink,
            state: Mutex::new(State {
                mode: TransportMode::Detecting,
                link: Link::Idle,
                generation: 0,
                intentionally_closed: false,
                reconnect_attempts: 0,
                reconnect_delay,
                detection_attempts: 0,
                reconnect_task: None,
                heartbeat_task: None,
                topics: Vec::new(),
                token,
            }),
            tasks: TaskTracker::new(),
        });

        TransportClient { inner }
    }
}

/// One logical connection to the visualization server.
///
/// Detects whether a duplex channel is usable, falls back to request/response
/// mode when it is not, and keeps the duplex channel alive with heartbeats and
/// exponential back-off. Lifecycle changes and inbound frames are published
/// through the event hub.
///
/// This struct is cheaply cloneable as it uses an internal Arc. Methods that
/// open channels or arm timers must be called from within a Tokio runtime.
#[derive(Clone)]
pub struct TransportClient {
    inner: Arc<TransportInner>,
}

impl TransportClient {
    /// Create a client that opens channels with `connector`
    pub fn new(config: TransportConfig, connector: Arc<dyn Connector>) -> Self {
        Self::builder(config, connector).build()
    }

    pub fn builder(config: TransportConfig, connector: Arc<dyn Connector>) -> TransportClientBuilder {
        TransportClientBuilder {
            config,
            connector,
            fallback: None,
            sink: None,
        }
    }

    /// WebSocket client, with an HTTP fallback when `config.fallback_url` is set
    pub fn websocket(config: TransportConfig) -> Result<Self> {
        let fallback = config
            .fallback_url
            .as_deref()
            .map(HttpFallback::new)
            .transpose()?;

        let mut builder = Self::builder(config, Arc::new(WebSocketConnector));
        if let Some(fallback) = fallback {
            builder = builder.fallback(Arc::new(fallback));
        }
        Ok(builder.build())
    }

    pub fn config(&self) -> &TransportConfig {
        &self.inner.config
    }

    /// Open the connection.
    ///
    /// Does nothing if a channel is already open or opening. In
    /// request/response mode this only re-emits `RestMode`.
    pub fn connect(&self) {
        let mut outbox = Outbox::default();
        {
            let mut state = self.inner.state.lock();
            if state.mode == TransportMode::RequestResponse {
                outbox.event(TransportEvent::RestMode);
            } else {
                state.intentionally_closed = false;
                match state.link {
                    Link::Open { .. } => debug!("Already connected"),
                    Link::Opening => debug!("Connection already in progress"),
                    Link::Idle => {
                        if let Some(task) = state.reconnect_task.take() {
                            task.abort();
                        }
                        if state.reconnect_attempts >= self.inner.config.max_reconnect_attempts {
                            state.reconnect_attempts = 0;
                        }
                        self.inner.start_open(&mut state);
                    }
                }
            }
        }
        self.inner.flush(outbox);
    }

    /// Close the connection and stop all timers. A later `connect` resumes.
    pub fn disconnect(&self) {
        {
            let mut state = self.inner.state.lock();
            state.intentionally_closed = true;
            state.generation += 1;
            state.detection_attempts = 0;
            if let Some(task) = state.heartbeat_task.take() {
                task.abort();
            }
            if let Some(task) = state.reconnect_task.take() {
                task.abort();
            }
            if let Link::Open { cancel, .. } = std::mem::replace(&mut state.link, Link::Idle) {
                cancel.cancel();
            }
        }
        info!("Disconnected");
        self.inner.hub.emit(&TransportEvent::Disconnect);
    }

    /// Disconnect, then wait until queued frames are written, the channel is
    /// closed and in-flight fallback exchanges have finished
    pub async fn close(&self) {
        self.disconnect();
        self.inner.tasks.close();
        self.inner.tasks.wait().await;
        self.inner.tasks.reopen();
    }

    /// Serialize and transmit a message.
    ///
    /// Returns true if the frame was handed to an open channel (or to the
    /// fallback in request/response mode). Never panics and never returns an
    /// error; transmission failures go to the error sink.
    pub fn send<T: Serialize + ?Sized>(&self, message: &T) -> bool {
        match serde_json::to_string(message) {
            Ok(frame) => self.inner.send_text(frame),
            Err(e) => {
                self.inner.sink.report(
                    ErrorId::SendFailed,
                    "Failed to serialize outbound message",
                    Value::Null,
                    Some(&e),
                );
                false
            }
        }
    }

    /// Remember the topic set and announce it to the server.
    ///
    /// The set is re-sent after every successful (re)connection. Returns true
    /// if it was sent right away.
    pub fn subscribe<I, S>(&self, topics: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let topics: Vec<String> = topics.into_iter().map(Into::into).collect();
        let connected = {
            let mut state = self.inner.state.lock();
            state.topics = topics.clone();
            matches!(state.link, Link::Open { .. })
        };

        if connected {
            self.send(&ClientFrame::Subscribe { topics })
        } else {
            false
        }
    }

    /// Register an event listener
    pub fn on<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&TransportEvent) + Send + Sync + 'static,
    {
        self.inner.hub.on(kind, listener)
    }

    /// Remove an event listener
    pub fn off(&self, kind: &EventKind, id: ListenerId) -> bool {
        self.inner.hub.off(kind, id)
    }

    /// Whether the duplex channel is open
    pub fn is_connected(&self) -> bool {
        matches!(self.inner.state.lock().link, Link::Open { .. })
    }

    pub fn connection_state(&self) -> ConnectionState {
        let state = self.inner.state.lock();
        match state.link {
            Link::Open { .. } => ConnectionState::Connected,
            Link::Opening => ConnectionState::Connecting,
            Link::Idle if state.reconnect_task.is_some() => ConnectionState::Reconnecting,
            Link::Idle => ConnectionState::Disconnected,
        }
    }

    pub fn transport_mode(&self) -> TransportMode {
        self.inner.state.lock().mode
    }

    /// Reconnection attempts since the last successful open
    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.state.lock().reconnect_attempts
    }

    /// Current back-off delay
    pub fn current_reconnect_delay(&self) -> Duration {
        self.inner.state.lock().reconnect_delay
    }

    /// Token presented on the next open and on every fallback exchange
    pub fn set_token(&self, token: impl Into<String>) {
        self.inner.state.lock().token = Some(token.into());
    }

    pub fn clear_token(&self) {
        self.inner.state.lock().token = None;
    }

    /// Wait until a working channel is available, in either mode
    pub async fn wait_connected(&self, limit: Duration) -> Result<TransportMode> {
        let (tx, rx) = oneshot::channel();
        let tx = Mutex::new(Some(tx));
        let id = self.on(EventKind::Connect, move |event| {
            if let TransportEvent::Connect { mode } = event {
                if let Some(tx) = tx.lock().take() {
                    let _ = tx.send(*mode);
                }
            }
        });

        let current = {
            let state = self.inner.state.lock();
            match (&state.link, state.mode) {
                (Link::Open { .. }, mode) => Some(mode),
                (_, TransportMode::RequestResponse) => Some(TransportMode::RequestResponse),
                _ => None,
            }
        };

        let result = match current {
            Some(mode) => Ok(mode),
            None => match timeout(limit, rx).await {
                Ok(Ok(mode)) => Ok(mode),
                Ok(Err(_)) => Err(TransportError::Closed("client dropped".into())),
                Err(_) => Err(TransportError::Timeout(limit)),
            },
        };

        self.off(&EventKind::Connect, id);
        result
    }

    /// Like [`send`](Self::send), but leaves reporting to the caller
    pub(crate) fn deliver<T: Serialize + ?Sized>(
        &self,
        message: &T,
    ) -> std::result::Result<(), SendFailure> {
        let frame = serde_json::to_string(message).map_err(|_| SendFailure::Serialize)?;
        self.inner.try_send_text(frame)
    }

    pub(crate) fn sink(&self) -> Arc<dyn ErrorSink> {
        self.inner.sink.clone()
    }
}

/// Why a frame could not be handed to the channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SendFailure {
    BufferFull,
    ChannelClosed,
    NotConnected,
    Serialize,
}

impl fmt::Display for SendFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SendFailure::BufferFull => "outbound buffer full",
            SendFailure::ChannelClosed => "channel closed",
            SendFailure::NotConnected => "not connected",
            SendFailure::Serialize => "message could not be serialized",
        })
    }
}

/// How an open duplex channel ended
enum Closure {
    /// The peer closed the stream
    Peer,
    /// Read or write error
    Failed(String),
}

impl TransportInner {
    fn flush(&self, outbox: Outbox) {
        for (id, message, context) in outbox.reports {
            self.sink.report(id, &message, context, None);
        }
        for event in outbox.events {
            self.hub.emit(&event);
        }
    }

    fn start_open(self: &Arc<Self>, state: &mut State) {
        state.generation += 1;
        state.link = Link::Opening;

        let generation = state.generation;
        let token = state.token.clone();
        let detecting = state.mode == TransportMode::Detecting;
        let inner = self.clone();
        self.tasks
            .spawn(async move { inner.run_connection(generation, token, detecting).await });
    }

    async fn run_connection(self: Arc<Self>, generation: u64, token: Option<String>, detecting: bool) {
        debug!(endpoint = %self.config.url, detecting, "Opening channel");
        let open = self.connector.open(&self.config.url, token.as_deref());
        let opened = if detecting {
            match timeout(self.config.detection_timeout, open).await {
                Ok(result) => result,
                Err(_) => Err(TransportError::Timeout(self.config.detection_timeout)),
            }
        } else {
            open.await
        };

        let DuplexChannel { mut sink, mut stream } = match opened {
            Ok(channel) => channel,
            Err(e) => {
                self.on_open_failed(generation, e);
                return;
            }
        };

        let Some((mut rx, cancel)) = self.on_open(generation) else {
            // Superseded while opening
            let _ = sink.close().await;
            return;
        };

        let closure = loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    // Frames queued before the disconnect are still written
                    while let Ok(frame) = rx.try_recv() {
                        if sink.send(frame).await.is_err() {
                            break;
                        }
                    }
                    let _ = sink.close().await;
                    return;
                }
                frame = rx.recv() => match frame {
                    Some(frame) => {
                        if let Err(e) = sink.send(frame).await {
                            break Closure::Failed(format!("write failed: {}", e));
                        }
                    }
                    None => {
                        let _ = sink.close().await;
                        return;
                    }
                },
                inbound = stream.next() => match inbound {
                    Some(Ok(text)) => self.handle_frame(&text),
                    Some(Err(e)) => break Closure::Failed(e.to_string()),
                    None => break Closure::Peer,
                },
            }
        };

        self.on_closed(generation, closure);
    }

    fn on_open(
        self: &Arc<Self>,
        generation: u64,
    ) -> Option<(mpsc::Receiver<String>, CancellationToken)> {
        let (rx, cancel, topics) = {
            let mut state = self.state.lock();
            if state.generation != generation || state.intentionally_closed {
                return None;
            }

            let (tx, rx) = mpsc::channel(self.config.outbound_buffer.max(1));
            let cancel = CancellationToken::new();
            state.link = Link::Open {
                tx,
                cancel: cancel.clone(),
            };
            state.mode = TransportMode::Duplex;
            state.reconnect_attempts = 0;
            state.reconnect_delay = self.config.reconnect_delay;
            state.detection_attempts = 0;
            self.start_heartbeat(&mut state);
            (rx, cancel, state.topics.clone())
        };

        info!(endpoint = %self.config.url, "Connected");
        if !topics.is_empty() {
            let frame = ClientFrame::Subscribe { topics };
            if let Ok(frame) = serde_json::to_string(&frame) {
                self.send_text(frame);
            }
        }
        self.hub.emit(&TransportEvent::Connect {
            mode: TransportMode::Duplex,
        });

        Some((rx, cancel))
    }

    fn on_open_failed(self: &Arc<Self>, generation: u64, error: TransportError) {
        let mut outbox = Outbox::default();
        {
            let mut state = self.state.lock();
            if state.generation != generation || state.intentionally_closed {
                return;
            }
            state.link = Link::Idle;

            if state.mode == TransportMode::Detecting {
                state.detection_attempts += 1;
                debug!(
                    attempt = state.detection_attempts,
                    error = %error,
                    "Duplex channel unavailable during detection"
                );
                if state.detection_attempts < self.config.max_detection_attempts {
                    self.schedule_retry(&mut state, self.config.detection_retry_delay);
                } else {
                    state.mode = TransportMode::RequestResponse;
                    state.detection_attempts = 0;
                    state.reconnect_attempts = 0;
                    info!("Duplex channel unavailable, using request/response mode");
                    outbox.event(TransportEvent::RestMode);
                    outbox.event(TransportEvent::Connect {
                        mode: TransportMode::RequestResponse,
                    });
                }
            } else {
                warn!(error = %error, "Connection failed");
                outbox.report(
                    ErrorId::ConnectionError,
                    format!("Connection failed: {}", error),
                    serde_json::json!({
                        "endpoint": self.config.url,
                        "attempt": state.reconnect_attempts,
                    }),
                );
                outbox.event(TransportEvent::Error {
                    message: error.to_string(),
                });
                self.schedule_reconnect(&mut state, &mut outbox);
            }
        }
        self.flush(outbox);
    }

    fn on_closed(self: &Arc<Self>, generation: u64, closure: Closure) {
        let mut outbox = Outbox::default();
        {
            let mut state = self.state.lock();
            if state.generation != generation || !matches!(state.link, Link::Open { .. }) {
                return;
            }
            state.link = Link::Idle;
            if let Some(task) = state.heartbeat_task.take() {
                task.abort();
            }

            match closure {
                Closure::Peer => {
                    info!("Connection closed by peer");
                    outbox.event(TransportEvent::Close {
                        reason: "closed by peer".to_string(),
                    });
                }
                Closure::Failed(reason) => {
                    warn!(reason = %reason, "Connection lost");
                    outbox.report(
                        ErrorId::ConnectionError,
                        format!("Connection lost: {}", reason),
                        serde_json::json!({
                            "endpoint": self.config.url,
                            "reason": reason,
                        }),
                    );
                    outbox.event(TransportEvent::Close {
                        reason: reason.clone(),
                    });
                    outbox.event(TransportEvent::Error { message: reason });
                }
            }
            self.schedule_reconnect(&mut state, &mut outbox);
        }
        self.flush(outbox);
    }

    fn schedule_reconnect(self: &Arc<Self>, state: &mut State, outbox: &mut Outbox) {
        if state.intentionally_closed || state.mode == TransportMode::RequestResponse {
            return;
        }

        let max_attempts = self.config.max_reconnect_attempts;
        if state.reconnect_attempts >= max_attempts {
            warn!(attempts = state.reconnect_attempts, "Giving up on reconnecting");
            outbox.report(
                ErrorId::MaxReconnectAttempts,
                format!("Failed to reconnect after {} attempts", state.reconnect_attempts),
                serde_json::json!({ "endpoint": self.config.url }),
            );
            outbox.event(TransportEvent::MaxReconnectAttempts {
                attempts: state.reconnect_attempts,
            });
            return;
        }

        state.reconnect_attempts += 1;
        let delay = reconnect_delay(
            self.config.reconnect_delay,
            self.config.max_reconnect_delay,
            state.reconnect_attempts,
        );
        state.reconnect_delay = delay;

        info!(attempt = state.reconnect_attempts, "Reconnecting in {:?}...", delay);
        outbox.event(TransportEvent::Reconnecting {
            attempt: state.reconnect_attempts,
            delay,
        });
        self.schedule_retry(state, delay);
    }

    fn schedule_retry(self: &Arc<Self>, state: &mut State, delay: Duration) {
        let inner = Arc::downgrade(self);
        let task = tokio::spawn(async move {
            sleep(delay).await;
            if let Some(inner) = inner.upgrade() {
                inner.retry_open();
            }
        });
        if let Some(previous) = state.reconnect_task.replace(task) {
            previous.abort();
        }
    }

    fn retry_open(self: &Arc<Self>) {
        let mut state = self.state.lock();
        // This is the task that fired; dropping the handle just detaches it
        state.reconnect_task = None;
        if state.intentionally_closed
            || state.mode == TransportMode::RequestResponse
            || !matches!(state.link, Link::Idle)
        {
            return;
        }
        self.start_open(&mut state);
    }

    fn start_heartbeat(self: &Arc<Self>, state: &mut State) {
        if let Some(task) = state.heartbeat_task.take() {
            task.abort();
        }

        let inner: Weak<Self> = Arc::downgrade(self);
        let period = self.config.heartbeat_interval;
        state.heartbeat_task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            loop {
                ticker.tick().await;
                let Some(inner) = inner.upgrade() else {
                    break;
                };
                let sent = serde_json::to_string(&ClientFrame::Ping)
                    .map_or(false, |frame| inner.send_text(frame));
                if sent {
                    trace!("Heartbeat sent");
                } else {
                    debug!("Heartbeat skipped");
                }
            }
        }));
    }

    /// Hand a frame to the channel, reporting failures to the sink
    fn send_text(self: &Arc<Self>, frame: String) -> bool {
        match self.try_send_text(frame) {
            Ok(()) => true,
            Err(SendFailure::NotConnected) => {
                debug!("Dropping frame: not connected");
                false
            }
            Err(failure) => {
                self.sink.report(
                    ErrorId::SendFailed,
                    &format!("Failed to send frame: {}", failure),
                    serde_json::json!({ "buffer": self.config.outbound_buffer }),
                    None,
                );
                false
            }
        }
    }

    fn try_send_text(self: &Arc<Self>, frame: String) -> std::result::Result<(), SendFailure> {
        enum Route {
            Duplex(mpsc::Sender<String>),
            Fallback(Arc<dyn RequestResponse>, Option<String>),
            Unavailable,
        }

        let route = {
            let state = self.state.lock();
            match (&state.link, state.mode) {
                (Link::Open { tx, .. }, _) => Route::Duplex(tx.clone()),
                (_, TransportMode::RequestResponse) => match &self.fallback {
                    Some(fallback) => Route::Fallback(fallback.clone(), state.token.clone()),
                    None => Route::Unavailable,
                },
                _ => Route::Unavailable,
            }
        };

        match route {
            Route::Duplex(tx) => tx.try_send(frame).map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => SendFailure::BufferFull,
                mpsc::error::TrySendError::Closed(_) => SendFailure::ChannelClosed,
            }),
            Route::Fallback(fallback, token) => {
                let inner = self.clone();
                self.tasks.spawn(async move {
                    match fallback.exchange(frame.clone(), token).await {
                        Ok(Some(reply)) => inner.handle_frame(&reply),
                        Ok(None) => trace!("Fallback exchange returned no reply"),
                        Err(e) => {
                            inner.sink.report(
                                ErrorId::FallbackFailed,
                                "Request/response exchange failed",
                                Value::Null,
                                Some(&e),
                            );
                            if let Ok(sent) = serde_json::from_str::<Value>(&frame) {
                                inner.hub.emit(&TransportEvent::Undelivered {
                                    frame: Arc::new(sent),
                                    message: e.to_string(),
                                });
                            }
                        }
                    }
                });
                Ok(())
            }
            Route::Unavailable => Err(SendFailure::NotConnected),
        }
    }

    fn handle_frame(&self, text: &str) {
        let value: Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(e) => {
                self.sink.report(
                    ErrorId::ParseError,
                    "Failed to parse inbound frame",
                    serde_json::json!({ "frame_len": text.len() }),
                    Some(&e),
                );
                return;
            }
        };

        if let Ok(frame) = ServerFrame::deserialize(&value) {
            match frame {
                ServerFrame::Connected { version, .. } => {
                    info!(version = ?version, "Server greeting received")
                }
                ServerFrame::Subscribed { topics } => debug!(?topics, "Subscription confirmed"),
                ServerFrame::Pong => trace!("Pong"),
            }
        }

        let message = Arc::new(value);
        self.hub.emit(&TransportEvent::Message(message.clone()));
        if let Some(kind) = message.get("type").and_then(Value::as_str) {
            self.hub.emit(&TransportEvent::Typed {
                kind: kind.to_owned(),
                message: message.clone(),
            });
        }
    }
}
