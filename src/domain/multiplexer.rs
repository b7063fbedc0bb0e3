//! Multiplexed streaming client.
//!
//! Many logical subscriptions share one physical socket per
//! [`StreamSignature`]. The multiplexer owns the socket lifecycle: it opens
//! on first subscribe, reconnects with exponential backoff while anyone is
//! still listening, and tears everything down when the last subscriber
//! leaves. Handlers are called outside the registry lock, so a handler may
//! subscribe or unsubscribe from inside its own callback.

use std::collections::{BTreeMap, HashMap};
use std::error::Error;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::domain::config::StreamConfig;
use crate::domain::error::LivefeedError;
use crate::domain::fault::{self, StreamFault};
use crate::domain::message::parse_envelope;
use crate::domain::stream::{
    ConnectionState, FeedType, ReconnectPolicy, StreamSignature, Subscription,
};
use crate::ports::transport_port::{SocketEvent, SocketHandle, TransportPort};

pub type HandlerError = Box<dyn Error + Send + Sync>;
pub type MessageHandler = Arc<dyn Fn(&Value) -> Result<(), HandlerError> + Send + Sync>;

struct Connection {
    state: ConnectionState,
    attempts: u32,
    /// Bumped on every open; events tagged with an older value are stale.
    generation: u64,
    socket: Option<Box<dyn SocketHandle>>,
    pump: Option<JoinHandle<()>>,
    timer: Option<JoinHandle<()>>,
    /// Keyed by subscriber id, which increases with registration order.
    subscribers: BTreeMap<u64, MessageHandler>,
}

impl Connection {
    fn new() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            attempts: 0,
            generation: 0,
            socket: None,
            pump: None,
            timer: None,
            subscribers: BTreeMap::new(),
        }
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    fn close_socket(&mut self) {
        if let Some(mut socket) = self.socket.take() {
            socket.close();
        }
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }

    fn teardown(mut self) {
        self.cancel_timer();
        self.close_socket();
        self.subscribers.clear();
    }

    fn has_pending_timer(&self) -> bool {
        self.timer.as_ref().is_some_and(|t| !t.is_finished())
    }
}

#[derive(Default)]
struct Registry {
    connections: HashMap<StreamSignature, Connection>,
    next_subscriber_id: u64,
    next_generation: u64,
}

struct Shared {
    registry: Mutex<Registry>,
    transport: Arc<dyn TransportPort>,
    endpoint: String,
    policy: ReconnectPolicy,
    runtime: Handle,
    faults: AtomicU64,
}

/// Handle to the shared connection registry. Clones share state.
#[derive(Clone)]
pub struct StreamMultiplexer {
    shared: Arc<Shared>,
}

impl StreamMultiplexer {
    /// Must be called from within a tokio runtime; the runtime handle is
    /// kept for spawning socket pumps and reconnect timers.
    pub fn new(
        config: &StreamConfig,
        transport: Arc<dyn TransportPort>,
    ) -> Result<Self, LivefeedError> {
        let runtime = Handle::try_current().map_err(|e| LivefeedError::Runtime {
            reason: e.to_string(),
        })?;
        Ok(Self {
            shared: Arc::new(Shared {
                registry: Mutex::new(Registry::default()),
                transport,
                endpoint: config.endpoint.clone(),
                policy: config.reconnect,
                runtime,
                faults: AtomicU64::new(0),
            }),
        })
    }

    /// Register `handler` for the stream described by `symbols`, `feed` and
    /// `interval`. Returns `None` for malformed requests.
    ///
    /// A new signature opens a socket. An existing signature whose socket is
    /// down (backing off or out of retries) is reopened immediately.
    pub fn subscribe<S, F>(
        &self,
        symbols: &[S],
        feed: FeedType,
        interval: Option<&str>,
        handler: F,
    ) -> Option<Subscription>
    where
        S: AsRef<str>,
        F: Fn(&Value) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let signature = StreamSignature::new(symbols, feed, interval)?;
        let shared = &self.shared;
        let mut registry = shared.lock();

        let subscriber_id = registry.next_subscriber_id;
        registry.next_subscriber_id += 1;

        let connection = registry
            .connections
            .entry(signature.clone())
            .or_insert_with(Connection::new);
        connection.subscribers.insert(subscriber_id, Arc::new(handler));
        let needs_open = connection.state == ConnectionState::Disconnected;

        debug!(%signature, subscriber_id, "subscribed");
        if needs_open {
            shared.open_socket(&mut registry, &signature);
        }

        Some(Subscription {
            signature,
            subscriber_id,
        })
    }

    /// Remove one subscriber. The connection is torn down when its last
    /// subscriber leaves. Unknown or already-removed handles are ignored.
    pub fn unsubscribe(&self, subscription: &Subscription) {
        let mut registry = self.shared.lock();
        let Some(connection) = registry.connections.get_mut(&subscription.signature) else {
            return;
        };
        if connection
            .subscribers
            .remove(&subscription.subscriber_id)
            .is_none()
        {
            return;
        }
        debug!(
            signature = %subscription.signature,
            subscriber_id = subscription.subscriber_id,
            "unsubscribed"
        );
        if connection.subscribers.is_empty() {
            if let Some(connection) = registry.connections.remove(&subscription.signature) {
                connection.teardown();
                debug!(signature = %subscription.signature, "connection released");
            }
        }
    }

    /// Release every connection, timer and subscriber.
    pub fn unsubscribe_all(&self) {
        let drained: Vec<Connection> = {
            let mut registry = self.shared.lock();
            registry.connections.drain().map(|(_, c)| c).collect()
        };
        let released = drained.len();
        for connection in drained {
            connection.teardown();
        }
        debug!(released, "all connections released");
    }

    pub fn connection_count(&self) -> usize {
        self.shared.lock().connections.len()
    }

    pub fn pending_timer_count(&self) -> usize {
        self.shared
            .lock()
            .connections
            .values()
            .filter(|c| c.has_pending_timer())
            .count()
    }

    pub fn subscriber_count(&self, signature: &StreamSignature) -> usize {
        self.shared
            .lock()
            .connections
            .get(signature)
            .map_or(0, |c| c.subscribers.len())
    }

    pub fn connection_state(&self, signature: &StreamSignature) -> Option<ConnectionState> {
        self.shared
            .lock()
            .connections
            .get(signature)
            .map(|c| c.state)
    }

    pub fn reconnect_attempts(&self, signature: &StreamSignature) -> Option<u32> {
        self.shared
            .lock()
            .connections
            .get(signature)
            .map(|c| c.attempts)
    }

    /// Total faults reported since construction.
    pub fn fault_count(&self) -> u64 {
        self.shared.faults.load(Ordering::Relaxed)
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn fault(&self, fault: StreamFault) {
        self.faults.fetch_add(1, Ordering::Relaxed);
        fault::report(&fault);
    }

    /// Replace whatever socket the connection had with a fresh one.
    fn open_socket(self: &Arc<Self>, registry: &mut Registry, signature: &StreamSignature) {
        registry.next_generation += 1;
        let generation = registry.next_generation;
        let Some(connection) = registry.connections.get_mut(signature) else {
            return;
        };
        connection.cancel_timer();
        connection.close_socket();
        connection.generation = generation;
        connection.state = ConnectionState::Connecting;

        let url = signature.url(&self.endpoint);
        let (events, receiver) = unbounded_channel();
        connection.socket = Some(self.transport.open(&url, events));
        connection.pump = Some(self.runtime.spawn(pump(
            Arc::downgrade(self),
            signature.clone(),
            generation,
            receiver,
        )));
        debug!(%signature, generation, %url, "connecting");
    }

    fn on_open(&self, signature: &StreamSignature, generation: u64) {
        let mut registry = self.lock();
        let Some(connection) = registry.connections.get_mut(signature) else {
            return;
        };
        if connection.generation != generation {
            return;
        }
        connection.state = ConnectionState::Connected;
        connection.attempts = 0;
        debug!(%signature, "connected");
    }

    fn on_message(&self, signature: &StreamSignature, generation: u64, text: &str) {
        let envelope = match parse_envelope(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                self.fault(StreamFault::MalformedPayload {
                    signature: signature.clone(),
                    reason: e.to_string(),
                });
                return;
            }
        };
        let Some(payload) = envelope.payload() else {
            trace!(%signature, "frame without payload");
            return;
        };

        let handlers: Vec<(u64, MessageHandler)> = {
            let registry = self.lock();
            match registry.connections.get(signature) {
                Some(c) if c.generation == generation => c
                    .subscribers
                    .iter()
                    .map(|(id, h)| (*id, Arc::clone(h)))
                    .collect(),
                _ => return,
            }
        };

        for (subscriber_id, handler) in handlers {
            match catch_unwind(AssertUnwindSafe(|| handler(payload))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => self.fault(StreamFault::HandlerFailed {
                    signature: signature.clone(),
                    subscriber_id,
                    reason: e.to_string(),
                }),
                Err(_) => self.fault(StreamFault::HandlerPanicked {
                    signature: signature.clone(),
                    subscriber_id,
                }),
            }
        }
    }

    fn on_failure(self: &Arc<Self>, signature: &StreamSignature, generation: u64, reason: String) {
        let mut registry = self.lock();
        let Some(connection) = registry.connections.get_mut(signature) else {
            return;
        };
        if connection.generation != generation {
            return;
        }
        connection.state = ConnectionState::Disconnected;
        if let Some(mut socket) = connection.socket.take() {
            socket.close();
        }
        // The pump calling us is about to return.
        connection.pump = None;

        self.fault(StreamFault::TransportFailed {
            signature: signature.clone(),
            reason,
        });
        if connection.subscribers.is_empty() {
            return;
        }

        match self.policy.next(connection.attempts) {
            Some(delay) => {
                let attempt = connection.attempts;
                connection.attempts += 1;
                connection.timer = Some(self.runtime.spawn(reconnect_after(
                    Arc::downgrade(self),
                    signature.clone(),
                    generation,
                    delay,
                )));
                self.fault(StreamFault::ReconnectScheduled {
                    signature: signature.clone(),
                    attempt,
                    delay,
                });
            }
            None => self.fault(StreamFault::ReconnectExhausted {
                signature: signature.clone(),
                attempts: connection.attempts,
            }),
        }
    }

    fn on_timer(self: &Arc<Self>, signature: &StreamSignature, generation: u64) {
        let mut registry = self.lock();
        let Some(connection) = registry.connections.get_mut(signature) else {
            return;
        };
        if connection.generation != generation
            || connection.state != ConnectionState::Disconnected
        {
            return;
        }
        // Detach rather than abort: this is the timer task itself.
        connection.timer = None;
        self.open_socket(&mut registry, signature);
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        let registry = self.registry.get_mut().unwrap_or_else(PoisonError::into_inner);
        for (_, connection) in registry.connections.drain() {
            connection.teardown();
        }
    }
}

/// Forward one socket's events into the registry until it fails.
async fn pump(
    shared: Weak<Shared>,
    signature: StreamSignature,
    generation: u64,
    mut events: UnboundedReceiver<SocketEvent>,
) {
    while let Some(event) = events.recv().await {
        let Some(shared) = shared.upgrade() else {
            return;
        };
        match event {
            SocketEvent::Opened => shared.on_open(&signature, generation),
            SocketEvent::Message(text) => shared.on_message(&signature, generation, &text),
            SocketEvent::Error(reason) => {
                shared.on_failure(&signature, generation, reason);
                return;
            }
            SocketEvent::Closed => {
                shared.on_failure(&signature, generation, "socket closed".to_string());
                return;
            }
        }
    }
    if let Some(shared) = shared.upgrade() {
        shared.on_failure(&signature, generation, "event channel dropped".to_string());
    }
}

async fn reconnect_after(
    shared: Weak<Shared>,
    signature: StreamSignature,
    generation: u64,
    delay: Duration,
) {
    tokio::time::sleep(delay).await;
    if let Some(shared) = shared.upgrade() {
        shared.on_timer(&signature, generation);
    }
}
