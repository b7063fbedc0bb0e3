//! Socket transport port.
//!
//! A transport opens one physical connection per call and reports its
//! lifecycle on the supplied channel. `open` must return immediately; the
//! connection completes in the background.

use tokio::sync::mpsc::UnboundedSender;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    Opened,
    Message(String),
    Error(String),
    Closed,
}

pub type SocketEvents = UnboundedSender<SocketEvent>;

/// Owner handle for an open (or opening) socket.
pub trait SocketHandle: Send {
    /// Close the socket and stop delivering events. Idempotent.
    fn close(&mut self);
}

pub trait TransportPort: Send + Sync {
    fn open(&self, url: &str, events: SocketEvents) -> Box<dyn SocketHandle>;
}
