//! In-process typed publish/subscribe channel.
//!
//! Announcements such as "a position just activated" go out on an
//! [`EventBus`] instead of an ambient global event system. Clone-able; every
//! clone publishes to the same receivers.

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct EventBus<T: Clone> {
    sender: broadcast::Sender<T>,
}

impl<T: Clone> EventBus<T> {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<T> {
        self.sender.subscribe()
    }

    /// Publish and return how many receivers saw the event; 0 when nobody
    /// is listening.
    pub fn publish(&self, event: T) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl<T: Clone> Default for EventBus<T> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PositionEvent {
    /// A position's entry price was captured from a live tick.
    EntryLocked {
        id: String,
        symbol: String,
        price: f64,
        at: DateTime<Utc>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_without_receivers_is_zero() {
        let bus: EventBus<u32> = EventBus::default();
        assert_eq!(bus.publish(1), 0);
    }

    #[test]
    fn every_receiver_gets_event() {
        let bus: EventBus<String> = EventBus::new(8);
        let mut a = bus.subscribe();
        let mut b = bus.clone().subscribe();

        assert_eq!(bus.publish("hello".to_string()), 2);
        assert_eq!(a.try_recv().unwrap(), "hello");
        assert_eq!(b.try_recv().unwrap(), "hello");
    }

    #[test]
    fn receiver_count_tracks_drops() {
        let bus: EventBus<u8> = EventBus::new(4);
        let rx = bus.subscribe();
        assert_eq!(bus.receiver_count(), 1);
        drop(rx);
        assert_eq!(bus.receiver_count(), 0);
    }
}
