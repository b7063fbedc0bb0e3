#![allow(dead_code)]

use livefeed::domain::candle::Candle;
use livefeed::domain::config::StreamConfig;
use livefeed::domain::position::{Direction, Position, PositionStatus};
use livefeed::domain::stream::ReconnectPolicy;
use livefeed::ports::transport_port::{SocketEvent, SocketEvents, SocketHandle, TransportPort};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One socket the mock transport was asked to open.
pub struct MockSocket {
    pub url: String,
    pub events: SocketEvents,
    pub closed: Arc<AtomicBool>,
}

struct MockHandle {
    closed: Arc<AtomicBool>,
}

impl SocketHandle for MockHandle {
    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Records every `open` and lets the test drive socket events by hand.
#[derive(Clone, Default)]
pub struct MockTransport {
    sockets: Arc<Mutex<Vec<MockSocket>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_count(&self) -> usize {
        self.sockets.lock().unwrap().len()
    }

    pub fn url(&self, idx: usize) -> String {
        self.sockets.lock().unwrap()[idx].url.clone()
    }

    pub fn is_closed(&self, idx: usize) -> bool {
        self.sockets.lock().unwrap()[idx].closed.load(Ordering::SeqCst)
    }

    /// Sockets not closed by the multiplexer.
    pub fn live_count(&self) -> usize {
        self.sockets
            .lock()
            .unwrap()
            .iter()
            .filter(|s| !s.closed.load(Ordering::SeqCst))
            .count()
    }

    pub fn send(&self, idx: usize, event: SocketEvent) {
        let _ = self.sockets.lock().unwrap()[idx].events.send(event);
    }

    pub fn open(&self, idx: usize) {
        self.send(idx, SocketEvent::Opened);
    }

    pub fn fail(&self, idx: usize) {
        self.send(idx, SocketEvent::Error("connection reset".into()));
    }

    pub fn message(&self, idx: usize, text: &str) {
        self.send(idx, SocketEvent::Message(text.to_string()));
    }

    pub fn last(&self) -> usize {
        self.open_count() - 1
    }
}

impl TransportPort for MockTransport {
    fn open(&self, url: &str, events: SocketEvents) -> Box<dyn SocketHandle> {
        let closed = Arc::new(AtomicBool::new(false));
        self.sockets.lock().unwrap().push(MockSocket {
            url: url.to_string(),
            events,
            closed: Arc::clone(&closed),
        });
        Box::new(MockHandle { closed })
    }
}

pub fn test_config(base_ms: u64, max_attempts: u32) -> StreamConfig {
    StreamConfig {
        endpoint: "wss://stream.test:9443".to_string(),
        reconnect: ReconnectPolicy {
            base: Duration::from_millis(base_ms),
            max_attempts,
        },
        ..StreamConfig::default()
    }
}

/// Let spawned pump and timer tasks run to quiescence.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

pub fn ticker_frame(symbol: &str, price: &str) -> String {
    serde_json::json!({
        "stream": format!("{}@ticker", symbol.to_lowercase()),
        "data": {
            "e": "24hrTicker",
            "s": symbol.to_uppercase(),
            "c": price,
            "P": "1.5",
            "h": "0",
            "l": "0",
            "v": "0"
        }
    })
    .to_string()
}

pub fn kline_frame(symbol: &str, open_ms: i64, close: &str, closed: bool) -> String {
    serde_json::json!({
        "stream": format!("{}@kline_1m", symbol.to_lowercase()),
        "data": {
            "e": "kline",
            "s": symbol.to_uppercase(),
            "k": {
                "t": open_ms,
                "i": "1m",
                "o": "100",
                "h": "110",
                "l": "90",
                "c": close,
                "v": "12.5",
                "x": closed
            }
        }
    })
    .to_string()
}

pub fn make_candle(time: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Candle {
    Candle {
        time,
        open,
        high,
        low,
        close,
        volume,
    }
}

/// Candles one minute apart with a small high/low band around each close.
pub fn candles_from_closes(closes: &[f64]) -> Vec<Candle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| make_candle(1_700_000_000 + i as i64 * 60, c, c + 1.0, c - 1.0, c, 1000.0))
        .collect()
}

pub fn make_position(id: &str, symbol: &str, direction: Direction, status: &str) -> Position {
    Position {
        id: id.to_string(),
        symbol: symbol.to_string(),
        entry_price: 100.0,
        current_price: 100.0,
        quantity: 1.0,
        leverage: 1.0,
        direction,
        status: PositionStatus::normalize(status),
        is_entry_price_locked: false,
        entry_price_locked_at: None,
        pnl: 0.0,
        pnl_percent: 0.0,
    }
}

pub fn locked(mut position: Position, entry_price: f64) -> Position {
    position.entry_price = entry_price;
    position.is_entry_price_locked = true;
    position
}
