//! Tick-driven position valuation.
//!
//! The engine holds one multiplexed ticker subscription covering every
//! symbol among the registered open positions. Each tick revalues the
//! positions on that symbol and hands the changed snapshots to the caller
//! as one batch. Caller-owned positions are never touched; the engine works
//! on its own copies.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::domain::bus::{EventBus, PositionEvent};
use crate::domain::message::TickerEvent;
use crate::domain::multiplexer::{HandlerError, StreamMultiplexer};
use crate::domain::position::{Position, revalue};
use crate::domain::stream::{FeedType, StreamSignature, Subscription};

pub type BatchHandler = Arc<dyn Fn(Vec<Position>) + Send + Sync>;

#[derive(Default)]
struct Tracking {
    positions: Vec<Position>,
    subscription: Option<Subscription>,
    /// Bumped on every (re)registration so late ticks from a released
    /// subscription are ignored.
    generation: u64,
}

#[derive(Clone)]
pub struct PositionValuationEngine {
    multiplexer: StreamMultiplexer,
    tracking: Arc<Mutex<Tracking>>,
    bus: Option<EventBus<PositionEvent>>,
}

impl PositionValuationEngine {
    pub fn new(multiplexer: StreamMultiplexer) -> Self {
        Self {
            multiplexer,
            tracking: Arc::new(Mutex::new(Tracking::default())),
            bus: None,
        }
    }

    /// Like [`new`](Self::new), additionally announcing entry locks on `bus`.
    pub fn with_bus(multiplexer: StreamMultiplexer, bus: EventBus<PositionEvent>) -> Self {
        Self {
            bus: Some(bus),
            ..Self::new(multiplexer)
        }
    }

    /// Start valuing the open positions among `positions`, replacing any
    /// previous registration. Returns the number of positions tracked.
    pub fn register_positions<F>(&self, positions: Vec<Position>, on_update: F) -> usize
    where
        F: Fn(Vec<Position>) + Send + Sync + 'static,
    {
        let (previous, generation, symbols, tracked) = {
            let mut tracking = lock(&self.tracking);
            let previous = tracking.subscription.take();
            tracking.generation += 1;

            let open: Vec<Position> = positions
                .into_iter()
                .filter(Position::is_open)
                .filter(streamable)
                .map(|p| carry_lock(p, &tracking.positions))
                .collect();
            let symbols: Vec<String> = open
                .iter()
                .map(Position::symbol_key)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            let tracked = open.len();
            tracking.positions = open;
            (previous, tracking.generation, symbols, tracked)
        };

        if let Some(previous) = previous {
            self.multiplexer.unsubscribe(&previous);
        }
        if symbols.is_empty() {
            debug!("no open positions to value");
            return 0;
        }

        let on_update: BatchHandler = Arc::new(on_update);
        let state = Arc::clone(&self.tracking);
        let bus = self.bus.clone();
        let subscription = self.multiplexer.subscribe(
            &symbols,
            FeedType::Ticker,
            None,
            move |payload: &Value| {
                on_tick(&state, generation, bus.as_ref(), &on_update, payload)
            },
        );

        let mut tracking = lock(&self.tracking);
        let Some(subscription) = subscription else {
            warn!(?symbols, "ticker subscription rejected");
            if tracking.generation == generation {
                tracking.positions.clear();
            }
            return 0;
        };
        if tracking.generation == generation {
            tracking.subscription = Some(subscription);
        } else {
            // Superseded by a registration made from inside a callback.
            drop(tracking);
            self.multiplexer.unsubscribe(&subscription);
        }
        info!(positions = tracked, symbols = symbols.len(), "valuing positions");
        tracked
    }

    /// Release the owned subscription and forget all positions.
    pub fn unregister_all(&self) {
        let previous = {
            let mut tracking = lock(&self.tracking);
            tracking.generation += 1;
            tracking.positions.clear();
            tracking.subscription.take()
        };
        if let Some(previous) = previous {
            self.multiplexer.unsubscribe(&previous);
            debug!("valuation subscription released");
        }
    }

    /// Current snapshots, in registration order.
    pub fn tracked_positions(&self) -> Vec<Position> {
        lock(&self.tracking).positions.clone()
    }

    pub fn subscription(&self) -> Option<Subscription> {
        lock(&self.tracking).subscription.clone()
    }
}

fn lock(tracking: &Mutex<Tracking>) -> MutexGuard<'_, Tracking> {
    tracking.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Positions whose symbol cannot name a ticker stream are left untracked.
fn streamable(position: &Position) -> bool {
    let ok = StreamSignature::new(&[position.symbol_key()], FeedType::Ticker, None).is_some();
    if !ok {
        warn!(
            id = %position.id,
            symbol = %position.symbol,
            "skipping position with invalid symbol"
        );
    }
    ok
}

/// Keep an entry lock the engine already observed for the same position.
fn carry_lock(mut incoming: Position, known: &[Position]) -> Position {
    if incoming.is_entry_price_locked {
        return incoming;
    }
    if let Some(prior) = known
        .iter()
        .find(|p| p.id == incoming.id && p.is_entry_price_locked)
    {
        incoming.entry_price = prior.entry_price;
        incoming.is_entry_price_locked = true;
        incoming.entry_price_locked_at = prior.entry_price_locked_at;
    }
    incoming
}

fn on_tick(
    tracking: &Mutex<Tracking>,
    generation: u64,
    bus: Option<&EventBus<PositionEvent>>,
    on_update: &BatchHandler,
    payload: &Value,
) -> Result<(), HandlerError> {
    let tick = TickerEvent::from_data(payload)?;
    let price = tick.last_price;
    if !price.is_finite() || price <= 0.0 {
        debug!(symbol = %tick.symbol, price, "ignoring non-positive tick");
        return Ok(());
    }

    let now = Utc::now();
    let mut batch = Vec::new();
    let mut locked = Vec::new();
    {
        let mut state = lock(tracking);
        if state.generation != generation {
            return Ok(());
        }
        for position in state
            .positions
            .iter_mut()
            .filter(|p| p.symbol_key() == tick.symbol)
        {
            let next = revalue(position, price, now);
            if next == *position {
                continue;
            }
            if !position.is_entry_price_locked && next.is_entry_price_locked {
                locked.push(PositionEvent::EntryLocked {
                    id: next.id.clone(),
                    symbol: tick.symbol.clone(),
                    price: next.entry_price,
                    at: next.entry_price_locked_at.unwrap_or(now),
                });
            }
            *position = next.clone();
            batch.push(next);
        }
    }

    if let Some(bus) = bus {
        for event in locked {
            bus.publish(event);
        }
    }
    if !batch.is_empty() {
        on_update(batch);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position::{Direction, PositionStatus};

    fn position(id: &str, status: PositionStatus, locked: bool) -> Position {
        Position {
            id: id.into(),
            symbol: "btcusdt".into(),
            entry_price: 100.0,
            current_price: 0.0,
            quantity: 2.0,
            leverage: 1.0,
            direction: Direction::Long,
            status,
            is_entry_price_locked: locked,
            entry_price_locked_at: None,
            pnl: 0.0,
            pnl_percent: 0.0,
        }
    }

    fn tracking_with(positions: Vec<Position>) -> Mutex<Tracking> {
        Mutex::new(Tracking {
            positions,
            subscription: None,
            generation: 1,
        })
    }

    fn collector() -> (BatchHandler, Arc<Mutex<Vec<Vec<Position>>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler: BatchHandler = Arc::new(move |batch| sink.lock().unwrap().push(batch));
        (handler, seen)
    }

    #[test]
    fn carry_lock_keeps_prior_entry() {
        let mut prior = position("a", PositionStatus::Active, true);
        prior.entry_price = 95.0;
        let incoming = position("a", PositionStatus::Active, false);

        let merged = carry_lock(incoming, &[prior]);
        assert!(merged.is_entry_price_locked);
        assert_eq!(merged.entry_price, 95.0);
    }

    #[test]
    fn carry_lock_ignores_other_ids() {
        let prior = position("a", PositionStatus::Active, true);
        let incoming = position("b", PositionStatus::Active, false);
        assert!(!carry_lock(incoming, &[prior]).is_entry_price_locked);
    }

    #[test]
    fn tick_batches_matching_symbol_only() {
        let mut other = position("c", PositionStatus::Active, true);
        other.symbol = "ETHUSDT".into();
        let tracking = tracking_with(vec![
            position("a", PositionStatus::Active, true),
            position("b", PositionStatus::Open, true),
            other,
        ]);
        let (handler, seen) = collector();

        let payload = serde_json::json!({"s": "BTCUSDT", "c": "110"});
        on_tick(&tracking, 1, None, &handler, &payload).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let ids: Vec<&str> = seen[0].iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(seen[0][0].pnl, 20.0);
    }

    #[test]
    fn unchanged_tick_sends_nothing() {
        let tracking = tracking_with(vec![position("a", PositionStatus::Active, true)]);
        let (handler, seen) = collector();
        let payload = serde_json::json!({"s": "BTCUSDT", "c": "110"});

        on_tick(&tracking, 1, None, &handler, &payload).unwrap();
        on_tick(&tracking, 1, None, &handler, &payload).unwrap();
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn stale_generation_is_ignored() {
        let tracking = tracking_with(vec![position("a", PositionStatus::Active, true)]);
        let (handler, seen) = collector();
        let payload = serde_json::json!({"s": "BTCUSDT", "c": "110"});

        on_tick(&tracking, 0, None, &handler, &payload).unwrap();
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn zero_price_tick_is_ignored() {
        let tracking = tracking_with(vec![position("a", PositionStatus::Active, false)]);
        let (handler, seen) = collector();
        let payload = serde_json::json!({"s": "BTCUSDT", "c": "0"});

        on_tick(&tracking, 1, None, &handler, &payload).unwrap();
        assert!(seen.lock().unwrap().is_empty());
        assert!(!lock(&tracking).positions[0].is_entry_price_locked);
    }

    #[test]
    fn malformed_tick_is_an_error() {
        let tracking = tracking_with(vec![]);
        let (handler, _) = collector();
        let payload = serde_json::json!({"c": "1"});
        assert!(on_tick(&tracking, 1, None, &handler, &payload).is_err());
    }

    #[test]
    fn first_tick_locks_and_announces() {
        let tracking = tracking_with(vec![position("a", PositionStatus::Active, false)]);
        let (handler, _) = collector();
        let bus = EventBus::new(4);
        let mut rx = bus.subscribe();
        let payload = serde_json::json!({"s": "BTCUSDT", "c": 105.5});

        on_tick(&tracking, 1, Some(&bus), &handler, &payload).unwrap();

        match rx.try_recv().unwrap() {
            PositionEvent::EntryLocked { id, symbol, price, .. } => {
                assert_eq!(id, "a");
                assert_eq!(symbol, "BTCUSDT");
                assert_eq!(price, 105.5);
            }
        }
        let snapshot = &lock(&tracking).positions[0];
        assert!(snapshot.is_entry_price_locked);
        assert_eq!(snapshot.entry_price, 105.5);
        assert_eq!(snapshot.pnl, 0.0);
    }
}
