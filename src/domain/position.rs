//! Position model and tick-driven valuation.
//!
//! Positions are owned by the caller. [`revalue`] never mutates its input;
//! it returns the next snapshot for a new tick price.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    #[serde(alias = "long", alias = "Long")]
    Long,
    #[serde(alias = "short", alias = "Short")]
    Short,
}

impl Direction {
    pub fn sign(self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }
}

/// Lifecycle status as reported by upstream bots. Free-form strings are
/// normalised (trimmed, uppercased); unknown values are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PositionStatus {
    Open,
    Active,
    Pending,
    Closed,
    Cancelled,
    Other(String),
}

impl PositionStatus {
    pub fn normalize(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "OPEN" => PositionStatus::Open,
            "ACTIVE" => PositionStatus::Active,
            "PENDING" => PositionStatus::Pending,
            "CLOSED" => PositionStatus::Closed,
            "CANCELLED" | "CANCELED" => PositionStatus::Cancelled,
            other => PositionStatus::Other(other.to_string()),
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, PositionStatus::Open | PositionStatus::Active)
    }
}

impl From<String> for PositionStatus {
    fn from(raw: String) -> Self {
        PositionStatus::normalize(&raw)
    }
}

impl From<PositionStatus> for String {
    fn from(status: PositionStatus) -> Self {
        status.to_string()
    }
}

impl fmt::Display for PositionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionStatus::Open => write!(f, "OPEN"),
            PositionStatus::Active => write!(f, "ACTIVE"),
            PositionStatus::Pending => write!(f, "PENDING"),
            PositionStatus::Closed => write!(f, "CLOSED"),
            PositionStatus::Cancelled => write!(f, "CANCELLED"),
            PositionStatus::Other(raw) => write!(f, "{}", raw),
        }
    }
}

fn default_leverage() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub id: String,
    pub symbol: String,
    #[serde(default)]
    pub entry_price: f64,
    #[serde(default)]
    pub current_price: f64,
    pub quantity: f64,
    #[serde(default = "default_leverage")]
    pub leverage: f64,
    pub direction: Direction,
    pub status: PositionStatus,
    #[serde(default)]
    pub is_entry_price_locked: bool,
    #[serde(default)]
    pub entry_price_locked_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pnl: f64,
    #[serde(default)]
    pub pnl_percent: f64,
}

impl Position {
    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }

    /// Symbol key used to match ticks (uppercase, trimmed).
    pub fn symbol_key(&self) -> String {
        self.symbol.trim().to_uppercase()
    }
}

/// Value `position` at tick `price`, returning the new snapshot.
///
/// The first tick seen while the position is open and unlocked becomes the
/// entry price. A non-positive entry price is always replaced by the tick.
pub fn revalue(position: &Position, price: f64, now: DateTime<Utc>) -> Position {
    let mut next = position.clone();

    if next.is_open() && !next.is_entry_price_locked {
        next.entry_price = price;
        next.is_entry_price_locked = true;
        next.entry_price_locked_at = Some(now);
    }

    if next.entry_price <= 0.0 {
        next.entry_price = price;
        next.is_entry_price_locked = true;
        next.entry_price_locked_at.get_or_insert(now);
    }

    let price_diff = match next.direction {
        Direction::Long => price - next.entry_price,
        Direction::Short => next.entry_price - price,
    };

    next.pnl = price_diff * next.quantity;
    next.pnl_percent = if next.entry_price != 0.0 {
        let change = (price - next.entry_price) / next.entry_price;
        change * next.direction.sign() * next.leverage * 100.0
    } else {
        0.0
    };
    next.current_price = price;
    next
}
