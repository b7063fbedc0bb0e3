//! Stream identity, connection state and reconnect policy.
//!
//! A [`StreamSignature`] is the canonical key for one physical connection:
//! the sorted, de-duplicated symbol set plus the feed type and, for klines,
//! the interval. Two requests with equal signatures share one socket.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeedType {
    Kline,
    Ticker,
}

impl FromStr for FeedType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kline" | "candle" => Ok(FeedType::Kline),
            "ticker" => Ok(FeedType::Ticker),
            other => Err(format!("unknown feed type '{other}'")),
        }
    }
}

impl fmt::Display for FeedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedType::Kline => write!(f, "kline"),
            FeedType::Ticker => write!(f, "ticker"),
        }
    }
}

const INTERVALS: &[&str] = &[
    "1s", "1m", "3m", "5m", "15m", "30m", "1h", "2h", "4h", "6h", "8h", "12h", "1d", "3d", "1w",
    "1M",
];

/// A kline interval from the exchange grammar (`1m`, `4h`, `1M`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Interval(String);

impl Interval {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        INTERVALS
            .iter()
            .find(|i| **i == raw)
            .map(|i| Interval((*i).to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamSignature {
    symbols: Vec<String>,
    feed: FeedType,
    interval: Option<Interval>,
}

impl StreamSignature {
    /// Build the canonical signature, or `None` for malformed requests:
    /// no symbols, a blank symbol, or a kline feed without a valid interval.
    pub fn new<S: AsRef<str>>(
        symbols: &[S],
        feed: FeedType,
        interval: Option<&str>,
    ) -> Option<Self> {
        if symbols.is_empty() {
            return None;
        }
        let mut normalized = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            let symbol = symbol.as_ref().trim();
            let reserved = |c: char| c.is_whitespace() || c == ',' || c == '@';
            if symbol.is_empty() || symbol.contains(reserved) {
                return None;
            }
            normalized.push(symbol.to_uppercase());
        }
        normalized.sort();
        normalized.dedup();

        let interval = match feed {
            FeedType::Kline => Some(Interval::parse(interval?)?),
            FeedType::Ticker => None,
        };

        Some(Self {
            symbols: normalized,
            feed,
            interval,
        })
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn feed(&self) -> FeedType {
        self.feed
    }

    pub fn interval(&self) -> Option<&Interval> {
        self.interval.as_ref()
    }

    /// Per-symbol stream names: `btcusdt@kline_1m`, `btcusdt@ticker`.
    pub fn stream_names(&self) -> Vec<String> {
        self.symbols
            .iter()
            .map(|symbol| {
                let lower = symbol.to_lowercase();
                match (&self.feed, &self.interval) {
                    (FeedType::Kline, Some(interval)) => format!("{lower}@kline_{interval}"),
                    _ => format!("{lower}@ticker"),
                }
            })
            .collect()
    }

    /// `<endpoint>/stream?streams=<comma-joined stream names>`
    pub fn url(&self, endpoint: &str) -> String {
        format!(
            "{}/stream?streams={}",
            endpoint.trim_end_matches('/'),
            self.stream_names().join(",")
        )
    }
}

impl fmt::Display for StreamSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.interval {
            Some(interval) => write!(f, "{}_{}:{}", self.feed, interval, self.symbols.join(",")),
            None => write!(f, "{}:{}", self.feed, self.symbols.join(",")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Opaque handle returned by `subscribe`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subscription {
    pub(crate) signature: StreamSignature,
    pub(crate) subscriber_id: u64,
}

impl Subscription {
    pub fn signature(&self) -> &StreamSignature {
        &self.signature
    }

    pub fn subscriber_id(&self) -> u64 {
        self.subscriber_id
    }
}

/// Exponential backoff: `delay(attempt) = base * 2^attempt`, giving up once
/// `max_attempts` consecutive retries have been scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub base: Duration,
    pub max_attempts: u32,
}

impl ReconnectPolicy {
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor)
    }

    /// Delay for the next retry, or `None` once retries are exhausted.
    pub fn next(&self, attempts: u32) -> Option<Duration> {
        (attempts < self.max_attempts).then(|| self.delay(attempts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_is_order_and_case_insensitive() {
        let a =
            StreamSignature::new(&["ethusdt", "BTCUSDT"], FeedType::Kline, Some("1m")).unwrap();
        let symbols = ["BTCUSDT", "ETHUSDT", "btcusdt"];
        let b = StreamSignature::new(&symbols, FeedType::Kline, Some("1m")).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.symbols(), &["BTCUSDT".to_string(), "ETHUSDT".to_string()]);
    }

    #[test]
    fn interval_distinguishes_kline_signatures() {
        let a = StreamSignature::new(&["BTCUSDT"], FeedType::Kline, Some("1m")).unwrap();
        let b = StreamSignature::new(&["BTCUSDT"], FeedType::Kline, Some("5m")).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn ticker_ignores_interval() {
        let a = StreamSignature::new(&["BTCUSDT"], FeedType::Ticker, Some("1m")).unwrap();
        let b = StreamSignature::new(&["BTCUSDT"], FeedType::Ticker, None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn malformed_requests_rejected() {
        let empty: [&str; 0] = [];
        assert!(StreamSignature::new(&empty, FeedType::Ticker, None).is_none());
        assert!(StreamSignature::new(&["  "], FeedType::Ticker, None).is_none());
        assert!(StreamSignature::new(&["BTC USDT"], FeedType::Ticker, None).is_none());
        assert!(StreamSignature::new(&["BTCUSDT"], FeedType::Kline, None).is_none());
        assert!(StreamSignature::new(&["BTCUSDT"], FeedType::Kline, Some("7m")).is_none());
    }

    #[test]
    fn stream_names_and_url() {
        let sig =
            StreamSignature::new(&["ETHUSDT", "BTCUSDT"], FeedType::Kline, Some("15m")).unwrap();
        assert_eq!(sig.stream_names(), vec!["btcusdt@kline_15m", "ethusdt@kline_15m"]);
        assert_eq!(
            sig.url("wss://stream.example.com:9443/"),
            "wss://stream.example.com:9443/stream?streams=btcusdt@kline_15m,ethusdt@kline_15m"
        );

        let ticker = StreamSignature::new(&["solusdt"], FeedType::Ticker, None).unwrap();
        assert_eq!(ticker.stream_names(), vec!["solusdt@ticker"]);
        assert_eq!(ticker.to_string(), "ticker:SOLUSDT");
    }

    #[test]
    fn backoff_doubles_from_base() {
        let policy = ReconnectPolicy {
            base: Duration::from_millis(500),
            max_attempts: 4,
        };
        let delays: Vec<Duration> = (0..4).map_while(|a| policy.next(a)).collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(500),
                Duration::from_millis(1000),
                Duration::from_millis(2000),
                Duration::from_millis(4000),
            ]
        );
        assert_eq!(policy.next(4), None);
    }

    #[test]
    fn backoff_saturates() {
        let policy = ReconnectPolicy {
            base: Duration::from_secs(1),
            max_attempts: u32::MAX,
        };
        assert_eq!(policy.delay(40), Duration::from_secs(1).saturating_mul(u32::MAX));
    }

    #[test]
    fn feed_type_parse() {
        assert_eq!("Kline".parse::<FeedType>(), Ok(FeedType::Kline));
        assert_eq!("ticker".parse::<FeedType>(), Ok(FeedType::Ticker));
        assert!("depth".parse::<FeedType>().is_err());
    }
}
