//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Notify;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::adapters::csv_adapter::load_candles;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::ws_transport::WsTransport;
use crate::domain::bus::{EventBus, PositionEvent};
use crate::domain::candle::{Candle, parse_kline_rows};
use crate::domain::config::StreamConfig;
use crate::domain::config_validation::validate_stream_config;
use crate::domain::error::LivefeedError;
use crate::domain::indicator::{self, IndicatorSeries, IndicatorType};
use crate::domain::multiplexer::StreamMultiplexer;
use crate::domain::position::Position;
use crate::domain::stream::FeedType;
use crate::domain::valuation::PositionValuationEngine;

#[derive(Parser, Debug)]
#[command(name = "livefeed", about = "Market-data streaming, live valuation and indicators")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compute indicators over a candle file (.csv or REST kline .json)
    Indicators {
        #[arg(long)]
        candles: PathBuf,
        /// e.g. `rsi:14`, `macd:12,26,9`, `bollinger:20,2`; repeatable
        #[arg(short, long = "indicator", required = true)]
        indicators: Vec<String>,
        #[arg(long)]
        max_candles: Option<usize>,
    },
    /// Stream raw payloads to stdout
    Watch {
        #[arg(short, long)]
        config: PathBuf,
        /// Comma-separated, e.g. `BTCUSDT,ETHUSDT`
        #[arg(long)]
        symbols: String,
        #[arg(long, default_value = "ticker")]
        feed: FeedType,
        #[arg(long)]
        interval: Option<String>,
        /// Stop after this many payloads
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Value positions from a JSON file against live tickers
    Positions {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        positions: PathBuf,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Indicators {
            candles,
            indicators,
            max_candles,
        } => run_indicators(&candles, &indicators, max_candles),
        Command::Watch {
            config,
            symbols,
            feed,
            interval,
            limit,
        } => run_watch(&config, &symbols, feed, interval.as_deref(), limit),
        Command::Positions { config, positions } => run_positions(&config, &positions),
        Command::Validate { config } => run_validate(&config),
    }
}

fn fail(err: LivefeedError) -> ExitCode {
    eprintln!("error: {err}");
    (&err).into()
}

/// Install the global subscriber. `RUST_LOG` wins over the configured filter.
pub fn init_logging(filter: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn load_stream_config(path: &Path) -> Result<StreamConfig, LivefeedError> {
    let adapter = FileConfigAdapter::from_file(path)?;
    StreamConfig::from_port(&adapter)
}

/// Load candles from `.json` (REST kline rows) or CSV.
pub fn load_candle_file(path: &Path, max_candles: usize) -> Result<Vec<Candle>, LivefeedError> {
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if !is_json {
        return load_candles(path, max_candles);
    }

    let content = fs::read_to_string(path).map_err(|e| {
        LivefeedError::data(format!("failed to read {}: {}", path.display(), e))
    })?;
    let rows: serde_json::Value = serde_json::from_str(&content)?;
    let mut candles = parse_kline_rows(&rows)?;
    if candles.len() > max_candles {
        candles.drain(..candles.len() - max_candles);
    }
    Ok(candles)
}

pub fn parse_indicators(specs: &[String]) -> Result<Vec<IndicatorType>, LivefeedError> {
    specs
        .iter()
        .map(|spec| {
            spec.parse::<IndicatorType>()
                .map_err(|reason| LivefeedError::ConfigInvalid {
                    section: "cli".into(),
                    key: "indicator".into(),
                    reason,
                })
        })
        .collect()
}

/// Header plus one CSV row per candle; undefined components are empty.
pub fn format_indicator_rows(candles: &[Candle], series: &[IndicatorSeries]) -> Vec<String> {
    let mut header = vec!["time".to_string(), "close".to_string()];
    for s in series {
        let width = s.values.first().map_or(1, |p| p.value.components().len());
        if width == 1 {
            header.push(s.indicator_type.to_string());
        } else {
            header.extend((0..width).map(|i| format!("{}[{}]", s.indicator_type, i)));
        }
    }

    let mut rows = vec![header.join(",")];
    for (idx, candle) in candles.iter().enumerate() {
        let mut row = vec![candle.time.to_string(), candle.close.to_string()];
        for s in series {
            for component in s.values[idx].value.components() {
                row.push(component.map(|v| format!("{v:.4}")).unwrap_or_default());
            }
        }
        rows.push(row.join(","));
    }
    rows
}

pub fn parse_symbols(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn load_positions(path: &Path) -> Result<Vec<Position>, LivefeedError> {
    let content = fs::read_to_string(path).map_err(|e| {
        LivefeedError::data(format!("failed to read {}: {}", path.display(), e))
    })?;
    Ok(serde_json::from_str(&content)?)
}

/// Load candles and render one row per candle for every indicator.
pub fn indicator_rows(
    path: &Path,
    specs: &[String],
    max_candles: Option<usize>,
) -> Result<Vec<String>, LivefeedError> {
    let indicators = parse_indicators(specs)?;
    let candles = load_candle_file(path, max_candles.unwrap_or(usize::MAX))?;
    eprintln!("Loaded {} candles from {}", candles.len(), path.display());

    let series: Vec<IndicatorSeries> = indicators
        .iter()
        .map(|i| indicator::compute(&candles, i))
        .collect();
    Ok(format_indicator_rows(&candles, &series))
}

fn run_indicators(path: &Path, specs: &[String], max_candles: Option<usize>) -> ExitCode {
    init_logging("warn");
    match indicator_rows(path, specs, max_candles) {
        Ok(rows) => {
            for row in rows {
                println!("{row}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

fn runtime() -> Result<tokio::runtime::Runtime, LivefeedError> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| LivefeedError::Runtime {
            reason: e.to_string(),
        })
}

fn run_watch(
    config_path: &Path,
    symbols: &str,
    feed: FeedType,
    interval: Option<&str>,
    limit: Option<usize>,
) -> ExitCode {
    let config = match load_stream_config(config_path) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    init_logging(&config.log_filter);
    let symbols = parse_symbols(symbols);

    let rt = match runtime() {
        Ok(rt) => rt,
        Err(e) => return fail(e),
    };
    let result = rt.block_on(async {
        let transport = Arc::new(WsTransport::new()?);
        let mux = StreamMultiplexer::new(&config, transport)?;

        let done = Arc::new(Notify::new());
        let seen = Arc::new(AtomicUsize::new(0));
        let (notify, counter) = (Arc::clone(&done), Arc::clone(&seen));
        let subscription = mux
            .subscribe(&symbols, feed, interval, move |payload| {
                println!("{payload}");
                let n = counter.fetch_add(1, Ordering::Relaxed) + 1;
                if limit.is_some_and(|limit| n >= limit) {
                    notify.notify_one();
                }
                Ok(())
            })
            .ok_or_else(|| LivefeedError::ConfigInvalid {
                section: "cli".into(),
                key: "symbols".into(),
                reason: "need at least one symbol, and --interval for kline feeds".into(),
            })?;
        info!(signature = %subscription.signature(), "watching");

        tokio::select! {
            _ = done.notified() => {}
            _ = tokio::signal::ctrl_c() => info!("interrupted"),
        }
        mux.unsubscribe_all();
        info!(
            payloads = seen.load(Ordering::Relaxed),
            faults = mux.fault_count(),
            "stopped"
        );
        Ok::<(), LivefeedError>(())
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(e),
    }
}

fn run_positions(config_path: &Path, positions_path: &Path) -> ExitCode {
    let config = match load_stream_config(config_path) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    init_logging(&config.log_filter);
    let positions = match load_positions(positions_path) {
        Ok(p) => p,
        Err(e) => return fail(e),
    };

    let rt = match runtime() {
        Ok(rt) => rt,
        Err(e) => return fail(e),
    };
    let result = rt.block_on(async {
        let transport = Arc::new(WsTransport::new()?);
        let mux = StreamMultiplexer::new(&config, transport)?;
        let bus = EventBus::default();
        let mut events = bus.subscribe();
        let engine = PositionValuationEngine::with_bus(mux.clone(), bus);

        let tracked = engine.register_positions(positions, |batch| {
            for position in batch {
                match serde_json::to_string(&position) {
                    Ok(line) => println!("{line}"),
                    Err(e) => warn!("failed to encode position {}: {e}", position.id),
                }
            }
        });
        if tracked == 0 {
            eprintln!("No open positions to value.");
            return Ok(());
        }

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Ok(PositionEvent::EntryLocked { id, symbol, price, .. }) => {
                        info!(%id, %symbol, price, "entry price locked");
                    }
                    Err(RecvError::Lagged(skipped)) => warn!(skipped, "position events lagged"),
                    Err(RecvError::Closed) => break,
                },
                _ = tokio::signal::ctrl_c() => {
                    info!("interrupted");
                    break;
                }
            }
        }
        engine.unregister_all();
        mux.unsubscribe_all();
        Ok::<(), LivefeedError>(())
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(e),
    }
}

/// Validate then resolve a config file.
pub fn validate_config_file(path: &Path) -> Result<StreamConfig, LivefeedError> {
    let adapter = FileConfigAdapter::from_file(path)?;
    validate_stream_config(&adapter)?;
    StreamConfig::from_port(&adapter)
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let config = match validate_config_file(config_path) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };

    eprintln!("  endpoint:           {}", config.endpoint);
    eprintln!("  reconnect base:     {}ms", config.reconnect.base.as_millis());
    eprintln!("  reconnect attempts: {}", config.reconnect.max_attempts);
    eprintln!("  max candles:        {}", config.max_candles);
    eprintln!("  log filter:         {}", config.log_filter);
    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}
