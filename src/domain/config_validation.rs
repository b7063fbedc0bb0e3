//! Configuration validation.
//!
//! Runs before any socket is opened so a bad value fails fast with the
//! offending section and key.

use crate::domain::error::LivefeedError;
use crate::ports::config_port::ConfigPort;
use url::Url;

pub fn validate_stream_config(config: &dyn ConfigPort) -> Result<(), LivefeedError> {
    validate_endpoint(config)?;
    validate_positive_int(config, "stream", "reconnect_base_ms", 1)?;
    validate_positive_int(config, "stream", "max_reconnect_attempts", 0)?;
    validate_positive_int(config, "history", "max_candles", 1)?;
    validate_log_filter(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> LivefeedError {
    LivefeedError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn validate_endpoint(config: &dyn ConfigPort) -> Result<(), LivefeedError> {
    let Some(raw) = config.get_string("stream", "endpoint") else {
        return Ok(());
    };
    let url = Url::parse(raw.trim())
        .map_err(|e| invalid("stream", "endpoint", format!("not a URL: {e}")))?;
    match url.scheme() {
        "ws" | "wss" => Ok(()),
        other => Err(invalid(
            "stream",
            "endpoint",
            format!("scheme must be ws or wss, got '{other}'"),
        )),
    }
}

/// Absent keys pass; present ones must parse as an integer `>= min`.
fn validate_positive_int(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    min: i64,
) -> Result<(), LivefeedError> {
    let Some(raw) = config.get_string(section, key) else {
        return Ok(());
    };
    let value: i64 = raw
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, format!("'{raw}' is not an integer")))?;
    if value < min {
        return Err(invalid(section, key, format!("{key} must be at least {min}")));
    }
    if value > i64::from(u32::MAX) {
        return Err(invalid(section, key, format!("{key} is too large")));
    }
    Ok(())
}

fn validate_log_filter(config: &dyn ConfigPort) -> Result<(), LivefeedError> {
    match config.get_string("log", "filter") {
        Some(filter) if filter.trim().is_empty() => {
            Err(invalid("log", "filter", "filter must not be empty"))
        }
        _ => Ok(()),
    }
}
