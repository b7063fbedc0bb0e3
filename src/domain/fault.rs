//! Recoverable stream faults and the single sink they are reported to.
//!
//! Nothing here is fatal: transport failures are retried, bad frames and
//! failing handlers are dropped. Every such event is described by a
//! [`StreamFault`] and routed through [`report`] so they stay inspectable.

use std::fmt;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::domain::stream::StreamSignature;

#[derive(Debug, Clone, PartialEq)]
pub enum StreamFault {
    MalformedPayload {
        signature: StreamSignature,
        reason: String,
    },
    HandlerFailed {
        signature: StreamSignature,
        subscriber_id: u64,
        reason: String,
    },
    HandlerPanicked {
        signature: StreamSignature,
        subscriber_id: u64,
    },
    TransportFailed {
        signature: StreamSignature,
        reason: String,
    },
    ReconnectScheduled {
        signature: StreamSignature,
        attempt: u32,
        delay: Duration,
    },
    ReconnectExhausted {
        signature: StreamSignature,
        attempts: u32,
    },
}

impl fmt::Display for StreamFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamFault::MalformedPayload { signature, reason } => {
                write!(f, "[{signature}] dropped malformed payload: {reason}")
            }
            StreamFault::HandlerFailed {
                signature,
                subscriber_id,
                reason,
            } => write!(f, "[{signature}] subscriber {subscriber_id} failed: {reason}"),
            StreamFault::HandlerPanicked {
                signature,
                subscriber_id,
            } => write!(f, "[{signature}] subscriber {subscriber_id} panicked"),
            StreamFault::TransportFailed { signature, reason } => {
                write!(f, "[{signature}] transport failed: {reason}")
            }
            StreamFault::ReconnectScheduled {
                signature,
                attempt,
                delay,
            } => write!(
                f,
                "[{signature}] reconnect attempt {} in {}ms",
                attempt + 1,
                delay.as_millis()
            ),
            StreamFault::ReconnectExhausted {
                signature,
                attempts,
            } => write!(f, "[{signature}] giving up after {attempts} reconnect attempts"),
        }
    }
}

pub fn report(fault: &StreamFault) {
    match fault {
        StreamFault::MalformedPayload { .. } => debug!("{fault}"),
        StreamFault::ReconnectScheduled { .. } => info!("{fault}"),
        StreamFault::HandlerFailed { .. }
        | StreamFault::HandlerPanicked { .. }
        | StreamFault::TransportFailed { .. }
        | StreamFault::ReconnectExhausted { .. } => warn!("{fault}"),
    }
}
