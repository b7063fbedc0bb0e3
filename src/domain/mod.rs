//! Core domain types and logic.

pub mod bus;
pub mod candle;
pub mod config;
pub mod config_validation;
pub mod error;
pub mod fault;
pub mod indicator;
pub mod indicator_helpers;
pub mod message;
pub mod multiplexer;
pub mod position;
pub mod stream;
pub mod valuation;
