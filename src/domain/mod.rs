//! Core domain types and logic.

pub mod ohlcv;
pub mod indicator;
pub mod indicator_helpers;
pub mod rule;
pub mod rule_eval;
pub mod signal;
pub mod sizing;
pub mod strategy;
pub mod trade;
pub mod equity;
pub mod backtest;
pub mod metrics;
pub mod config_validation;
pub mod error;
