//! Core data model for the trading dashboard.
//!
//! Defines the canonical entities the synchronization layer reconciles
//! (signals, trades, price quotes, aggregate statistics) and the pure
//! derivations computed from them (equity curve, win rate, risk/reward,
//! position progress). This crate performs no I/O and holds no async state;
//! the `dashboard-sync` crate owns connection lifecycle and reconciliation.

pub mod log;
pub mod metrics;
pub mod price;
pub mod risk;
pub mod room;
pub mod signal;
pub mod stats;
pub mod status;
pub mod trade;

pub use log::LogEntry;
pub use metrics::{DerivedMetrics, EquityPoint, SignalMetrics};
pub use price::PriceQuote;
pub use risk::RiskMetrics;
pub use room::Room;
pub use signal::{Direction, Signal, SignalStatus};
pub use stats::StatsSnapshot;
pub use status::{ServiceHealth, SystemStatus};
pub use trade::{Trade, TradeStatus};
