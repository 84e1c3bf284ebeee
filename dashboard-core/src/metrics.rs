//! Pure derivations over canonical state.
//!
//! Everything here is a side-effect-free function of its inputs; the
//! reconciler recomputes the full [`DerivedMetrics`] after every mutation
//! and publishes it alongside the state snapshot.

use crate::price::PriceQuote;
use crate::signal::{Direction, Signal};
use crate::stats::StatsSnapshot;
use crate::trade::Trade;
use chrono::{DateTime, Utc};
use derive_more::Constructor;
use itertools::Itertools;
use std::collections::HashMap;

/// One point of the cumulative profit/loss sequence, one per trade.
#[derive(Debug, Clone, Copy, PartialEq, Constructor)]
pub struct EquityPoint {
    pub index: usize,
    pub cumulative_pnl: f64,
    pub timestamp: DateTime<Utc>,
}

/// Per-signal derived figures.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SignalMetrics {
    pub risk_reward: f64,
    pub progress_pct: f64,
}

/// The full set of derived views published with each state snapshot.
#[derive(Debug, Clone, Default)]
pub struct DerivedMetrics {
    pub equity_curve: Vec<EquityPoint>,
    pub win_rate: f64,
    pub signal_metrics: HashMap<u64, SignalMetrics>,
}

impl DerivedMetrics {
    /// Recompute every derived view from the current canonical state.
    pub fn derive(
        signals: &[Signal],
        trades: &[Trade],
        quotes: &HashMap<String, PriceQuote>,
        stats: &StatsSnapshot,
        initial_balance: f64,
    ) -> Self {
        let signal_metrics = signals
            .iter()
            .map(|signal| {
                let progress = quotes
                    .get(&signal.symbol)
                    .map(|quote| position_progress(signal, quote.price))
                    .unwrap_or(0.0);
                let metrics = SignalMetrics {
                    risk_reward: risk_reward(signal),
                    progress_pct: progress,
                };
                (signal.id, metrics)
            })
            .collect();

        Self {
            equity_curve: equity_curve(trades, initial_balance),
            win_rate: win_rate(stats),
            signal_metrics,
        }
    }
}

/// Cumulative profit/loss across trades in chronological order.
///
/// Trades arrive newest-first for display, so they are re-sorted oldest-first
/// here. A trade without a realised pnl contributes zero.
pub fn equity_curve(trades: &[Trade], initial_balance: f64) -> Vec<EquityPoint> {
    let mut cumulative = initial_balance;
    trades
        .iter()
        .sorted_by_key(|trade| trade.timestamp)
        .enumerate()
        .map(|(index, trade)| {
            cumulative += trade.net_pnl.unwrap_or(0.0);
            EquityPoint::new(index, cumulative, trade.timestamp)
        })
        .collect()
}

/// Percentage of closed trades that were winners, in `[0, 100]`.
///
/// Zero when no trades have closed yet.
pub fn win_rate(stats: &StatsSnapshot) -> f64 {
    if stats.closed_trades == 0 {
        return 0.0;
    }
    (stats.winning_trades as f64 / stats.closed_trades as f64 * 100.0).clamp(0.0, 100.0)
}

/// Reward distance over risk distance for a signal.
///
/// Zero when the stop distance is zero or the signal is missing any of the
/// three price levels.
pub fn risk_reward(signal: &Signal) -> f64 {
    let (Some(entry), Some(stop), Some(target)) =
        (signal.entry_price, signal.stop_loss, signal.final_target())
    else {
        return 0.0;
    };
    let risk = (entry - stop).abs();
    if risk == 0.0 {
        return 0.0;
    }
    (target - entry).abs() / risk
}

/// Fraction of the entry-to-final-target distance the price has travelled,
/// as a percentage clamped to `[0, 100]`.
///
/// Direction-aware: a buy measures moves above entry, a sell moves below.
/// Zero when the signal has no usable entry/target span.
pub fn position_progress(signal: &Signal, current_price: f64) -> f64 {
    let (Some(entry), Some(target)) = (signal.entry_price, signal.final_target()) else {
        return 0.0;
    };
    let (span, travelled) = match signal.direction {
        Direction::Buy => (target - entry, current_price - entry),
        Direction::Sell => (entry - target, entry - current_price),
    };
    if span <= 0.0 {
        return 0.0;
    }
    (travelled / span * 100.0).clamp(0.0, 100.0)
}
