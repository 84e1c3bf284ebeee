//! The single mutation point for canonical state.
//!
//! Push events and pull snapshots both funnel into one [`StateUpdate`]
//! channel consumed by the [`Reconciler`] task, so no two updates can ever
//! interleave mid-mutation. After each update the reconciler recomputes the
//! derived metrics and publishes a fresh [`DashboardSnapshot`].

use crate::state::{DashboardSnapshot, DashboardState};
use chrono::{DateTime, Utc};
use dashboard_core::{
    LogEntry, PriceQuote, RiskMetrics, Signal, StatsSnapshot, SystemStatus, Trade,
};
use std::collections::HashMap;
use tokio::sync::{mpsc, watch};
use tracing::debug;

/// One serialized mutation of canonical state.
#[derive(Debug)]
pub enum StateUpdate {
    /// A single signal observation from the push channel.
    Signal(Signal),
    /// A batch of signal observations from a pull snapshot.
    Signals(Vec<Signal>),
    /// Wholesale trade history replacement (pull-sourced only).
    Trades(Vec<Trade>),
    /// Wholesale price table replacement.
    Prices(HashMap<String, PriceQuote>),
    /// Wholesale stats replacement; supersedes local increments.
    Stats(StatsSnapshot),
    Status(SystemStatus),
    Risk(RiskMetrics),
    Log(LogEntry),
    Clock(DateTime<Utc>),
}

/// Owns [`DashboardState`] and applies every update in arrival order.
pub struct Reconciler {
    state: DashboardState,
    snapshot_tx: watch::Sender<DashboardSnapshot>,
    initial_balance: f64,
    max_log_entries: usize,
}

impl Reconciler {
    pub fn new(
        initial_balance: f64,
        max_log_entries: usize,
    ) -> (Self, watch::Receiver<DashboardSnapshot>) {
        let (snapshot_tx, snapshot_rx) = watch::channel(DashboardSnapshot::empty());
        let reconciler = Self {
            state: DashboardState::default(),
            snapshot_tx,
            initial_balance,
            max_log_entries,
        };
        (reconciler, snapshot_rx)
    }

    /// Consume updates until every producer has hung up.
    pub async fn run(mut self, mut update_rx: mpsc::Receiver<StateUpdate>) {
        while let Some(update) = update_rx.recv().await {
            self.apply(update);
        }
        debug!("update channel closed, reconciler stopping");
    }

    /// Apply one update and republish the snapshot.
    pub fn apply(&mut self, update: StateUpdate) {
        match update {
            StateUpdate::Signal(signal) => self.apply_signal_event(signal),
            StateUpdate::Signals(signals) => {
                for signal in signals {
                    self.apply_signal_event(signal);
                }
            }
            StateUpdate::Trades(trades) => self.apply_trade_snapshot(trades),
            StateUpdate::Prices(quotes) => self.apply_price_table(quotes),
            StateUpdate::Stats(stats) => self.apply_stats_snapshot(stats),
            StateUpdate::Status(status) => self.state.system = status,
            StateUpdate::Risk(risk) => self.state.risk = risk,
            StateUpdate::Log(entry) => self.apply_log(entry),
            StateUpdate::Clock(now) => {
                self.state.updated_at = now;
                self.publish();
                return;
            }
        }
        self.state.updated_at = Utc::now();
        self.publish();
    }

    /// Insert a brand-new signal at the front of the collection, or fold an
    /// update into the existing entry without moving it or re-counting it.
    fn apply_signal_event(&mut self, incoming: Signal) {
        match self
            .state
            .signals
            .iter_mut()
            .find(|signal| signal.id == incoming.id)
        {
            Some(existing) => existing.merge_update(incoming),
            None => {
                self.state.signals.insert(0, incoming);
                self.state.stats.total_signals += 1;
            }
        }
    }

    /// Trades are replaced wholesale in delivery order; they are never
    /// pushed incrementally.
    fn apply_trade_snapshot(&mut self, trades: Vec<Trade>) {
        self.state.trades = trades;
    }

    /// Any price update is a full table snapshot; symbols missing from the
    /// incoming set are removed.
    fn apply_price_table(&mut self, quotes: HashMap<String, PriceQuote>) {
        self.state.prices = quotes;
    }

    /// Last writer wins between pull replacement and local increments.
    fn apply_stats_snapshot(&mut self, stats: StatsSnapshot) {
        self.state.stats = stats;
    }

    fn apply_log(&mut self, entry: LogEntry) {
        self.state.logs.push_back(entry);
        while self.state.logs.len() > self.max_log_entries {
            self.state.logs.pop_front();
        }
    }

    fn publish(&self) {
        let _ = self
            .snapshot_tx
            .send(DashboardSnapshot::capture(&self.state, self.initial_balance));
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }
}
