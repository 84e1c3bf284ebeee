//! Canonical in-memory state and the snapshot published to readers.

use chrono::{DateTime, Utc};
use dashboard_core::{
    DerivedMetrics, LogEntry, PriceQuote, RiskMetrics, Signal, StatsSnapshot, SystemStatus, Trade,
};
use std::collections::{HashMap, VecDeque};

/// The canonical application state.
///
/// Mutated only inside the [`Reconciler`](crate::reconcile::Reconciler);
/// every other component reads immutable [`DashboardSnapshot`]s.
#[derive(Debug, Clone)]
pub struct DashboardState {
    /// Signals newest-first; unique by id.
    pub signals: Vec<Signal>,
    /// Trades as delivered by the pull channel, newest-first.
    pub trades: Vec<Trade>,
    /// Live quotes keyed by symbol, replaced wholesale on every update.
    pub prices: HashMap<String, PriceQuote>,
    pub stats: StatsSnapshot,
    pub system: SystemStatus,
    pub risk: RiskMetrics,
    /// Bounded ring of recent backend log lines, oldest evicted first.
    pub logs: VecDeque<LogEntry>,
    pub updated_at: DateTime<Utc>,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self {
            signals: Vec::new(),
            trades: Vec::new(),
            prices: HashMap::new(),
            stats: StatsSnapshot::default(),
            system: SystemStatus::default(),
            risk: RiskMetrics::default(),
            logs: VecDeque::new(),
            updated_at: Utc::now(),
        }
    }
}

impl DashboardState {
    pub fn signal(&self, id: u64) -> Option<&Signal> {
        self.signals.iter().find(|signal| signal.id == id)
    }
}

/// Immutable copy of canonical state plus freshly derived views, published
/// after every reconciler mutation.
#[derive(Debug, Clone)]
pub struct DashboardSnapshot {
    pub signals: Vec<Signal>,
    pub trades: Vec<Trade>,
    pub prices: HashMap<String, PriceQuote>,
    pub stats: StatsSnapshot,
    pub system: SystemStatus,
    pub risk: RiskMetrics,
    pub logs: Vec<LogEntry>,
    pub derived: DerivedMetrics,
    pub updated_at: DateTime<Utc>,
}

impl DashboardSnapshot {
    pub(crate) fn capture(state: &DashboardState, initial_balance: f64) -> Self {
        let derived = DerivedMetrics::derive(
            &state.signals,
            &state.trades,
            &state.prices,
            &state.stats,
            initial_balance,
        );
        Self {
            signals: state.signals.clone(),
            trades: state.trades.clone(),
            prices: state.prices.clone(),
            stats: state.stats.clone(),
            system: state.system.clone(),
            risk: state.risk.clone(),
            logs: state.logs.iter().cloned().collect(),
            derived,
            updated_at: state.updated_at,
        }
    }

    pub(crate) fn empty() -> Self {
        Self::capture(&DashboardState::default(), 0.0)
    }
}
