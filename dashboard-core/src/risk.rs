use serde::{Deserialize, Serialize};

/// Rolling risk summary broadcast on the risk-metrics room.
///
/// Replaced wholesale on each update; the dashboard never derives these
/// locally because the risk engine owns the day-boundary reset logic.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RiskMetrics {
    #[serde(default)]
    pub daily_pnl: f64,
    #[serde(default)]
    pub daily_trades: u64,
    #[serde(default)]
    pub consecutive_losses: u32,
    #[serde(default)]
    pub current_exposure: f64,
    #[serde(default)]
    pub max_exposure: f64,
    #[serde(default)]
    pub exposure_utilization_pct: f64,
}
