use serde::{Deserialize, Serialize};

/// Aggregate trading counters.
///
/// Sourced from the `/stats` pull endpoint and replaced wholesale on each
/// snapshot; `total_signals` is additionally incremented locally when a
/// brand-new signal arrives on the push channel, with the next pull snapshot
/// superseding the local count (last writer wins, ordered by arrival).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StatsSnapshot {
    #[serde(default)]
    pub total_signals: u64,
    #[serde(default)]
    pub total_trades: u64,
    #[serde(default)]
    pub open_trades: u64,
    #[serde(default)]
    pub total_pnl: f64,
    #[serde(default)]
    pub win_rate: f64,
    #[serde(default)]
    pub closed_trades: u64,
    #[serde(default)]
    pub winning_trades: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_payload_defaults_missing_counters() {
        let stats: StatsSnapshot =
            serde_json::from_str(r#"{"total_signals": 12, "total_pnl": 310.5}"#).unwrap();

        assert_eq!(stats.total_signals, 12);
        assert_eq!(stats.total_pnl, 310.5);
        assert_eq!(stats.closed_trades, 0);
        assert_eq!(stats.win_rate, 0.0);
    }
}
