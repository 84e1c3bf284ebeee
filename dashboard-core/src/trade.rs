use crate::signal::Direction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Trade lifecycle status as reported by the execution backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeStatus {
    #[default]
    Pending,
    Placed,
    Filled,
    PartiallyFilled,
    Closed,
    Cancelled,
    Rejected,
}

impl TradeStatus {
    /// An open trade still holds market exposure.
    pub fn is_open(&self) -> bool {
        matches!(self, TradeStatus::Placed | TradeStatus::Filled | TradeStatus::PartiallyFilled)
    }
}

/// An executed trade, immutable once recorded.
///
/// The pull channel delivers trades newest-first for display; the equity
/// curve re-sorts them oldest-first (see [`crate::metrics::equity_curve`]).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Trade {
    pub id: u64,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default)]
    pub status: TradeStatus,
    #[serde(default)]
    pub entry_price_filled: Option<f64>,
    /// Realised profit/loss, absent until the trade closes.
    #[serde(default)]
    pub net_pnl: Option<f64>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_statuses() {
        assert!(TradeStatus::Filled.is_open());
        assert!(TradeStatus::PartiallyFilled.is_open());
        assert!(!TradeStatus::Closed.is_open());
        assert!(!TradeStatus::Rejected.is_open());
    }

    #[test]
    fn test_deserialize_backend_shape() {
        // Mirrors the `/trades` payload: pnl is null until the trade closes
        let trade: Trade = serde_json::from_str(
            r#"{
                "id": 11,
                "symbol": "GBPUSD",
                "direction": "sell",
                "timestamp": "2025-11-19T08:00:00Z",
                "status": "closed",
                "entry_price_filled": 1.2650,
                "net_pnl": 42.5
            }"#,
        )
        .unwrap();

        assert_eq!(trade.status, TradeStatus::Closed);
        assert_eq!(trade.net_pnl, Some(42.5));

        let open: Trade = serde_json::from_str(
            r#"{"id": 12, "symbol": "GBPUSD", "direction": "buy", "status": "filled", "net_pnl": null}"#,
        )
        .unwrap();
        assert_eq!(open.net_pnl, None);
        assert!(open.status.is_open());
    }
}
