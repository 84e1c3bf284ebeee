use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Push-channel topic a client subscribes to independently of others.
///
/// Each [`Room`] maps to one websocket endpoint at `ws(s)://<host>/ws/<room>`
/// and carries one category of asynchronous dashboard events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Room {
    Signals,
    Trades,
    Prices,
    SystemHealth,
    Logs,
    RiskMetrics,
}

impl Room {
    /// Every room the dashboard subscribes to by default.
    pub const ALL: [Room; 6] = [
        Room::Signals,
        Room::Trades,
        Room::Prices,
        Room::SystemHealth,
        Room::Logs,
        Room::RiskMetrics,
    ];

    /// Wire name used in the websocket endpoint path.
    pub fn as_str(&self) -> &'static str {
        match self {
            Room::Signals => "signals",
            Room::Trades => "trades",
            Room::Prices => "prices",
            Room::SystemHealth => "system_health",
            Room::Logs => "logs",
            Room::RiskMetrics => "risk_metrics",
        }
    }
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Room {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "signals" => Ok(Room::Signals),
            "trades" => Ok(Room::Trades),
            "prices" => Ok(Room::Prices),
            "system_health" => Ok(Room::SystemHealth),
            "logs" => Ok(Room::Logs),
            "risk_metrics" => Ok(Room::RiskMetrics),
            other => Err(format!("unknown room: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_round_trip() {
        for room in Room::ALL {
            assert_eq!(room.as_str().parse::<Room>(), Ok(room));
        }
    }

    #[test]
    fn test_room_display_matches_wire_name() {
        assert_eq!(Room::SystemHealth.to_string(), "system_health");
        assert_eq!(Room::RiskMetrics.to_string(), "risk_metrics");
    }

    #[test]
    fn test_unknown_room_is_rejected() {
        assert!("orders".parse::<Room>().is_err());
    }
}
