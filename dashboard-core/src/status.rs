use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Health of one backend service, as reported by `GET /api/status` and the
/// system-health push room.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ServiceHealth {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub connected: bool,
    #[serde(default)]
    pub latency_ms: Option<f64>,
}

/// Overall backend status: one top-level state plus a per-service breakdown.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SystemStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub services: HashMap<String, ServiceHealth>,
}

impl SystemStatus {
    pub fn is_online(&self) -> bool {
        self.status == "online" || self.status == "healthy"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_status_endpoint_shape() {
        let status: SystemStatus = serde_json::from_str(
            r#"{
                "status": "online",
                "services": {
                    "database": {"status": "healthy", "connected": true, "latency_ms": 1.8},
                    "mt5": {"status": "disconnected", "connected": false}
                }
            }"#,
        )
        .unwrap();

        assert!(status.is_online());
        assert_eq!(status.services.len(), 2);
        assert!(!status.services["mt5"].connected);
        assert_eq!(status.services["database"].latency_ms, Some(1.8));
    }
}
