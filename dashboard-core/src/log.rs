use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One line from the backend log room.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogEntry {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub message: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

fn default_level() -> String {
    "info".to_string()
}
