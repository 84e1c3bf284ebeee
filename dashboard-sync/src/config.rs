use dashboard_core::Room;
use std::time::Duration;

/// Configuration for the synchronization subsystem.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Websocket base URL; rooms attach at `<ws_base_url>/ws/<room>`.
    pub ws_base_url: String,
    /// REST base URL for the pull endpoints.
    pub rest_base_url: String,
    /// Bearer token attached to every pull request.
    pub bearer_token: Option<String>,
    /// Rooms subscribed on startup.
    pub rooms: Vec<Room>,
    /// Interval between outbound `"ping"` keep-alive frames while Open.
    pub heartbeat_interval: Duration,
    /// First reconnect delay; doubles on each consecutive failure.
    pub base_reconnect_delay: Duration,
    /// Consecutive failures tolerated before a room gives up for good.
    pub max_reconnect_attempts: u32,
    /// Buffer size for the frame and state-update channels.
    pub channel_buffer_size: usize,
    /// Starting balance for the equity curve.
    pub initial_balance: f64,
    /// Retained entries in the log ring.
    pub max_log_entries: usize,
    pub stats_poll_interval: Duration,
    pub status_poll_interval: Duration,
    pub clock_tick_interval: Duration,
    pub trades_poll_interval: Duration,
    pub signals_poll_interval: Duration,
    pub prices_poll_interval: Duration,
    /// Row limit passed to the trades/signals pull endpoints.
    pub history_limit: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            ws_base_url: "ws://127.0.0.1:8000".to_string(),
            rest_base_url: "http://127.0.0.1:8000".to_string(),
            bearer_token: None,
            rooms: Room::ALL.to_vec(),
            heartbeat_interval: Duration::from_secs(30),
            base_reconnect_delay: Duration::from_secs(1),
            max_reconnect_attempts: 8,
            channel_buffer_size: 1000,
            initial_balance: 0.0,
            max_log_entries: 200,
            stats_poll_interval: Duration::from_secs(5),
            status_poll_interval: Duration::from_secs(10),
            clock_tick_interval: Duration::from_secs(1),
            trades_poll_interval: Duration::from_secs(15),
            signals_poll_interval: Duration::from_secs(15),
            prices_poll_interval: Duration::from_secs(5),
            history_limit: 100,
        }
    }
}

impl SyncConfig {
    /// Create a configuration pointing both channels at the given host.
    pub fn new(ws_base_url: impl Into<String>, rest_base_url: impl Into<String>) -> Self {
        Self {
            ws_base_url: ws_base_url.into(),
            rest_base_url: rest_base_url.into(),
            ..Default::default()
        }
    }

    /// Set the bearer token attached to pull requests.
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Set the rooms subscribed on startup.
    pub fn with_rooms(mut self, rooms: impl Into<Vec<Room>>) -> Self {
        self.rooms = rooms.into();
        self
    }

    /// Set the keep-alive interval.
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Set the first reconnect delay.
    pub fn with_base_reconnect_delay(mut self, delay: Duration) -> Self {
        self.base_reconnect_delay = delay;
        self
    }

    /// Set the consecutive-failure cap.
    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    /// Set the starting balance for the equity curve.
    pub fn with_initial_balance(mut self, balance: f64) -> Self {
        self.initial_balance = balance;
        self
    }

    /// Websocket endpoint for one room.
    pub fn room_url(&self, room: Room) -> String {
        format!("{}/ws/{}", self.ws_base_url.trim_end_matches('/'), room)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_url_construction() {
        let config = SyncConfig::new("ws://example.com:8000/", "http://example.com:8000");
        assert_eq!(
            config.room_url(Room::SystemHealth),
            "ws://example.com:8000/ws/system_health"
        );
    }

    #[test]
    fn test_builder_overrides() {
        let config = SyncConfig::default()
            .with_bearer_token("token-123")
            .with_rooms([Room::Signals, Room::Prices])
            .with_heartbeat_interval(Duration::from_secs(15))
            .with_max_reconnect_attempts(3);

        assert_eq!(config.bearer_token.as_deref(), Some("token-123"));
        assert_eq!(config.rooms, vec![Room::Signals, Room::Prices]);
        assert_eq!(config.heartbeat_interval, Duration::from_secs(15));
        assert_eq!(config.max_reconnect_attempts, 3);
    }
}
