//! Per-room websocket connection lifecycle.
//!
//! Each subscribed room owns exactly one [`ChannelConnection`] state machine
//! and one driver task. The machine is pure (transitions only), so the
//! timing-sensitive behaviour - exponential backoff, attempt reset on open,
//! give-up after the retry cap - is testable without a socket. The driver
//! task owns every timer (heartbeat, backoff) as `select!` branches, so
//! aborting the task cancels them deterministically.

use crate::config::SyncConfig;
use crate::error::SyncError;
use chrono::{DateTime, Utc};
use dashboard_core::Room;
use derive_more::Constructor;
use futures::{SinkExt, StreamExt};
use std::fmt;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

/// Lifecycle state of one room's link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Open,
    Reconnecting,
    Closed,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::Closed => "closed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Connectivity report published on every transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub room: Room,
    pub state: ConnectionState,
    pub attempt: u32,
    pub last_error: Option<String>,
}

/// A raw inbound text frame, tagged with its room and arrival time.
/// Transient - not retained beyond dispatch.
#[derive(Debug, Clone, Constructor)]
pub struct RawFrame {
    pub room: Room,
    pub text: String,
    pub received_at: DateTime<Utc>,
}

/// Pure connection state machine for one room.
///
/// `attempt` counts consecutive failed cycles since the last successful
/// open; the n-th consecutive failure backs off `base_delay * 2^n` before
/// retrying, and once `attempt` exceeds `max_attempts` the connection gives
/// up for good.
#[derive(Debug, Clone)]
pub struct ChannelConnection {
    room: Room,
    state: ConnectionState,
    attempt: u32,
    base_delay: Duration,
    max_attempts: u32,
    last_error: Option<String>,
    given_up: bool,
}

impl ChannelConnection {
    pub fn new(room: Room, base_delay: Duration, max_attempts: u32) -> Self {
        Self {
            room,
            state: ConnectionState::Idle,
            attempt: 0,
            base_delay,
            max_attempts,
            last_error: None,
            given_up: false,
        }
    }

    pub fn room(&self) -> Room {
        self.room
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn status(&self) -> ConnectionStatus {
        ConnectionStatus {
            room: self.room,
            state: self.state,
            attempt: self.attempt,
            last_error: self.last_error.clone(),
        }
    }

    /// Idle -> Connecting.
    pub fn on_subscribe(&mut self) {
        if self.state == ConnectionState::Idle {
            self.state = ConnectionState::Connecting;
        }
    }

    /// Connecting -> Open. Resets the consecutive-failure counter.
    pub fn on_open(&mut self) {
        self.state = ConnectionState::Open;
        self.attempt = 0;
        self.last_error = None;
    }

    /// Link failure (handshake or mid-stream) not caused by teardown.
    ///
    /// Returns the backoff delay to wait before the next cycle, or `None`
    /// when the retry cap is exhausted and the connection moves to a
    /// terminal Closed state.
    pub fn on_failure(&mut self, error: impl Into<String>) -> Option<Duration> {
        if self.state == ConnectionState::Closed {
            return None;
        }
        self.last_error = Some(error.into());

        if self.attempt >= self.max_attempts {
            self.state = ConnectionState::Closed;
            self.given_up = true;
            self.last_error = Some(
                SyncError::RetriesExhausted {
                    room: self.room,
                    attempts: self.attempt,
                }
                .to_string(),
            );
            return None;
        }

        self.state = ConnectionState::Reconnecting;
        let delay = self.base_delay * 2u32.saturating_pow(self.attempt.min(16));
        self.attempt += 1;
        Some(delay)
    }

    /// Reconnecting -> Connecting, once the backoff delay has elapsed.
    pub fn on_retry_elapsed(&mut self) {
        if self.state == ConnectionState::Reconnecting {
            self.state = ConnectionState::Connecting;
        }
    }

    /// Any state -> Closed, on explicit teardown.
    pub fn on_teardown(&mut self) {
        self.state = ConnectionState::Closed;
    }

    /// Closed with the retry cap exhausted: no automatic recovery remains.
    pub fn is_given_up(&self) -> bool {
        self.given_up
    }
}

/// Drive one room's connection until teardown or give-up.
///
/// Inbound text frames are forwarded to the dispatcher channel; every state
/// transition is published on `status_tx`. The shutdown receiver is honoured
/// at every await point so teardown never leaves a timer pending.
pub(crate) async fn run_connection(
    config: SyncConfig,
    room: Room,
    frame_tx: mpsc::Sender<RawFrame>,
    status_tx: watch::Sender<ConnectionStatus>,
    mut shutdown_rx: mpsc::Receiver<()>,
) {
    let mut link = ChannelConnection::new(
        room,
        config.base_reconnect_delay,
        config.max_reconnect_attempts,
    );
    link.on_subscribe();
    let _ = status_tx.send(link.status());

    let url = config.room_url(room);
    info!(%room, %url, "starting room connection");

    loop {
        // Connecting: handshake, bailing out if teardown arrives first
        let ws_stream = tokio::select! {
            _ = shutdown_rx.recv() => {
                link.on_teardown();
                let _ = status_tx.send(link.status());
                return;
            }
            result = connect_async(url.as_str()) => match result {
                Ok((stream, _)) => stream,
                Err(err) => {
                    let error = SyncError::Transport(err.to_string());
                    warn!(%room, %error, "websocket connect failed");
                    match link.on_failure(error.to_string()) {
                        Some(delay) => {
                            let _ = status_tx.send(link.status());
                            if !wait_backoff(&mut shutdown_rx, delay, room).await {
                                link.on_teardown();
                                let _ = status_tx.send(link.status());
                                return;
                            }
                            link.on_retry_elapsed();
                            let _ = status_tx.send(link.status());
                            continue;
                        }
                        None => {
                            error!(%room, "reconnect attempts exhausted, giving up");
                            let _ = status_tx.send(link.status());
                            return;
                        }
                    }
                }
            }
        };

        link.on_open();
        let _ = status_tx.send(link.status());
        info!(%room, "connected");

        let (mut write, mut read) = ws_stream.split();
        let mut heartbeat = tokio::time::interval(config.heartbeat_interval);

        // Open: read frames, keep the link alive, honour teardown
        let failure = loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    let _ = write.send(Message::Close(None)).await;
                    link.on_teardown();
                    let _ = status_tx.send(link.status());
                    info!(%room, "connection torn down");
                    return;
                }
                _ = heartbeat.tick() => {
                    if let Err(err) = write.send(Message::Text("ping".into())).await {
                        break format!("heartbeat send failed: {err}");
                    }
                }
                msg = read.next() => match msg {
                    Some(Ok(Message::Text(text))) => {
                        let frame = RawFrame::new(room, text.as_str().to_string(), Utc::now());
                        if frame_tx.send(frame).await.is_err() {
                            info!(%room, "frame receiver dropped, closing connection");
                            link.on_teardown();
                            let _ = status_tx.send(link.status());
                            return;
                        }
                    }
                    Some(Ok(Message::Close(_))) => break "server closed connection".to_string(),
                    Some(Ok(Message::Ping(_) | Message::Pong(_))) => {
                        // Transport-level heartbeat, answered by tungstenite
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => break err.to_string(),
                    None => break "stream ended".to_string(),
                }
            }
        };

        let error = SyncError::Transport(failure);
        warn!(%room, %error, "connection lost");
        match link.on_failure(error.to_string()) {
            Some(delay) => {
                let _ = status_tx.send(link.status());
                if !wait_backoff(&mut shutdown_rx, delay, room).await {
                    link.on_teardown();
                    let _ = status_tx.send(link.status());
                    return;
                }
                link.on_retry_elapsed();
                let _ = status_tx.send(link.status());
            }
            None => {
                error!(%room, "reconnect attempts exhausted, giving up");
                let _ = status_tx.send(link.status());
                return;
            }
        }
    }
}

/// Sleep out a backoff delay. Returns `false` if teardown arrived instead.
async fn wait_backoff(shutdown_rx: &mut mpsc::Receiver<()>, delay: Duration, room: Room) -> bool {
    debug!(%room, ?delay, "waiting before reconnecting");
    tokio::select! {
        _ = shutdown_rx.recv() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine(max_attempts: u32) -> ChannelConnection {
        ChannelConnection::new(Room::Signals, Duration::from_millis(1000), max_attempts)
    }

    #[test]
    fn test_subscribe_then_open() {
        let mut link = machine(5);
        assert_eq!(link.state(), ConnectionState::Idle);

        link.on_subscribe();
        assert_eq!(link.state(), ConnectionState::Connecting);

        link.on_open();
        assert_eq!(link.state(), ConnectionState::Open);
        assert_eq!(link.attempt(), 0);
    }

    #[test]
    fn test_backoff_doubles_per_consecutive_failure() {
        let mut link = machine(8);
        link.on_subscribe();

        let mut delays = Vec::new();
        for _ in 0..5 {
            delays.push(link.on_failure("connection refused").unwrap());
            link.on_retry_elapsed();
        }

        let expected: Vec<Duration> = [1000, 2000, 4000, 8000, 16000]
            .into_iter()
            .map(Duration::from_millis)
            .collect();
        assert_eq!(delays, expected);
    }

    #[test]
    fn test_attempt_resets_on_every_successful_open() {
        let mut link = machine(8);
        link.on_subscribe();

        for _ in 0..3 {
            link.on_failure("reset by peer");
            link.on_retry_elapsed();
        }
        assert_eq!(link.attempt(), 3);

        link.on_open();
        assert_eq!(link.attempt(), 0);

        // The next failure after a successful open starts over at base delay
        assert_eq!(
            link.on_failure("reset by peer"),
            Some(Duration::from_millis(1000))
        );
    }

    #[test]
    fn test_exhausted_retries_is_terminal() {
        let mut link = machine(2);
        link.on_subscribe();

        assert!(link.on_failure("down").is_some());
        link.on_retry_elapsed();
        assert!(link.on_failure("down").is_some());
        link.on_retry_elapsed();

        // Third consecutive failure exceeds the cap of 2
        assert_eq!(link.on_failure("down"), None);
        assert_eq!(link.state(), ConnectionState::Closed);
        assert!(link.is_given_up());
        assert!(link.status().last_error.unwrap().contains("gave up"));

        // No further reconnects are ever scheduled
        assert_eq!(link.on_failure("down"), None);
    }

    #[test]
    fn test_teardown_from_any_state() {
        let setups: [fn(&mut ChannelConnection); 4] = [
            |_| {},
            |link| link.on_subscribe(),
            |link| {
                link.on_subscribe();
                link.on_open();
            },
            |link| {
                link.on_subscribe();
                link.on_failure("down");
            },
        ];

        for setup in setups {
            let mut link = machine(5);
            setup(&mut link);
            link.on_teardown();
            assert_eq!(link.state(), ConnectionState::Closed);
        }
    }

    #[test]
    fn test_teardown_is_not_given_up() {
        let mut link = machine(5);
        link.on_subscribe();
        link.on_open();
        link.on_teardown();
        // A deliberate close carries no error and may be re-subscribed
        assert!(!link.is_given_up());
    }
}
