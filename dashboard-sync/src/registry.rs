//! Ownership of the per-room connections.
//!
//! Guarantees at most one live connection per room, and that unsubscribing
//! synchronously stops the room's heartbeat and any pending reconnect timer
//! before returning.

use crate::config::SyncConfig;
use crate::connection::{ConnectionState, ConnectionStatus, RawFrame, run_connection};
use dashboard_core::Room;
use parking_lot::RwLock;
use std::collections::HashMap;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Aggregate connectivity view read by the UI collaborator.
#[derive(Debug, Clone)]
pub struct ConnectivitySnapshot {
    pub rooms: HashMap<Room, ConnectionStatus>,
    /// True when every subscribed room is Open (and at least one exists).
    pub fully_connected: bool,
}

struct ConnectionHandle {
    status_rx: watch::Receiver<ConnectionStatus>,
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl ConnectionHandle {
    fn status(&self) -> ConnectionStatus {
        self.status_rx.borrow().clone()
    }

    /// Stop the driver task and every timer it owns, synchronously.
    fn shutdown(self) {
        let _ = self.shutdown_tx.try_send(());
        self.task.abort();
    }
}

/// Creates and tracks one connection per subscribed room.
pub struct ConnectionRegistry {
    config: SyncConfig,
    frame_tx: mpsc::Sender<RawFrame>,
    connections: RwLock<HashMap<Room, ConnectionHandle>>,
}

impl ConnectionRegistry {
    pub fn new(config: SyncConfig, frame_tx: mpsc::Sender<RawFrame>) -> Self {
        Self {
            config,
            frame_tx,
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Subscribe to a room, spawning its connection task.
    ///
    /// A no-op when a non-terminal connection already exists; a room that
    /// previously gave up (Closed) is replaced, which is the manual
    /// reconnect path. Returns whether a new connection was created.
    pub fn subscribe(&self, room: Room) -> bool {
        let mut connections = self.connections.write();

        if let Some(existing) = connections.get(&room) {
            if existing.status().state != ConnectionState::Closed {
                debug!(%room, "already subscribed, ignoring");
                return false;
            }
            info!(%room, "replacing closed connection");
            if let Some(stale) = connections.remove(&room) {
                stale.shutdown();
            }
        }

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let (status_tx, status_rx) = watch::channel(ConnectionStatus {
            room,
            state: ConnectionState::Idle,
            attempt: 0,
            last_error: None,
        });
        let task = tokio::spawn(run_connection(
            self.config.clone(),
            room,
            self.frame_tx.clone(),
            status_tx,
            shutdown_rx,
        ));

        connections.insert(
            room,
            ConnectionHandle {
                status_rx,
                shutdown_tx,
                task,
            },
        );
        true
    }

    /// Tear down one room's connection.
    ///
    /// Heartbeat and reconnect timers are owned by the connection task, so
    /// aborting it here stops them before this call returns. Returns whether
    /// a connection existed.
    pub fn unsubscribe(&self, room: Room) -> bool {
        let handle = self.connections.write().remove(&room);
        match handle {
            Some(handle) => {
                handle.shutdown();
                info!(%room, "unsubscribed");
                true
            }
            None => false,
        }
    }

    /// Latest status for one room, if subscribed.
    pub fn status(&self, room: Room) -> Option<ConnectionStatus> {
        self.connections.read().get(&room).map(|h| h.status())
    }

    /// Latest status for every subscribed room.
    pub fn statuses(&self) -> HashMap<Room, ConnectionStatus> {
        self.connections
            .read()
            .iter()
            .map(|(room, handle)| (*room, handle.status()))
            .collect()
    }

    /// True when every subscribed room is Open.
    pub fn is_fully_connected(&self) -> bool {
        let connections = self.connections.read();
        !connections.is_empty()
            && connections
                .values()
                .all(|h| h.status().state == ConnectionState::Open)
    }

    pub fn connectivity(&self) -> ConnectivitySnapshot {
        let rooms = self.statuses();
        let fully_connected = !rooms.is_empty()
            && rooms
                .values()
                .all(|status| status.state == ConnectionState::Open);
        ConnectivitySnapshot {
            rooms,
            fully_connected,
        }
    }

    /// Tear down every connection.
    pub fn shutdown_all(&self) {
        let mut connections = self.connections.write();
        for (room, handle) in connections.drain() {
            debug!(%room, "shutting down connection");
            handle.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn test_config() -> SyncConfig {
        // Points at a closed local port so the handshake fails fast
        SyncConfig::new("ws://127.0.0.1:9", "http://127.0.0.1:9")
            .with_base_reconnect_delay(Duration::from_millis(10))
            .with_max_reconnect_attempts(50)
    }

    #[tokio::test]
    async fn test_subscribe_is_idempotent_per_room() {
        let (frame_tx, _frame_rx) = mpsc::channel(8);
        let registry = ConnectionRegistry::new(test_config(), frame_tx);

        assert!(registry.subscribe(Room::Signals));
        assert!(!registry.subscribe(Room::Signals));
        assert_eq!(registry.statuses().len(), 1);

        registry.shutdown_all();
    }

    #[tokio::test]
    async fn test_unsubscribe_removes_room_synchronously() {
        let (frame_tx, _frame_rx) = mpsc::channel(8);
        let registry = ConnectionRegistry::new(test_config(), frame_tx);

        registry.subscribe(Room::Prices);
        assert!(registry.status(Room::Prices).is_some());

        assert!(registry.unsubscribe(Room::Prices));
        assert!(registry.status(Room::Prices).is_none());
        assert!(!registry.unsubscribe(Room::Prices));
    }

    #[tokio::test]
    async fn test_not_fully_connected_while_unreachable() {
        let (frame_tx, _frame_rx) = mpsc::channel(8);
        let registry = ConnectionRegistry::new(test_config(), frame_tx);
        assert!(!registry.is_fully_connected());

        registry.subscribe(Room::Signals);
        tokio::time::sleep(Duration::from_millis(50)).await;

        // The room can never open against a closed port
        assert!(!registry.is_fully_connected());
        let status = registry.status(Room::Signals).unwrap();
        assert_ne!(status.state, ConnectionState::Open);

        registry.shutdown_all();
        assert!(registry.statuses().is_empty());
    }
}
