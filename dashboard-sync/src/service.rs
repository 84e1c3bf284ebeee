//! Top-level wiring of the synchronization pipeline.
//!
//! `rooms -> connections -> dispatcher -> reconciler <- poll scheduler`,
//! with the reconciler publishing snapshots on a watch channel. The handle
//! returned by [`SyncService::start`] is the only surface the rendering
//! collaborator touches: read-only snapshots, connectivity, settings
//! passthrough, and teardown.

use crate::config::SyncConfig;
use crate::dispatch::MessageDispatcher;
use crate::error::SyncError;
use crate::poll::PollScheduler;
use crate::reconcile::Reconciler;
use crate::registry::{ConnectionRegistry, ConnectivitySnapshot};
use crate::rest::{PullApi, RestClient, Settings};
use crate::state::DashboardSnapshot;
use dashboard_core::Room;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::info;

/// Entry point for the synchronization subsystem.
pub struct SyncService;

impl SyncService {
    /// Start against the configured REST endpoint.
    pub fn start(config: SyncConfig) -> Result<SyncHandle, SyncError> {
        let api = RestClient::new(&config.rest_base_url, config.bearer_token.clone())?;
        Ok(Self::start_with_api(config, Arc::new(api)))
    }

    /// Start with an injected pull transport (tests, alternative backends).
    pub fn start_with_api(config: SyncConfig, api: Arc<dyn PullApi>) -> SyncHandle {
        let (frame_tx, frame_rx) = mpsc::channel(config.channel_buffer_size);
        let (update_tx, update_rx) = mpsc::channel(config.channel_buffer_size);

        let (reconciler, snapshot_rx) =
            Reconciler::new(config.initial_balance, config.max_log_entries);
        let reconciler_task = tokio::spawn(reconciler.run(update_rx));

        let poller = PollScheduler::spawn(&config, api.clone(), update_tx.clone());
        let dispatcher = MessageDispatcher::new(update_tx, poller.trade_refresh_handle());
        let dispatcher_task = tokio::spawn(dispatcher.run(frame_rx));

        let registry = Arc::new(ConnectionRegistry::new(config.clone(), frame_tx));
        for room in &config.rooms {
            registry.subscribe(*room);
        }
        info!(rooms = config.rooms.len(), "sync service started");

        SyncHandle {
            registry,
            api,
            snapshot_rx,
            poller,
            tasks: vec![dispatcher_task, reconciler_task],
        }
    }
}

/// Running synchronization subsystem.
pub struct SyncHandle {
    registry: Arc<ConnectionRegistry>,
    api: Arc<dyn PullApi>,
    snapshot_rx: watch::Receiver<DashboardSnapshot>,
    poller: PollScheduler,
    tasks: Vec<JoinHandle<()>>,
}

impl SyncHandle {
    /// Latest published snapshot.
    pub fn snapshot(&self) -> DashboardSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Watch receiver for snapshot updates (one per render loop).
    pub fn subscribe(&self) -> watch::Receiver<DashboardSnapshot> {
        self.snapshot_rx.clone()
    }

    pub fn connectivity(&self) -> ConnectivitySnapshot {
        self.registry.connectivity()
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Manual reconnect for a room that gave up, or a late subscription.
    pub fn resubscribe(&self, room: Room) -> bool {
        self.registry.subscribe(room)
    }

    pub fn unsubscribe(&self, room: Room) -> bool {
        self.registry.unsubscribe(room)
    }

    /// Read the user settings through the pull contract.
    pub async fn settings(&self) -> Result<Settings, SyncError> {
        self.api.fetch_settings().await
    }

    /// Write the user settings through the pull contract.
    pub async fn update_settings(&self, settings: &Settings) -> Result<(), SyncError> {
        self.api.update_settings(settings).await
    }

    /// Tear the whole subsystem down.
    ///
    /// Stops every timer - heartbeats, reconnect backoffs, poll intervals -
    /// synchronously before the pipeline tasks are dropped, so nothing fires
    /// into destroyed state.
    pub fn shutdown(self) {
        self.registry.shutdown_all();
        self.poller.abort_all();
        for task in &self.tasks {
            task.abort();
        }
        info!("sync service stopped");
    }
}
