//! Real-time synchronization layer for the trading dashboard.
//!
//! Merges two independent sources into one coherent, duplicate-free
//! application state:
//!
//! - a **push channel**: one websocket per [`Room`](dashboard_core::Room)
//!   delivering asynchronous events, each link owning its own
//!   connect/heartbeat/backoff lifecycle ([`connection`], [`registry`]),
//! - a **pull channel**: periodic REST snapshots on independent timers
//!   ([`poll`], [`rest`]).
//!
//! Inbound frames pass through the [`dispatch`] boundary (decode, classify,
//! drop malformed), and every mutation of canonical state goes through the
//! single [`reconcile::Reconciler`] entry point, which republishes an
//! immutable [`state::DashboardSnapshot`] (with freshly derived metrics)
//! after each change. [`service::SyncService`] wires the whole pipeline and
//! hands out read-only snapshot receivers; rendering is an external
//! collaborator and never mutates state.

pub mod config;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod poll;
pub mod reconcile;
pub mod registry;
pub mod rest;
pub mod service;
pub mod state;

pub use config::SyncConfig;
pub use connection::{ConnectionState, ConnectionStatus};
pub use error::SyncError;
pub use registry::{ConnectionRegistry, ConnectivitySnapshot};
pub use service::{SyncHandle, SyncService};
pub use state::{DashboardSnapshot, DashboardState};
