use dashboard_core::Room;
use dashboard_sync::{SyncConfig, SyncService};
use tracing::info;

/// Connects to a running dashboard backend and logs each published snapshot
/// until interrupted. Point it at another host with DASHBOARD_HOST.
#[tokio::main]
async fn main() {
    // Initialise INFO Tracing log subscriber
    init_logging();

    let host = std::env::var("DASHBOARD_HOST").unwrap_or_else(|_| "127.0.0.1:8000".to_string());
    let config = SyncConfig::new(format!("ws://{host}"), format!("http://{host}"))
        .with_rooms([Room::Signals, Room::Trades, Room::Prices, Room::SystemHealth]);

    let handle = match SyncService::start(config) {
        Ok(handle) => handle,
        Err(err) => {
            eprintln!("failed to start sync service: {err}");
            return;
        }
    };

    let mut snapshots = handle.subscribe();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received, shutting down");
                break;
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow().clone();
                let connectivity = handle.connectivity();
                info!(
                    signals = snapshot.signals.len(),
                    trades = snapshot.trades.len(),
                    symbols = snapshot.prices.len(),
                    win_rate = snapshot.derived.win_rate,
                    equity_points = snapshot.derived.equity_curve.len(),
                    fully_connected = connectivity.fully_connected,
                    "state updated"
                );
            }
        }
    }

    handle.shutdown();
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
