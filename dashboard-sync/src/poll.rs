//! Fixed-interval pull scheduling.
//!
//! Each pull resource runs on its own timer task; the first tick fires
//! immediately so the dashboard fills from REST before the push channel
//! warms up. A failed poll keeps the last good canonical value in place
//! (stale-while-revalidate) - the reconciler simply never hears about it.

use crate::config::SyncConfig;
use crate::reconcile::StateUpdate;
use crate::rest::PullApi;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, warn};

/// Owns the poll timer tasks; aborting them is the teardown path.
pub struct PollScheduler {
    tasks: Vec<JoinHandle<()>>,
    trade_refresh_tx: mpsc::Sender<()>,
}

impl PollScheduler {
    /// Spawn one timer task per pull resource.
    pub fn spawn(
        config: &SyncConfig,
        api: Arc<dyn PullApi>,
        update_tx: mpsc::Sender<StateUpdate>,
    ) -> Self {
        let (trade_refresh_tx, trade_refresh_rx) = mpsc::channel(8);

        let tasks = vec![
            tokio::spawn(poll_stats(
                api.clone(),
                update_tx.clone(),
                config.stats_poll_interval,
            )),
            tokio::spawn(poll_status(
                api.clone(),
                update_tx.clone(),
                config.status_poll_interval,
            )),
            tokio::spawn(poll_prices(
                api.clone(),
                update_tx.clone(),
                config.prices_poll_interval,
            )),
            tokio::spawn(poll_signals(
                api.clone(),
                update_tx.clone(),
                config.signals_poll_interval,
                config.history_limit,
            )),
            tokio::spawn(poll_trades(
                api,
                update_tx.clone(),
                config.trades_poll_interval,
                config.history_limit,
                trade_refresh_rx,
            )),
            tokio::spawn(tick_clock(update_tx, config.clock_tick_interval)),
        ];

        Self {
            tasks,
            trade_refresh_tx,
        }
    }

    /// Channel the dispatcher pokes when trade activity is pushed.
    pub fn trade_refresh_handle(&self) -> mpsc::Sender<()> {
        self.trade_refresh_tx.clone()
    }

    /// Stop every poll timer synchronously.
    pub fn abort_all(&self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

async fn poll_stats(
    api: Arc<dyn PullApi>,
    update_tx: mpsc::Sender<StateUpdate>,
    period: Duration,
) {
    let mut ticker = interval(period);
    loop {
        ticker.tick().await;
        match api.fetch_stats().await {
            Ok(stats) => {
                if update_tx.send(StateUpdate::Stats(stats)).await.is_err() {
                    break;
                }
            }
            Err(err) => warn!(%err, "stats poll failed, retaining last snapshot"),
        }
    }
}

async fn poll_status(
    api: Arc<dyn PullApi>,
    update_tx: mpsc::Sender<StateUpdate>,
    period: Duration,
) {
    let mut ticker = interval(period);
    loop {
        ticker.tick().await;
        match api.fetch_status().await {
            Ok(status) => {
                if update_tx.send(StateUpdate::Status(status)).await.is_err() {
                    break;
                }
            }
            Err(err) => warn!(%err, "status poll failed, retaining last snapshot"),
        }
    }
}

async fn poll_prices(
    api: Arc<dyn PullApi>,
    update_tx: mpsc::Sender<StateUpdate>,
    period: Duration,
) {
    let mut ticker = interval(period);
    loop {
        ticker.tick().await;
        match api.fetch_prices().await {
            Ok(quotes) => {
                if update_tx.send(StateUpdate::Prices(quotes)).await.is_err() {
                    break;
                }
            }
            Err(err) => warn!(%err, "price poll failed, retaining last table"),
        }
    }
}

async fn poll_signals(
    api: Arc<dyn PullApi>,
    update_tx: mpsc::Sender<StateUpdate>,
    period: Duration,
    limit: usize,
) {
    let mut ticker = interval(period);
    loop {
        ticker.tick().await;
        match api.fetch_signals(limit).await {
            Ok(signals) => {
                if update_tx.send(StateUpdate::Signals(signals)).await.is_err() {
                    break;
                }
            }
            Err(err) => warn!(%err, "signal poll failed, retaining last snapshot"),
        }
    }
}

/// Trades poll on its own timer, plus on-demand re-polls when the push
/// channel reports trade activity.
async fn poll_trades(
    api: Arc<dyn PullApi>,
    update_tx: mpsc::Sender<StateUpdate>,
    period: Duration,
    limit: usize,
    mut refresh_rx: mpsc::Receiver<()>,
) {
    let mut ticker = interval(period);
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            poked = refresh_rx.recv() => {
                if poked.is_none() {
                    debug!("trade refresh channel closed, trades poller stopping");
                    break;
                }
                debug!("trade activity pushed, re-polling trades");
            }
        }
        match api.fetch_trades(limit).await {
            Ok(trades) => {
                if update_tx.send(StateUpdate::Trades(trades)).await.is_err() {
                    break;
                }
            }
            Err(err) => warn!(%err, "trade poll failed, retaining last snapshot"),
        }
    }
}

/// Wall-clock tick so snapshot consumers see time advance between events.
async fn tick_clock(update_tx: mpsc::Sender<StateUpdate>, period: Duration) {
    let mut ticker = interval(period);
    loop {
        ticker.tick().await;
        if update_tx.send(StateUpdate::Clock(Utc::now())).await.is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use crate::rest::Settings;
    use async_trait::async_trait;
    use dashboard_core::{PriceQuote, Signal, StatsSnapshot, SystemStatus, Trade};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Pull transport that fails stats on demand and counts trade fetches.
    struct FlakyApi {
        fail_stats: bool,
        trade_fetches: AtomicUsize,
    }

    #[async_trait]
    impl PullApi for FlakyApi {
        async fn fetch_stats(&self) -> Result<StatsSnapshot, SyncError> {
            if self.fail_stats {
                Err(SyncError::Transport("stats endpoint down".to_string()))
            } else {
                Ok(StatsSnapshot {
                    total_signals: 3,
                    ..StatsSnapshot::default()
                })
            }
        }

        async fn fetch_trades(&self, _limit: usize) -> Result<Vec<Trade>, SyncError> {
            self.trade_fetches.fetch_add(1, Ordering::SeqCst);
            Ok(vec![Trade {
                id: 1,
                ..Trade::default()
            }])
        }

        async fn fetch_signals(&self, _limit: usize) -> Result<Vec<Signal>, SyncError> {
            Ok(Vec::new())
        }

        async fn fetch_prices(&self) -> Result<HashMap<String, PriceQuote>, SyncError> {
            Ok(HashMap::new())
        }

        async fn fetch_status(&self) -> Result<SystemStatus, SyncError> {
            Ok(SystemStatus::default())
        }

        async fn fetch_settings(&self) -> Result<Settings, SyncError> {
            Ok(Settings::default())
        }

        async fn update_settings(&self, _settings: &Settings) -> Result<(), SyncError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_failed_poll_sends_nothing() {
        let api = Arc::new(FlakyApi {
            fail_stats: true,
            trade_fetches: AtomicUsize::new(0),
        });
        let (update_tx, mut update_rx) = mpsc::channel(8);

        let task = tokio::spawn(poll_stats(api, update_tx, Duration::from_millis(10)));
        tokio::time::sleep(Duration::from_millis(40)).await;
        task.abort();

        // Stale-while-revalidate: failures never clear displayed data
        assert!(update_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_first_tick_polls_immediately() {
        let api = Arc::new(FlakyApi {
            fail_stats: false,
            trade_fetches: AtomicUsize::new(0),
        });
        let (update_tx, mut update_rx) = mpsc::channel(8);

        let task = tokio::spawn(poll_stats(api, update_tx, Duration::from_secs(3600)));
        let update = tokio::time::timeout(Duration::from_secs(1), update_rx.recv())
            .await
            .expect("startup poll should fire without waiting a full period")
            .unwrap();
        task.abort();

        match update {
            StateUpdate::Stats(stats) => assert_eq!(stats.total_signals, 3),
            other => panic!("unexpected update: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_trade_refresh_triggers_extra_poll() {
        let api = Arc::new(FlakyApi {
            fail_stats: false,
            trade_fetches: AtomicUsize::new(0),
        });
        let (update_tx, mut update_rx) = mpsc::channel(32);
        let (refresh_tx, refresh_rx) = mpsc::channel(4);

        let task = tokio::spawn(poll_trades(
            api.clone(),
            update_tx,
            Duration::from_secs(3600),
            50,
            refresh_rx,
        ));

        // Startup poll
        tokio::time::timeout(Duration::from_secs(1), update_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(api.trade_fetches.load(Ordering::SeqCst), 1);

        // Push-activity poke re-polls without waiting for the timer
        refresh_tx.send(()).await.unwrap();
        tokio::time::timeout(Duration::from_secs(1), update_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(api.trade_fetches.load(Ordering::SeqCst), 2);

        task.abort();
    }
}
