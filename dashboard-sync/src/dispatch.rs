//! Message-passing boundary between transport and reconciliation.
//!
//! Raw frames from every room funnel through here: decode, classify by the
//! `type` field, forward to the reconciler. Control traffic (heartbeat
//! replies, connection acks) is filtered out, and a malformed frame is
//! dropped with a diagnostic - decode failures never propagate.

use crate::connection::RawFrame;
use crate::reconcile::StateUpdate;
use chrono::{DateTime, Utc};
use dashboard_core::{LogEntry, PriceQuote, RiskMetrics, Signal, SystemStatus};
use serde::Deserialize;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Inbound frame envelope: `{ type, data, timestamp }`.
#[derive(Debug, Deserialize)]
struct WsFrame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: serde_json::Value,
    #[serde(default)]
    #[allow(dead_code)]
    timestamp: Option<DateTime<Utc>>,
}

/// Parses inbound frames and routes typed updates to the reconciler.
pub struct MessageDispatcher {
    update_tx: mpsc::Sender<StateUpdate>,
    /// Pokes the trades poller: trades are pull-sourced wholesale, so a
    /// trade push only signals that a re-poll is worthwhile.
    trade_refresh_tx: mpsc::Sender<()>,
}

impl MessageDispatcher {
    pub fn new(update_tx: mpsc::Sender<StateUpdate>, trade_refresh_tx: mpsc::Sender<()>) -> Self {
        Self {
            update_tx,
            trade_refresh_tx,
        }
    }

    /// Consume frames until every connection has hung up.
    pub async fn run(self, mut frame_rx: mpsc::Receiver<RawFrame>) {
        while let Some(frame) = frame_rx.recv().await {
            self.dispatch(frame).await;
        }
        debug!("frame channel closed, dispatcher stopping");
    }

    /// Decode and route one frame. Malformed frames are dropped.
    pub async fn dispatch(&self, frame: RawFrame) {
        let room = frame.room;

        // Heartbeat reply to our "ping" text frame - not JSON, never routed
        if frame.text.trim() == "pong" {
            debug!(%room, "heartbeat acknowledged");
            return;
        }

        let envelope: WsFrame = match serde_json::from_str(&frame.text) {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!(%room, %err, "dropping malformed frame");
                return;
            }
        };

        let update = match envelope.kind.as_str() {
            "signal" => match serde_json::from_value::<Signal>(envelope.data) {
                Ok(signal) => StateUpdate::Signal(signal),
                Err(err) => {
                    warn!(%room, %err, "dropping undecodable signal event");
                    return;
                }
            },
            "trade" => {
                debug!(%room, "trade activity, requesting trades re-poll");
                let _ = self.trade_refresh_tx.try_send(());
                return;
            }
            "price" | "prices" => match decode_price_table(envelope.data) {
                Ok(quotes) => StateUpdate::Prices(quotes),
                Err(err) => {
                    warn!(%room, %err, "dropping undecodable price event");
                    return;
                }
            },
            "health" => match serde_json::from_value::<SystemStatus>(envelope.data) {
                Ok(status) => StateUpdate::Status(status),
                Err(err) => {
                    warn!(%room, %err, "dropping undecodable health event");
                    return;
                }
            },
            "risk" => match serde_json::from_value::<RiskMetrics>(envelope.data) {
                Ok(risk) => StateUpdate::Risk(risk),
                Err(err) => {
                    warn!(%room, %err, "dropping undecodable risk event");
                    return;
                }
            },
            "log" => match serde_json::from_value::<LogEntry>(envelope.data) {
                Ok(entry) => StateUpdate::Log(entry),
                Err(err) => {
                    warn!(%room, %err, "dropping undecodable log event");
                    return;
                }
            },
            // Server-side acks and echoes - control traffic, never reconciled
            "connection" | "welcome" | "echo" | "ping" | "pong" => {
                debug!(%room, kind = %envelope.kind, "control frame filtered");
                return;
            }
            other => {
                debug!(%room, kind = %other, "unhandled frame type");
                return;
            }
        };

        if self.update_tx.send(update).await.is_err() {
            debug!(%room, "reconciler gone, dropping update");
        }
    }
}

/// Decode a price table from either a bare `symbol -> quote` map or the
/// feed's `{ "prices": { ... } }` wrapper. Quote symbols missing from the
/// payload body are backfilled from the map keys.
pub(crate) fn decode_price_table(
    value: serde_json::Value,
) -> Result<HashMap<String, PriceQuote>, serde_json::Error> {
    #[derive(Deserialize)]
    struct Wrapper {
        prices: HashMap<String, PriceQuote>,
    }

    let mut table = serde_json::from_value::<HashMap<String, PriceQuote>>(value.clone())
        .or_else(|_| serde_json::from_value::<Wrapper>(value).map(|wrapper| wrapper.prices))?;

    for (symbol, quote) in table.iter_mut() {
        if quote.symbol.is_empty() {
            quote.symbol = symbol.clone();
        }
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashboard_core::{Room, SignalStatus};
    use serde_json::json;

    fn dispatcher() -> (
        MessageDispatcher,
        mpsc::Receiver<StateUpdate>,
        mpsc::Receiver<()>,
    ) {
        let (update_tx, update_rx) = mpsc::channel(16);
        let (refresh_tx, refresh_rx) = mpsc::channel(4);
        (
            MessageDispatcher::new(update_tx, refresh_tx),
            update_rx,
            refresh_rx,
        )
    }

    fn frame(room: Room, text: impl Into<String>) -> RawFrame {
        RawFrame::new(room, text.into(), Utc::now())
    }

    #[tokio::test]
    async fn test_signal_frame_is_routed() {
        let (dispatcher, mut update_rx, _refresh_rx) = dispatcher();

        let text = json!({
            "type": "signal",
            "data": {"signal_id": 9, "symbol": "XAUUSD", "direction": "buy", "status": "received"},
            "timestamp": "2025-11-20T10:15:00Z"
        })
        .to_string();
        dispatcher.dispatch(frame(Room::Signals, text)).await;

        match update_rx.try_recv().unwrap() {
            StateUpdate::Signal(signal) => {
                assert_eq!(signal.id, 9);
                assert_eq!(signal.status, SignalStatus::Received);
            }
            other => panic!("unexpected update: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_frame_is_dropped_without_error() {
        let (dispatcher, mut update_rx, _refresh_rx) = dispatcher();

        dispatcher
            .dispatch(frame(Room::Signals, "{not valid json"))
            .await;
        dispatcher
            .dispatch(frame(Room::Signals, r#"{"missing": "type field"}"#))
            .await;

        assert!(update_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_control_frames_never_reach_reconciler() {
        let (dispatcher, mut update_rx, _refresh_rx) = dispatcher();

        dispatcher.dispatch(frame(Room::Signals, "pong")).await;
        let ack = json!({
            "type": "connection",
            "status": "connected",
            "room": "signals"
        })
        .to_string();
        dispatcher.dispatch(frame(Room::Signals, ack)).await;

        assert!(update_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_trade_push_pokes_refresh_only() {
        let (dispatcher, mut update_rx, mut refresh_rx) = dispatcher();

        let text = json!({"type": "trade", "data": {"id": 5}}).to_string();
        dispatcher.dispatch(frame(Room::Trades, text)).await;

        assert!(refresh_rx.try_recv().is_ok());
        assert!(update_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_price_frame_accepts_wrapped_table() {
        let (dispatcher, mut update_rx, _refresh_rx) = dispatcher();

        let text = json!({
            "type": "price",
            "data": {"prices": {"EURUSD": {"price": 1.0842, "change_24h": 0.12}}}
        })
        .to_string();
        dispatcher.dispatch(frame(Room::Prices, text)).await;

        match update_rx.try_recv().unwrap() {
            StateUpdate::Prices(quotes) => {
                // Symbol backfilled from the map key
                assert_eq!(quotes["EURUSD"].symbol, "EURUSD");
                assert_eq!(quotes["EURUSD"].change_pct, 0.12);
            }
            other => panic!("unexpected update: {other:?}"),
        }
    }

    #[test]
    fn test_decode_price_table_bare_map() {
        let table = decode_price_table(json!({
            "BTCUSD": {"symbol": "BTCUSD", "price": 97250.0},
            "ETHUSD": {"price": 3600.0}
        }))
        .unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table["ETHUSD"].symbol, "ETHUSD");
    }
}
