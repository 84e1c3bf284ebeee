//! Pull-channel client for the dashboard REST contract.
//!
//! The [`PullApi`] trait is the seam between the poll scheduler and the
//! transport, so scheduling is testable against a mock. [`RestClient`] is
//! the production implementation: it attaches the configured bearer token to
//! every request and decodes the backend's response wrappers permissively
//! (absent fields default instead of failing derivation).

use crate::dispatch::decode_price_table;
use crate::error::SyncError;
use async_trait::async_trait;
use dashboard_core::{PriceQuote, Signal, StatsSnapshot, SystemStatus, Trade};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// User-facing dashboard settings, read and written through
/// `GET/PUT /api/settings`. Persistence is the backend's concern.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub timezone: Option<String>,
    pub show_sessions: Option<bool>,
    pub default_chart_timeframe: Option<String>,
    pub theme: Option<String>,
    pub mt5_enabled: Option<bool>,
}

/// The fixed pull contract consumed by the poll scheduler.
#[async_trait]
pub trait PullApi: Send + Sync {
    async fn fetch_stats(&self) -> Result<StatsSnapshot, SyncError>;
    async fn fetch_trades(&self, limit: usize) -> Result<Vec<Trade>, SyncError>;
    async fn fetch_signals(&self, limit: usize) -> Result<Vec<Signal>, SyncError>;
    async fn fetch_prices(&self) -> Result<HashMap<String, PriceQuote>, SyncError>;
    async fn fetch_status(&self) -> Result<SystemStatus, SyncError>;
    async fn fetch_settings(&self) -> Result<Settings, SyncError>;
    async fn update_settings(&self, settings: &Settings) -> Result<(), SyncError>;
}

/// `GET /trades` wrapper: `{ count, trades: [...] }`.
#[derive(Debug, Deserialize)]
struct TradesResponse {
    #[serde(default)]
    trades: Vec<Trade>,
}

/// `GET /signals` wrapper: `{ count, signals: [...] }`.
#[derive(Debug, Deserialize)]
struct SignalsResponse {
    #[serde(default)]
    signals: Vec<Signal>,
}

/// Production pull transport over `reqwest`.
pub struct RestClient {
    http: reqwest::Client,
    base: Url,
    bearer_token: Option<String>,
}

impl RestClient {
    /// Default per-request timeout.
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(base_url: &str, bearer_token: Option<String>) -> Result<Self, SyncError> {
        // A trailing slash keeps Url::join from swallowing path segments
        let mut base = base_url.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let http = reqwest::Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base: Url::parse(&base)?,
            bearer_token,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, SyncError> {
        Ok(self.base.join(path)?)
    }

    fn get(&self, url: Url) -> reqwest::RequestBuilder {
        let mut request = self.http.get(url);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }
        request
    }
}

#[async_trait]
impl PullApi for RestClient {
    async fn fetch_stats(&self) -> Result<StatsSnapshot, SyncError> {
        let url = self.endpoint("stats")?;
        Ok(self.get(url).send().await?.error_for_status()?.json().await?)
    }

    async fn fetch_trades(&self, limit: usize) -> Result<Vec<Trade>, SyncError> {
        let mut url = self.endpoint("trades")?;
        url.query_pairs_mut().append_pair("limit", &limit.to_string());
        let response: TradesResponse =
            self.get(url).send().await?.error_for_status()?.json().await?;
        Ok(response.trades)
    }

    async fn fetch_signals(&self, limit: usize) -> Result<Vec<Signal>, SyncError> {
        let mut url = self.endpoint("signals")?;
        url.query_pairs_mut().append_pair("limit", &limit.to_string());
        let response: SignalsResponse =
            self.get(url).send().await?.error_for_status()?.json().await?;
        Ok(response.signals)
    }

    async fn fetch_prices(&self) -> Result<HashMap<String, PriceQuote>, SyncError> {
        let url = self.endpoint("api/prices/live")?;
        let value: serde_json::Value =
            self.get(url).send().await?.error_for_status()?.json().await?;
        Ok(decode_price_table(value)?)
    }

    async fn fetch_status(&self) -> Result<SystemStatus, SyncError> {
        let url = self.endpoint("api/status")?;
        Ok(self.get(url).send().await?.error_for_status()?.json().await?)
    }

    async fn fetch_settings(&self) -> Result<Settings, SyncError> {
        let url = self.endpoint("api/settings")?;
        Ok(self.get(url).send().await?.error_for_status()?.json().await?)
    }

    async fn update_settings(&self, settings: &Settings) -> Result<(), SyncError> {
        let url = self.endpoint("api/settings")?;
        let mut request = self.http.put(url).json(settings);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }
        request.send().await?.error_for_status()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joining_preserves_nested_paths() {
        let client = RestClient::new("http://127.0.0.1:8000", None).unwrap();
        assert_eq!(
            client.endpoint("api/prices/live").unwrap().as_str(),
            "http://127.0.0.1:8000/api/prices/live"
        );
        assert_eq!(
            client.endpoint("stats").unwrap().as_str(),
            "http://127.0.0.1:8000/stats"
        );
    }

    #[test]
    fn test_trades_response_wrapper_decodes() {
        let response: TradesResponse = serde_json::from_str(
            r#"{"count": 1, "trades": [{"id": 3, "symbol": "EURUSD", "direction": "buy", "status": "closed", "net_pnl": 12.0}]}"#,
        )
        .unwrap();
        assert_eq!(response.trades.len(), 1);
        assert_eq!(response.trades[0].net_pnl, Some(12.0));
    }

    #[test]
    fn test_settings_round_trip_skips_unset_fields() {
        let settings = Settings {
            theme: Some("dark".to_string()),
            ..Settings::default()
        };
        let encoded = serde_json::to_string(&settings).unwrap();
        let decoded: Settings = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.theme.as_deref(), Some("dark"));
        assert_eq!(decoded.timezone, None);
    }
}
