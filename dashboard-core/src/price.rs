use serde::{Deserialize, Serialize};

/// Live quote for one symbol.
///
/// Quotes are replaced wholesale on every push or pull update — the table is
/// keyed by symbol and the last writer wins; there is no per-field merge.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PriceQuote {
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub price: f64,
    /// 24h change percentage.
    #[serde(default, alias = "change_24h")]
    pub change_pct: f64,
    /// Share of buyer-initiated volume, 0-100.
    #[serde(default)]
    pub buy_percent: f64,
    /// Share of seller-initiated volume, 0-100.
    #[serde(default)]
    pub sell_percent: f64,
    #[serde(default)]
    pub market_open: bool,
}
