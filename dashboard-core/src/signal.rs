use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Trade direction of a signal or an executed trade.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Buy,
    Sell,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Buy => "buy",
            Direction::Sell => "sell",
        }
    }

    pub fn is_buy(&self) -> bool {
        matches!(self, Direction::Buy)
    }
}

/// Signal lifecycle status.
///
/// Transitions are monotonic forward: `Received -> Ongoing -> Succeeded`,
/// with `Rejected` as the terminal failure branch. A later observation of a
/// signal never moves its status backward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalStatus {
    #[default]
    #[serde(alias = "waiting")]
    Received,
    #[serde(alias = "executed", alias = "validated")]
    Ongoing,
    #[serde(alias = "closed")]
    Succeeded,
    #[serde(alias = "failed")]
    Rejected,
}

impl SignalStatus {
    /// Position in the forward lifecycle. Terminal outcomes share the top
    /// rank so neither can overwrite the other.
    pub fn rank(&self) -> u8 {
        match self {
            SignalStatus::Received => 0,
            SignalStatus::Ongoing => 1,
            SignalStatus::Succeeded | SignalStatus::Rejected => 2,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SignalStatus::Succeeded | SignalStatus::Rejected)
    }
}

/// A trading signal observed from the push channel or a pull snapshot.
///
/// Identity is the `id`: a later observation of the same id updates fields
/// in place rather than appending a duplicate. Push payloads carry the id as
/// `signal_id`, pull payloads as `id`; everything except the id is optional
/// on the wire, so absent fields fall back to defaults instead of failing
/// the decode.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Signal {
    #[serde(alias = "signal_id")]
    pub id: u64,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default)]
    pub status: SignalStatus,
    #[serde(default)]
    pub entry_price: Option<f64>,
    #[serde(default)]
    pub stop_loss: Option<f64>,
    /// Ordered take-profit levels, nearest first.
    #[serde(default)]
    pub targets: Vec<f64>,
    /// Single take-profit level from payloads that do not carry `targets`.
    #[serde(default)]
    pub take_profit: Option<f64>,
    #[serde(default, alias = "confidence")]
    pub confidence_factors: Vec<String>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Signal {
    /// The final target the position is working toward: the last entry of
    /// `targets`, falling back to the single `take_profit` level.
    pub fn final_target(&self) -> Option<f64> {
        self.targets.last().copied().or(self.take_profit)
    }

    /// Fold a later observation of the same signal into this one.
    ///
    /// Status only ever moves forward through the lifecycle and terminal
    /// states are sticky. Price levels and confidence factors are replaced
    /// only when the incoming observation actually carries them, so a sparse
    /// push event cannot wipe values a pull snapshot already filled in.
    pub fn merge_update(&mut self, update: Signal) {
        debug_assert_eq!(self.id, update.id);

        if !self.status.is_terminal() && update.status.rank() >= self.status.rank() {
            self.status = update.status;
        }
        if !update.symbol.is_empty() {
            self.symbol = update.symbol;
        }
        self.direction = update.direction;
        if update.entry_price.is_some() {
            self.entry_price = update.entry_price;
        }
        if update.stop_loss.is_some() {
            self.stop_loss = update.stop_loss;
        }
        if !update.targets.is_empty() {
            self.targets = update.targets;
        }
        if update.take_profit.is_some() {
            self.take_profit = update.take_profit;
        }
        if !update.confidence_factors.is_empty() {
            self.confidence_factors = update.confidence_factors;
        }
    }
}
