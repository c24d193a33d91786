use crate::domain::errors::JournalError;
use crate::domain::market::MarketIndex;
use crate::domain::trading::SignalKind;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a logged trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeStatus {
    Open,
    Closed,
    Cancelled,
}

/// One journal entry. Created OPEN by the orchestrator, mutated only via
/// [`TradeUpdate`], never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub trade_id: String,
    pub index: MarketIndex,
    pub signal: SignalKind,
    pub entry_time: NaiveDateTime,
    pub entry_price: Decimal,
    pub quantity: u32,
    pub strike: f64,
    pub expiry: String,
    pub status: TradeStatus,
    pub log_time: NaiveDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_time: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pnl: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Pattern labels detected at entry, for effectiveness correlation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patterns_detected: Vec<String>,
    /// Market-psychology snapshot at entry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub psychology: Option<PsychologySnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Compact psychology context stored alongside a trade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PsychologySnapshot {
    pub fear_greed_score: f64,
    pub sentiment: String,
    pub contrarian_bias: String,
}

/// The mutable subset of a trade. Supplying both exit fields closes the
/// trade and computes pnl.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TradeUpdate {
    pub exit_time: Option<NaiveDateTime>,
    pub exit_price: Option<Decimal>,
    pub pnl: Option<Decimal>,
    pub status: Option<TradeStatus>,
    pub stop_loss: Option<Decimal>,
    pub target: Option<Decimal>,
    pub notes: Option<String>,
}

impl TradeRecord {
    /// Validates the journal's required fields.
    pub fn validate(&self) -> Result<(), JournalError> {
        if self.trade_id.is_empty() {
            return Err(JournalError::MissingField { field: "trade_id" });
        }
        if self.quantity == 0 {
            return Err(JournalError::MissingField { field: "quantity" });
        }
        if self.expiry.is_empty() {
            return Err(JournalError::MissingField { field: "expiry" });
        }
        Ok(())
    }

    /// `direction · (exit − entry) · quantity`, +1 for BUY CALL, −1 for
    /// BUY PUT.
    pub fn compute_pnl(&self, exit_price: Decimal) -> Decimal {
        let direction = Decimal::from(self.signal.direction());
        direction * (exit_price - self.entry_price) * Decimal::from(self.quantity)
    }

    /// Applies a patch; last writer wins for every permitted field.
    pub fn apply(&mut self, update: TradeUpdate) {
        if let Some(stop) = update.stop_loss {
            self.stop_loss = Some(stop);
        }
        if let Some(target) = update.target {
            self.target = Some(target);
        }
        if let Some(notes) = update.notes {
            self.notes = Some(notes);
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(pnl) = update.pnl {
            self.pnl = Some(pnl);
        }
        match (update.exit_time, update.exit_price) {
            (Some(time), Some(price)) => {
                self.exit_time = Some(time);
                self.exit_price = Some(price);
                self.pnl = Some(self.compute_pnl(price));
                self.status = TradeStatus::Closed;
            }
            (time, price) => {
                if let Some(t) = time {
                    self.exit_time = Some(t);
                }
                if let Some(p) = price {
                    self.exit_price = Some(p);
                }
            }
        }
    }

    pub fn pnl_f64(&self) -> f64 {
        use rust_decimal::prelude::ToPrimitive;
        self.pnl.and_then(|p| p.to_f64()).unwrap_or(0.0)
    }

    pub fn is_closed(&self) -> bool {
        self.status == TradeStatus::Closed
    }
}
