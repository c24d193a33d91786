use crate::domain::market::{Candle, MarketIndex, OptionChainSnapshot};
use crate::domain::ml::feature_registry::FeatureSet;
use crate::domain::trading::{Signal, SignalKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Source of OHLCV candles for an index.
#[async_trait]
pub trait CandleSource: Send + Sync {
    async fn fetch_candles(&self, index: MarketIndex) -> anyhow::Result<Vec<Candle>>;
}

/// Source of option-chain snapshots.
#[async_trait]
pub trait OptionChainSource: Send + Sync {
    async fn fetch_chain(&self, index: MarketIndex) -> anyhow::Result<OptionChainSnapshot>;
}

/// Inference contract over the externally trained classifier.
pub trait SignalClassifier: Send + Sync {
    /// Classifies a feature row into a directional signal.
    fn classify(&self, features: &FeatureSet) -> Signal;

    fn name(&self) -> &str;
}

/// Market order per the dispatcher wire contract (type 2 = MARKET,
/// 1 = LIMIT; side +1 = buy, -1 = sell).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPayload {
    pub symbol: String,
    pub qty: u32,
    pub side: i8,
    #[serde(rename = "type")]
    pub order_type: u8,
    #[serde(rename = "productType")]
    pub product_type: String,
    pub validity: String,
    #[serde(rename = "disclosedQty")]
    pub disclosed_qty: u32,
    #[serde(rename = "limitPrice", skip_serializing_if = "Option::is_none")]
    pub limit_price: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderAck {
    #[serde(rename = "orderNumber")]
    pub order_number: String,
    pub status: String,
    pub message: String,
}

/// External order dispatcher. Implementations own credentials and the
/// real-trading gate; callers only see the payload contract.
#[async_trait]
pub trait OrderDispatcher: Send + Sync {
    async fn place_order(&self, payload: OrderPayload) -> anyhow::Result<OrderAck>;

    /// Whether orders actually leave the process.
    fn is_live(&self) -> bool;
}

/// Builds the exchange option symbol: `NSE:<INDEX><YYMMDD><STRIKE><CE|PE>`.
pub fn option_symbol(
    index: MarketIndex,
    expiry: chrono::NaiveDate,
    strike: f64,
    kind: SignalKind,
) -> String {
    let leg = match kind {
        SignalKind::BuyPut => "PE",
        _ => "CE",
    };
    format!(
        "NSE:{}{}{}{}",
        index.symbol(),
        expiry.format("%y%m%d"),
        strike as i64,
        leg
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_option_symbol_format() {
        let expiry = NaiveDate::from_ymd_opt(2025, 1, 9).unwrap();
        assert_eq!(
            option_symbol(MarketIndex::Nifty, expiry, 22500.0, SignalKind::BuyCall),
            "NSE:NIFTY25010922500CE"
        );
        assert_eq!(
            option_symbol(MarketIndex::BankNifty, expiry, 48000.0, SignalKind::BuyPut),
            "NSE:BANKNIFTY25010948000PE"
        );
    }

    #[test]
    fn test_order_payload_wire_names() {
        let payload = OrderPayload {
            symbol: "NSE:NIFTY25010922500CE".into(),
            qty: 50,
            side: 1,
            order_type: 2,
            product_type: "INTRADAY".into(),
            validity: "DAY".into(),
            disclosed_qty: 0,
            limit_price: None,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], 2);
        assert_eq!(json["productType"], "INTRADAY");
        assert!(json.get("limitPrice").is_none());
    }
}
