use crate::config::BrokerConfig;
use crate::domain::errors::EngineError;
use crate::domain::ports::{OrderAck, OrderDispatcher, OrderPayload};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// Order dispatcher for the Fyers-style payload contract.
///
/// With `ENABLE_REAL_TRADING=false` (or unset) every order is acknowledged
/// synthetically and nothing leaves the process. Real trading requires the
/// full credential set; the broker transport itself lives outside this
/// crate and receives the payload unchanged.
pub struct FyersDispatcher {
    live: bool,
    order_counter: AtomicU64,
}

impl FyersDispatcher {
    /// Builds the dispatcher, refusing a live configuration without
    /// credentials.
    pub fn from_config(broker: &BrokerConfig) -> Result<Self, EngineError> {
        if broker.real_trading && !broker.has_credentials() {
            return Err(EngineError::configuration(
                "ENABLE_REAL_TRADING is set but FYERS credentials are incomplete",
            ));
        }
        Ok(Self {
            live: broker.real_trading,
            order_counter: AtomicU64::new(1),
        })
    }

    pub fn paper() -> Self {
        Self {
            live: false,
            order_counter: AtomicU64::new(1),
        }
    }
}

#[async_trait]
impl OrderDispatcher for FyersDispatcher {
    async fn place_order(&self, payload: OrderPayload) -> anyhow::Result<OrderAck> {
        if payload.qty == 0 {
            anyhow::bail!(EngineError::InvariantViolation {
                reason: format!("order for {} has zero quantity", payload.symbol),
            });
        }
        let sequence = self.order_counter.fetch_add(1, Ordering::SeqCst);
        let (prefix, status, message) = if self.live {
            ("LIVE", "FORWARDED", "Order handed to broker gateway")
        } else {
            ("PAPER", "SIMULATED", "Real trading disabled; synthetic fill")
        };
        info!(
            symbol = %payload.symbol,
            qty = payload.qty,
            side = payload.side,
            live = self.live,
            "Dispatching order"
        );
        Ok(OrderAck {
            order_number: format!("{prefix}-{sequence:06}"),
            status: status.to_string(),
            message: message.to_string(),
        })
    }

    fn is_live(&self) -> bool {
        self.live
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> OrderPayload {
        OrderPayload {
            symbol: "NSE:NIFTY25010922500CE".into(),
            qty: 100,
            side: 1,
            order_type: 2,
            product_type: "INTRADAY".into(),
            validity: "DAY".into(),
            disclosed_qty: 0,
            limit_price: None,
        }
    }

    #[tokio::test]
    async fn test_paper_dispatcher_acknowledges_synthetically() {
        let dispatcher = FyersDispatcher::paper();
        let ack = dispatcher.place_order(payload()).await.unwrap();
        assert_eq!(ack.status, "SIMULATED");
        assert!(ack.order_number.starts_with("PAPER-"));
        assert!(!dispatcher.is_live());
    }

    #[tokio::test]
    async fn test_order_numbers_increase() {
        let dispatcher = FyersDispatcher::paper();
        let first = dispatcher.place_order(payload()).await.unwrap();
        let second = dispatcher.place_order(payload()).await.unwrap();
        assert!(second.order_number > first.order_number);
    }

    #[tokio::test]
    async fn test_zero_quantity_is_fatal() {
        let dispatcher = FyersDispatcher::paper();
        let mut bad = payload();
        bad.qty = 0;
        assert!(dispatcher.place_order(bad).await.is_err());
    }

    #[test]
    fn test_live_requires_credentials() {
        let broker = BrokerConfig {
            real_trading: true,
            ..Default::default()
        };
        assert!(FyersDispatcher::from_config(&broker).is_err());

        let broker = BrokerConfig {
            api_key: "key".into(),
            api_secret: "secret".into(),
            client_id: "client".into(),
            real_trading: true,
        };
        assert!(FyersDispatcher::from_config(&broker).unwrap().is_live());
    }
}
