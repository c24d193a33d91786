//! In-memory port implementations for tests and dry runs.

use crate::domain::market::{Candle, MarketIndex, OptionChainSnapshot, OptionLeg, StrikeEntry};
use crate::domain::ports::{
    CandleSource, OptionChainSource, OrderAck, OrderDispatcher, OrderPayload,
};
use async_trait::async_trait;
use chrono::Local;
use std::sync::Mutex;

/// Serves a fixed candle series.
pub struct MockCandleSource {
    candles: Vec<Candle>,
}

impl MockCandleSource {
    pub fn new(candles: Vec<Candle>) -> Self {
        Self { candles }
    }
}

#[async_trait]
impl CandleSource for MockCandleSource {
    async fn fetch_candles(&self, _index: MarketIndex) -> anyhow::Result<Vec<Candle>> {
        Ok(self.candles.clone())
    }
}

/// Serves a fixed chain snapshot (per call, re-stamped to now).
pub struct MockChainSource {
    snapshot: OptionChainSnapshot,
}

impl MockChainSource {
    pub fn new(snapshot: OptionChainSnapshot) -> Self {
        Self { snapshot }
    }

    /// A balanced five-strike chain centered on `underlying`.
    pub fn flat(underlying: f64) -> Self {
        let step = 50.0;
        let atm = (underlying / step).round() * step;
        let strikes = (-2..=2)
            .map(|offset| {
                let strike = atm + offset as f64 * step;
                StrikeEntry {
                    strike,
                    ce: OptionLeg {
                        open_interest: 1000.0,
                        volume: 500.0,
                        implied_volatility: 14.0,
                        last_price: 100.0,
                        ..Default::default()
                    },
                    pe: OptionLeg {
                        open_interest: 1000.0,
                        volume: 500.0,
                        implied_volatility: 14.0,
                        last_price: 100.0,
                        ..Default::default()
                    },
                }
            })
            .collect();
        Self::new(OptionChainSnapshot {
            index: MarketIndex::Nifty,
            underlying,
            fetched_at: Local::now().naive_local(),
            expiry: "09-Jan-2025".into(),
            strikes,
        })
    }
}

#[async_trait]
impl OptionChainSource for MockChainSource {
    async fn fetch_chain(&self, index: MarketIndex) -> anyhow::Result<OptionChainSnapshot> {
        let mut snapshot = self.snapshot.clone();
        snapshot.index = index;
        snapshot.fetched_at = Local::now().naive_local();
        Ok(snapshot)
    }
}

/// Records every dispatched payload and acknowledges it.
#[derive(Default)]
pub struct MockDispatcher {
    pub orders: Mutex<Vec<OrderPayload>>,
}

#[async_trait]
impl OrderDispatcher for MockDispatcher {
    async fn place_order(&self, payload: OrderPayload) -> anyhow::Result<OrderAck> {
        let mut orders = self.orders.lock().expect("order log mutex");
        orders.push(payload);
        Ok(OrderAck {
            order_number: format!("MOCK-{:06}", orders.len()),
            status: "SIMULATED".into(),
            message: "Recorded by mock dispatcher".into(),
        })
    }

    fn is_live(&self) -> bool {
        false
    }
}
