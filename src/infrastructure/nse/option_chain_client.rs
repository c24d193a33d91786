use crate::domain::market::{MarketIndex, OptionChainSnapshot};
use crate::domain::ports::OptionChainSource;
use crate::infrastructure::core::HttpClientFactory;
use anyhow::Context;
use async_trait::async_trait;
use chrono::Local;
use std::time::Duration;
use tracing::{info, warn};

const NSE_ROOT: &str = "https://www.nseindia.com";
const CHAIN_ENDPOINT: &str = "https://www.nseindia.com/api/option-chain-indices";

/// Fetches the public option chain, priming the cookie session against the
/// site root first. A fresh client (and therefore session) is created per
/// fetch; retries reuse the same session and are throttled.
pub struct NseOptionChainClient {
    timeout: Duration,
    throttle: Duration,
}

impl NseOptionChainClient {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            throttle: Duration::from_secs(1),
        }
    }
}

impl Default for NseOptionChainClient {
    fn default() -> Self {
        Self::new(Duration::from_secs(15))
    }
}

#[async_trait]
impl OptionChainSource for NseOptionChainClient {
    async fn fetch_chain(&self, index: MarketIndex) -> anyhow::Result<OptionChainSnapshot> {
        let client = HttpClientFactory::nse_client(self.timeout);

        // cookie priming; a failure here is survivable, the API call
        // itself may still be served
        if let Err(e) = client.get(NSE_ROOT).send().await {
            warn!("NSE session priming failed: {e}");
        }
        tokio::time::sleep(self.throttle).await;

        let url = format!("{CHAIN_ENDPOINT}?symbol={}", index.symbol());
        let response = client
            .get(&url)
            .send()
            .await
            .context("Option-chain request failed after retries")?;
        if !response.status().is_success() {
            anyhow::bail!("Option-chain endpoint returned {}", response.status());
        }
        let body: serde_json::Value = response
            .json()
            .await
            .context("Option-chain response was not JSON")?;

        let snapshot = OptionChainSnapshot::from_raw_json(
            index,
            &body,
            None,
            Local::now().naive_local(),
        )?;
        info!(
            index = %index,
            strikes = snapshot.strikes.len(),
            underlying = snapshot.underlying,
            expiry = %snapshot.expiry,
            "Fetched option chain"
        );
        Ok(snapshot)
    }
}
