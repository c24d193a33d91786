use crate::domain::market::{Candle, CandleSeries, MarketIndex};
use crate::domain::ports::{CandleSource, OptionChainSource};
use anyhow::Context;
use async_trait::async_trait;
use chrono::{Local, NaiveDateTime, Timelike};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Candle rows as exported to CSV: one bar per line with a
/// `%Y-%m-%d %H:%M:%S` timestamp.
#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: f64,
}

/// Reads a recorded candle file from disk. The file is re-read on each
/// fetch so a growing recording is picked up between cycles.
pub struct CsvCandleSource {
    path: PathBuf,
}

impl CsvCandleSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl CandleSource for CsvCandleSource {
    async fn fetch_candles(&self, index: MarketIndex) -> anyhow::Result<Vec<Candle>> {
        let path = self.path.clone();
        let candles = tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<Candle>> {
            let mut reader = csv::Reader::from_path(&path)
                .with_context(|| format!("Failed to open candle file {}", path.display()))?;
            let mut candles = Vec::new();
            for row in reader.deserialize::<CsvRow>() {
                let row = row.context("Malformed candle row")?;
                let timestamp =
                    NaiveDateTime::parse_from_str(&row.timestamp, "%Y-%m-%d %H:%M:%S")
                        .with_context(|| format!("Bad candle timestamp {}", row.timestamp))?;
                candles.push(Candle {
                    timestamp,
                    open: row.open,
                    high: row.high,
                    low: row.low,
                    close: row.close,
                    volume: row.volume,
                });
            }
            Ok(candles)
        })
        .await??;

        // validation also enforces ordering
        let series = CandleSeries::new(candles)?;
        info!(index = %index, bars = series.len(), "Loaded candle file");
        Ok(series.as_slice().to_vec())
    }
}

const SYNTHETIC_HISTORY_CAP: usize = 500;

/// Derives a per-cycle candle from the chain's underlying value and keeps
/// a rolling in-memory history so the indicator engine has a series to
/// work with. A stand-in for a real feed, not a market-accurate bar.
pub struct SyntheticCandleSource {
    chain_source: Arc<dyn OptionChainSource>,
    history: Mutex<HashMap<MarketIndex, Vec<Candle>>>,
}

impl SyntheticCandleSource {
    pub fn new(chain_source: Arc<dyn OptionChainSource>) -> Self {
        Self {
            chain_source,
            history: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl CandleSource for SyntheticCandleSource {
    async fn fetch_candles(&self, index: MarketIndex) -> anyhow::Result<Vec<Candle>> {
        let snapshot = self.chain_source.fetch_chain(index).await?;
        let underlying = snapshot.underlying;
        let now = Local::now().naive_local().with_nanosecond(0).unwrap_or_else(
            || Local::now().naive_local(),
        );

        let candle = Candle {
            timestamp: now,
            open: underlying - 10.0,
            high: underlying + 20.0,
            low: underlying - 30.0,
            close: underlying,
            volume: 100_000.0 + (underlying % 1000.0),
        };

        let mut history = self.history.lock().await;
        let series = history.entry(index).or_default();
        match series.last() {
            Some(last) if last.timestamp >= candle.timestamp => {}
            _ => series.push(candle),
        }
        if series.len() > SYNTHETIC_HISTORY_CAP {
            let excess = series.len() - SYNTHETIC_HISTORY_CAP;
            series.drain(..excess);
        }
        Ok(series.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mock::MockChainSource;

    fn temp_csv(content: &str) -> PathBuf {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let path = std::env::temp_dir().join(format!(
            "optrade_candles_{}_{}.csv",
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[tokio::test]
    async fn test_csv_source_parses_rows() {
        let path = temp_csv(
            "timestamp,open,high,low,close,volume\n\
             2025-01-02 09:15:00,100,101,99,100.5,1500\n\
             2025-01-02 09:20:00,100.5,102,100,101.5,1800\n",
        );
        let source = CsvCandleSource::new(path.clone());
        let candles = source.fetch_candles(MarketIndex::Nifty).await.unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].close, 100.5);
        assert_eq!(candles[1].volume, 1800.0);
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_csv_source_rejects_unordered() {
        let path = temp_csv(
            "timestamp,open,high,low,close,volume\n\
             2025-01-02 09:20:00,100,101,99,100.5,1500\n\
             2025-01-02 09:15:00,100.5,102,100,101.5,1800\n",
        );
        let source = CsvCandleSource::new(path.clone());
        assert!(source.fetch_candles(MarketIndex::Nifty).await.is_err());
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_synthetic_source_accumulates_history() {
        let chain = Arc::new(MockChainSource::flat(22500.0));
        let source = SyntheticCandleSource::new(chain);
        let first = source.fetch_candles(MarketIndex::Nifty).await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].close, 22500.0);
        // same-second fetches do not duplicate bars
        let second = source.fetch_candles(MarketIndex::Nifty).await.unwrap();
        assert!(second.len() <= 2);
    }
}
