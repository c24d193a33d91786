use crate::domain::errors::EngineError;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A single OHLCV bar in exchange-local time.
///
/// Volume may be absent at the source; it is stored as zero in that case so
/// downstream volume analytics stay defined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

impl Candle {
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    pub fn upper_shadow(&self) -> f64 {
        self.high - self.open.max(self.close)
    }

    pub fn lower_shadow(&self) -> f64 {
        self.open.min(self.close) - self.low
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }
}

/// An ordered candle sequence. Gaps are allowed, reordering is not.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandleSeries {
    candles: Vec<Candle>,
}

impl CandleSeries {
    /// Builds a series, validating field sanity and timestamp order.
    pub fn new(candles: Vec<Candle>) -> Result<Self, EngineError> {
        for c in &candles {
            if !(c.open.is_finite() && c.high.is_finite() && c.low.is_finite() && c.close.is_finite())
            {
                return Err(EngineError::invalid_input(format!(
                    "non-finite price in candle at {}",
                    c.timestamp
                )));
            }
            if c.high < c.low {
                return Err(EngineError::invalid_input(format!(
                    "candle at {} has high {} below low {}",
                    c.timestamp, c.high, c.low
                )));
            }
            if c.volume < 0.0 {
                return Err(EngineError::invalid_input(format!(
                    "negative volume in candle at {}",
                    c.timestamp
                )));
            }
        }
        for w in candles.windows(2) {
            if w[1].timestamp < w[0].timestamp {
                return Err(EngineError::invalid_input(format!(
                    "candles out of order at {}",
                    w[1].timestamp
                )));
            }
        }
        Ok(Self { candles })
    }

    pub fn as_slice(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    pub fn push(&mut self, candle: Candle) -> Result<(), EngineError> {
        if let Some(prev) = self.candles.last()
            && candle.timestamp < prev.timestamp
        {
            return Err(EngineError::invalid_input(format!(
                "appended candle at {} precedes series tail {}",
                candle.timestamp, prev.timestamp
            )));
        }
        self.candles.push(candle);
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn bar(seq: u32, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Candle {
    use chrono::NaiveDate;
    let session_open = NaiveDate::from_ymd_opt(2025, 1, 2)
        .unwrap()
        .and_hms_opt(9, 15, 0)
        .unwrap();
    Candle {
        timestamp: session_open + chrono::Duration::minutes(5 * seq as i64),
        open,
        high,
        low,
        close,
        volume,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candle_geometry() {
        let c = bar(0, 100.0, 110.0, 95.0, 104.0, 1000.0);
        assert_eq!(c.body(), 4.0);
        assert_eq!(c.range(), 15.0);
        assert_eq!(c.upper_shadow(), 6.0);
        assert_eq!(c.lower_shadow(), 5.0);
        assert!(c.is_bullish());
    }

    #[test]
    fn test_series_rejects_reordered() {
        let a = bar(1, 100.0, 101.0, 99.0, 100.0, 0.0);
        let b = bar(0, 100.0, 101.0, 99.0, 100.0, 0.0);
        assert!(CandleSeries::new(vec![a, b]).is_err());
    }

    #[test]
    fn test_series_rejects_inverted_range() {
        let mut c = bar(0, 100.0, 101.0, 99.0, 100.0, 0.0);
        c.high = 98.0;
        assert!(CandleSeries::new(vec![c]).is_err());
    }

    #[test]
    fn test_series_allows_gaps() {
        let a = bar(0, 100.0, 101.0, 99.0, 100.0, 0.0);
        let b = bar(30, 100.0, 101.0, 99.0, 100.0, 0.0);
        let series = CandleSeries::new(vec![a, b]).unwrap();
        assert_eq!(series.len(), 2);
    }
}
