//! Candle indicator engine: computes the trend / momentum / volatility /
//! volume columns over an OHLCV sequence and derives trend strength and
//! an indicator-level trading signal.
//!
//! Every published column is finite for every bar; where history is
//! shorter than an indicator's lookback the column holds its documented
//! neutral default instead of NaN.

mod basic;
mod momentum;
mod signals;
mod trend;
mod volatility;
mod volume;

pub use basic::MovingAverageColumns;
pub use momentum::MomentumColumns;
pub use signals::{TrendDirection, get_indicator_signals, get_trend_strength};
pub use trend::{AdxBucket, TrendColumns};
pub use volatility::{VolatilityBucket, VolatilityColumns};
pub use volume::VolumeColumns;

use crate::domain::market::Candle;
use serde::{Deserialize, Serialize};

/// Indicator parameters with the engine's documented defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorConfig {
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub stochastic_period: usize,
    pub stochastic_smooth: usize,
    pub stochastic_d: usize,
    pub cci_period: usize,
    pub williams_period: usize,
    pub momentum_period: usize,
    pub adx_period: usize,
    pub supertrend_period: usize,
    pub supertrend_multiplier: f64,
    pub psar_acceleration: f64,
    pub psar_maximum: f64,
    pub aroon_period: usize,
    pub bollinger_period: usize,
    pub bollinger_std_dev: f64,
    pub atr_period: usize,
    pub keltner_period: usize,
    pub keltner_atr_multiplier: f64,
    pub donchian_period: usize,
    pub volatility_ratio_short: usize,
    pub volatility_ratio_long: usize,
    pub hist_volatility_period: usize,
    pub hist_volatility_annualization: usize,
    pub bandwidth_percentile_window: usize,
    pub obv_ema_period: usize,
    pub volume_sma_short: usize,
    pub volume_sma_long: usize,
    pub volume_spike_multiplier: f64,
    pub ultra_volume_multiplier: f64,
    pub mfi_period: usize,
    /// Daily VWAP reset at the session open (09:15). When false, VWAP is
    /// cumulative over the whole series.
    pub vwap_daily_reset: bool,
    pub volume_profile_zones: usize,
    /// Per-candle delivery fractions in percent, when the caller has them.
    /// Without them the engine assumes 50% and flags its delivery outputs
    /// as approximate.
    pub delivery_series: Option<Vec<f64>>,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            stochastic_period: 14,
            stochastic_smooth: 3,
            stochastic_d: 3,
            cci_period: 20,
            williams_period: 14,
            momentum_period: 14,
            adx_period: 14,
            supertrend_period: 10,
            supertrend_multiplier: 3.0,
            psar_acceleration: 0.02,
            psar_maximum: 0.2,
            aroon_period: 25,
            bollinger_period: 20,
            bollinger_std_dev: 2.0,
            atr_period: 14,
            keltner_period: 20,
            keltner_atr_multiplier: 2.0,
            donchian_period: 20,
            volatility_ratio_short: 5,
            volatility_ratio_long: 20,
            hist_volatility_period: 20,
            hist_volatility_annualization: 252,
            bandwidth_percentile_window: 252,
            obv_ema_period: 20,
            volume_sma_short: 5,
            volume_sma_long: 20,
            volume_spike_multiplier: 2.0,
            ultra_volume_multiplier: 3.0,
            mfi_period: 14,
            vwap_daily_reset: true,
            volume_profile_zones: 10,
            delivery_series: None,
        }
    }
}

/// The candle sequence plus every computed indicator column.
#[derive(Debug, Clone)]
pub struct IndicatorFrame {
    pub candles: Vec<Candle>,
    pub ma: MovingAverageColumns,
    pub momentum: MomentumColumns,
    pub trend: TrendColumns,
    pub volatility: VolatilityColumns,
    pub volume: VolumeColumns,
}

impl IndicatorFrame {
    pub fn build(candles: Vec<Candle>, config: &IndicatorConfig) -> Self {
        let ma = MovingAverageColumns::compute(&candles);
        let momentum = MomentumColumns::compute(&candles, config);
        let trend = TrendColumns::compute(&candles, config);
        let volatility = VolatilityColumns::compute(&candles, config);
        let volume = VolumeColumns::compute(&candles, config);
        Self {
            candles,
            ma,
            momentum,
            trend,
            volatility,
            volume,
        }
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Index of the latest bar. Panics on an empty frame; callers check
    /// `is_empty` first.
    pub fn last_index(&self) -> usize {
        self.candles.len() - 1
    }
}

/// Clamped OHLCV view accepted by the `ta` crate's bar-based indicators.
pub(crate) fn data_item(candle: &Candle) -> ta::DataItem {
    let high = candle.high.max(candle.open).max(candle.close);
    let low = candle.low.min(candle.open).min(candle.close);
    ta::DataItem::builder()
        .open(candle.open)
        .high(high)
        .low(low)
        .close(candle.close)
        .volume(candle.volume)
        .build()
        .expect("clamped candle bounds are always valid")
}

/// True range of the bar at `i`.
pub(crate) fn true_range(candles: &[Candle], i: usize) -> f64 {
    let c = &candles[i];
    if i == 0 {
        return c.high - c.low;
    }
    let prev_close = candles[i - 1].close;
    (c.high - c.low)
        .max((c.high - prev_close).abs())
        .max((c.low - prev_close).abs())
}

/// Rolling simple mean with expanding warm-up (mean of what exists so far).
pub(crate) fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for i in 0..values.len() {
        sum += values[i];
        if i >= window {
            sum -= values[i - window];
        }
        let n = (i + 1).min(window);
        out.push(sum / n as f64);
    }
    out
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::domain::market::Candle;
    use chrono::{NaiveDate, NaiveDateTime};

    pub fn session_open() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 2)
            .unwrap()
            .and_hms_opt(9, 15, 0)
            .unwrap()
    }

    /// A flat series: O=H=L=C at `price`, fixed volume.
    pub fn flat_series(price: f64, volume: f64, bars: usize) -> Vec<Candle> {
        (0..bars)
            .map(|i| Candle {
                timestamp: session_open() + chrono::Duration::minutes(5 * i as i64),
                open: price,
                high: price,
                low: price,
                close: price,
                volume,
            })
            .collect()
    }

    /// Bars from close prices; each bar spans [close-1, close+1].
    pub fn series_from_closes(closes: &[f64], volume: f64) -> Vec<Candle> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Candle {
                timestamp: session_open() + chrono::Duration::minutes(5 * i as i64),
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume,
            })
            .collect()
    }
}
