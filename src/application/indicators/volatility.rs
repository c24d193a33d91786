use super::{IndicatorConfig, data_item};
use crate::domain::market::Candle;
use serde::{Deserialize, Serialize};
use ta::Next;
use ta::indicators::{AverageTrueRange, BollingerBands, KeltnerChannel};

/// ATR-percent regime buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolatilityBucket {
    Low,
    Normal,
    High,
    Extreme,
}

impl VolatilityBucket {
    pub fn from_atr_percent(atr_percent: f64) -> Self {
        if atr_percent < 0.5 {
            Self::Low
        } else if atr_percent < 1.0 {
            Self::Normal
        } else if atr_percent < 1.5 {
            Self::High
        } else {
            Self::Extreme
        }
    }
}

/// Volatility indicators: Bollinger, ATR, Keltner, Donchian, volatility
/// ratio, historical volatility and bandwidth percentile.
#[derive(Debug, Clone, Default)]
pub struct VolatilityColumns {
    pub bb_middle: Vec<f64>,
    pub bb_upper: Vec<f64>,
    pub bb_lower: Vec<f64>,
    /// %B; 0.5 while the band is degenerate.
    pub bb_pct_b: Vec<f64>,
    /// (upper - lower) / middle.
    pub bb_width: Vec<f64>,
    /// Width below the 20th percentile of its trailing 50-bar window.
    pub bb_squeeze: Vec<bool>,
    pub bb_bandwidth_percentile: Vec<f64>,
    pub atr: Vec<f64>,
    pub atr_percent: Vec<f64>,
    pub volatility_bucket: Vec<VolatilityBucket>,
    pub keltner_middle: Vec<f64>,
    pub keltner_upper: Vec<f64>,
    pub keltner_lower: Vec<f64>,
    pub donchian_upper: Vec<f64>,
    pub donchian_lower: Vec<f64>,
    pub donchian_middle: Vec<f64>,
    pub donchian_breakout_up: Vec<bool>,
    pub donchian_breakout_down: Vec<bool>,
    /// Short-window ATR over long-window ATR; 1.0 is neutral.
    pub volatility_ratio: Vec<f64>,
    /// Annualized stddev of log returns, in percent.
    pub hist_volatility: Vec<f64>,
}

impl VolatilityColumns {
    pub fn compute(candles: &[Candle], config: &IndicatorConfig) -> Self {
        let mut columns = Self::default();
        let mut bb =
            BollingerBands::new(config.bollinger_period, config.bollinger_std_dev).unwrap();
        let mut atr = AverageTrueRange::new(config.atr_period).unwrap();
        let mut keltner =
            KeltnerChannel::new(config.keltner_period, config.keltner_atr_multiplier).unwrap();

        for (i, candle) in candles.iter().enumerate() {
            let close = candle.close;
            let item = data_item(candle);

            let bands = bb.next(close);
            columns.bb_middle.push(bands.average);
            columns.bb_upper.push(bands.upper);
            columns.bb_lower.push(bands.lower);
            let band_span = bands.upper - bands.lower;
            columns.bb_pct_b.push(if band_span > 0.0 {
                (close - bands.lower) / band_span
            } else {
                0.5
            });
            let width = if bands.average > 0.0 {
                band_span / bands.average
            } else {
                0.0
            };
            columns.bb_width.push(width);
            columns
                .bb_squeeze
                .push(width < rolling_quantile(&columns.bb_width, i, 50, 0.2));
            columns
                .bb_bandwidth_percentile
                .push(percent_rank(
                    &columns.bb_width,
                    i,
                    config.bandwidth_percentile_window,
                ));

            let atr_value = atr.next(&item);
            columns.atr.push(atr_value);
            let atr_percent = if close > 0.0 {
                atr_value / close * 100.0
            } else {
                0.0
            };
            columns.atr_percent.push(atr_percent);
            columns
                .volatility_bucket
                .push(VolatilityBucket::from_atr_percent(atr_percent));

            let kc = keltner.next(&item);
            columns.keltner_middle.push(kc.average);
            columns.keltner_upper.push(kc.upper);
            columns.keltner_lower.push(kc.lower);
        }

        compute_donchian(candles, config.donchian_period, &mut columns);
        columns.volatility_ratio = volatility_ratio(
            candles,
            config.volatility_ratio_short,
            config.volatility_ratio_long,
        );
        columns.hist_volatility = historical_volatility(
            candles,
            config.hist_volatility_period,
            config.hist_volatility_annualization,
        );
        columns
    }
}

/// Quantile of `values[..=i]` over a trailing window, by the nearest-rank
/// rule. Returns 0 for an empty window.
fn rolling_quantile(values: &[f64], i: usize, window: usize, q: f64) -> f64 {
    let start = (i + 1).saturating_sub(window);
    let mut slice: Vec<f64> = values[start..=i].to_vec();
    if slice.is_empty() {
        return 0.0;
    }
    slice.sort_by(f64::total_cmp);
    let rank = (q * (slice.len() - 1) as f64).floor() as usize;
    slice[rank]
}

/// Percent rank of values[i] within its trailing window, in [0, 100].
fn percent_rank(values: &[f64], i: usize, window: usize) -> f64 {
    let start = (i + 1).saturating_sub(window);
    let slice = &values[start..=i];
    let current = values[i];
    let below = slice.iter().filter(|v| **v <= current).count();
    below as f64 / slice.len() as f64 * 100.0
}

fn compute_donchian(candles: &[Candle], period: usize, columns: &mut VolatilityColumns) {
    for i in 0..candles.len() {
        let start = (i + 1).saturating_sub(period);
        let window = &candles[start..=i];
        let upper = window.iter().map(|c| c.high).fold(f64::MIN, f64::max);
        let lower = window.iter().map(|c| c.low).fold(f64::MAX, f64::min);
        columns.donchian_upper.push(upper);
        columns.donchian_lower.push(lower);
        columns.donchian_middle.push((upper + lower) / 2.0);
        // breakouts compare against the prior bar's channel
        if i == 0 {
            columns.donchian_breakout_up.push(false);
            columns.donchian_breakout_down.push(false);
        } else {
            columns
                .donchian_breakout_up
                .push(candles[i].close > columns.donchian_upper[i - 1]);
            columns
                .donchian_breakout_down
                .push(candles[i].close < columns.donchian_lower[i - 1]);
        }
    }
}

fn volatility_ratio(candles: &[Candle], short: usize, long: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(candles.len());
    let mut trs = Vec::with_capacity(candles.len());
    for i in 0..candles.len() {
        let tr = super::true_range(candles, i);
        trs.push(tr);
        let short_start = (i + 1).saturating_sub(short);
        let long_start = (i + 1).saturating_sub(long);
        let short_atr: f64 =
            trs[short_start..=i].iter().sum::<f64>() / (i + 1 - short_start) as f64;
        let long_atr: f64 = trs[long_start..=i].iter().sum::<f64>() / (i + 1 - long_start) as f64;
        out.push(if long_atr > 0.0 {
            short_atr / long_atr
        } else {
            1.0
        });
    }
    out
}

fn historical_volatility(candles: &[Candle], period: usize, annualization: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(candles.len());
    let mut log_returns: Vec<f64> = Vec::with_capacity(candles.len());
    for i in 0..candles.len() {
        if i == 0 || candles[i - 1].close <= 0.0 || candles[i].close <= 0.0 {
            log_returns.push(0.0);
        } else {
            log_returns.push((candles[i].close / candles[i - 1].close).ln());
        }
        let start = (i + 1).saturating_sub(period);
        let window = &log_returns[start..=i];
        if window.len() < 2 {
            out.push(0.0);
            continue;
        }
        let mean = window.iter().sum::<f64>() / window.len() as f64;
        let variance = window.iter().map(|r| (r - mean).powi(2)).sum::<f64>()
            / (window.len() - 1) as f64;
        out.push(variance.sqrt() * (annualization as f64).sqrt() * 100.0);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::indicators::test_support::{flat_series, series_from_closes};

    #[test]
    fn test_flat_series_neutral_bands() {
        let columns =
            VolatilityColumns::compute(&flat_series(100.0, 0.0, 60), &IndicatorConfig::default());
        let last = columns.bb_pct_b.len() - 1;
        assert!((columns.bb_pct_b[last] - 0.5).abs() < 1e-9);
        assert_eq!(columns.bb_width[last], 0.0);
        assert_eq!(columns.atr[last], 0.0);
        assert_eq!(columns.volatility_bucket[last], VolatilityBucket::Low);
        assert!((columns.volatility_ratio[last] - 1.0).abs() < 1e-9);
        assert_eq!(columns.hist_volatility[last], 0.0);
        assert!(!columns.donchian_breakout_up[last]);
    }

    #[test]
    fn test_pct_b_tracks_band_position() {
        let mut closes: Vec<f64> = (0..30).map(|_| 100.0).collect();
        closes.extend([101.0, 103.0, 106.0, 110.0]);
        let columns =
            VolatilityColumns::compute(&series_from_closes(&closes, 0.0), &IndicatorConfig::default());
        let last = columns.bb_pct_b.len() - 1;
        assert!(columns.bb_pct_b[last] > 0.8, "break upward should push %B high");
        assert!(columns.bb_upper[last] > columns.bb_lower[last]);
    }

    #[test]
    fn test_donchian_breakout_flags() {
        let mut closes: Vec<f64> = (0..25).map(|_| 100.0).collect();
        closes.push(110.0);
        let candles = series_from_closes(&closes, 0.0);
        let columns = VolatilityColumns::compute(&candles, &IndicatorConfig::default());
        let last = columns.donchian_breakout_up.len() - 1;
        // prior channel topped at 101 (flat bars span 99..101); close 110 breaks out
        assert!(columns.donchian_breakout_up[last]);
        assert!(!columns.donchian_breakout_down[last]);
    }

    #[test]
    fn test_bucket_thresholds() {
        assert_eq!(VolatilityBucket::from_atr_percent(0.2), VolatilityBucket::Low);
        assert_eq!(VolatilityBucket::from_atr_percent(0.7), VolatilityBucket::Normal);
        assert_eq!(VolatilityBucket::from_atr_percent(1.2), VolatilityBucket::High);
        assert_eq!(VolatilityBucket::from_atr_percent(2.4), VolatilityBucket::Extreme);
    }

    #[test]
    fn test_percentile_rank_bounds() {
        let closes: Vec<f64> = (0..80).map(|i| 100.0 + ((i * 7) % 13) as f64).collect();
        let columns =
            VolatilityColumns::compute(&series_from_closes(&closes, 0.0), &IndicatorConfig::default());
        for value in &columns.bb_bandwidth_percentile {
            assert!((0.0..=100.0).contains(value));
        }
    }
}
