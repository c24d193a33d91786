use super::{IndicatorConfig, true_range};
use crate::domain::market::Candle;
use serde::{Deserialize, Serialize};

/// ADX regime buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdxBucket {
    Weak,
    Moderate,
    Strong,
    VeryStrong,
}

impl AdxBucket {
    pub fn from_adx(adx: f64) -> Self {
        if adx < 20.0 {
            Self::Weak
        } else if adx < 40.0 {
            Self::Moderate
        } else if adx < 60.0 {
            Self::Strong
        } else {
            Self::VeryStrong
        }
    }
}

/// Trend indicators: ADX/DI, Supertrend, Ichimoku, Parabolic SAR, Aroon.
#[derive(Debug, Clone, Default)]
pub struct TrendColumns {
    pub adx: Vec<f64>,
    pub plus_di: Vec<f64>,
    pub minus_di: Vec<f64>,
    pub adx_bucket: Vec<AdxBucket>,
    /// +1 when +DI > -DI, -1 when below, 0 when equal.
    pub di_cross: Vec<i8>,
    pub supertrend: Vec<f64>,
    /// +1 up, -1 down, 0 while the true range is degenerate.
    pub supertrend_direction: Vec<i8>,
    pub tenkan_sen: Vec<f64>,
    pub kijun_sen: Vec<f64>,
    pub senkou_span_a: Vec<f64>,
    pub senkou_span_b: Vec<f64>,
    /// Close shifted 26 bars back; absent for the final bars.
    pub chikou_span: Vec<Option<f64>>,
    /// +1 when span A above span B, -1 below, 0 equal.
    pub cloud_direction: Vec<i8>,
    pub price_above_cloud: Vec<bool>,
    pub price_below_cloud: Vec<bool>,
    pub price_in_cloud: Vec<bool>,
    pub psar: Vec<f64>,
    pub psar_signal: Vec<i8>,
    pub aroon_up: Vec<f64>,
    pub aroon_down: Vec<f64>,
    pub aroon_osc: Vec<f64>,
    pub aroon_bull: Vec<bool>,
    pub aroon_bear: Vec<bool>,
}

impl Default for AdxBucket {
    fn default() -> Self {
        Self::Moderate
    }
}

impl TrendColumns {
    pub fn compute(candles: &[Candle], config: &IndicatorConfig) -> Self {
        let mut columns = Self::default();
        compute_adx(candles, config.adx_period, &mut columns);
        compute_supertrend(
            candles,
            config.supertrend_period,
            config.supertrend_multiplier,
            &mut columns,
        );
        compute_ichimoku(candles, &mut columns);
        compute_psar(
            candles,
            config.psar_acceleration,
            config.psar_maximum,
            &mut columns,
        );
        compute_aroon(candles, config.aroon_period, &mut columns);
        columns
    }

    /// Bar where the supertrend direction flipped relative to the previous
    /// bar: Some(+1) bullish flip, Some(-1) bearish flip.
    pub fn supertrend_flip(&self, i: usize) -> Option<i8> {
        if i == 0 {
            return None;
        }
        let prev = self.supertrend_direction[i - 1];
        let curr = self.supertrend_direction[i];
        if prev == -1 && curr == 1 {
            Some(1)
        } else if prev == 1 && curr == -1 {
            Some(-1)
        } else {
            None
        }
    }
}

/// Wilder smoothing (EMA with alpha = 1/period).
struct WilderEma {
    alpha: f64,
    value: Option<f64>,
}

impl WilderEma {
    fn new(period: usize) -> Self {
        Self {
            alpha: 1.0 / period as f64,
            value: None,
        }
    }

    fn next(&mut self, input: f64) -> f64 {
        let value = match self.value {
            Some(prev) => prev + self.alpha * (input - prev),
            None => input,
        };
        self.value = Some(value);
        value
    }
}

fn compute_adx(candles: &[Candle], period: usize, columns: &mut TrendColumns) {
    let mut tr_ema = WilderEma::new(period);
    let mut plus_ema = WilderEma::new(period);
    let mut minus_ema = WilderEma::new(period);
    let mut dx_ema = WilderEma::new(period);

    for i in 0..candles.len() {
        let (plus_dm, minus_dm) = if i == 0 {
            (0.0, 0.0)
        } else {
            let up_move = candles[i].high - candles[i - 1].high;
            let down_move = candles[i - 1].low - candles[i].low;
            (
                if up_move > down_move && up_move > 0.0 {
                    up_move
                } else {
                    0.0
                },
                if down_move > up_move && down_move > 0.0 {
                    down_move
                } else {
                    0.0
                },
            )
        };

        let smoothed_tr = tr_ema.next(true_range(candles, i));
        let smoothed_plus = plus_ema.next(plus_dm);
        let smoothed_minus = minus_ema.next(minus_dm);

        let (plus_di, minus_di) = if smoothed_tr > 0.0 {
            (
                100.0 * smoothed_plus / smoothed_tr,
                100.0 * smoothed_minus / smoothed_tr,
            )
        } else {
            (25.0, 25.0)
        };
        let dx = if plus_di + minus_di > 0.0 {
            100.0 * (plus_di - minus_di).abs() / (plus_di + minus_di)
        } else {
            0.0
        };
        let adx = dx_ema.next(dx);

        // short history falls back to the documented neutral regime
        if i < period {
            columns.adx.push(25.0);
            columns.plus_di.push(25.0);
            columns.minus_di.push(25.0);
            columns.adx_bucket.push(AdxBucket::Moderate);
            columns.di_cross.push(0);
        } else {
            columns.adx.push(adx);
            columns.plus_di.push(plus_di);
            columns.minus_di.push(minus_di);
            columns.adx_bucket.push(AdxBucket::from_adx(adx));
            columns.di_cross.push(if plus_di > minus_di {
                1
            } else if plus_di < minus_di {
                -1
            } else {
                0
            });
        }
    }
}

fn compute_supertrend(
    candles: &[Candle],
    period: usize,
    multiplier: f64,
    columns: &mut TrendColumns,
) {
    let mut tr_sum = 0.0;
    let mut trs: Vec<f64> = Vec::with_capacity(candles.len());
    for i in 0..candles.len() {
        let tr = true_range(candles, i);
        trs.push(tr);
        tr_sum += tr;
        if i >= period {
            tr_sum -= trs[i - period];
        }
        let atr = tr_sum / (i + 1).min(period) as f64;

        let hl2 = (candles[i].high + candles[i].low) / 2.0;
        let basic_upper = hl2 + multiplier * atr;
        let basic_lower = hl2 - multiplier * atr;

        if atr <= 0.0 {
            // degenerate range carries no trend information
            columns.supertrend.push(hl2);
            columns.supertrend_direction.push(0);
            continue;
        }
        let (prev_st, prev_dir) = match i {
            0 => (basic_lower, 1),
            _ => (
                columns.supertrend[i - 1],
                columns.supertrend_direction[i - 1],
            ),
        };
        let close = candles[i].close;
        let (st, dir) = if prev_dir == 0 {
            if close >= hl2 {
                (basic_lower, 1)
            } else {
                (basic_upper, -1)
            }
        } else if prev_st <= basic_upper && prev_dir == 1 {
            (basic_lower, 1)
        } else if prev_st >= basic_lower && prev_dir == -1 {
            (basic_upper, -1)
        } else if close <= prev_st && prev_dir == 1 {
            (basic_upper, -1)
        } else if close >= prev_st && prev_dir == -1 {
            (basic_lower, 1)
        } else {
            (prev_st, prev_dir)
        };
        columns.supertrend.push(st);
        columns.supertrend_direction.push(dir);
    }
}

fn rolling_high(candles: &[Candle], i: usize, window: usize) -> f64 {
    let start = (i + 1).saturating_sub(window);
    candles[start..=i]
        .iter()
        .map(|c| c.high)
        .fold(f64::MIN, f64::max)
}

fn rolling_low(candles: &[Candle], i: usize, window: usize) -> f64 {
    let start = (i + 1).saturating_sub(window);
    candles[start..=i]
        .iter()
        .map(|c| c.low)
        .fold(f64::MAX, f64::min)
}

fn compute_ichimoku(candles: &[Candle], columns: &mut TrendColumns) {
    const TENKAN: usize = 9;
    const KIJUN: usize = 26;
    const SENKOU_B: usize = 52;
    const SHIFT: usize = 26;

    let n = candles.len();
    let mut tenkan = Vec::with_capacity(n);
    let mut kijun = Vec::with_capacity(n);
    let mut senkou_b_raw = Vec::with_capacity(n);
    for i in 0..n {
        tenkan.push((rolling_high(candles, i, TENKAN) + rolling_low(candles, i, TENKAN)) / 2.0);
        kijun.push((rolling_high(candles, i, KIJUN) + rolling_low(candles, i, KIJUN)) / 2.0);
        senkou_b_raw
            .push((rolling_high(candles, i, SENKOU_B) + rolling_low(candles, i, SENKOU_B)) / 2.0);
    }

    for i in 0..n {
        let close = candles[i].close;
        // spans are shifted forward; before the shift is available the
        // cloud is treated as degenerate at the close
        let (span_a, span_b) = if i >= SHIFT {
            (
                (tenkan[i - SHIFT] + kijun[i - SHIFT]) / 2.0,
                senkou_b_raw[i - SHIFT],
            )
        } else {
            (close, close)
        };
        columns.tenkan_sen.push(tenkan[i]);
        columns.kijun_sen.push(kijun[i]);
        columns.senkou_span_a.push(span_a);
        columns.senkou_span_b.push(span_b);
        columns
            .chikou_span
            .push(candles.get(i + SHIFT).map(|c| c.close));
        columns.cloud_direction.push(if span_a > span_b {
            1
        } else if span_a < span_b {
            -1
        } else {
            0
        });
        let above = close > span_a.max(span_b);
        let below = close < span_a.min(span_b);
        columns.price_above_cloud.push(above);
        columns.price_below_cloud.push(below);
        columns.price_in_cloud.push(!above && !below);
    }
}

fn compute_psar(candles: &[Candle], acceleration: f64, maximum: f64, columns: &mut TrendColumns) {
    if candles.is_empty() {
        return;
    }
    let mut rising = true;
    let mut af = acceleration;
    let mut psar = candles[0].low;
    let mut extreme = candles[0].high;

    for i in 0..candles.len() {
        if i > 0 {
            psar += af * (extreme - psar);
            if rising {
                psar = psar.min(candles[i - 1].low);
                if i > 1 {
                    psar = psar.min(candles[i - 2].low);
                }
                if candles[i].low < psar {
                    rising = false;
                    psar = extreme;
                    extreme = candles[i].low;
                    af = acceleration;
                } else if candles[i].high > extreme {
                    extreme = candles[i].high;
                    af = (af + acceleration).min(maximum);
                }
            } else {
                psar = psar.max(candles[i - 1].high);
                if i > 1 {
                    psar = psar.max(candles[i - 2].high);
                }
                if candles[i].high > psar {
                    rising = true;
                    psar = extreme;
                    extreme = candles[i].high;
                    af = acceleration;
                } else if candles[i].low < extreme {
                    extreme = candles[i].low;
                    af = (af + acceleration).min(maximum);
                }
            }
        }
        columns.psar.push(psar);
        let close = candles[i].close;
        columns.psar_signal.push(if close > psar {
            1
        } else if close < psar {
            -1
        } else {
            0
        });
    }
}

fn compute_aroon(candles: &[Candle], period: usize, columns: &mut TrendColumns) {
    for i in 0..candles.len() {
        if i < period {
            columns.aroon_up.push(50.0);
            columns.aroon_down.push(50.0);
            columns.aroon_osc.push(0.0);
            columns.aroon_bull.push(false);
            columns.aroon_bear.push(false);
            continue;
        }
        let window = &candles[i - period..=i];
        let mut high_offset = 0usize;
        let mut low_offset = 0usize;
        let mut high = f64::MIN;
        let mut low = f64::MAX;
        for (offset, candle) in window.iter().enumerate() {
            if candle.high >= high {
                high = candle.high;
                high_offset = offset;
            }
            if candle.low <= low {
                low = candle.low;
                low_offset = offset;
            }
        }
        let up = high_offset as f64 / period as f64 * 100.0;
        let down = low_offset as f64 / period as f64 * 100.0;
        columns.aroon_up.push(up);
        columns.aroon_down.push(down);
        columns.aroon_osc.push(up - down);
        columns.aroon_bull.push(up > 70.0 && down < 30.0);
        columns.aroon_bear.push(down > 70.0 && up < 30.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::indicators::test_support::{flat_series, series_from_closes};

    #[test]
    fn test_flat_series_is_directionless() {
        let columns = TrendColumns::compute(&flat_series(100.0, 0.0, 60), &IndicatorConfig::default());
        let last = columns.adx.len() - 1;
        assert_eq!(columns.supertrend_direction[last], 0);
        assert_eq!(columns.cloud_direction[last], 0);
        assert_eq!(columns.psar_signal[last], 0);
        assert_eq!(columns.di_cross[14], 0);
    }

    #[test]
    fn test_adx_neutral_during_warmup() {
        let columns = TrendColumns::compute(
            &series_from_closes(&[100.0, 101.0, 102.0], 0.0),
            &IndicatorConfig::default(),
        );
        assert_eq!(columns.adx, vec![25.0, 25.0, 25.0]);
        assert_eq!(columns.adx_bucket[0], AdxBucket::Moderate);
    }

    #[test]
    fn test_uptrend_dominates_directionals() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + 2.0 * i as f64).collect();
        let columns =
            TrendColumns::compute(&series_from_closes(&closes, 0.0), &IndicatorConfig::default());
        let last = columns.adx.len() - 1;
        assert_eq!(columns.supertrend_direction[last], 1);
        assert!(columns.plus_di[last] > columns.minus_di[last]);
        assert_eq!(columns.di_cross[last], 1);
        assert_eq!(columns.psar_signal[last], 1);
        assert!(columns.aroon_up[last] > columns.aroon_down[last]);
        assert!(columns.price_above_cloud[last]);
    }

    #[test]
    fn test_supertrend_flip_on_reversal() {
        let mut closes: Vec<f64> = (0..40).map(|i| 100.0 + 2.0 * i as f64).collect();
        closes.extend((0..20).map(|i| 178.0 - 8.0 * i as f64));
        let columns =
            TrendColumns::compute(&series_from_closes(&closes, 0.0), &IndicatorConfig::default());
        let flipped = (1..closes.len()).any(|i| columns.supertrend_flip(i) == Some(-1));
        assert!(flipped, "expected a bearish supertrend flip after reversal");
        assert_eq!(*columns.supertrend_direction.last().unwrap(), -1);
    }

    #[test]
    fn test_aroon_bounds() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + ((i * 13) % 17) as f64).collect();
        let columns =
            TrendColumns::compute(&series_from_closes(&closes, 0.0), &IndicatorConfig::default());
        for i in 0..closes.len() {
            assert!((0.0..=100.0).contains(&columns.aroon_up[i]));
            assert!((0.0..=100.0).contains(&columns.aroon_down[i]));
        }
    }

    #[test]
    fn test_chikou_is_future_close() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let columns =
            TrendColumns::compute(&series_from_closes(&closes, 0.0), &IndicatorConfig::default());
        assert_eq!(columns.chikou_span[0], Some(closes[26]));
        assert_eq!(columns.chikou_span[20], None);
    }
}
