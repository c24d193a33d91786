use super::{IndicatorConfig, rolling_mean};
use crate::domain::market::Candle;
use ta::Next;
use ta::indicators::{ExponentialMovingAverage, OnBalanceVolume};

/// Volume analytics: VWAP, OBV, volume profile, relative volume, MFI and
/// delivery-percentage analysis.
#[derive(Debug, Clone, Default)]
pub struct VolumeColumns {
    pub vwap: Vec<f64>,
    pub price_to_vwap: Vec<f64>,
    pub price_above_vwap: Vec<bool>,
    pub obv: Vec<f64>,
    pub obv_ema: Vec<f64>,
    pub obv_bullish_div: Vec<bool>,
    pub obv_bearish_div: Vec<bool>,
    pub volume_sma_short: Vec<f64>,
    pub volume_sma_long: Vec<f64>,
    /// Volume over its long SMA; 1.0 is neutral.
    pub relative_volume: Vec<f64>,
    pub volume_spike: Vec<bool>,
    pub ultra_high_volume: Vec<bool>,
    pub mfi: Vec<f64>,
    /// Center prices of the top-3 volume zones, highest volume first.
    pub volume_profile_levels: Vec<f64>,
    pub delivery_pct: Vec<f64>,
    pub delivery_volume: Vec<f64>,
    pub high_delivery: Vec<bool>,
    pub low_delivery: Vec<bool>,
    pub delivery_trend_up: Vec<bool>,
    /// True when the 50% delivery stub was used instead of exchange data.
    pub delivery_approximate: bool,
}

impl VolumeColumns {
    pub fn compute(candles: &[Candle], config: &IndicatorConfig) -> Self {
        let mut columns = Self::default();
        compute_vwap(candles, config.vwap_daily_reset, &mut columns);
        compute_obv(candles, config.obv_ema_period, &mut columns);
        compute_relative_volume(candles, config, &mut columns);
        columns.mfi = money_flow_index(candles, config.mfi_period);
        columns.volume_profile_levels = volume_profile(candles, config.volume_profile_zones);
        compute_delivery(candles, config, &mut columns);
        columns
    }
}

fn compute_vwap(candles: &[Candle], daily_reset: bool, columns: &mut VolumeColumns) {
    let mut tp_volume_sum = 0.0;
    let mut volume_sum = 0.0;
    let mut current_day = None;
    for candle in candles {
        let day = candle.timestamp.date();
        if daily_reset && current_day != Some(day) {
            current_day = Some(day);
            tp_volume_sum = 0.0;
            volume_sum = 0.0;
        }
        tp_volume_sum += candle.typical_price() * candle.volume;
        volume_sum += candle.volume;
        let vwap = if volume_sum > 0.0 {
            tp_volume_sum / volume_sum
        } else {
            candle.close
        };
        columns.vwap.push(vwap);
        columns
            .price_to_vwap
            .push(if vwap > 0.0 { candle.close / vwap } else { 1.0 });
        columns.price_above_vwap.push(candle.close > vwap);
    }
}

fn compute_obv(candles: &[Candle], ema_period: usize, columns: &mut VolumeColumns) {
    let mut obv = OnBalanceVolume::new();
    let mut obv_ema = ExponentialMovingAverage::new(ema_period).unwrap();
    for (i, candle) in candles.iter().enumerate() {
        let value = obv.next(&super::data_item(candle));
        columns.obv.push(value);
        columns.obv_ema.push(obv_ema.next(value));
        if i == 0 {
            columns.obv_bullish_div.push(false);
            columns.obv_bearish_div.push(false);
        } else {
            let price_up = candle.close > candles[i - 1].close;
            let obv_up = value > columns.obv[i - 1];
            columns.obv_bullish_div.push(!price_up && obv_up);
            columns.obv_bearish_div.push(price_up && !obv_up);
        }
    }
}

fn compute_relative_volume(
    candles: &[Candle],
    config: &IndicatorConfig,
    columns: &mut VolumeColumns,
) {
    let volumes: Vec<f64> = candles.iter().map(|c| c.volume).collect();
    columns.volume_sma_short = rolling_mean(&volumes, config.volume_sma_short);
    columns.volume_sma_long = rolling_mean(&volumes, config.volume_sma_long);
    for i in 0..volumes.len() {
        let base = columns.volume_sma_long[i];
        let relative = if base > 0.0 { volumes[i] / base } else { 1.0 };
        columns.relative_volume.push(relative);
        columns
            .volume_spike
            .push(base > 0.0 && volumes[i] > base * config.volume_spike_multiplier);
        columns
            .ultra_high_volume
            .push(base > 0.0 && volumes[i] > base * config.ultra_volume_multiplier);
    }
}

/// Volume-weighted RSI analogue over typical price; 50 while flows are
/// balanced or absent.
fn money_flow_index(candles: &[Candle], period: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(candles.len());
    let mut positive: Vec<f64> = Vec::with_capacity(candles.len());
    let mut negative: Vec<f64> = Vec::with_capacity(candles.len());
    for i in 0..candles.len() {
        let raw_flow = candles[i].typical_price() * candles[i].volume;
        if i == 0 {
            positive.push(0.0);
            negative.push(0.0);
        } else {
            let prev_tp = candles[i - 1].typical_price();
            let tp = candles[i].typical_price();
            positive.push(if tp > prev_tp { raw_flow } else { 0.0 });
            negative.push(if tp < prev_tp { raw_flow } else { 0.0 });
        }
        let start = (i + 1).saturating_sub(period);
        let positive_sum: f64 = positive[start..=i].iter().sum();
        let negative_sum: f64 = negative[start..=i].iter().sum();
        let total = positive_sum + negative_sum;
        out.push(if total > 0.0 {
            100.0 * positive_sum / total
        } else {
            50.0
        });
    }
    out
}

/// Bins closes into price zones and returns the centers of the top-k
/// zones by traded volume (k = 3), highest first.
fn volume_profile(candles: &[Candle], zones: usize) -> Vec<f64> {
    if candles.is_empty() || zones == 0 {
        return Vec::new();
    }
    let price_min = candles.iter().map(|c| c.low).fold(f64::MAX, f64::min);
    let price_max = candles.iter().map(|c| c.high).fold(f64::MIN, f64::max);
    let span = price_max - price_min;
    if span <= 0.0 {
        return vec![price_min];
    }
    let zone_size = span / zones as f64;
    let mut volume_by_zone = vec![0.0; zones];
    for candle in candles {
        let zone = (((candle.close - price_min) / zone_size) as usize).min(zones - 1);
        volume_by_zone[zone] += candle.volume;
    }
    let mut ranked: Vec<(usize, f64)> = volume_by_zone.into_iter().enumerate().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked
        .into_iter()
        .take(3)
        .filter(|(_, volume)| *volume > 0.0)
        .map(|(zone, _)| price_min + (zone as f64 + 0.5) * zone_size)
        .collect()
}

fn compute_delivery(candles: &[Candle], config: &IndicatorConfig, columns: &mut VolumeColumns) {
    let supplied = config
        .delivery_series
        .as_ref()
        .filter(|series| series.len() == candles.len());
    columns.delivery_approximate = supplied.is_none();
    let delivery: Vec<f64> = match supplied {
        Some(series) => series.clone(),
        None => vec![50.0; candles.len()],
    };
    let sma5 = rolling_mean(&delivery, 5);
    for i in 0..candles.len() {
        columns.delivery_pct.push(delivery[i]);
        columns
            .delivery_volume
            .push(candles[i].volume * delivery[i] / 100.0);
        columns.high_delivery.push(delivery[i] > 60.0);
        columns.low_delivery.push(delivery[i] < 40.0);
        columns.delivery_trend_up.push(delivery[i] > sma5[i]);
    }
}
