use super::IndicatorFrame;
use crate::domain::trading::{Signal, SignalKind, SignalSource};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Multi-indicator trend vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendDirection {
    Uptrend,
    Downtrend,
    Sideways,
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uptrend => write!(f, "UPTREND"),
            Self::Downtrend => write!(f, "DOWNTREND"),
            Self::Sideways => write!(f, "SIDEWAYS"),
        }
    }
}

/// Accumulates weighted bullish and bearish points over MA ordering, RSI
/// zones, MACD state, %B, Supertrend, VWAP, ADX regime, volume-spike and
/// delivery direction. Strength is `max(bull, bear) / total`; ties vote
/// SIDEWAYS at 0.5.
pub fn get_trend_strength(frame: &IndicatorFrame) -> (TrendDirection, f64) {
    if frame.is_empty() {
        return (TrendDirection::Sideways, 0.5);
    }
    let i = frame.last_index();
    let candle = &frame.candles[i];
    let close = candle.close;

    let mut bullish: f64 = 0.0;
    let mut bearish: f64 = 0.0;
    let mut total: f64 = 0.0;

    // 1. Moving-average ordering
    let sma_20 = frame.ma.sma_20[i];
    let sma_50 = frame.ma.sma_50[i];
    total += 3.0;
    if close > sma_20 && sma_20 > sma_50 {
        bullish += 3.0;
    } else if close > sma_20 && sma_20 < sma_50 {
        bullish += 1.0;
    } else if close < sma_20 && sma_20 < sma_50 {
        bearish += 3.0;
    } else if close < sma_20 && sma_20 > sma_50 {
        bearish += 1.0;
    }

    // 2. RSI zones
    let rsi = frame.momentum.rsi[i];
    total += 2.0;
    if rsi > 60.0 {
        bullish += 2.0;
    } else if rsi < 40.0 {
        bearish += 2.0;
    } else if rsi > 50.0 {
        bullish += 1.0;
    } else if rsi < 50.0 {
        bearish += 1.0;
    }

    // 3. MACD state
    let macd = frame.momentum.macd[i];
    let macd_signal = frame.momentum.macd_signal[i];
    total += 2.0;
    if macd > macd_signal && macd > 0.0 {
        bullish += 2.0;
    } else if macd > macd_signal && macd < 0.0 {
        bullish += 1.0;
    } else if macd < macd_signal && macd < 0.0 {
        bearish += 2.0;
    } else if macd < macd_signal && macd > 0.0 {
        bearish += 1.0;
    }

    // 4. Bollinger %B
    let pct_b = frame.volatility.bb_pct_b[i];
    total += 2.0;
    if pct_b > 0.8 {
        bullish += 2.0;
    } else if pct_b < 0.2 {
        bearish += 2.0;
    } else if pct_b > 0.5 {
        bullish += 1.0;
    } else if pct_b < 0.5 {
        bearish += 1.0;
    }

    // 5. Supertrend direction
    total += 3.0;
    match frame.trend.supertrend_direction[i] {
        1 => bullish += 3.0,
        -1 => bearish += 3.0,
        _ => {}
    }

    // 6. Price vs VWAP
    let vwap = frame.volume.vwap[i];
    total += 1.0;
    if close > vwap {
        bullish += 1.0;
    } else if close < vwap {
        bearish += 1.0;
    }

    // 7. ADX regime with DI dominance
    total += 2.0;
    if frame.trend.adx[i] > 25.0 {
        if frame.trend.plus_di[i] > frame.trend.minus_di[i] {
            bullish += 2.0;
        } else if frame.trend.minus_di[i] > frame.trend.plus_di[i] {
            bearish += 2.0;
        }
    }

    // 8. Volume spike in the bar's direction
    if frame.volume.volume_spike[i] {
        total += 2.0;
        if candle.is_bullish() {
            bullish += 2.0;
        } else if candle.is_bearish() {
            bearish += 2.0;
        }
    }

    // 9. Delivery conviction (only with real delivery data)
    if !frame.volume.delivery_approximate && frame.volume.high_delivery[i] {
        total += 2.0;
        if candle.is_bullish() {
            bullish += 2.0;
        } else if candle.is_bearish() {
            bearish += 2.0;
        }
    }

    if total == 0.0 || bullish == bearish {
        return (TrendDirection::Sideways, 0.5);
    }
    if bullish > bearish {
        (TrendDirection::Uptrend, (bullish / total).min(1.0))
    } else {
        (TrendDirection::Downtrend, (bearish / total).min(1.0))
    }
}

/// Crossover / extreme / volume signals over the latest two bars, gated by
/// the trend vote. Confidence is `min(0.5 + |Δ| / 10 + strength, 0.95)`.
pub fn get_indicator_signals(frame: &IndicatorFrame) -> Signal {
    if frame.len() < 2 {
        return Signal::wait(SignalSource::Indicators, "Insufficient candle history");
    }
    let i = frame.last_index();
    let prev = i - 1;
    let candle = &frame.candles[i];
    let (trend, strength) = get_trend_strength(frame);

    let mut bullish: Vec<&str> = Vec::new();
    let mut bearish: Vec<&str> = Vec::new();

    if frame.ma.ema_9[prev] <= frame.ma.ema_20[prev] && frame.ma.ema_9[i] > frame.ma.ema_20[i] {
        bullish.push("EMA 9-20 Bullish Crossover");
    } else if frame.ma.ema_9[prev] >= frame.ma.ema_20[prev]
        && frame.ma.ema_9[i] < frame.ma.ema_20[i]
    {
        bearish.push("EMA 9-20 Bearish Crossover");
    }

    let rsi = frame.momentum.rsi[i];
    if rsi < 30.0 {
        bullish.push("RSI Oversold");
    } else if rsi > 70.0 {
        bearish.push("RSI Overbought");
    }

    if frame.momentum.macd[prev] <= frame.momentum.macd_signal[prev]
        && frame.momentum.macd[i] > frame.momentum.macd_signal[i]
    {
        bullish.push("MACD Bullish Crossover");
    } else if frame.momentum.macd[prev] >= frame.momentum.macd_signal[prev]
        && frame.momentum.macd[i] < frame.momentum.macd_signal[i]
    {
        bearish.push("MACD Bearish Crossover");
    }

    if candle.close < frame.volatility.bb_lower[i] {
        bullish.push("Price Below Lower Bollinger Band");
    } else if candle.close > frame.volatility.bb_upper[i] {
        bearish.push("Price Above Upper Bollinger Band");
    }

    match frame.trend.supertrend_flip(i) {
        Some(1) => bullish.push("Supertrend Bullish Flip"),
        Some(-1) => bearish.push("Supertrend Bearish Flip"),
        _ => {}
    }

    let prev_candle = &frame.candles[prev];
    if prev_candle.close < frame.volume.vwap[prev] && candle.close > frame.volume.vwap[i] {
        bullish.push("Price Crossed Above VWAP");
    } else if prev_candle.close > frame.volume.vwap[prev] && candle.close < frame.volume.vwap[i] {
        bearish.push("Price Crossed Below VWAP");
    }

    if frame.volume.volume_spike[i] {
        if candle.is_bullish() {
            bullish.push("Bullish Volume Spike");
        } else if candle.is_bearish() {
            bearish.push("Bearish Volume Spike");
        }
        if frame.volume.ultra_high_volume[i] && candle.is_bullish() {
            bullish.push("Ultra-High Volume Bullish");
        }
    }

    if !frame.volume.delivery_approximate && frame.volume.high_delivery[i] {
        if candle.is_bullish() {
            bullish.push("High Delivery Bullish");
        } else if candle.is_bearish() {
            bearish.push("High Delivery Bearish");
        }
    }

    let delta = bullish.len().abs_diff(bearish.len()) as f64;
    let confidence = (0.5 + delta / 10.0 + strength).min(0.95);

    if bullish.len() > bearish.len() && trend == TrendDirection::Uptrend {
        let reason = bullish[..bullish.len().min(3)].join(", ");
        Signal::new(SignalKind::BuyCall, confidence, SignalSource::Indicators, reason)
    } else if bearish.len() > bullish.len() && trend == TrendDirection::Downtrend {
        let reason = bearish[..bearish.len().min(3)].join(", ");
        Signal::new(SignalKind::BuyPut, confidence, SignalSource::Indicators, reason)
    } else {
        Signal::wait(
            SignalSource::Indicators,
            format!("Mixed signals in {} market", trend.to_string().to_lowercase()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::indicators::test_support::{flat_series, series_from_closes};
    use crate::application::indicators::{IndicatorConfig, IndicatorFrame};

    fn build(closes: &[f64], volume: f64) -> IndicatorFrame {
        IndicatorFrame::build(series_from_closes(closes, volume), &IndicatorConfig::default())
    }

    #[test]
    fn test_flat_series_is_sideways_and_waits() {
        let frame =
            IndicatorFrame::build(flat_series(100.0, 1000.0, 60), &IndicatorConfig::default());
        let (trend, strength) = get_trend_strength(&frame);
        assert_eq!(trend, TrendDirection::Sideways);
        assert_eq!(strength, 0.5);

        let signal = get_indicator_signals(&frame);
        assert_eq!(signal.kind, SignalKind::Wait);
        assert_eq!(signal.confidence, 0.5);
    }

    #[test]
    fn test_steady_rally_votes_uptrend() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + 1.5 * i as f64).collect();
        let frame = build(&closes, 1000.0);
        let (trend, strength) = get_trend_strength(&frame);
        assert_eq!(trend, TrendDirection::Uptrend);
        assert!(strength > 0.6, "strength was {strength}");
    }

    #[test]
    fn test_steady_decline_votes_downtrend() {
        let closes: Vec<f64> = (0..60).map(|i| 200.0 - 1.5 * i as f64).collect();
        let frame = build(&closes, 1000.0);
        let (trend, strength) = get_trend_strength(&frame);
        assert_eq!(trend, TrendDirection::Downtrend);
        assert!(strength > 0.6);
    }

    #[test]
    fn test_confidence_is_capped() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + 2.0 * i as f64).collect();
        let frame = build(&closes, 1000.0);
        let signal = get_indicator_signals(&frame);
        assert!(signal.confidence <= 0.95);
    }
}
