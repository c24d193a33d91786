use super::{IndicatorConfig, data_item, rolling_mean};
use crate::domain::market::Candle;
use ta::Next;
use ta::indicators::{
    CommodityChannelIndex, MovingAverageConvergenceDivergence, RelativeStrengthIndex,
};

/// Momentum oscillators: RSI, MACD, Stochastic, CCI, Williams %R and the
/// raw momentum ratio.
#[derive(Debug, Clone, Default)]
pub struct MomentumColumns {
    pub rsi: Vec<f64>,
    pub macd: Vec<f64>,
    pub macd_signal: Vec<f64>,
    pub macd_hist: Vec<f64>,
    /// +1 when MACD > signal, else -1.
    pub macd_cross: Vec<i8>,
    pub stoch_k: Vec<f64>,
    pub stoch_d: Vec<f64>,
    pub cci: Vec<f64>,
    pub williams_r: Vec<f64>,
    /// close / close[n-period] · 100; 100 is neutral.
    pub momentum: Vec<f64>,
}

impl MomentumColumns {
    pub fn compute(candles: &[Candle], config: &IndicatorConfig) -> Self {
        let mut columns = Self::default();
        let mut rsi = RelativeStrengthIndex::new(config.rsi_period).unwrap();
        let mut macd = MovingAverageConvergenceDivergence::new(
            config.macd_fast,
            config.macd_slow,
            config.macd_signal,
        )
        .unwrap();
        let mut cci = CommodityChannelIndex::new(config.cci_period).unwrap();

        for candle in candles {
            let close = candle.close;
            columns.rsi.push(rsi.next(close));

            let macd_out = macd.next(close);
            columns.macd.push(macd_out.macd);
            columns.macd_signal.push(macd_out.signal);
            columns.macd_hist.push(macd_out.histogram);
            columns
                .macd_cross
                .push(if macd_out.macd > macd_out.signal { 1 } else { -1 });

            let cci_value = cci.next(&data_item(candle));
            columns
                .cci
                .push(if cci_value.is_finite() { cci_value } else { 0.0 });
        }

        let (stoch_k, stoch_d) = stochastic(
            candles,
            config.stochastic_period,
            config.stochastic_smooth,
            config.stochastic_d,
        );
        columns.stoch_k = stoch_k;
        columns.stoch_d = stoch_d;
        columns.williams_r = williams_r(candles, config.williams_period);
        columns.momentum = momentum_ratio(candles, config.momentum_period);
        columns
    }
}

/// %K over the rolling high/low range with SMA slowing, %D as SMA of %K.
/// 50 is the neutral value while the range is degenerate.
fn stochastic(
    candles: &[Candle],
    period: usize,
    smooth: usize,
    d_period: usize,
) -> (Vec<f64>, Vec<f64>) {
    let mut raw_k = Vec::with_capacity(candles.len());
    for i in 0..candles.len() {
        let start = (i + 1).saturating_sub(period);
        let window = &candles[start..=i];
        let high = window.iter().map(|c| c.high).fold(f64::MIN, f64::max);
        let low = window.iter().map(|c| c.low).fold(f64::MAX, f64::min);
        if high > low {
            raw_k.push(100.0 * (candles[i].close - low) / (high - low));
        } else {
            raw_k.push(50.0);
        }
    }
    let k = if smooth > 1 {
        rolling_mean(&raw_k, smooth)
    } else {
        raw_k
    };
    let d = rolling_mean(&k, d_period);
    (k, d)
}

/// Williams %R in [-100, 0]; -50 is the neutral value.
fn williams_r(candles: &[Candle], period: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(candles.len());
    for i in 0..candles.len() {
        let start = (i + 1).saturating_sub(period);
        let window = &candles[start..=i];
        let high = window.iter().map(|c| c.high).fold(f64::MIN, f64::max);
        let low = window.iter().map(|c| c.low).fold(f64::MAX, f64::min);
        if high > low {
            out.push(-100.0 * (high - candles[i].close) / (high - low));
        } else {
            out.push(-50.0);
        }
    }
    out
}

fn momentum_ratio(candles: &[Candle], period: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(candles.len());
    for i in 0..candles.len() {
        if i >= period && candles[i - period].close > 0.0 {
            out.push(candles[i].close / candles[i - period].close * 100.0);
        } else {
            out.push(100.0);
        }
    }
    out
}
