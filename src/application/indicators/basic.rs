use crate::domain::market::Candle;
use ta::Next;
use ta::indicators::{ExponentialMovingAverage, SimpleMovingAverage};

/// Simple and exponential moving averages over close, with the EMA 9/20
/// crossover label and price/SMA ratios.
#[derive(Debug, Clone, Default)]
pub struct MovingAverageColumns {
    pub sma_9: Vec<f64>,
    pub sma_20: Vec<f64>,
    pub sma_50: Vec<f64>,
    pub sma_200: Vec<f64>,
    pub ema_9: Vec<f64>,
    pub ema_20: Vec<f64>,
    pub ema_50: Vec<f64>,
    pub ema_200: Vec<f64>,
    /// +1 when EMA9 > EMA20, else -1.
    pub ma_cross_9_20: Vec<i8>,
    pub price_to_sma_20: Vec<f64>,
    pub price_to_sma_50: Vec<f64>,
}

impl MovingAverageColumns {
    pub fn compute(candles: &[Candle]) -> Self {
        let mut columns = Self::default();
        let mut sma_9 = SimpleMovingAverage::new(9).unwrap();
        let mut sma_20 = SimpleMovingAverage::new(20).unwrap();
        let mut sma_50 = SimpleMovingAverage::new(50).unwrap();
        let mut sma_200 = SimpleMovingAverage::new(200).unwrap();
        let mut ema_9 = ExponentialMovingAverage::new(9).unwrap();
        let mut ema_20 = ExponentialMovingAverage::new(20).unwrap();
        let mut ema_50 = ExponentialMovingAverage::new(50).unwrap();
        let mut ema_200 = ExponentialMovingAverage::new(200).unwrap();

        for candle in candles {
            let close = candle.close;
            let s20 = sma_20.next(close);
            let s50 = sma_50.next(close);
            let e9 = ema_9.next(close);
            let e20 = ema_20.next(close);

            columns.sma_9.push(sma_9.next(close));
            columns.sma_20.push(s20);
            columns.sma_50.push(s50);
            columns.sma_200.push(sma_200.next(close));
            columns.ema_9.push(e9);
            columns.ema_20.push(e20);
            columns.ema_50.push(ema_50.next(close));
            columns.ema_200.push(ema_200.next(close));
            columns.ma_cross_9_20.push(if e9 > e20 { 1 } else { -1 });
            columns
                .price_to_sma_20
                .push(if s20 > 0.0 { close / s20 } else { 1.0 });
            columns
                .price_to_sma_50
                .push(if s50 > 0.0 { close / s50 } else { 1.0 });
        }
        columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::indicators::test_support::{flat_series, series_from_closes};

    #[test]
    fn test_flat_series_mas_equal_price() {
        let columns = MovingAverageColumns::compute(&flat_series(100.0, 0.0, 30));
        let last = columns.sma_20.len() - 1;
        assert!((columns.sma_20[last] - 100.0).abs() < 1e-9);
        assert!((columns.ema_9[last] - 100.0).abs() < 1e-9);
        assert!((columns.price_to_sma_20[last] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_crossover_label_flips_with_momentum() {
        // 30 falling closes keep EMA9 under EMA20; a sharp rally flips it
        let mut closes: Vec<f64> = (0..30).map(|i| 200.0 - i as f64).collect();
        closes.extend((0..10).map(|i| 171.0 + 5.0 * i as f64));
        let columns = MovingAverageColumns::compute(&series_from_closes(&closes, 0.0));
        assert_eq!(columns.ma_cross_9_20[29], -1);
        assert_eq!(*columns.ma_cross_9_20.last().unwrap(), 1);
    }
}
