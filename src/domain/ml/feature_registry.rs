use serde::{Deserialize, Serialize};

/// Inputs the classifier was trained on, assembled from the indicator
/// frame and pattern marks of the latest bar.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureSet {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub bullish_pattern: bool,
    pub bearish_pattern: bool,
    pub rsi: f64,
    pub macd: f64,
    pub macd_signal: f64,
    pub volume: Option<f64>,
    pub vwap: Option<f64>,
    pub supertrend_direction: Option<i8>,
    pub atr: Option<f64>,
}

/// Flattens a feature set into the fixed training order:
/// open, high, low, close, bullish_pattern, bearish_pattern, rsi, macd,
/// macd_signal, then volume / vwap / supertrend_direction / atr for those
/// that are present. The model artifact and this function must agree; a
/// reordering here is a silent model-contract break.
pub fn features_to_vector(fs: &FeatureSet) -> Vec<f64> {
    let mut row = vec![
        fs.open,
        fs.high,
        fs.low,
        fs.close,
        if fs.bullish_pattern { 1.0 } else { 0.0 },
        if fs.bearish_pattern { 1.0 } else { 0.0 },
        fs.rsi,
        fs.macd,
        fs.macd_signal,
    ];
    if let Some(volume) = fs.volume {
        row.push(volume);
    }
    if let Some(vwap) = fs.vwap {
        row.push(vwap);
    }
    if let Some(direction) = fs.supertrend_direction {
        row.push(direction as f64);
    }
    if let Some(atr) = fs.atr {
        row.push(atr);
    }
    row
}
