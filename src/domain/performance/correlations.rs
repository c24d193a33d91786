use crate::domain::trading::TradeRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aggregated outcome for one bucket of trades (an index, a signal kind,
/// a month, a pattern label, ...).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BucketOutcome {
    pub trades: usize,
    pub wins: usize,
    pub total_pnl: f64,
}

impl BucketOutcome {
    pub fn add(&mut self, pnl: f64) {
        self.trades += 1;
        if pnl > 0.0 {
            self.wins += 1;
        }
        self.total_pnl += pnl;
    }

    pub fn win_rate(&self) -> f64 {
        if self.trades == 0 {
            0.0
        } else {
            self.wins as f64 / self.trades as f64
        }
    }

    pub fn avg_pnl(&self) -> f64 {
        if self.trades == 0 {
            0.0
        } else {
            self.total_pnl / self.trades as f64
        }
    }

    /// win_rate · avg_pnl, the pattern-effectiveness score.
    pub fn effectiveness(&self) -> f64 {
        self.win_rate() * self.avg_pnl()
    }
}

/// Psychology-vs-outcome correlation buckets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PsychologyCorrelation {
    pub by_sentiment: BTreeMap<String, BucketOutcome>,
    pub by_contrarian_bias: BTreeMap<String, BucketOutcome>,
    pub by_fear_greed_band: BTreeMap<String, BucketOutcome>,
}

fn fear_greed_band(score: f64) -> &'static str {
    if score < 10.0 {
        "Extreme Fear (0-10)"
    } else if score < 30.0 {
        "Fear (10-30)"
    } else if score < 70.0 {
        "Neutral (30-70)"
    } else if score < 90.0 {
        "Greed (70-90)"
    } else {
        "Extreme Greed (90-100)"
    }
}

/// Per-pattern outcomes plus the effectiveness ranking. Trades without
/// pattern context count under "No Pattern".
pub fn compute_pattern_effectiveness(
    closed: &[&TradeRecord],
) -> (BTreeMap<String, f64>, BTreeMap<String, BucketOutcome>) {
    let mut performance: BTreeMap<String, BucketOutcome> = BTreeMap::new();
    for trade in closed {
        let pnl = trade.pnl_f64();
        if trade.patterns_detected.is_empty() {
            performance.entry("No Pattern".to_string()).or_default().add(pnl);
        } else {
            for pattern in &trade.patterns_detected {
                performance.entry(pattern.clone()).or_default().add(pnl);
            }
        }
    }
    let effectiveness = performance
        .iter()
        .map(|(label, outcome)| (label.clone(), outcome.effectiveness()))
        .collect();
    (effectiveness, performance)
}

/// Sentiment / contrarian / fear-greed-band outcome buckets over trades
/// that carry a psychology snapshot.
pub fn compute_psychology_correlation(closed: &[&TradeRecord]) -> PsychologyCorrelation {
    let mut correlation = PsychologyCorrelation::default();
    for trade in closed {
        let Some(psych) = &trade.psychology else {
            continue;
        };
        let pnl = trade.pnl_f64();
        correlation
            .by_sentiment
            .entry(psych.sentiment.clone())
            .or_default()
            .add(pnl);
        correlation
            .by_contrarian_bias
            .entry(psych.contrarian_bias.clone())
            .or_default()
            .add(pnl);
        correlation
            .by_fear_greed_band
            .entry(fear_greed_band(psych.fear_greed_score).to_string())
            .or_default()
            .add(pnl);
    }
    correlation
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::MarketIndex;
    use crate::domain::trading::{PsychologySnapshot, SignalKind, TradeStatus};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn trade(pnl: f64, patterns: Vec<&str>, psych: Option<PsychologySnapshot>) -> TradeRecord {
        let t = NaiveDate::from_ymd_opt(2025, 1, 2)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        TradeRecord {
            trade_id: "T".into(),
            index: MarketIndex::Nifty,
            signal: SignalKind::BuyCall,
            entry_time: t,
            entry_price: dec!(100),
            quantity: 50,
            strike: 22500.0,
            expiry: "2025-01-09".into(),
            status: TradeStatus::Closed,
            log_time: t,
            exit_time: Some(t),
            exit_price: Some(dec!(100)),
            pnl: Some(rust_decimal::Decimal::from_f64_retain(pnl).unwrap()),
            stop_loss: None,
            target: None,
            confidence: None,
            patterns_detected: patterns.into_iter().map(String::from).collect(),
            psychology: psych,
            notes: None,
        }
    }

    #[test]
    fn test_pattern_effectiveness_is_win_rate_times_avg_pnl() {
        let trades = [
            trade(200.0, vec!["Hammer"], None),
            trade(-100.0, vec!["Hammer"], None),
            trade(50.0, vec![], None),
        ];
        let refs: Vec<&TradeRecord> = trades.iter().collect();
        let (effectiveness, performance) = compute_pattern_effectiveness(&refs);
        // Hammer: win_rate 0.5, avg_pnl 50 -> 25
        assert!((effectiveness["Hammer"] - 25.0).abs() < 1e-9);
        assert_eq!(performance["No Pattern"].trades, 1);
    }

    #[test]
    fn test_psychology_buckets() {
        let psych = PsychologySnapshot {
            fear_greed_score: 15.0,
            sentiment: "Fear".into(),
            contrarian_bias: "Bullish".into(),
        };
        let trades = [trade(120.0, vec![], Some(psych))];
        let refs: Vec<&TradeRecord> = trades.iter().collect();
        let correlation = compute_psychology_correlation(&refs);
        assert_eq!(correlation.by_sentiment["Fear"].wins, 1);
        assert_eq!(correlation.by_contrarian_bias["Bullish"].trades, 1);
        assert_eq!(correlation.by_fear_greed_band["Fear (10-30)"].trades, 1);
    }
}
