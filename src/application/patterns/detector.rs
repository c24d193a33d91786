use super::{Pattern, predicates};
use crate::application::indicators::TrendDirection;
use crate::domain::market::Candle;
use crate::domain::trading::{Signal, SignalKind, SignalSource};

/// Per-candle detected pattern sets. Single-candle patterns are marked from
/// index 0, two-candle from 1, three-candle from 2.
pub type PatternMarks = Vec<Vec<Pattern>>;

/// Runs every predicate over the series.
pub fn detect_patterns(candles: &[Candle]) -> PatternMarks {
    let mut marks: PatternMarks = vec![Vec::new(); candles.len()];

    for i in 0..candles.len() {
        let c = &candles[i];
        if predicates::is_dragonfly_doji(c) {
            marks[i].push(Pattern::DragonflyDoji);
        } else if predicates::is_gravestone_doji(c) {
            marks[i].push(Pattern::GravestoneDoji);
        } else if predicates::is_doji(c) {
            marks[i].push(Pattern::Doji);
        }
        if predicates::is_hammer(c) {
            marks[i].push(Pattern::Hammer);
        }
        if predicates::is_shooting_star(c) {
            marks[i].push(Pattern::ShootingStar);
        }
        match predicates::marubozu(c) {
            Some(1) => marks[i].push(Pattern::BullishMarubozu),
            Some(-1) => marks[i].push(Pattern::BearishMarubozu),
            _ => {}
        }

        if i >= 1 {
            let c1 = &candles[i - 1];
            if predicates::is_bullish_engulfing(c1, c) {
                marks[i].push(Pattern::BullishEngulfing);
            }
            if predicates::is_bearish_engulfing(c1, c) {
                marks[i].push(Pattern::BearishEngulfing);
            }
            if predicates::is_bullish_harami(c1, c) {
                marks[i].push(Pattern::BullishHarami);
            }
            if predicates::is_bearish_harami(c1, c) {
                marks[i].push(Pattern::BearishHarami);
            }
            if predicates::is_tweezer_top(c1, c) {
                marks[i].push(Pattern::TweezerTop);
            }
            if predicates::is_tweezer_bottom(c1, c) {
                marks[i].push(Pattern::TweezerBottom);
            }
            if predicates::is_dark_cloud_cover(c1, c) {
                marks[i].push(Pattern::DarkCloudCover);
            }
            if predicates::is_piercing(c1, c) {
                marks[i].push(Pattern::Piercing);
            }
        }

        if i >= 2 {
            let c1 = &candles[i - 2];
            let c2 = &candles[i - 1];
            if predicates::is_morning_star(c1, c2, c) {
                marks[i].push(Pattern::MorningStar);
            }
            if predicates::is_evening_star(c1, c2, c) {
                marks[i].push(Pattern::EveningStar);
            }
            if predicates::is_three_white_soldiers(c1, c2, c) {
                marks[i].push(Pattern::ThreeWhiteSoldiers);
            }
            if predicates::is_three_black_crows(c1, c2, c) {
                marks[i].push(Pattern::ThreeBlackCrows);
            }
            match predicates::abandoned_baby(c1, c2, c) {
                Some(1) => marks[i].push(Pattern::AbandonedBabyBullish),
                Some(-1) => marks[i].push(Pattern::AbandonedBabyBearish),
                _ => {}
            }
        }
    }
    marks
}

/// Patterns that stay significant under a trend filter.
fn keep_in_trend(pattern: Pattern, trend: TrendDirection) -> bool {
    use Pattern::*;
    match trend {
        TrendDirection::Sideways => true,
        TrendDirection::Uptrend => matches!(
            pattern,
            // continuation bullish
            ThreeWhiteSoldiers | BullishMarubozu
            // reversal bearish
            | BearishEngulfing | EveningStar | ShootingStar | TweezerTop
            | ThreeBlackCrows | DarkCloudCover | AbandonedBabyBearish
            // neutral
            | Doji | DragonflyDoji | GravestoneDoji
        ),
        TrendDirection::Downtrend => matches!(
            pattern,
            // reversal bullish
            BullishEngulfing | MorningStar | Hammer | TweezerBottom
            | ThreeWhiteSoldiers | Piercing | AbandonedBabyBullish
            // continuation bearish
            | ThreeBlackCrows | BearishMarubozu
            // neutral
            | Doji | DragonflyDoji | GravestoneDoji
        ),
    }
}

/// Aggregates the latest bar's patterns into a directional signal.
///
/// Weighted strengths decide the direction; confidence is
/// `min(max_side_weight / (pattern_count · 0.9), 1.0)`.
pub fn pattern_to_signal(marks: &PatternMarks, trend: TrendDirection) -> Signal {
    let Some(latest) = marks.last() else {
        return Signal::wait(SignalSource::Patterns, "No candles to analyze");
    };
    let filtered: Vec<Pattern> = latest
        .iter()
        .copied()
        .filter(|p| keep_in_trend(*p, trend))
        .collect();

    let bullish_strength: f64 = filtered
        .iter()
        .filter(|p| p.direction() > 0)
        .map(|p| p.weight())
        .sum();
    let bearish_strength: f64 = filtered
        .iter()
        .filter(|p| p.direction() < 0)
        .map(|p| p.weight())
        .sum();

    let trend_label = trend.to_string().to_lowercase();
    if filtered.is_empty() || bullish_strength == bearish_strength {
        return Signal::wait(
            SignalSource::Patterns,
            format!("No significant patterns detected in {trend_label} market"),
        );
    }

    let max_strength = bullish_strength.max(bearish_strength);
    let confidence = (max_strength / (filtered.len() as f64 * 0.9)).min(1.0);
    let kind = if bullish_strength > bearish_strength {
        SignalKind::BuyCall
    } else {
        SignalKind::BuyPut
    };
    let names: Vec<&str> = filtered.iter().take(3).map(|p| p.label()).collect();
    Signal::new(
        kind,
        confidence,
        SignalSource::Patterns,
        format!(
            "Based on detected patterns: {} in a {trend_label} market",
            names.join(", ")
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::candle::bar;

    fn downtrend_prefix(bars: u32) -> Vec<Candle> {
        (0..bars)
            .map(|i| {
                let open = 130.0 - 0.5 * i as f64;
                bar(i, open, open + 0.6, open - 1.1, open - 0.5, 1000.0)
            })
            .collect()
    }

    #[test]
    fn test_three_white_soldiers_marked_on_third_bar() {
        let mut candles = downtrend_prefix(20);
        let base = 120.0;
        for (step, seq) in [(0.0, 20u32), (3.0, 21), (6.0, 22)] {
            let open = base + step;
            candles.push(bar(seq, open, open + 2.6, open - 0.1, open + 2.5, 4000.0));
        }
        let marks = detect_patterns(&candles);
        assert!(marks[22].contains(&Pattern::ThreeWhiteSoldiers));
        assert!(marks[22].contains(&Pattern::BullishMarubozu));
        assert!(!marks[21].contains(&Pattern::ThreeWhiteSoldiers));
    }

    #[test]
    fn test_pattern_signal_bullish_in_downtrend_reversal() {
        let mut candles = downtrend_prefix(20);
        for (step, seq) in [(0.0, 20u32), (3.0, 21), (6.0, 22)] {
            let open = 120.0 + step;
            candles.push(bar(seq, open, open + 2.6, open - 0.1, open + 2.5, 4000.0));
        }
        let marks = detect_patterns(&candles);
        let signal = pattern_to_signal(&marks, TrendDirection::Downtrend);
        assert_eq!(signal.kind, SignalKind::BuyCall);
        assert!(signal.confidence > 0.6);
        assert!(signal.reason.contains("Three White Soldiers"));
    }

    #[test]
    fn test_trend_filter_drops_counter_trend_noise() {
        // a bullish harami is not significant inside an uptrend
        let c1 = bar(0, 106.0, 107.0, 99.0, 100.0, 0.0);
        let c2 = bar(1, 101.0, 104.5, 100.5, 104.0, 0.0);
        let marks = detect_patterns(&[c1, c2]);
        assert!(marks[1].contains(&Pattern::BullishHarami));

        let uptrend = pattern_to_signal(&marks, TrendDirection::Uptrend);
        assert_eq!(uptrend.kind, SignalKind::Wait);
        let sideways = pattern_to_signal(&marks, TrendDirection::Sideways);
        assert_eq!(sideways.kind, SignalKind::BuyCall);
    }

    #[test]
    fn test_no_patterns_waits() {
        let candles = vec![
            bar(0, 100.0, 103.0, 99.0, 102.0, 0.0),
            bar(1, 102.0, 105.0, 101.0, 104.0, 0.0),
        ];
        let marks = detect_patterns(&candles);
        let signal = pattern_to_signal(&marks, TrendDirection::Sideways);
        assert_eq!(signal.kind, SignalKind::Wait);
    }
}
