//! Geometric predicates over candle windows. All thresholds are ratios of
//! body or range, so every predicate is invariant under uniform positive
//! scaling and shifting of OHLC.

use crate::domain::market::Candle;

const DOJI_BODY_RATIO: f64 = 0.1;
const DOJI_SHADOW_MULTIPLIER: f64 = 5.0;
const SHADOW_MULTIPLIER: f64 = 2.0;
const MARUBOZU_SHADOW_RATIO: f64 = 0.1;
const STAR_BODY_RATIO: f64 = 0.3;
const SOLDIER_WICK_RATIO: f64 = 0.3;
const TWEEZER_RATIO: f64 = 0.2;
const PENETRATION: f64 = 0.5;
const BABY_GAP_RATIO: f64 = 0.1;

pub fn is_doji(c: &Candle) -> bool {
    c.range() > 0.0 && c.body() / c.range() < DOJI_BODY_RATIO
}

pub fn is_dragonfly_doji(c: &Candle) -> bool {
    let body = c.body();
    body > 0.0
        && is_doji(c)
        && c.upper_shadow() < body
        && c.lower_shadow() > body * DOJI_SHADOW_MULTIPLIER
}

pub fn is_gravestone_doji(c: &Candle) -> bool {
    let body = c.body();
    body > 0.0
        && is_doji(c)
        && c.lower_shadow() < body
        && c.upper_shadow() > body * DOJI_SHADOW_MULTIPLIER
}

pub fn is_hammer(c: &Candle) -> bool {
    let body = c.body();
    body > 0.0 && c.lower_shadow() > SHADOW_MULTIPLIER * body && c.upper_shadow() < body
}

pub fn is_shooting_star(c: &Candle) -> bool {
    let body = c.body();
    body > 0.0 && c.upper_shadow() > SHADOW_MULTIPLIER * body && c.lower_shadow() < body
}

/// Both shadows at most a tenth of the body; direction from the body sign.
pub fn marubozu(c: &Candle) -> Option<i8> {
    let body = c.body();
    if body == 0.0 {
        return None;
    }
    let is_marubozu = c.upper_shadow() <= MARUBOZU_SHADOW_RATIO * body
        && c.lower_shadow() <= MARUBOZU_SHADOW_RATIO * body;
    is_marubozu.then(|| if c.is_bullish() { 1 } else { -1 })
}

pub fn is_bullish_engulfing(c1: &Candle, c2: &Candle) -> bool {
    c1.is_bearish() && c2.open < c1.close && c2.close > c1.open && c2.is_bullish()
}

pub fn is_bearish_engulfing(c1: &Candle, c2: &Candle) -> bool {
    c1.is_bullish() && c2.open > c1.close && c2.close < c1.open && c2.is_bearish()
}

pub fn is_bullish_harami(c1: &Candle, c2: &Candle) -> bool {
    c1.is_bearish()
        && c2.is_bullish()
        && c2.open > c1.close
        && c2.close < c1.open
        && c2.body() < c1.body()
}

pub fn is_bearish_harami(c1: &Candle, c2: &Candle) -> bool {
    c1.is_bullish()
        && c2.is_bearish()
        && c2.open < c1.close
        && c2.close > c1.open
        && c2.body() < c1.body()
}

pub fn is_tweezer_top(c1: &Candle, c2: &Candle) -> bool {
    let avg_range = (c1.range() + c2.range()) / 2.0;
    c1.is_bullish() && c2.is_bearish() && (c1.high - c2.high).abs() < avg_range * TWEEZER_RATIO
}

pub fn is_tweezer_bottom(c1: &Candle, c2: &Candle) -> bool {
    let avg_range = (c1.range() + c2.range()) / 2.0;
    c1.is_bearish() && c2.is_bullish() && (c1.low - c2.low).abs() < avg_range * TWEEZER_RATIO
}

/// Bearish close at least half-way into the prior bullish body after an
/// opening gap above its high.
pub fn is_dark_cloud_cover(c1: &Candle, c2: &Candle) -> bool {
    let body1 = c1.close - c1.open;
    if body1 <= 0.0 {
        return false;
    }
    let penetration_point = c1.close - body1 * PENETRATION;
    c2.is_bearish() && c2.open > c1.high && c2.close < penetration_point
}

pub fn is_piercing(c1: &Candle, c2: &Candle) -> bool {
    let body1 = c1.open - c1.close;
    if body1 <= 0.0 {
        return false;
    }
    let penetration_point = c1.close + body1 * PENETRATION;
    c2.is_bullish() && c2.open < c1.low && c2.close > penetration_point
}

pub fn is_morning_star(c1: &Candle, c2: &Candle, c3: &Candle) -> bool {
    if c1.body() == 0.0 || c3.body() == 0.0 {
        return false;
    }
    c1.is_bearish()
        && c2.body() < c1.body() * STAR_BODY_RATIO
        && c3.is_bullish()
        && c3.close > (c1.open + c1.close) / 2.0
}

pub fn is_evening_star(c1: &Candle, c2: &Candle, c3: &Candle) -> bool {
    if c1.body() == 0.0 || c3.body() == 0.0 {
        return false;
    }
    c1.is_bullish()
        && c2.body() < c1.body() * STAR_BODY_RATIO
        && c3.is_bearish()
        && c3.close < (c1.open + c1.close) / 2.0
}

pub fn is_three_white_soldiers(c1: &Candle, c2: &Candle, c3: &Candle) -> bool {
    let bodies = [c1, c2, c3].map(|c| c.close - c.open);
    if bodies.iter().any(|b| *b <= 0.0) {
        return false;
    }
    c2.open > c1.open
        && c3.open > c2.open
        && c2.close > c1.close
        && c3.close > c2.close
        && c1.upper_shadow() < bodies[0] * SOLDIER_WICK_RATIO
        && c2.upper_shadow() < bodies[1] * SOLDIER_WICK_RATIO
        && c3.upper_shadow() < bodies[2] * SOLDIER_WICK_RATIO
}

pub fn is_three_black_crows(c1: &Candle, c2: &Candle, c3: &Candle) -> bool {
    let bodies = [c1, c2, c3].map(|c| c.open - c.close);
    if bodies.iter().any(|b| *b <= 0.0) {
        return false;
    }
    c2.open < c1.open
        && c3.open < c2.open
        && c2.close < c1.close
        && c3.close < c2.close
        && c1.lower_shadow() < bodies[0] * SOLDIER_WICK_RATIO
        && c2.lower_shadow() < bodies[1] * SOLDIER_WICK_RATIO
        && c3.lower_shadow() < bodies[2] * SOLDIER_WICK_RATIO
}

/// Gap-isolated doji between opposing bodies. Returns the reversal
/// direction: Some(1) bullish, Some(-1) bearish.
pub fn abandoned_baby(c1: &Candle, c2: &Candle, c3: &Candle) -> Option<i8> {
    if !is_doji(c2) {
        return None;
    }
    let min_price = c1.close.min(c2.close).min(c3.close);
    if min_price <= 0.0 {
        return None;
    }
    let gap_threshold = min_price * BABY_GAP_RATIO;
    if c1.is_bearish() && c3.is_bullish() {
        // doji gaps down below the first bar, third gaps back up
        if c1.low - c2.high > gap_threshold && c3.low - c2.high > gap_threshold {
            return Some(1);
        }
    } else if c1.is_bullish() && c3.is_bearish() {
        // doji gaps up above the first bar, third gaps back down
        if c2.low - c1.high > gap_threshold && c2.low - c3.high > gap_threshold {
            return Some(-1);
        }
    }
    None
}
