//! Candlestick pattern detection: a closed taxonomy of single-, two- and
//! three-candle patterns with geometric predicates, plus the trend-filtered
//! pattern signal.

mod detector;
mod predicates;

pub use detector::{PatternMarks, detect_patterns, pattern_to_signal};

use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed pattern taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Pattern {
    Doji,
    DragonflyDoji,
    GravestoneDoji,
    Hammer,
    ShootingStar,
    BullishMarubozu,
    BearishMarubozu,
    BullishEngulfing,
    BearishEngulfing,
    BullishHarami,
    BearishHarami,
    TweezerTop,
    TweezerBottom,
    DarkCloudCover,
    Piercing,
    MorningStar,
    EveningStar,
    ThreeWhiteSoldiers,
    ThreeBlackCrows,
    AbandonedBabyBullish,
    AbandonedBabyBearish,
}

impl Pattern {
    pub const ALL: [Pattern; 21] = [
        Pattern::Doji,
        Pattern::DragonflyDoji,
        Pattern::GravestoneDoji,
        Pattern::Hammer,
        Pattern::ShootingStar,
        Pattern::BullishMarubozu,
        Pattern::BearishMarubozu,
        Pattern::BullishEngulfing,
        Pattern::BearishEngulfing,
        Pattern::BullishHarami,
        Pattern::BearishHarami,
        Pattern::TweezerTop,
        Pattern::TweezerBottom,
        Pattern::DarkCloudCover,
        Pattern::Piercing,
        Pattern::MorningStar,
        Pattern::EveningStar,
        Pattern::ThreeWhiteSoldiers,
        Pattern::ThreeBlackCrows,
        Pattern::AbandonedBabyBullish,
        Pattern::AbandonedBabyBearish,
    ];

    /// Bars the predicate looks at.
    pub fn window(&self) -> usize {
        match self {
            Self::Doji
            | Self::DragonflyDoji
            | Self::GravestoneDoji
            | Self::Hammer
            | Self::ShootingStar
            | Self::BullishMarubozu
            | Self::BearishMarubozu => 1,
            Self::BullishEngulfing
            | Self::BearishEngulfing
            | Self::BullishHarami
            | Self::BearishHarami
            | Self::TweezerTop
            | Self::TweezerBottom
            | Self::DarkCloudCover
            | Self::Piercing => 2,
            Self::MorningStar
            | Self::EveningStar
            | Self::ThreeWhiteSoldiers
            | Self::ThreeBlackCrows
            | Self::AbandonedBabyBullish
            | Self::AbandonedBabyBearish => 3,
        }
    }

    /// +1 bullish, -1 bearish, 0 neutral.
    pub fn direction(&self) -> i8 {
        match self {
            Self::Doji => 0,
            Self::DragonflyDoji
            | Self::Hammer
            | Self::BullishMarubozu
            | Self::BullishEngulfing
            | Self::BullishHarami
            | Self::TweezerBottom
            | Self::Piercing
            | Self::MorningStar
            | Self::ThreeWhiteSoldiers
            | Self::AbandonedBabyBullish => 1,
            _ => -1,
        }
    }

    /// Aggregation weight.
    pub fn weight(&self) -> f64 {
        match self {
            Self::Doji | Self::DragonflyDoji | Self::GravestoneDoji => 0.3,
            Self::Hammer | Self::ShootingStar => 0.6,
            Self::BullishMarubozu | Self::BearishMarubozu => 0.7,
            Self::BullishEngulfing | Self::BearishEngulfing => 0.7,
            Self::BullishHarami | Self::BearishHarami => 0.5,
            Self::TweezerTop | Self::TweezerBottom => 0.6,
            Self::DarkCloudCover | Self::Piercing => 0.5,
            Self::MorningStar | Self::EveningStar => 0.8,
            Self::ThreeWhiteSoldiers | Self::ThreeBlackCrows => 0.9,
            Self::AbandonedBabyBullish | Self::AbandonedBabyBearish => 0.5,
        }
    }

    /// Human label, as stored on trade records for effectiveness analysis.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Doji => "Doji",
            Self::DragonflyDoji => "Dragonfly Doji",
            Self::GravestoneDoji => "Gravestone Doji",
            Self::Hammer => "Hammer",
            Self::ShootingStar => "Shooting Star",
            Self::BullishMarubozu => "Bullish Marubozu",
            Self::BearishMarubozu => "Bearish Marubozu",
            Self::BullishEngulfing => "Bullish Engulfing",
            Self::BearishEngulfing => "Bearish Engulfing",
            Self::BullishHarami => "Bullish Harami",
            Self::BearishHarami => "Bearish Harami",
            Self::TweezerTop => "Tweezer Top",
            Self::TweezerBottom => "Tweezer Bottom",
            Self::DarkCloudCover => "Dark Cloud Cover",
            Self::Piercing => "Piercing Pattern",
            Self::MorningStar => "Morning Star",
            Self::EveningStar => "Evening Star",
            Self::ThreeWhiteSoldiers => "Three White Soldiers",
            Self::ThreeBlackCrows => "Three Black Crows",
            Self::AbandonedBabyBullish => "Bullish Abandoned Baby",
            Self::AbandonedBabyBearish => "Bearish Abandoned Baby",
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}
