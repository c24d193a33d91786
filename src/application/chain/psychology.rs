use super::analyzer::{ChainAnalysis, MomentumBucket};
use crate::domain::market::OptionChainSnapshot;
use crate::domain::trading::{PsychologySnapshot, Signal, SignalKind, SignalSource};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fear-greed sentiment buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FearGreedBucket {
    ExtremeFear,
    Fear,
    NeutralBearish,
    NeutralBullish,
    Greed,
    ExtremeGreed,
}

impl FearGreedBucket {
    pub fn from_score(score: f64) -> Self {
        if score >= 75.0 {
            Self::ExtremeGreed
        } else if score >= 60.0 {
            Self::Greed
        } else if score >= 45.0 {
            Self::NeutralBullish
        } else if score >= 30.0 {
            Self::NeutralBearish
        } else if score > 15.0 {
            Self::Fear
        } else {
            Self::ExtremeFear
        }
    }
}

impl fmt::Display for FearGreedBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExtremeFear => write!(f, "Extreme Fear"),
            Self::Fear => write!(f, "Fear"),
            Self::NeutralBearish => write!(f, "Neutral-to-Bearish"),
            Self::NeutralBullish => write!(f, "Neutral-to-Bullish"),
            Self::Greed => write!(f, "Greed"),
            Self::ExtremeGreed => write!(f, "Extreme Greed"),
        }
    }
}

/// Contrarian lean derived from the fear-greed score bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContrarianBias {
    Bullish,
    Bearish,
    Neutral,
}

impl fmt::Display for ContrarianBias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bullish => write!(f, "Bullish"),
            Self::Bearish => write!(f, "Bearish"),
            Self::Neutral => write!(f, "Neutral"),
        }
    }
}

/// An institutional-positioning pattern read off the key levels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmartMoneySign {
    pub pattern: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<f64>,
    pub indication: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContrarianSignal {
    pub signal: String,
    pub strength: String,
    pub reason: String,
}

/// A psychological read of the volume distribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeProfileInsight {
    pub insight: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strike: Option<f64>,
    pub interpretation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeProfile {
    pub total_call_volume: f64,
    pub total_put_volume: f64,
    /// Call over put volume; infinite put droughts are capped out by the
    /// bias bucketing.
    pub call_put_volume_ratio: f64,
    pub bias: String,
    pub highest_call_volume_strike: Option<f64>,
    pub highest_put_volume_strike: Option<f64>,
    pub insights: Vec<VolumeProfileInsight>,
}

/// Read of what the retail crowd is likely doing, from PCR extremes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetailPositioning {
    pub activity: String,
    pub implications: String,
}

/// Immutable point-in-time psychology report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PsychologyReport {
    /// Bounded composite in [0, 100]; 50 is neutral.
    pub fear_greed_score: f64,
    pub sentiment: FearGreedBucket,
    pub contrarian_bias: ContrarianBias,
    pub smart_money_signs: Vec<SmartMoneySign>,
    pub retail_positioning: RetailPositioning,
    pub contrarian_signals: Vec<ContrarianSignal>,
    pub volume_profile: VolumeProfile,
}

const LARGE_OI_CHANGE: f64 = 200_000.0;
const EXHAUSTION_OI_CHANGE: f64 = 500_000.0;

/// Derives the psychology report from a chain analysis. Bounded and
/// deterministic; never fails.
pub fn analyze_psychology(
    analysis: &ChainAnalysis,
    snapshot: &OptionChainSnapshot,
) -> PsychologyReport {
    let score = fear_greed_score(analysis);
    let sentiment = FearGreedBucket::from_score(score);
    let contrarian_bias = if score < 30.0 {
        ContrarianBias::Bullish
    } else if score > 70.0 {
        ContrarianBias::Bearish
    } else {
        ContrarianBias::Neutral
    };

    PsychologyReport {
        fear_greed_score: score,
        sentiment,
        contrarian_bias,
        smart_money_signs: smart_money_signs(analysis),
        retail_positioning: retail_positioning(analysis.pcr_oi),
        contrarian_signals: contrarian_signals(analysis, score),
        volume_profile: volume_profile(snapshot),
    }
}

fn retail_positioning(pcr: f64) -> RetailPositioning {
    if pcr > 0.0 && pcr < 0.6 {
        RetailPositioning {
            activity: "Bullish Chasing".into(),
            implications: "Retail likely chasing upside momentum, potentially overextended".into(),
        }
    } else if pcr > 1.4 {
        RetailPositioning {
            activity: "Excessive Fear".into(),
            implications: "Retail showing excessive fear, potentially oversold".into(),
        }
    } else {
        RetailPositioning {
            activity: "Neutral".into(),
            implications: "No clear retail positioning detected".into(),
        }
    }
}

fn fear_greed_score(analysis: &ChainAnalysis) -> f64 {
    let mut score: f64 = 50.0;

    let pcr = analysis.pcr_oi;
    if pcr > 1.5 {
        score -= 20.0;
    } else if pcr > 1.2 {
        score -= 10.0;
    } else if pcr > 0.0 && pcr < 0.5 {
        score += 20.0;
    } else if pcr > 0.0 && pcr < 0.8 {
        score += 10.0;
    }

    match analysis.momentum.oi_momentum {
        MomentumBucket::Bullish => score += 10.0,
        MomentumBucket::Bearish => score -= 10.0,
    }

    let gap_percent = max_pain_gap_percent(analysis);
    if gap_percent > 1.0 {
        score += 5.0;
    } else if gap_percent < -1.0 {
        score -= 5.0;
    }

    if let (Some(put_delta), Some(call_delta)) = (
        analysis.iv_skew.avg_put_delta(),
        analysis.iv_skew.avg_call_delta(),
    ) {
        if put_delta > call_delta * 1.5 {
            score -= 10.0;
        } else if call_delta > put_delta * 1.5 {
            score += 10.0;
        }
    }

    score.clamp(0.0, 100.0)
}

/// (max_pain - underlying) / underlying, in percent.
fn max_pain_gap_percent(analysis: &ChainAnalysis) -> f64 {
    if analysis.underlying > 0.0 {
        (analysis.max_pain - analysis.underlying) / analysis.underlying * 100.0
    } else {
        0.0
    }
}

fn smart_money_signs(analysis: &ChainAnalysis) -> Vec<SmartMoneySign> {
    let mut signs = Vec::new();

    if let Some(put_delta) = analysis.iv_skew.avg_put_delta()
        && put_delta > 5.0
    {
        signs.push(SmartMoneySign {
            pattern: "Institutional Hedging".into(),
            level: None,
            indication: "Steep put IV skew: smart money adding downside protection".into(),
        });
    }

    for level in analysis.key_levels.put_support.iter().take(2) {
        if level.strike < analysis.underlying && level.open_interest > 0.0 {
            signs.push(SmartMoneySign {
                pattern: "Strong Put Support".into(),
                level: Some(level.strike),
                indication: "Significant put writing at a key level below price".into(),
            });
        }
    }
    for level in analysis.key_levels.call_resistance.iter().take(2) {
        if level.strike > analysis.underlying && level.open_interest > 0.0 {
            signs.push(SmartMoneySign {
                pattern: "Strong Call Resistance".into(),
                level: Some(level.strike),
                indication: "Significant call writing at a key level above price".into(),
            });
        }
    }

    if let Some(change) = analysis.key_levels.significant_pe_change.first()
        && change.change_in_oi > LARGE_OI_CHANGE
    {
        signs.push(SmartMoneySign {
            pattern: "Large Put OI Change".into(),
            level: Some(change.strike),
            indication: "Institutional-size put position change at this strike".into(),
        });
    }
    if let Some(change) = analysis.key_levels.significant_ce_change.first()
        && change.change_in_oi > LARGE_OI_CHANGE
    {
        signs.push(SmartMoneySign {
            pattern: "Large Call OI Change".into(),
            level: Some(change.strike),
            indication: "Institutional-size call position change at this strike".into(),
        });
    }
    signs
}

fn contrarian_signals(analysis: &ChainAnalysis, score: f64) -> Vec<ContrarianSignal> {
    let mut signals = Vec::new();

    if score <= 15.0 {
        signals.push(ContrarianSignal {
            signal: "Potential Bullish Reversal".into(),
            strength: "Strong".into(),
            reason: format!("Extreme fear (score: {score:.0}) often precedes market bottoms"),
        });
    } else if score >= 85.0 {
        signals.push(ContrarianSignal {
            signal: "Potential Bearish Reversal".into(),
            strength: "Strong".into(),
            reason: format!("Extreme greed (score: {score:.0}) often precedes market tops"),
        });
    }

    let pcr = analysis.pcr_oi;
    if pcr > 1.5 {
        signals.push(ContrarianSignal {
            signal: "Contrarian Bullish Signal".into(),
            strength: "Moderate to Strong".into(),
            reason: format!("Very high PCR ({pcr}) indicates excessive fear or hedging"),
        });
    } else if pcr > 0.0 && pcr < 0.5 {
        signals.push(ContrarianSignal {
            signal: "Contrarian Bearish Signal".into(),
            strength: "Moderate to Strong".into(),
            reason: format!("Very low PCR ({pcr}) indicates excessive complacency"),
        });
    }

    let gap = max_pain_gap_percent(analysis);
    if gap > 3.0 {
        signals.push(ContrarianSignal {
            signal: "Potential Upward Reversion".into(),
            strength: "Moderate".into(),
            reason: format!(
                "Price ({}) significantly below max pain ({})",
                analysis.underlying, analysis.max_pain
            ),
        });
    } else if gap < -3.0 {
        signals.push(ContrarianSignal {
            signal: "Potential Downward Reversion".into(),
            strength: "Moderate".into(),
            reason: format!(
                "Price ({}) significantly above max pain ({})",
                analysis.underlying, analysis.max_pain
            ),
        });
    }

    let ce_change = analysis.momentum.ce_oi_change;
    let pe_change = analysis.momentum.pe_oi_change;
    if ce_change > EXHAUSTION_OI_CHANGE && ce_change > pe_change * 3.0 {
        signals.push(ContrarianSignal {
            signal: "Potential Call Exhaustion".into(),
            strength: "Moderate".into(),
            reason: format!("Extremely one-sided call OI buildup (change: {ce_change:.0})"),
        });
    }
    if pe_change > EXHAUSTION_OI_CHANGE && pe_change > ce_change * 3.0 {
        signals.push(ContrarianSignal {
            signal: "Potential Put Exhaustion".into(),
            strength: "Moderate".into(),
            reason: format!("Extremely one-sided put OI buildup (change: {pe_change:.0})"),
        });
    }
    signals
}

fn volume_bias(ratio: f64) -> &'static str {
    if ratio > 2.0 {
        "Extremely Bullish"
    } else if ratio > 1.5 {
        "Bullish"
    } else if ratio > 1.0 {
        "Slightly Bullish"
    } else if ratio > 0.7 {
        "Neutral"
    } else if ratio > 0.5 {
        "Slightly Bearish"
    } else if ratio > 0.3 {
        "Bearish"
    } else {
        "Extremely Bearish"
    }
}

fn volume_profile(snapshot: &OptionChainSnapshot) -> VolumeProfile {
    let total_call = snapshot.total_ce_volume();
    let total_put = snapshot.total_pe_volume();
    let ratio = if total_put > 0.0 {
        (total_call / total_put * 100.0).round() / 100.0
    } else if total_call > 0.0 {
        f64::MAX
    } else {
        1.0
    };

    let highest_call = snapshot
        .strikes
        .iter()
        .max_by(|a, b| a.ce.volume.total_cmp(&b.ce.volume))
        .filter(|s| s.ce.volume > 0.0);
    let highest_put = snapshot
        .strikes
        .iter()
        .max_by(|a, b| a.pe.volume.total_cmp(&b.pe.volume))
        .filter(|s| s.pe.volume > 0.0);

    let underlying = snapshot.underlying;
    let otm_call_volume: f64 = snapshot
        .strikes
        .iter()
        .filter(|s| s.strike > underlying)
        .map(|s| s.ce.volume)
        .sum();
    let itm_call_volume = total_call - otm_call_volume;
    let otm_put_volume: f64 = snapshot
        .strikes
        .iter()
        .filter(|s| s.strike <= underlying)
        .map(|s| s.pe.volume)
        .sum();
    let itm_put_volume = total_put - otm_put_volume;

    let mut insights = Vec::new();
    if itm_call_volume > 0.0 && otm_call_volume > itm_call_volume * 3.0 {
        insights.push(VolumeProfileInsight {
            insight: "Heavy OTM Call Buying".into(),
            strike: None,
            interpretation: "Speculative bullish activity or anticipation of a large upward move"
                .into(),
        });
    }
    if itm_put_volume > 0.0 && otm_put_volume > itm_put_volume * 3.0 {
        insights.push(VolumeProfileInsight {
            insight: "Heavy OTM Put Buying".into(),
            strike: None,
            interpretation: "Significant hedging or anticipation of a market decline".into(),
        });
    }
    if let Some(entry) = highest_call
        && total_call > 0.0
        && entry.ce.volume > total_call * 0.2
    {
        insights.push(VolumeProfileInsight {
            insight: "Call Volume Clustering".into(),
            strike: Some(entry.strike),
            interpretation: "Anchoring to a specific upside price target".into(),
        });
    }
    if let Some(entry) = highest_put
        && total_put > 0.0
        && entry.pe.volume > total_put * 0.2
    {
        insights.push(VolumeProfileInsight {
            insight: "Put Volume Clustering".into(),
            strike: Some(entry.strike),
            interpretation: "Anchoring to a specific support level".into(),
        });
    }

    VolumeProfile {
        total_call_volume: total_call,
        total_put_volume: total_put,
        call_put_volume_ratio: ratio,
        bias: volume_bias(ratio).to_string(),
        highest_call_volume_strike: highest_call.map(|s| s.strike),
        highest_put_volume_strike: highest_put.map(|s| s.strike),
        insights,
    }
}

impl PsychologyReport {
    /// Directional signal for fusion, from the contrarian bias. Confidence
    /// grows with distance from the neutral score.
    pub fn signal(&self) -> Signal {
        let confidence = 0.5 + (self.fear_greed_score - 50.0).abs() / 100.0;
        match self.contrarian_bias {
            ContrarianBias::Bullish => Signal::new(
                SignalKind::BuyCall,
                confidence,
                SignalSource::Psychology,
                format!(
                    "{} sentiment (score {:.0}) favors a contrarian bullish stance",
                    self.sentiment, self.fear_greed_score
                ),
            ),
            ContrarianBias::Bearish => Signal::new(
                SignalKind::BuyPut,
                confidence,
                SignalSource::Psychology,
                format!(
                    "{} sentiment (score {:.0}) favors a contrarian bearish stance",
                    self.sentiment, self.fear_greed_score
                ),
            ),
            ContrarianBias::Neutral => Signal::wait(
                SignalSource::Psychology,
                format!("Balanced sentiment (score {:.0})", self.fear_greed_score),
            ),
        }
    }

    /// Compact snapshot stored on executed trades.
    pub fn to_snapshot(&self) -> PsychologySnapshot {
        PsychologySnapshot {
            fear_greed_score: self.fear_greed_score,
            sentiment: self.sentiment.to_string(),
            contrarian_bias: self.contrarian_bias.to_string(),
        }
    }
}
