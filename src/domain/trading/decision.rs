use crate::domain::trading::{Signal, SignalSource};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What the orchestrator should do with a fused decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeAction {
    ExecuteTrade,
    SuggestTrade,
    NoAction,
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExecuteTrade => write!(f, "EXECUTE TRADE"),
            Self::SuggestTrade => write!(f, "SUGGEST TRADE"),
            Self::NoAction => write!(f, "NO ACTION"),
        }
    }
}

/// Risk appetite controlling fusion weights, execution threshold and the
/// pre-execution gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RiskProfile {
    Conservative,
    #[default]
    Moderate,
    Aggressive,
}

impl RiskProfile {
    /// (w_ml, w_indicators, w_psychology)
    pub fn weights(&self) -> (f64, f64, f64) {
        match self {
            Self::Conservative => (0.3, 0.5, 0.2),
            Self::Moderate => (0.4, 0.4, 0.2),
            Self::Aggressive => (0.5, 0.3, 0.2),
        }
    }

    /// Minimum fused confidence to execute rather than suggest.
    pub fn confidence_threshold(&self) -> f64 {
        match self {
            Self::Conservative => 0.80,
            Self::Moderate => 0.75,
            Self::Aggressive => 0.65,
        }
    }

    /// Minimum risk-reward accepted by the pre-execution gate.
    pub fn min_risk_reward(&self) -> f64 {
        match self {
            Self::Conservative => 2.0,
            Self::Moderate => 1.5,
            Self::Aggressive => 1.2,
        }
    }

    /// Maximum ATR as a percent of price accepted by the gate.
    pub fn max_atr_percent(&self) -> f64 {
        match self {
            Self::Conservative => 1.5,
            Self::Moderate => 2.0,
            Self::Aggressive => 2.5,
        }
    }

    /// Minimum ADX accepted by the gate.
    pub fn min_adx(&self) -> f64 {
        match self {
            Self::Conservative => 25.0,
            Self::Moderate => 20.0,
            Self::Aggressive => 15.0,
        }
    }

    /// Days before expiry at which the chooser rolls to next week.
    pub fn expiry_roll_days(&self) -> i64 {
        match self {
            Self::Conservative | Self::Moderate => 2,
            Self::Aggressive => 1,
        }
    }
}

impl fmt::Display for RiskProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conservative => write!(f, "conservative"),
            Self::Moderate => write!(f, "moderate"),
            Self::Aggressive => write!(f, "aggressive"),
        }
    }
}

impl FromStr for RiskProfile {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "conservative" => Ok(Self::Conservative),
            "moderate" => Ok(Self::Moderate),
            "aggressive" => Ok(Self::Aggressive),
            _ => anyhow::bail!(
                "Invalid risk profile: {}. Must be conservative, moderate or aggressive",
                s
            ),
        }
    }
}

/// Per-source contribution to a fused decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceContribution {
    pub source: SignalSource,
    pub kind: crate::domain::trading::SignalKind,
    pub confidence: f64,
    pub weight: f64,
}

/// The fused output of one analysis cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub signal: Signal,
    pub action: TradeAction,
    pub adjusted_confidence: f64,
    pub lots: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strike: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_reward: Option<f64>,
    pub contributions: Vec<SourceContribution>,
    /// Set when the risk gate rejected execution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gate_rejection: Option<String>,
}
