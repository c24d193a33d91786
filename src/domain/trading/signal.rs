use serde::{Deserialize, Serialize};
use std::fmt;

/// The discrete trading signal emitted by every analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalKind {
    BuyCall,
    BuyPut,
    Wait,
}

impl SignalKind {
    /// Position direction: +1 for calls, -1 for puts, 0 for wait.
    pub fn direction(&self) -> i8 {
        match self {
            Self::BuyCall => 1,
            Self::BuyPut => -1,
            Self::Wait => 0,
        }
    }

    pub fn is_directional(&self) -> bool {
        *self != Self::Wait
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BuyCall => write!(f, "BUY CALL"),
            Self::BuyPut => write!(f, "BUY PUT"),
            Self::Wait => write!(f, "WAIT"),
        }
    }
}

impl std::str::FromStr for SignalKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "BUY CALL" | "BUY_CALL" => Ok(Self::BuyCall),
            "BUY PUT" | "BUY_PUT" => Ok(Self::BuyPut),
            "WAIT" => Ok(Self::Wait),
            _ => anyhow::bail!("Unknown signal kind: {}", s),
        }
    }
}

/// Which stage of the pipeline produced a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalSource {
    Ml,
    Indicators,
    Patterns,
    Psychology,
    OptionChain,
}

impl fmt::Display for SignalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ml => write!(f, "ml"),
            Self::Indicators => write!(f, "indicators"),
            Self::Patterns => write!(f, "patterns"),
            Self::Psychology => write!(f, "psychology"),
            Self::OptionChain => write!(f, "option_chain"),
        }
    }
}

/// A directional recommendation with its confidence and provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub kind: SignalKind,
    /// In [0, 1].
    pub confidence: f64,
    pub reason: String,
    pub source: SignalSource,
    /// Price level the signal expects to be tested, when one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeframe: Option<String>,
}

impl Signal {
    pub fn wait(source: SignalSource, reason: impl Into<String>) -> Self {
        Self {
            kind: SignalKind::Wait,
            confidence: 0.5,
            reason: reason.into(),
            source,
            target: None,
            timeframe: None,
        }
    }

    pub fn new(
        kind: SignalKind,
        confidence: f64,
        source: SignalSource,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            confidence: confidence.clamp(0.0, 1.0),
            reason: reason.into(),
            source,
            target: None,
            timeframe: None,
        }
    }
}
