use super::smartcore_predictor::SmartCoreClassifier;
use crate::domain::ml::feature_registry::FeatureSet;
use crate::domain::ports::SignalClassifier;
use crate::domain::trading::{Signal, SignalKind, SignalSource};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Momentum-extreme rule used when no model artifact is present.
#[derive(Debug, Default)]
pub struct RuleBasedClassifier;

impl SignalClassifier for RuleBasedClassifier {
    fn classify(&self, features: &FeatureSet) -> Signal {
        if features.rsi < 30.0 && features.macd > features.macd_signal {
            Signal::new(
                SignalKind::BuyCall,
                0.7,
                SignalSource::Ml,
                "Oversold RSI with MACD above signal line",
            )
        } else if features.rsi > 70.0 && features.macd < features.macd_signal {
            Signal::new(
                SignalKind::BuyPut,
                0.7,
                SignalSource::Ml,
                "Overbought RSI with MACD below signal line",
            )
        } else {
            Signal::wait(SignalSource::Ml, "No momentum extreme")
        }
    }

    fn name(&self) -> &str {
        "rule-fallback"
    }
}

/// Loads the classifier artifact, falling back to the rule when the file
/// is missing or unreadable. The artifact is loaded once and shared.
pub fn load_classifier(model_path: &Path) -> Arc<dyn SignalClassifier> {
    match SmartCoreClassifier::load(model_path) {
        Some(classifier) => Arc::new(classifier),
        None => {
            info!(
                path = %model_path.display(),
                "No usable classifier artifact; using rule-based fallback"
            );
            Arc::new(RuleBasedClassifier)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(rsi: f64, macd: f64, macd_signal: f64) -> FeatureSet {
        FeatureSet {
            rsi,
            macd,
            macd_signal,
            ..Default::default()
        }
    }

    #[test]
    fn test_fallback_rule_buy_call() {
        let signal = RuleBasedClassifier.classify(&features(25.0, 0.5, 0.2));
        assert_eq!(signal.kind, SignalKind::BuyCall);
        assert_eq!(signal.confidence, 0.7);
    }

    #[test]
    fn test_fallback_rule_buy_put() {
        let signal = RuleBasedClassifier.classify(&features(78.0, -0.5, -0.2));
        assert_eq!(signal.kind, SignalKind::BuyPut);
        assert_eq!(signal.confidence, 0.7);
    }

    #[test]
    fn test_fallback_rule_waits_on_neutral() {
        let signal = RuleBasedClassifier.classify(&features(50.0, 0.0, 0.0));
        assert_eq!(signal.kind, SignalKind::Wait);
        assert_eq!(signal.confidence, 0.5);

        // oversold alone is not enough without MACD confirmation
        let signal = RuleBasedClassifier.classify(&features(25.0, -0.5, 0.2));
        assert_eq!(signal.kind, SignalKind::Wait);
    }

    #[test]
    fn test_missing_artifact_falls_back() {
        let classifier = load_classifier(Path::new("does/not/exist.json"));
        assert_eq!(classifier.name(), "rule-fallback");
    }
}
