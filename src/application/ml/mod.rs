//! Inference over the externally trained signal classifier, with the
//! rule-based fallback used when no artifact is available.

mod predictor;
mod smartcore_predictor;

pub use predictor::{RuleBasedClassifier, load_classifier};
pub use smartcore_predictor::SmartCoreClassifier;
