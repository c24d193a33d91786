use crate::domain::ml::feature_registry::{FeatureSet, features_to_vector};
use crate::domain::ports::SignalClassifier;
use crate::domain::trading::{Signal, SignalKind, SignalSource};
use smartcore::ensemble::random_forest_classifier::RandomForestClassifier;
use smartcore::linalg::basic::matrix::DenseMatrix;
use std::fs::File;
use std::path::Path;
use tracing::{error, info, warn};

/// Confidence assigned to model classes; the random forest artifact does
/// not expose per-class probabilities.
const MODEL_CONFIDENCE: f64 = 0.7;

/// A random-forest classifier deserialized from the training pipeline's
/// JSON artifact. Loaded once, immutable afterwards.
pub struct SmartCoreClassifier {
    model: RandomForestClassifier<f64, i64, DenseMatrix<f64>, Vec<i64>>,
}

impl SmartCoreClassifier {
    /// Reads the artifact; None when the file is missing or malformed so
    /// the caller can degrade to the rule fallback.
    pub fn load(model_path: &Path) -> Option<Self> {
        if !model_path.exists() {
            warn!(
                path = %model_path.display(),
                "Classifier artifact not found"
            );
            return None;
        }
        let file = match File::open(model_path) {
            Ok(file) => file,
            Err(e) => {
                error!("Failed to open classifier artifact: {e}");
                return None;
            }
        };
        match serde_json::from_reader(file) {
            Ok(model) => {
                info!(path = %model_path.display(), "Loaded classifier artifact");
                Some(Self { model })
            }
            Err(e) => {
                error!("Failed to deserialize classifier artifact: {e}");
                None
            }
        }
    }
}

impl SignalClassifier for SmartCoreClassifier {
    fn classify(&self, features: &FeatureSet) -> Signal {
        let row = features_to_vector(features);
        let matrix = match DenseMatrix::from_2d_vec(&vec![row]) {
            Ok(matrix) => matrix,
            Err(e) => {
                error!("Feature matrix construction failed: {e}");
                return Signal::wait(SignalSource::Ml, "Inference unavailable");
            }
        };
        let class = match self.model.predict(&matrix) {
            Ok(predictions) => predictions.first().copied().unwrap_or(0),
            Err(e) => {
                error!("Classifier prediction failed: {e}");
                return Signal::wait(SignalSource::Ml, "Inference unavailable");
            }
        };
        match class {
            1 => Signal::new(
                SignalKind::BuyCall,
                MODEL_CONFIDENCE,
                SignalSource::Ml,
                "Classifier predicts upside",
            ),
            -1 => Signal::new(
                SignalKind::BuyPut,
                MODEL_CONFIDENCE,
                SignalSource::Ml,
                "Classifier predicts downside",
            ),
            _ => {
                let mut signal = Signal::wait(SignalSource::Ml, "Classifier predicts no edge");
                signal.confidence = MODEL_CONFIDENCE;
                signal
            }
        }
    }

    fn name(&self) -> &str {
        "smartcore-random-forest"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_artifact_is_none() {
        assert!(SmartCoreClassifier::load(Path::new("missing.json")).is_none());
    }

    #[test]
    fn test_load_malformed_artifact_is_none() {
        let path = std::env::temp_dir().join(format!(
            "optrade_model_test_{}.json",
            std::process::id()
        ));
        std::fs::write(&path, b"{ not a model }").unwrap();
        assert!(SmartCoreClassifier::load(&path).is_none());
        let _ = std::fs::remove_file(&path);
    }
}
