use thiserror::Error;

/// Errors surfaced by the analysis and decision pipeline.
///
/// Analyzers degrade to neutral defaults instead of returning these; only
/// the orchestrator and the infrastructure layer propagate them.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("external source unavailable after {attempts} attempts: {reason}")]
    ExternalUnavailable { attempts: u32, reason: String },

    #[error("configuration error: {reason}")]
    Configuration { reason: String },

    #[error("invariant violation: {reason}")]
    InvariantViolation { reason: String },
}

impl EngineError {
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Process exit code per the external interface contract:
    /// 1 for configuration/input problems, 2 for exhausted external I/O.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ExternalUnavailable { .. } => 2,
            _ => 1,
        }
    }
}

/// Errors raised by the trade journal.
#[derive(Debug, Error)]
pub enum JournalError {
    #[error("trade not found: {trade_id}")]
    TradeNotFound { trade_id: String },

    #[error("required field missing in trade data: {field}")]
    MissingField { field: &'static str },

    #[error("journal I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("journal serialization failed: {0}")]
    Serde(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            EngineError::configuration("missing model").exit_code(),
            1
        );
        assert_eq!(
            EngineError::ExternalUnavailable {
                attempts: 3,
                reason: "timeout".into()
            }
            .exit_code(),
            2
        );
    }

    #[test]
    fn test_error_formatting() {
        let err = EngineError::InvalidInput {
            reason: "strike order broken".into(),
        };
        assert!(err.to_string().contains("strike order broken"));

        let err = JournalError::MissingField { field: "entry_time" };
        assert!(err.to_string().contains("entry_time"));
    }
}
