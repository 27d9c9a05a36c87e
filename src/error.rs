use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AdVerdictError {
    #[error("Unknown metric: {0} (expected one of CTR, CPC, Conversions)")]
    UnknownMetric(String),

    #[error("Metric weights must sum to 1.0, got {sum}")]
    WeightSum { sum: f64 },

    #[error("Weight for {metric} must be in [0, 1], got {weight}")]
    WeightOutOfRange { metric: String, weight: f64 },

    #[error("Missing weight for metric {0}")]
    MissingWeight(String),

    #[error("Missing direction for metric {0}")]
    MissingDirection(String),

    #[error("Significance threshold must be in (0, 1) exclusive, got {0}")]
    InvalidThreshold(f64),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("JSON error: {0}")]
    Json(String),
}

pub type Result<T> = std::result::Result<T, AdVerdictError>;

impl AdVerdictError {
    /// True for every variant that represents an invalid configuration.
    /// These are the only errors that abort a run.
    pub fn is_configuration_error(&self) -> bool {
        !matches!(self, AdVerdictError::Io(_) | AdVerdictError::Json(_))
    }
}

impl From<std::io::Error> for AdVerdictError {
    fn from(e: std::io::Error) -> Self {
        AdVerdictError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for AdVerdictError {
    fn from(e: serde_json::Error) -> Self {
        AdVerdictError::Json(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weight_sum_message_includes_sum() {
        let e = AdVerdictError::WeightSum { sum: 0.9 };
        assert_eq!(e.to_string(), "Metric weights must sum to 1.0, got 0.9");
    }

    #[test]
    fn io_and_json_are_not_configuration_errors() {
        assert!(!AdVerdictError::Io("x".into()).is_configuration_error());
        assert!(!AdVerdictError::Json("x".into()).is_configuration_error());
        assert!(AdVerdictError::UnknownMetric("ROAS".into()).is_configuration_error());
        assert!(AdVerdictError::InvalidThreshold(1.5).is_configuration_error());
    }

    #[test]
    fn serde_json_error_converts() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let e: AdVerdictError = err.into();
        assert!(matches!(e, AdVerdictError::Json(_)));
    }
}
