//! Domain-level error taxonomy for trialgrade.
//!
//! Malformed *trial data* never produces one of these: the engine degrades to
//! empty mappings, absent values and undefined Pass^k instead. Errors are
//! reserved for load-time problems (configuration, ground truth identity, I/O).

/// trialgrade errors.
#[derive(Debug, thiserror::Error)]
pub enum GradeError {
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("invalid ground truth in {source_name}: {reason}")]
    InvalidGroundTruth { source_name: String, reason: String },

    #[error("digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for trialgrade operations.
pub type Result<T> = std::result::Result<T, GradeError>;
