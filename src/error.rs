use thiserror::Error;

#[derive(Error, Debug)]
pub enum InsightError {
    #[error("Required columns could not be resolved: {}", .missing.join(", "))]
    MissingRequiredColumns { missing: Vec<String> },

    #[error("No usable data rows remain after cleaning")]
    EmptyTable,

    #[error("Invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("Insight payload rejected: {}", .reasons.join("; "))]
    ValidationRejected { reasons: Vec<String> },

    #[error("Insight provider error: {0}")]
    Provider(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, InsightError>;
