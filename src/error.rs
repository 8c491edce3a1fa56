use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimulationError {
    #[error("Invalid scenario: {0}")]
    InvalidScenario(String),

    #[error("Invalid duration {0}: must be between 1 and 1200 months")]
    InvalidDuration(i64),

    #[error("Invalid value for parameter '{name}': {details}")]
    InvalidParameter { name: String, details: String },

    #[error("Invalid risk thresholds: {0}")]
    InvalidThreshold(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),

    #[error("No baseline available for tenant: {0}")]
    UnknownTenant(String),

    #[error("Date calculation error: {0}")]
    DateError(String),

    #[cfg(feature = "gemini")]
    #[error("Analysis failed: {0}")]
    AnalysisFailed(String),

    #[cfg(feature = "gemini")]
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl SimulationError {
    /// True for errors caused by the caller's scenario input rather than by
    /// configuration or infrastructure.
    pub fn is_invalid_scenario(&self) -> bool {
        matches!(
            self,
            Self::InvalidScenario(_) | Self::InvalidDuration(_) | Self::InvalidParameter { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, SimulationError>;
