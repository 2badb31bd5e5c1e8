use thiserror::Error;

/// Failures of the headline fetch layer.
///
/// Every variant carries owned, clonable detail so the error can be stored
/// in the feed's view state and compared in tests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NewsError {
    #[error("Network Error: {0}")]
    Network(String),
    #[error("Data Error: {0}")]
    Decoding(String),
    #[error("Invalid URL configuration")]
    InvalidUrl,
    #[error("No data received from server")]
    NoData,
    #[error("API Error: {0}")]
    Api(String),
    #[error("Too many requests. Please try again later.")]
    RateLimitExceeded,
    #[error("Invalid API key. Please check your configuration.")]
    Unauthorized,
    #[error("An unexpected error occurred")]
    Unknown,
}

impl NewsError {
    /// Short hint shown next to the retry affordance.
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            NewsError::Network(_) => "Please check your internet connection and try again.",
            NewsError::Decoding(_) => "The data format has changed. Please update the app.",
            NewsError::InvalidUrl => "Please contact support.",
            NewsError::NoData => "Try refreshing or changing your search criteria.",
            NewsError::Api(_) => "Please try again later.",
            NewsError::RateLimitExceeded => "Wait a moment and try again.",
            NewsError::Unauthorized => "Verify your API key is correct.",
            NewsError::Unknown => "Please try again or restart the app.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistenceError {
    #[error("Failed to save: {0}")]
    SaveFailed(String),
    #[error("Failed to load: {0}")]
    LoadFailed(String),
    #[error("Failed to delete: {0}")]
    DeleteFailed(String),
    #[error("Failed to encode data")]
    EncodingFailed,
    #[error("Failed to decode data")]
    DecodingFailed,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not locate the configuration directory")]
    NoConfigDir,
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config file: {0}")]
    Parse(#[from] serde_json::Error),
}
