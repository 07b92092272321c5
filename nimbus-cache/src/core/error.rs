use thiserror::Error;

/// Main error type for Nimbus cache operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("Invalid active capacity: {0} (must be greater than zero)")]
    InvalidCapacity(usize),

    #[error("Invalid cleaner interval: {0}ms (must be greater than zero)")]
    InvalidInterval(u64),

    #[error("Cache has been disposed")]
    Disposed,

    #[error("No tokio runtime available to run the cleaner")]
    NoRuntime,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CacheError {
    /// Whether this error comes from misconfiguration at construction time
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidCapacity(_) | Self::InvalidInterval(_) | Self::Config(_)
        )
    }
}

/// Result type alias for Nimbus cache operations
pub type Result<T> = std::result::Result<T, CacheError>;
