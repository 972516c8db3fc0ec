use thiserror::Error;

/// Infrastructure errors that can prevent the engine from serving
#[derive(Error, Debug)]
pub enum CasError {
    /// Network communication errors
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Server lifecycle errors
    #[error("Server error: {0}")]
    ServerError(String),

    /// Credential backend errors
    #[error("Directory error: {0}")]
    DirectoryError(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Internal system errors
    #[error("Internal error: {0}")]
    InternalError(String),

    /// Wrapped external errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CasError {
    /// Short machine-readable category, used as a structured log field
    pub fn error_type(&self) -> &'static str {
        match self {
            CasError::NetworkError(_) => "network_error",
            CasError::ServerError(_) => "server_error",
            CasError::DirectoryError(_) => "directory_error",
            CasError::ConfigError(_) => "configuration_error",
            CasError::InternalError(_) => "internal_error",
            CasError::Other(_) => "other",
        }
    }
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, CasError>;

/// Log an error with its category before it is propagated or swallowed
pub fn log_error(context: &str, error: &CasError) {
    tracing::error!(
        context = context,
        error_type = error.error_type(),
        error = %error,
        "MockCAS error occurred"
    );
}
