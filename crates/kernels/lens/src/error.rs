//! Lens error types.

use thiserror::Error;

/// Lens result type alias.
pub type Result<T> = std::result::Result<T, LensError>;

/// Lens error types.
#[derive(Debug, Error)]
pub enum LensError {
    /// Failure inside readback, compositing or output.
    #[error(transparent)]
    Runtime(#[from] vantage_runtime::Error),
    /// Configuration validation failure.
    #[error("Invalid lens config: {0}")]
    InvalidConfig(String),
    /// Run document could not be parsed.
    #[error("Invalid run document: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// Run document read failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Report table failure.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    /// Run document declares an unsupported `apiVersion`.
    #[error("Unsupported apiVersion '{0}', expected '{expected}'", expected = crate::config::API_VERSION)]
    InvalidApiVersion(String),
    /// Run document declares an unsupported `kind`.
    #[error("Unsupported kind '{0}', expected '{expected}'", expected = crate::config::KIND)]
    InvalidKind(String),
    /// A controller needs at least one candidate location.
    #[error("Viewpoint has no locations")]
    EmptyViewpoint,
}

impl LensError {
    /// Create an InvalidConfig error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}
