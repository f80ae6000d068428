use thiserror::Error;

/// Top-level error type for the Wayfind system.
///
/// Subsystem crates define their own error types for their seams (model,
/// search, proxy) and convert into this one where they cross into
/// configuration or process setup.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WayfindError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Assistant error: {0}")]
    Assistant(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Turn error: {0}")]
    Turn(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for WayfindError {
    fn from(err: toml::de::Error) -> Self {
        WayfindError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for WayfindError {
    fn from(err: toml::ser::Error) -> Self {
        WayfindError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for WayfindError {
    fn from(err: serde_json::Error) -> Self {
        WayfindError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Wayfind operations.
pub type Result<T> = std::result::Result<T, WayfindError>;
