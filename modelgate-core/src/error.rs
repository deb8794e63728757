//! Error types for model registry and execution operations.

/// The main error type for model operations.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// No identifier was given and no provider has ever been registered
    #[error("No model available")]
    NoModelAvailable,

    /// The identifier is not present in the registry
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    /// The identifier is already registered and the registry rejects duplicates
    #[error("Duplicate model: {0}")]
    DuplicateModel(String),

    /// The request carries neither or both of prompt/messages
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// The provider settled successfully but produced no content
    #[error("Empty response from {0}")]
    EmptyResponse(String),

    /// Adapter-specific errors, passed through unchanged
    #[error("Provider error: {0}")]
    Provider(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ModelError {
    /// Create an unknown model error
    pub fn unknown_model(id: impl Into<String>) -> Self {
        Self::UnknownModel(id.into())
    }

    /// Create a duplicate model error
    pub fn duplicate_model(id: impl Into<String>) -> Self {
        Self::DuplicateModel(id.into())
    }

    /// Create a malformed request error
    pub fn malformed_request(msg: impl Into<String>) -> Self {
        Self::MalformedRequest(msg.into())
    }

    /// Create an empty response error for the named operation
    pub fn empty_response(operation: impl Into<String>) -> Self {
        Self::EmptyResponse(operation.into())
    }

    /// Create a provider error
    pub fn provider(msg: impl Into<String>) -> Self {
        Self::Provider(msg.into())
    }

    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}
