//! Error types for the connection governance subsystem.

use thiserror::Error;

/// Result type alias for governance operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for connection governance operations
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid input from a caller
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Adapter registration conflict
    #[error("Adapter already registered: {0}")]
    AdapterConflict(String),

    /// Fault raised by an adapter while probing a remote authority
    #[error("Adapter fault: {0}")]
    AdapterFault(String),

    /// Wizard state machine refused a transition
    #[error("Invalid wizard transition: {0}")]
    WizardTransition(String),

    /// A health check was requested while one is already running
    #[error("Health check already in flight for connection {0}")]
    CheckInFlight(uuid::Uuid),

    /// Persistence error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Secret material could not be resolved
    #[error("Secret resolution failed: {0}")]
    SecretResolution(String),

    /// Audit sink error
    #[error("Audit error: {0}")]
    Audit(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Store-specific error types
#[derive(Debug, Error)]
pub enum StoreError {
    /// Connection not found
    #[error("Connection not found: {0}")]
    NotFound(uuid::Uuid),

    /// Uniqueness or immutability conflict
    #[error("Store conflict: {0}")]
    Conflict(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
