use thiserror::Error;

use crate::director::Phase;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Director error: {0}")]
    Director(#[from] DirectorError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("OmniLink error: {0}")]
    OmniLink(#[from] OmniLinkError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

/// Breakthrough director errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DirectorError {
    #[error("Cannot {operation} while director is in {phase} phase")]
    InvalidTransition {
        operation: &'static str,
        phase: Phase,
    },

    #[error("No prewarmed variant available for play")]
    NotPrewarmed,

    #[error("Variant selection failed: {message}")]
    VariantSelection { message: String },
}

/// Question / synthesis generation errors
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Langbase error: {0}")]
    Langbase(#[from] LangbaseError),

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Validation failed: {field} - {reason}")]
    Validation { field: String, reason: String },

    #[error("Generator unavailable: {message}")]
    Unavailable { message: String },
}

/// Langbase API errors
#[derive(Debug, Error)]
pub enum LangbaseError {
    #[error("Langbase unavailable: {message} (retries: {retries})")]
    Unavailable { message: String, retries: u32 },

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// OmniLink webhook errors
#[derive(Debug, Error)]
pub enum OmniLinkError {
    #[error("Circuit breaker is open: {consecutive_failures} consecutive failures")]
    CircuitOpen { consecutive_failures: u32 },

    #[error("Webhook returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Session store errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SessionError {
    #[error("No active session")]
    NoActiveSession,

    #[error("Entity not found: {entity_id}")]
    EntityNotFound { entity_id: String },
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for director operations
pub type DirectorResult<T> = Result<T, DirectorError>;

/// Result type alias for generation operations
pub type GenerationResult<T> = Result<T, GenerationError>;

/// Result type alias for Langbase operations
pub type LangbaseResult<T> = Result<T, LangbaseError>;

/// Result type alias for OmniLink operations
pub type OmniLinkResult<T> = Result<T, OmniLinkError>;

/// Result type alias for session store operations
pub type SessionResult<T> = Result<T, SessionError>;
