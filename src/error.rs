//! Error taxonomy for the connection broker.
//!
//! Every failure crossing the public surface carries a stable kind plus a
//! human-readable detail string. Provider errors are translated into this
//! taxonomy at the coordinator boundary; raw provider errors never escape.

use thiserror::Error;

/// Errors surfaced by the connection broker.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Provider application credentials are missing or unusable.
    /// Not retryable without operator action.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The OAuth provider could not be reached or rejected the
    /// request-token call. Transient; retry the handshake from Initiate.
    #[error("oauth provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The verifier-for-token exchange failed. Transient; the handshake
    /// session remains valid for retry within its TTL.
    #[error("token exchange failed: {0}")]
    TokenExchangeFailed(String),

    /// The handshake session is unknown. Covers expiry, replay, and
    /// forgery without distinguishing them.
    #[error("invalid or expired oauth session")]
    InvalidOrExpiredSession,

    /// Durable storage backend failure. A failed write leaves the
    /// previous record, if any, unchanged.
    #[error("credential storage failure: {0}")]
    Storage(String),

    /// Stored credentials could not be decrypted (rotated master key,
    /// tampered ciphertext). Distinct from "not connected" so operators
    /// can detect secret-rotation issues.
    #[error("credential decryption failed: {0}")]
    CredentialCorrupt(String),

    /// The service name is outside the supported enumeration.
    #[error("unsupported service: {0}")]
    UnsupportedService(String),
}

impl AuthError {
    /// Stable machine-readable kind for API responses and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::Configuration(_) => "configuration",
            AuthError::ProviderUnavailable(_) => "provider_unavailable",
            AuthError::TokenExchangeFailed(_) => "token_exchange_failed",
            AuthError::InvalidOrExpiredSession => "invalid_or_expired_session",
            AuthError::Storage(_) => "storage",
            AuthError::CredentialCorrupt(_) => "credential_corrupt",
            AuthError::UnsupportedService(_) => "unsupported_service",
        }
    }
}

impl From<rusqlite::Error> for AuthError {
    fn from(err: rusqlite::Error) -> Self {
        AuthError::Storage(err.to_string())
    }
}

pub type Result<T, E = AuthError> = std::result::Result<T, E>;
