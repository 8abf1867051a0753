// ABOUTME: Error types for authentication and token lifecycle operations
// ABOUTME: Covers OAuth code exchange, token refresh, and token store failures

use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Domain is required")]
    DomainRequired,

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("No refresh token available for domain: {0}")]
    NoRefreshToken(String),

    #[error("Failed to refresh tokens for domain: {0}")]
    RefreshFailed(String),

    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    #[error("Invalid token response from Bitrix24")]
    InvalidTokenResponse,

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
