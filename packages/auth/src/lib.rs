// ABOUTME: Bridge24 authentication library managing Bitrix24 OAuth tokens
// ABOUTME: Handles code exchange, refresh, install events, and file-backed token storage

pub mod error;
pub mod oauth;

// Re-export main types
pub use error::{AuthError, AuthResult};
pub use oauth::{
    AuthStatus, InstallAuth, OAuthConfig, TokenManager, TokenRecord, TokenResponse, TokenStore,
};
