// ABOUTME: OAuth module managing the Bitrix24 token lifecycle
// ABOUTME: Includes token records, the file-backed store, and the lifecycle manager

pub mod manager;
pub mod store;
pub mod types;

pub use manager::{AuthStatus, OAuthConfig, TokenManager};
pub use store::TokenStore;
pub use types::{InstallAuth, TokenRecord, TokenResponse};
