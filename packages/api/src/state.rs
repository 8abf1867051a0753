use std::sync::Arc;

use bridge24_auth::TokenManager;
use bridge24_contacts::ContactService;

/// Shared application state injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub tokens: Arc<TokenManager>,
    pub contacts: ContactService,
    /// Tenant domain used when a request does not name one.
    pub default_domain: String,
}

impl AppState {
    pub fn new(tokens: Arc<TokenManager>, contacts: ContactService, default_domain: String) -> Self {
        Self {
            tokens,
            contacts,
            default_domain,
        }
    }
}
