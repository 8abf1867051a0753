// ABOUTME: Auth-gating middleware for the contact endpoints
// ABOUTME: Verifies stored tokens, refreshes expired ones, and injects the domain

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::{error::ApiError, state::AppState};

/// Tenant domain resolved for the current request, available to handlers
/// through request extensions.
#[derive(Debug, Clone)]
pub struct CrmDomain(pub String);

/// Gate a request on a usable token for the configured domain. An expired
/// token gets one refresh attempt; a failed refresh means the session
/// must be re-established through the login flow.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let domain = state.default_domain.clone();

    let tokens = state
        .tokens
        .get_tokens(&domain)
        .await
        .map_err(|e| ApiError::internal("AUTH_CHECK_ERROR", e))?;

    if tokens.is_none() {
        return Err(ApiError::auth_required(
            "AUTHENTICATION_REQUIRED",
            "Bitrix24 authentication is required",
            &domain,
        ));
    }

    if state.tokens.is_expired(&domain).await {
        if let Err(e) = state.tokens.refresh(&domain).await {
            warn!("Token refresh failed for {}: {}", domain, e);
            return Err(ApiError::auth_required(
                "TOKEN_REFRESH_FAILED",
                "Authentication session has expired",
                &domain,
            ));
        }
    }

    req.extensions_mut().insert(CrmDomain(domain));
    Ok(next.run(req).await)
}
