// ABOUTME: HTTP request handlers for the Bitrix24 OAuth surface
// ABOUTME: Covers login URL generation, the OAuth callback, install events, and status

use axum::{
    body::Bytes,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use bridge24_auth::InstallAuth;

use crate::{error::ApiError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub domain: Option<String>,
    pub redirect: Option<String>,
}

/// Generate the Bitrix24 authorize URL, redirecting when asked to.
pub async fn login(
    State(state): State<AppState>,
    Query(query): Query<LoginQuery>,
) -> Result<Response, ApiError> {
    let domain = query
        .domain
        .unwrap_or_else(|| state.default_domain.clone());

    let auth_url = state
        .tokens
        .auth_url(&domain)
        .map_err(|e| ApiError::internal("AUTH_URL_ERROR", e))?;

    if query.redirect.as_deref() == Some("true") {
        Ok(Redirect::temporary(&auth_url).into_response())
    } else {
        Ok(Json(json!({
            "success": true,
            "authUrl": auth_url,
            "domain": domain
        }))
        .into_response())
    }
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub domain: Option<String>,
    pub redirect_uri: Option<String>,
}

/// OAuth callback. Bitrix24 may deliver either an authorization code or a
/// push-style install event on this route, via any method.
pub async fn callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let body_json: Option<Value> = serde_json::from_slice(&body).ok();

    if let Some(event) = body_json
        .as_ref()
        .filter(|b| b["event"] == "ONAPPINSTALL" && b["auth"].is_object())
    {
        let auth = parse_install_auth(event, "PROCESSING_ERROR")?;
        state
            .tokens
            .handle_install_event(auth)
            .await
            .map_err(|e| ApiError::internal("PROCESSING_ERROR", e))?;
        return Ok(install_success().into_response());
    }

    let code = query.code.clone().or_else(|| {
        body_json
            .as_ref()
            .and_then(|b| b["code"].as_str().map(String::from))
    });
    let domain = query
        .domain
        .clone()
        .or_else(|| {
            body_json
                .as_ref()
                .and_then(|b| b["domain"].as_str().map(String::from))
        })
        .unwrap_or_else(|| state.default_domain.clone());

    let Some(code) = code else {
        return Err(ApiError::BadRequest {
            code: "MISSING_PARAMS",
            message: "Missing required parameter: code".to_string(),
        });
    };

    let record = state
        .tokens
        .exchange_code(&code, &domain)
        .await
        .map_err(|e| ApiError::internal("PROCESSING_ERROR", e))?;

    info!("Authentication completed for domain: {}", record.domain);

    if let Some(redirect_uri) = query.redirect_uri {
        return Ok(Redirect::temporary(&redirect_uri).into_response());
    }

    Ok(Json(json!({
        "success": true,
        "message": "Authentication successful",
        "domain": record.domain
    }))
    .into_response())
}

/// Persist tokens pushed by a Bitrix24 app installation event.
pub async fn install_event(
    State(state): State<AppState>,
    Json(event): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    if event["event"] != "ONAPPINSTALL" || !event["auth"].is_object() {
        return Err(ApiError::BadRequest {
            code: "INVALID_EVENT",
            message: "Invalid or missing event data".to_string(),
        });
    }

    let auth = parse_install_auth(&event, "INSTALL_ERROR")?;
    state
        .tokens
        .handle_install_event(auth)
        .await
        .map_err(|e| ApiError::internal("INSTALL_ERROR", e))?;

    Ok(install_success())
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub domain: Option<String>,
}

/// Report authentication status for a domain.
pub async fn check_status(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Json<Value> {
    let domain = query
        .domain
        .unwrap_or_else(|| state.default_domain.clone());
    let status = state.tokens.status(&domain).await;

    Json(json!({
        "success": true,
        "authenticated": status.authenticated,
        "domain": status.domain,
        "expires": status.expires
    }))
}

fn parse_install_auth(event: &Value, error_code: &'static str) -> Result<InstallAuth, ApiError> {
    serde_json::from_value(event["auth"].clone())
        .map_err(|e| ApiError::internal(error_code, format!("Invalid installation data: {}", e)))
}

fn install_success() -> Json<Value> {
    Json(json!({
        "success": true,
        "message": "Installation event processed successfully"
    }))
}
