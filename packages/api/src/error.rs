use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use bridge24_auth::AuthError;
use bridge24_contacts::ContactError;
use bridge24_crm::CrmError;

/// API error taxonomy mapped onto HTTP status codes.
///
/// Remote-call failures bubble unmodified through the composition service
/// to here; this is the single place status codes are chosen.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Missing required fields")]
    Validation { missing: Vec<String> },

    #[error("{message}")]
    BadRequest {
        code: &'static str,
        message: String,
    },

    #[error("{message}")]
    AuthRequired {
        code: &'static str,
        message: String,
        details: Option<String>,
        auth_url: Option<String>,
    },

    #[error("You don't have permission to perform this action")]
    Forbidden { details: String },

    #[error("{message}")]
    NotFound { message: String },

    #[error("Too many requests. Please try again later.")]
    RateLimited { details: String },

    /// Opaque passthrough of a provider error code and description.
    #[error("{message}")]
    Remote { code: String, message: String },

    #[error("{message}")]
    Internal {
        code: &'static str,
        message: String,
    },
}

impl ApiError {
    pub fn internal(code: &'static str, message: impl ToString) -> Self {
        ApiError::Internal {
            code,
            message: message.to_string(),
        }
    }

    pub fn auth_required(code: &'static str, message: impl ToString, domain: &str) -> Self {
        ApiError::AuthRequired {
            code,
            message: message.to_string(),
            details: None,
            auth_url: Some(format!("/auth/login?domain={}", domain)),
        }
    }

    /// Map a composition-service failure, attaching a login hint to
    /// authentication failures for the given domain.
    pub fn from_contact_error(err: ContactError, domain: &str) -> Self {
        match err {
            ContactError::Validation { missing } => ApiError::Validation { missing },
            ContactError::ContactNotFound(_)
            | ContactError::RequisiteNotFound(_)
            | ContactError::AddressNotFound(_)
            | ContactError::BankDetailNotFound(_) => ApiError::NotFound {
                message: err.to_string(),
            },
            ContactError::Crm(crm) => Self::from_crm_error(crm, domain),
        }
    }

    fn from_crm_error(err: CrmError, domain: &str) -> Self {
        match err {
            CrmError::AccessDenied(details) => ApiError::Forbidden { details },
            CrmError::RateLimited(details) => ApiError::RateLimited { details },
            CrmError::Api { code, description } => ApiError::Remote {
                code,
                message: description,
            },
            CrmError::NoTokens(_) => ApiError::AuthRequired {
                code: "AUTHENTICATION_REQUIRED",
                message: "Bitrix24 authentication is required".to_string(),
                details: Some(err.to_string()),
                auth_url: Some(format!("/auth/login?domain={}", domain)),
            },
            CrmError::Unauthorized => ApiError::AuthRequired {
                code: "AUTHENTICATION_ERROR",
                message: "Authentication required or token invalid".to_string(),
                details: Some(err.to_string()),
                auth_url: Some(format!("/auth/login?domain={}", domain)),
            },
            CrmError::Auth(auth) => match auth {
                AuthError::RefreshFailed(_) | AuthError::NoRefreshToken(_) => {
                    ApiError::AuthRequired {
                        code: "TOKEN_REFRESH_FAILED",
                        message: "Authentication session has expired".to_string(),
                        details: Some(auth.to_string()),
                        auth_url: Some(format!("/auth/login?domain={}", domain)),
                    }
                }
                other => ApiError::internal("AUTH_CHECK_ERROR", other),
            },
            other => ApiError::internal("INTERNAL_SERVER_ERROR", other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Validation { missing } => (
                StatusCode::BAD_REQUEST,
                json!({
                    "error": "Missing required fields",
                    "missingFields": missing
                }),
            ),
            ApiError::BadRequest { code, message } => (
                StatusCode::BAD_REQUEST,
                json!({
                    "success": false,
                    "error": code,
                    "message": message
                }),
            ),
            ApiError::AuthRequired {
                code,
                message,
                details,
                auth_url,
            } => (
                StatusCode::UNAUTHORIZED,
                json!({
                    "success": false,
                    "error": code,
                    "message": message,
                    "details": details,
                    "authUrl": auth_url
                }),
            ),
            ApiError::Forbidden { details } => (
                StatusCode::FORBIDDEN,
                json!({
                    "error": "FORBIDDEN",
                    "message": "You don't have permission to perform this action",
                    "details": details
                }),
            ),
            ApiError::NotFound { message } => (
                StatusCode::NOT_FOUND,
                json!({
                    "error": "NOT_FOUND",
                    "message": message
                }),
            ),
            ApiError::RateLimited { details } => (
                StatusCode::TOO_MANY_REQUESTS,
                json!({
                    "error": "RATE_LIMITED",
                    "message": "Too many requests. Please try again later.",
                    "details": details
                }),
            ),
            ApiError::Remote { code, message } => (
                StatusCode::BAD_REQUEST,
                json!({
                    "error": code,
                    "message": message
                }),
            ),
            ApiError::Internal { code, message } => {
                error!("Internal error ({}): {}", code, message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "success": false,
                        "error": code,
                        "message": message
                    }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
