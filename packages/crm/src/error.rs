use thiserror::Error;

use bridge24_auth::AuthError;

pub type CrmResult<T> = Result<T, CrmError>;

/// Remote CRM call errors
#[derive(Error, Debug)]
pub enum CrmError {
    #[error("Method is required")]
    MethodRequired,

    #[error("No tokens found for domain: {0}")]
    NoTokens(String),

    #[error("Authorization rejected by Bitrix24 after token refresh")]
    Unauthorized,

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Rate limited by Bitrix24: {0}")]
    RateLimited(String),

    #[error("Bitrix24 API error {code}: {description}")]
    Api { code: String, description: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl CrmError {
    /// Map a Bitrix24 error envelope onto the taxonomy. Unrecognized codes
    /// pass through unchanged with the provider's description.
    pub fn from_api_error(code: &str, description: String) -> Self {
        match code {
            "QUERY_LIMIT_EXCEEDED" => CrmError::RateLimited(description),
            "ACCESS_DENIED" | "insufficient_scope" => CrmError::AccessDenied(description),
            _ => CrmError::Api {
                code: code.to_string(),
                description,
            },
        }
    }
}
