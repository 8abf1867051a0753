use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use bridge24_auth::{TokenManager, TokenRecord};

use crate::error::{CrmError, CrmResult};

/// Outcome of a single dispatch, before the self-healing retry decision.
enum Dispatch {
    Ok(Value),
    Unauthorized,
}

/// Client for the Bitrix24 REST API.
///
/// Calls are method-per-URL (`{endpoint}{method}.json`) with the access
/// token as a bearer credential and a JSON body. An expired token is
/// refreshed once before dispatch; a 401 from the remote after a
/// fresh-looking token gets exactly one refresh-and-retry cycle.
#[derive(Clone)]
pub struct CrmClient {
    http_client: Client,
    tokens: Arc<TokenManager>,
}

impl CrmClient {
    pub fn new(tokens: Arc<TokenManager>) -> CrmResult<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| CrmError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            tokens,
        })
    }

    /// Call a Bitrix24 REST method and return its `result` payload.
    pub async fn call(&self, method: &str, params: Value, domain: &str) -> CrmResult<Value> {
        if method.is_empty() {
            return Err(CrmError::MethodRequired);
        }

        let mut record = self
            .tokens
            .get_tokens(domain)
            .await?
            .ok_or_else(|| CrmError::NoTokens(domain.to_string()))?;

        if self.tokens.is_expired(domain).await {
            debug!("Token expired for {}, refreshing before {}", domain, method);
            record = self.tokens.refresh(domain).await?;
        }

        match self.dispatch(method, &params, &record).await? {
            Dispatch::Ok(result) => Ok(result),
            Dispatch::Unauthorized => {
                // The remote rejected a token we believed fresh. One
                // refresh-and-retry cycle, then give up.
                warn!("Bitrix24 rejected token for {}, retrying once", domain);
                let record = self.tokens.refresh(domain).await?;
                match self.dispatch(method, &params, &record).await? {
                    Dispatch::Ok(result) => Ok(result),
                    Dispatch::Unauthorized => Err(CrmError::Unauthorized),
                }
            }
        }
    }

    async fn dispatch(
        &self,
        method: &str,
        params: &Value,
        record: &TokenRecord,
    ) -> CrmResult<Dispatch> {
        let url = format!("{}{}.json", record.client_endpoint, method);
        debug!("Calling Bitrix24 method: {}", method);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&record.access_token)
            .json(params)
            .send()
            .await
            .map_err(|e| CrmError::Network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Ok(Dispatch::Unauthorized);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| CrmError::InvalidResponse(e.to_string()))?;

        if let Some(code) = body.get("error").and_then(Value::as_str) {
            let description = body
                .get("error_description")
                .and_then(Value::as_str)
                .unwrap_or(code)
                .to_string();
            warn!("Bitrix24 API error ({}): {}", method, code);
            return Err(CrmError::from_api_error(code, description));
        }

        if !status.is_success() {
            return Err(CrmError::Http(status.to_string()));
        }

        Ok(Dispatch::Ok(body.get("result").cloned().unwrap_or(Value::Null)))
    }
}
