// ABOUTME: Token lifecycle manager orchestrating Bitrix24 OAuth flows
// ABOUTME: Handles code exchange, refresh, install events, and auth status per domain

use std::collections::HashMap;
use std::sync::Arc;

use reqwest::Client;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{error, info};
use url::Url;

use crate::{
    error::{AuthError, AuthResult},
    oauth::{
        store::TokenStore,
        types::{InstallAuth, TokenRecord, TokenResponse, DEFAULT_EXPIRY_SECS},
    },
};

/// Bitrix24 OAuth token endpoint. Shared across tenants, unlike the
/// per-domain authorize URL.
pub const DEFAULT_TOKEN_URL: &str = "https://oauth.bitrix.info/oauth/token/";

/// OAuth application configuration, loaded from the environment by the server.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub token_url: String,
}

impl OAuthConfig {
    pub fn new(client_id: String, client_secret: String, redirect_uri: String) -> Self {
        Self {
            client_id,
            client_secret,
            redirect_uri,
            token_url: DEFAULT_TOKEN_URL.to_string(),
        }
    }

    /// Override the token endpoint (tests point this at a local server).
    pub fn with_token_url(mut self, token_url: String) -> Self {
        self.token_url = token_url;
        self
    }
}

/// Authentication status for a domain.
#[derive(Debug, Clone, Serialize)]
pub struct AuthStatus {
    pub authenticated: bool,
    pub domain: String,
    /// Nominal expiry in epoch milliseconds, when a record exists.
    pub expires: Option<i64>,
}

/// Token manager for the Bitrix24 OAuth lifecycle.
///
/// Refreshes and exchanges for the same domain are serialized by a
/// per-domain async mutex, so overlapping requests cannot double-write
/// the token file.
pub struct TokenManager {
    store: TokenStore,
    config: OAuthConfig,
    client: Client,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl TokenManager {
    pub fn new(store: TokenStore, config: OAuthConfig) -> Self {
        Self {
            store,
            config,
            client: Client::new(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// Get the stored token record for a domain.
    pub async fn get_tokens(&self, domain: &str) -> AuthResult<Option<TokenRecord>> {
        if domain.is_empty() {
            return Err(AuthError::DomainRequired);
        }
        self.store.get(domain).await
    }

    /// Check whether the domain's token is expired. An absent record or a
    /// record without expiry metadata counts as expired.
    pub async fn is_expired(&self, domain: &str) -> bool {
        match self.get_tokens(domain).await {
            Ok(Some(record)) => record.is_expired(),
            _ => true,
        }
    }

    /// Refresh the domain's tokens with a single attempt against the
    /// provider. No retry, no backoff.
    pub async fn refresh(&self, domain: &str) -> AuthResult<TokenRecord> {
        if domain.is_empty() {
            return Err(AuthError::DomainRequired);
        }

        let lock = self.domain_lock(domain).await;
        let _guard = lock.lock().await;

        let existing = self
            .store
            .get(domain)
            .await?
            .filter(|record| record.refresh_token.is_some())
            .ok_or_else(|| AuthError::NoRefreshToken(domain.to_string()))?;
        let refresh_token = existing.refresh_token.clone().unwrap_or_default();

        info!("Refreshing tokens for domain: {}", domain);

        let response = self
            .client
            .post(&self.config.token_url)
            .query(&[
                ("grant_type", "refresh_token"),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("refresh_token", refresh_token.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                error!("Token refresh request failed: {}", e);
                AuthError::RefreshFailed(domain.to_string())
            })?;

        if !response.status().is_success() {
            error!("Token refresh failed with status {}", response.status());
            return Err(AuthError::RefreshFailed(domain.to_string()));
        }

        let token_response: TokenResponse = response.json().await.map_err(|e| {
            error!("Failed to parse refresh response: {}", e);
            AuthError::RefreshFailed(domain.to_string())
        })?;

        let access_token = token_response
            .access_token
            .ok_or(AuthError::InvalidTokenResponse)?;

        let record = TokenRecord {
            access_token,
            // Bitrix24 rotates refresh tokens; keep the old one if the
            // response omits it.
            refresh_token: token_response.refresh_token.or(Some(refresh_token)),
            domain: domain.to_string(),
            expires_in: token_response.expires_in.or(existing.expires_in),
            saved_at: None,
            client_endpoint: token_response
                .client_endpoint
                .unwrap_or(existing.client_endpoint),
            member_id: token_response.member_id.or(existing.member_id),
            application_token: existing.application_token,
            scope: token_response.scope.or(existing.scope),
            status: existing.status,
        };

        let stored = self.store.put(domain, record).await?;
        info!("Refreshed tokens for domain: {}", domain);
        Ok(stored)
    }

    /// Exchange an authorization code for tokens and persist them.
    pub async fn exchange_code(&self, code: &str, domain: &str) -> AuthResult<TokenRecord> {
        if code.is_empty() || domain.is_empty() {
            return Err(AuthError::InvalidParams(
                "Code and domain are required".to_string(),
            ));
        }

        let lock = self.domain_lock(domain).await;
        let _guard = lock.lock().await;

        let response = self
            .client
            .post(&self.config.token_url)
            .query(&[
                ("grant_type", "authorization_code"),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", self.config.redirect_uri.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AuthError::TokenExchange(format!("Failed to exchange code: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            error!("Token exchange failed with status {}", status);
            return Err(AuthError::TokenExchange(format!(
                "Token exchange failed with status {}",
                status
            )));
        }

        let token_response: TokenResponse = response.json().await.map_err(|e| {
            AuthError::TokenExchange(format!("Failed to parse token response: {}", e))
        })?;

        let (access_token, refresh_token) = match (
            token_response.access_token,
            token_response.refresh_token,
        ) {
            (Some(access), Some(refresh)) => (access, refresh),
            _ => return Err(AuthError::InvalidTokenResponse),
        };

        let record = TokenRecord {
            access_token,
            refresh_token: Some(refresh_token),
            domain: domain.to_string(),
            expires_in: Some(token_response.expires_in.unwrap_or(DEFAULT_EXPIRY_SECS)),
            saved_at: None,
            client_endpoint: token_response
                .client_endpoint
                .unwrap_or_else(|| default_client_endpoint(domain)),
            member_id: token_response.member_id,
            application_token: None,
            scope: token_response.scope,
            status: None,
        };

        let stored = self.store.put(domain, record).await?;
        info!("Exchanged authorization code for domain: {}", domain);
        Ok(stored)
    }

    /// Persist tokens pushed by an ONAPPINSTALL event.
    pub async fn handle_install_event(&self, auth: InstallAuth) -> AuthResult<TokenRecord> {
        let domain = auth
            .domain
            .clone()
            .filter(|d| !d.is_empty())
            .ok_or_else(|| AuthError::InvalidParams("Invalid installation data".to_string()))?;

        let lock = self.domain_lock(&domain).await;
        let _guard = lock.lock().await;

        // Some event variants carry an absolute `expires` timestamp instead
        // of a relative lifetime.
        let expires_in = auth
            .expires_in
            .or_else(|| {
                auth.expires
                    .map(|expires| (expires - chrono::Utc::now().timestamp()).max(0) as u64)
            })
            .unwrap_or(DEFAULT_EXPIRY_SECS);

        let record = TokenRecord {
            access_token: auth.access_token,
            refresh_token: auth.refresh_token,
            domain: domain.clone(),
            expires_in: Some(expires_in),
            saved_at: None,
            client_endpoint: auth
                .client_endpoint
                .unwrap_or_else(|| default_client_endpoint(&domain)),
            member_id: auth.member_id,
            application_token: auth.application_token,
            scope: auth.scope,
            status: auth.status,
        };

        let stored = self.store.put(&domain, record).await?;
        info!("Processed install event for domain: {}", domain);
        Ok(stored)
    }

    /// Build the Bitrix24 authorize URL for a domain.
    pub fn auth_url(&self, domain: &str) -> AuthResult<String> {
        if self.config.client_id.is_empty() || self.config.redirect_uri.is_empty() {
            return Err(AuthError::Configuration(
                "Missing required configuration: CLIENT_ID or REDIRECT_URI".to_string(),
            ));
        }

        let mut url = Url::parse(&format!("https://{}/oauth/authorize/", domain))
            .map_err(|e| AuthError::Configuration(format!("Invalid domain: {}", e)))?;

        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", &self.config.redirect_uri);

        Ok(url.to_string())
    }

    /// Report authentication status for a domain.
    pub async fn status(&self, domain: &str) -> AuthStatus {
        let record = self.get_tokens(domain).await.ok().flatten();
        let expires = record.as_ref().and_then(|r| r.expires_at_millis());
        let authenticated = record.map(|r| !r.is_expired()).unwrap_or(false);

        AuthStatus {
            authenticated,
            domain: domain.to_string(),
            expires,
        }
    }

    async fn domain_lock(&self, domain: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(domain.to_string()).or_default().clone()
    }
}

fn default_client_endpoint(domain: &str) -> String {
    format!("https://{}/rest/", domain)
}
