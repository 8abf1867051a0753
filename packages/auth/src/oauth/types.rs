// ABOUTME: Core type definitions for Bitrix24 OAuth token management
// ABOUTME: Includes stored token records, provider token responses, and install-event payloads

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Lifetime assumed when the provider omits `expires_in` (one hour).
pub const DEFAULT_EXPIRY_SECS: u64 = 3600;

/// Tokens are treated as expired this long before their nominal expiry,
/// covering clock skew and in-flight request latency.
const EXPIRY_BUFFER_MILLIS: i64 = 5 * 60 * 1000;

/// OAuth token record persisted per domain in the token file.
///
/// A domain has at most one record; writes replace it wholesale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRecord {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub domain: String,
    /// Lifetime in seconds granted at issuance. Absent on records written
    /// by older builds; such records cannot be judged fresh.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    /// Local epoch-millisecond timestamp stamped by the store on write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<i64>,
    /// Tenant-specific REST base URL, e.g. `https://{domain}/rest/`.
    pub client_endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl TokenRecord {
    /// Nominal expiry instant in epoch milliseconds, if the record carries
    /// enough metadata to compute one.
    pub fn expires_at_millis(&self) -> Option<i64> {
        let saved_at = self.saved_at?;
        let expires_in = self.expires_in?;
        Some(saved_at + (expires_in as i64) * 1000)
    }

    /// Check expiry against an explicit clock, with the 5-minute buffer.
    /// Missing expiry metadata is treated as expired.
    pub fn is_expired_at(&self, now_millis: i64) -> bool {
        match self.expires_at_millis() {
            Some(expiry) => now_millis > expiry - EXPIRY_BUFFER_MILLIS,
            None => true,
        }
    }

    /// Check if the token is expired (with 5-minute buffer).
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_millis())
    }
}

pub(crate) fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Token response from the Bitrix24 OAuth endpoint.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_in: Option<u64>,
    pub member_id: Option<String>,
    pub client_endpoint: Option<String>,
    pub scope: Option<String>,
}

/// Auth payload delivered by a Bitrix24 ONAPPINSTALL event.
#[derive(Debug, Clone, Deserialize)]
pub struct InstallAuth {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub domain: Option<String>,
    pub expires_in: Option<u64>,
    /// Absolute expiry in epoch seconds, sent by some event variants.
    pub expires: Option<i64>,
    pub member_id: Option<String>,
    pub client_endpoint: Option<String>,
    pub application_token: Option<String>,
    pub status: Option<String>,
    pub scope: Option<String>,
}
