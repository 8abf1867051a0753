// ABOUTME: File-backed storage for Bitrix24 OAuth tokens
// ABOUTME: Persists one JSON map of domain to token record, no schema version

use std::collections::HashMap;
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, warn};

use crate::{
    error::AuthResult,
    oauth::types::{now_millis, TokenRecord},
};

/// Token store writing a single JSON file mapping domain -> TokenRecord.
///
/// Reads are lenient: a missing or unparseable file yields an empty map.
/// Writes replace the whole file.
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Get the record for a domain, if one is stored.
    pub async fn get(&self, domain: &str) -> AuthResult<Option<TokenRecord>> {
        let records = self.read_all().await?;
        Ok(records.get(domain).cloned())
    }

    /// Store the record for a domain, stamping `saved_at`. Replaces any
    /// previous record for that domain wholesale.
    pub async fn put(&self, domain: &str, mut record: TokenRecord) -> AuthResult<TokenRecord> {
        record.saved_at = Some(now_millis());

        let mut records = self.read_all().await?;
        records.insert(domain.to_string(), record.clone());
        self.write_all(&records).await?;

        debug!("Stored token record for domain: {}", domain);
        Ok(record)
    }

    /// Read every stored record.
    pub async fn read_all(&self) -> AuthResult<HashMap<String, TokenRecord>> {
        match fs::read_to_string(&self.path).await {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(records) => Ok(records),
                Err(e) => {
                    warn!("Failed to parse token file {:?}: {}", self.path, e);
                    Ok(HashMap::new())
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Token file {:?} does not exist yet", self.path);
                Ok(HashMap::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn write_all(&self, records: &HashMap<String, TokenRecord>) -> AuthResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let json_content = serde_json::to_string_pretty(records)?;
        fs::write(&self.path, json_content).await?;
        Ok(())
    }
}
