use std::env;
use std::num::ParseIntError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid port number: {0}")]
    InvalidPort(#[from] ParseIntError),
    #[error("Port {0} is out of valid range (1-65535)")]
    PortOutOfRange(u16),
}

#[derive(Debug)]
pub struct Config {
    pub port: u16,
    pub cors_origin: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub default_domain: String,
    pub tokens_file: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let port_str = env::var("PORT").unwrap_or_else(|_| "3000".to_string());

        let port = port_str.parse::<u16>()?;

        if port == 0 {
            return Err(ConfigError::PortOutOfRange(port));
        }

        let cors_origin =
            env::var("CORS_ORIGIN").unwrap_or_else(|_| "http://localhost:5173".to_string());

        // App credentials may be absent until the Bitrix24 app is
        // registered; the login route reports the missing configuration.
        let client_id = env::var("BITRIX24_CLIENT_ID").unwrap_or_default();
        let client_secret = env::var("BITRIX24_CLIENT_SECRET").unwrap_or_default();
        let redirect_uri = env::var("BITRIX24_REDIRECT_URI").unwrap_or_default();
        let default_domain = env::var("BITRIX24_DOMAIN").unwrap_or_default();

        let tokens_file = env::var("BITRIX24_TOKENS_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("storage/tokens.json"));

        Ok(Config {
            port,
            cors_origin,
            client_id,
            client_secret,
            redirect_uri,
            default_domain,
            tokens_file,
        })
    }
}
