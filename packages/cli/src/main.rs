use axum::{http::Method, routing::get, Json, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use bridge24_api::{create_auth_router, create_contacts_router, AppState};
use bridge24_auth::{OAuthConfig, TokenManager, TokenStore};
use bridge24_contacts::ContactService;
use bridge24_crm::CrmClient;

mod config;

use config::Config;

async fn root() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "bridge24",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    let store = TokenStore::new(&config.tokens_file);
    let oauth = OAuthConfig::new(
        config.client_id.clone(),
        config.client_secret.clone(),
        config.redirect_uri.clone(),
    );
    let tokens = Arc::new(TokenManager::new(store, oauth));
    let contacts = ContactService::new(CrmClient::new(tokens.clone())?);
    let state = AppState::new(tokens, contacts, config.default_domain.clone());

    // Create CORS layer
    let cors = CorsLayer::new()
        .allow_origin(config.cors_origin.parse::<axum::http::HeaderValue>()?)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(root))
        .nest("/auth", create_auth_router())
        .nest("/api/contact", create_contacts_router(state.clone()))
        .with_state(state)
        .layer(cors);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    info!("Bridge24 server listening on http://{}", addr);
    info!("Default Bitrix24 domain: {}", config.default_domain);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
