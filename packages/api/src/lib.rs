// ABOUTME: HTTP API layer for Bridge24 providing REST endpoints and routing
// ABOUTME: Integration layer over the auth, crm, and contacts packages

use axum::{
    middleware,
    routing::{any, delete, get, post, put},
    Router,
};

pub mod auth_handlers;
pub mod contact_handlers;
pub mod error;
pub mod guard;
pub mod state;

pub use error::ApiError;
pub use state::AppState;

/// Creates the OAuth router mounted under `/auth`
pub fn create_auth_router() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth_handlers::login))
        .route("/callback", any(auth_handlers::callback))
        .route("/install-event", post(auth_handlers::install_event))
        .route("/status", get(auth_handlers::check_status))
}

/// Creates the contacts router mounted under `/api/contact`, gated by the
/// token-checking middleware
pub fn create_contacts_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(contact_handlers::list_contacts))
        .route("/", post(contact_handlers::create_contact))
        .route("/{id}", put(contact_handlers::update_contact))
        .route("/{id}", delete(contact_handlers::delete_contact))
        .route_layer(middleware::from_fn_with_state(state, guard::require_auth))
}
