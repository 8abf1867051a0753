// ABOUTME: HTTP request handlers for the composed contact resource
// ABOUTME: Create, update, delete, and list full contacts via the composition service

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde_json::{json, Value};
use tracing::info;

use bridge24_contacts::ContactInput;

use crate::{error::ApiError, guard::CrmDomain, state::AppState};

/// List all contacts, enriched with address and bank details.
pub async fn list_contacts(
    State(state): State<AppState>,
    Extension(CrmDomain(domain)): Extension<CrmDomain>,
) -> Result<Json<Value>, ApiError> {
    let contacts = state
        .contacts
        .list(&domain)
        .await
        .map_err(|e| ApiError::from_contact_error(e, &domain))?;

    Ok(Json(json!({
        "success": true,
        "message": "Contacts retrieved successfully",
        "data": contacts
    })))
}

/// Create a new contact with requisite, address, and bank detail.
pub async fn create_contact(
    State(state): State<AppState>,
    Extension(CrmDomain(domain)): Extension<CrmDomain>,
    Json(input): Json<ContactInput>,
) -> Result<impl IntoResponse, ApiError> {
    let created = state
        .contacts
        .create(&input, &domain)
        .await
        .map_err(|e| ApiError::from_contact_error(e, &domain))?;

    info!("Created contact via API");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Contact created successfully with all details",
            "data": created
        })),
    ))
}

/// Update an existing contact and its linked sub-entities.
pub async fn update_contact(
    State(state): State<AppState>,
    Extension(CrmDomain(domain)): Extension<CrmDomain>,
    Path(id): Path<String>,
    Json(input): Json<ContactInput>,
) -> Result<Json<Value>, ApiError> {
    let updated = state
        .contacts
        .update(&id, &input, &domain)
        .await
        .map_err(|e| ApiError::from_contact_error(e, &domain))?;

    Ok(Json(json!({
        "message": "Contact updated successfully",
        "data": updated
    })))
}

/// Delete a contact and everything linked under it.
pub async fn delete_contact(
    State(state): State<AppState>,
    Extension(CrmDomain(domain)): Extension<CrmDomain>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state
        .contacts
        .delete(&id, &domain)
        .await
        .map_err(|e| ApiError::from_contact_error(e, &domain))?;

    Ok(Json(json!({
        "success": true,
        "message": "Contact deleted successfully",
        "data": { "contactId": id }
    })))
}
