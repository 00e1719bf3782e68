//! Thin user endpoints in front of the user directory.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::UserId;
use domain::{UserDirectory, UserProfile};
use serde::{Deserialize, Serialize};
use ticket_store::{HoldStore, InventoryStore, OrderStore};
use uuid::Uuid;

use crate::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl UserResponse {
    fn from_profile(profile: &UserProfile) -> Self {
        Self {
            id: profile.id.to_string(),
            name: profile.name.clone(),
            email: profile.email.clone(),
        }
    }
}

/// POST /users — register a user.
#[tracing::instrument(skip(state, req))]
pub async fn create<I, O, H, U>(
    State(state): State<Arc<AppState<I, O, H, U>>>,
    Json(req): Json<CreateUserRequest>,
) -> Result<(axum::http::StatusCode, Json<UserResponse>), ApiError>
where
    I: InventoryStore + Clone + 'static,
    O: OrderStore + Clone + 'static,
    H: HoldStore + Clone + 'static,
    U: UserDirectory + Clone + 'static,
{
    let name = req.name.trim();
    let email = req.email.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("name is required".to_string()));
    }
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::BadRequest("valid email is required".to_string()));
    }

    let profile = state
        .users
        .register(name.to_string(), email.to_string())
        .await?;

    Ok((
        axum::http::StatusCode::CREATED,
        Json(UserResponse::from_profile(&profile)),
    ))
}

/// GET /users/{id} — look up a user.
#[tracing::instrument(skip(state))]
pub async fn get<I, O, H, U>(
    State(state): State<Arc<AppState<I, O, H, U>>>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserResponse>, ApiError>
where
    I: InventoryStore + Clone + 'static,
    O: OrderStore + Clone + 'static,
    H: HoldStore + Clone + 'static,
    U: UserDirectory + Clone + 'static,
{
    let profile = state
        .users
        .get(UserId::from_uuid(id))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("user {id} not found")))?;
    Ok(Json(UserResponse::from_profile(&profile)))
}
