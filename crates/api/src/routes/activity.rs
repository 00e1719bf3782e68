//! Activity log endpoints.
//!
//! Served from the best-effort activity read model; entries may lag or be
//! missing and that is fine.

use std::sync::Arc;

use analytics::ActivityRecord;
use axum::Json;
use axum::extract::{Path, State};
use common::{EventId, UserId};
use domain::UserDirectory;
use serde::Serialize;
use ticket_store::{HoldStore, InventoryStore, OrderStore};
use uuid::Uuid;

use crate::AppState;
use crate::error::ApiError;

#[derive(Serialize)]
pub struct ActivityResponse {
    pub data: Vec<ActivityRecord>,
}

/// GET /activity/user/{id} — a user's recent cart activity, newest first.
#[tracing::instrument(skip(state))]
pub async fn for_user<I, O, H, U>(
    State(state): State<Arc<AppState<I, O, H, U>>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ActivityResponse>, ApiError>
where
    I: InventoryStore + Clone + 'static,
    O: OrderStore + Clone + 'static,
    H: HoldStore + Clone + 'static,
    U: UserDirectory + Clone + 'static,
{
    let data = state.activity.for_user(UserId::from_uuid(id)).await;
    Ok(Json(ActivityResponse { data }))
}

/// GET /activity/event/{id} — an event's recent activity, newest first.
#[tracing::instrument(skip(state))]
pub async fn for_event<I, O, H, U>(
    State(state): State<Arc<AppState<I, O, H, U>>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ActivityResponse>, ApiError>
where
    I: InventoryStore + Clone + 'static,
    O: OrderStore + Clone + 'static,
    H: HoldStore + Clone + 'static,
    U: UserDirectory + Clone + 'static,
{
    let data = state.activity.for_event(EventId::from_uuid(id)).await;
    Ok(Json(ActivityResponse { data }))
}
