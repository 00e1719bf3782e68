//! Event catalog endpoints.
//!
//! Creating an event also generates its full ticket inventory atomically;
//! an event never exists with a half-created inventory.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use chrono::{DateTime, Utc};
use common::{EventId, Money, UserId};
use domain::{MarketEvent, UserDirectory};
use serde::{Deserialize, Serialize};
use ticket_store::{
    EventDraft, EventRecord, HoldStore, InventorySpec, InventoryStore, OrderStore,
};
use uuid::Uuid;

use crate::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    pub venue: String,
    pub starts_at: DateTime<Utc>,
    pub description: Option<String>,
    pub inventory: Option<InventoryRequest>,
}

#[derive(Deserialize)]
pub struct InventoryRequest {
    pub ga_count: u32,
    pub ga_price_cents: i64,
    #[serde(default)]
    pub seat_labels: Vec<String>,
    pub seat_price_cents: i64,
}

impl InventoryRequest {
    fn into_spec(self) -> InventorySpec {
        InventorySpec {
            ga_count: self.ga_count,
            ga_price: Money::from_cents(self.ga_price_cents),
            seat_labels: self.seat_labels,
            seat_price: Money::from_cents(self.seat_price_cents),
        }
    }
}

#[derive(Serialize)]
pub struct EventResponse {
    pub id: String,
    pub title: String,
    pub venue: String,
    pub starts_at: String,
    pub description: Option<String>,
    pub created_at: String,
}

impl EventResponse {
    fn from_record(event: &EventRecord) -> Self {
        Self {
            id: event.id.to_string(),
            title: event.title.clone(),
            venue: event.venue.clone(),
            starts_at: event.starts_at.to_rfc3339(),
            description: event.description.clone(),
            created_at: event.created_at.to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
pub struct EventCreatedResponse {
    #[serde(flatten)]
    pub event: EventResponse,
    pub ticket_count: usize,
}

#[derive(Serialize)]
pub struct EventListResponse {
    pub data: Vec<EventResponse>,
}

#[derive(Debug, Deserialize)]
pub struct ViewerQuery {
    #[serde(rename = "userId")]
    pub user_id: Option<Uuid>,
}

/// POST /events — create an event with its ticket inventory.
#[tracing::instrument(skip(state, req))]
pub async fn create<I, O, H, U>(
    State(state): State<Arc<AppState<I, O, H, U>>>,
    Json(req): Json<CreateEventRequest>,
) -> Result<(axum::http::StatusCode, Json<EventCreatedResponse>), ApiError>
where
    I: InventoryStore + Clone + 'static,
    O: OrderStore + Clone + 'static,
    H: HoldStore + Clone + 'static,
    U: UserDirectory + Clone + 'static,
{
    if req.title.trim().is_empty() {
        return Err(ApiError::BadRequest("title is required".to_string()));
    }
    if req.venue.trim().is_empty() {
        return Err(ApiError::BadRequest("venue is required".to_string()));
    }

    let spec = req
        .inventory
        .map(InventoryRequest::into_spec)
        .unwrap_or_default();

    let mut draft = EventDraft::new(req.title.trim(), req.venue.trim(), req.starts_at);
    draft.description = req.description.filter(|d| !d.trim().is_empty());

    let (event, units) = state.inventory.create_event(draft, spec).await?;

    // New inventory changes availability; stale aggregates go.
    state.feed.publish(MarketEvent::OrdersChanged);

    Ok((
        axum::http::StatusCode::CREATED,
        Json(EventCreatedResponse {
            event: EventResponse::from_record(&event),
            ticket_count: units.len(),
        }),
    ))
}

/// GET /events — list events, newest first.
#[tracing::instrument(skip(state))]
pub async fn list<I, O, H, U>(
    State(state): State<Arc<AppState<I, O, H, U>>>,
) -> Result<Json<EventListResponse>, ApiError>
where
    I: InventoryStore + Clone + 'static,
    O: OrderStore + Clone + 'static,
    H: HoldStore + Clone + 'static,
    U: UserDirectory + Clone + 'static,
{
    let events = state.inventory.list_events().await?;
    Ok(Json(EventListResponse {
        data: events.iter().map(EventResponse::from_record).collect(),
    }))
}

/// GET /events/{id} — load one event, recording the view.
#[tracing::instrument(skip(state))]
pub async fn get<I, O, H, U>(
    State(state): State<Arc<AppState<I, O, H, U>>>,
    Path(id): Path<Uuid>,
    Query(viewer): Query<ViewerQuery>,
) -> Result<Json<EventResponse>, ApiError>
where
    I: InventoryStore + Clone + 'static,
    O: OrderStore + Clone + 'static,
    H: HoldStore + Clone + 'static,
    U: UserDirectory + Clone + 'static,
{
    let event_id = EventId::from_uuid(id);
    let event = state
        .inventory
        .get_event(event_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("event {id} not found")))?;

    state.feed.publish(MarketEvent::EventViewed {
        user_id: viewer.user_id.map(UserId::from_uuid),
        event_id,
    });

    Ok(Json(EventResponse::from_record(&event)))
}
