//! Cached per-event sales aggregates.
//!
//! The summary is computed lazily and cached; the feed worker drops the
//! cache whenever order data changes.

use std::collections::HashSet;
use std::sync::Arc;

use analytics::SalesSummary;
use axum::Json;
use axum::extract::{Path, State};
use common::EventId;
use domain::UserDirectory;
use ticket_store::{HoldStore, InventoryStore, OrderStore, TicketFilter};
use uuid::Uuid;

use crate::AppState;
use crate::error::ApiError;

/// GET /analytics/events/{id} — sales summary over paid orders.
#[tracing::instrument(skip(state))]
pub async fn event_sales<I, O, H, U>(
    State(state): State<Arc<AppState<I, O, H, U>>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SalesSummary>, ApiError>
where
    I: InventoryStore + Clone + 'static,
    O: OrderStore + Clone + 'static,
    H: HoldStore + Clone + 'static,
    U: UserDirectory + Clone + 'static,
{
    let event_id = EventId::from_uuid(id);
    if state.inventory.get_event(event_id).await?.is_none() {
        return Err(ApiError::NotFound(format!("event {id} not found")));
    }

    if let Some(cached) = state.analytics.get(event_id).await {
        return Ok(Json(cached));
    }

    let orders = state.orders.list().await?;
    let event_tickets: HashSet<_> = state
        .inventory
        .list_by_event(event_id, &TicketFilter::default())
        .await?
        .into_iter()
        .map(|u| u.id)
        .collect();

    let summary = SalesSummary::compute(event_id, &orders, &event_tickets);
    state.analytics.store(summary.clone()).await;
    Ok(Json(summary))
}
