//! Availability listing.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use common::{EventId, Money};
use domain::{AvailabilityRow, UserDirectory};
use serde::{Deserialize, Serialize};
use ticket_store::{HoldStore, InventoryStore, OrderStore, TicketFilter, TicketKind};
use uuid::Uuid;

use crate::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct TicketQuery {
    #[serde(rename = "eventId")]
    pub event_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(rename = "minPrice")]
    pub min_price: Option<i64>,
    #[serde(rename = "maxPrice")]
    pub max_price: Option<i64>,
    pub seat: Option<String>,
}

#[derive(Serialize)]
pub struct TicketRow {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub seat: Option<String>,
    pub price_cents: i64,
    pub available: usize,
}

#[derive(Serialize)]
pub struct TicketListResponse {
    pub data: Vec<TicketRow>,
    pub meta: TicketListMeta,
}

#[derive(Serialize)]
pub struct TicketListMeta {
    pub total: usize,
}

fn build_filter(query: &TicketQuery) -> Result<TicketFilter, ApiError> {
    let mut filter = TicketFilter {
        min_price: query.min_price.map(Money::from_cents),
        max_price: query.max_price.map(Money::from_cents),
        ..TicketFilter::default()
    };

    if let Some(ref kind) = query.kind {
        filter.kind = match kind.trim() {
            "GA" => Some(TicketKind::GeneralAdmission),
            "seat" => Some(TicketKind::Seat),
            _ => {
                return Err(ApiError::BadRequest(
                    "type must be GA or seat".to_string(),
                ));
            }
        };
    }

    if let Some(ref seat) = query.seat {
        let trimmed = seat.trim();
        let upper = trimmed.to_ascii_uppercase();
        match upper.as_str() {
            "" | "ALL" => {}
            "GA" | "GENERAL" | "GENERAL ADMISSION" => {
                filter.kind = Some(TicketKind::GeneralAdmission);
            }
            _ => filter.seat_prefix = Some(trimmed.to_string()),
        }
    }

    Ok(filter)
}

/// GET /tickets?eventId=&type=&minPrice=&maxPrice=&seat= — the
/// availability view: everything not sold, not pending, and not held in
/// any live cart.
#[tracing::instrument(skip(state))]
pub async fn list<I, O, H, U>(
    State(state): State<Arc<AppState<I, O, H, U>>>,
    Query(query): Query<TicketQuery>,
) -> Result<Json<TicketListResponse>, ApiError>
where
    I: InventoryStore + Clone + 'static,
    O: OrderStore + Clone + 'static,
    H: HoldStore + Clone + 'static,
    U: UserDirectory + Clone + 'static,
{
    let event_id = query
        .event_id
        .ok_or_else(|| ApiError::BadRequest("eventId is required".to_string()))?;
    let filter = build_filter(&query)?;

    let view = state
        .resolver
        .list_available(EventId::from_uuid(event_id), &filter)
        .await?;

    let data: Vec<TicketRow> = view
        .rows
        .into_iter()
        .map(|row| match row {
            AvailabilityRow::GeneralAdmission { price, available } => TicketRow {
                id: "GA".to_string(),
                kind: "GA",
                seat: None,
                price_cents: price.cents(),
                available,
            },
            AvailabilityRow::Seat {
                ticket_id,
                seat,
                price,
            } => TicketRow {
                id: ticket_id.to_string(),
                kind: "seat",
                seat: Some(seat),
                price_cents: price.cents(),
                available: 1,
            },
        })
        .collect();

    let total = data.len();
    Ok(Json(TicketListResponse {
        data,
        meta: TicketListMeta { total },
    }))
}
