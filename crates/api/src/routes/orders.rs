//! Order endpoints: create, read, pay, cancel.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::{EventId, OrderId, TicketId, UserId};
use domain::{LineRequest, UserDirectory};
use serde::{Deserialize, Serialize};
use ticket_store::{HoldStore, InventoryStore, OrderRecord, OrderStore};
use uuid::Uuid;

use crate::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub user_id: Uuid,
    pub event_id: Option<Uuid>,
    pub items: Vec<OrderItemRequest>,
}

/// One order line: either a specific ticket or a GA quantity.
#[derive(Deserialize)]
#[serde(untagged)]
pub enum OrderItemRequest {
    Specific { ticket_id: Uuid },
    GeneralAdmission { general_admission: u32 },
}

impl OrderItemRequest {
    fn into_line_request(self) -> LineRequest {
        match self {
            OrderItemRequest::Specific { ticket_id } => {
                LineRequest::specific(TicketId::from_uuid(ticket_id))
            }
            OrderItemRequest::GeneralAdmission { general_admission } => {
                LineRequest::general_admission(general_admission)
            }
        }
    }
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub user_id: String,
    pub status: String,
    pub created_at: String,
    pub paid_at: Option<String>,
    pub total_cents: i64,
    pub items: Vec<OrderLineResponse>,
}

#[derive(Serialize)]
pub struct OrderLineResponse {
    pub ticket_id: String,
    pub price_cents: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub seat: Option<String>,
}

impl OrderResponse {
    pub fn from_record(order: &OrderRecord) -> Self {
        Self {
            id: order.id.to_string(),
            user_id: order.user_id.to_string(),
            status: order.status.to_string(),
            created_at: order.created_at.to_rfc3339(),
            paid_at: order.paid_at.map(|t| t.to_rfc3339()),
            total_cents: order.total.cents(),
            items: order
                .lines
                .iter()
                .map(|line| OrderLineResponse {
                    ticket_id: line.ticket_id.to_string(),
                    price_cents: line.price.cents(),
                    kind: line.kind.to_string(),
                    seat: line.seat.clone(),
                })
                .collect(),
        }
    }
}

// -- Handlers --

/// POST /orders — commit a reservation as a pending order.
#[tracing::instrument(skip(state, req))]
pub async fn create<I, O, H, U>(
    State(state): State<Arc<AppState<I, O, H, U>>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(axum::http::StatusCode, Json<OrderResponse>), ApiError>
where
    I: InventoryStore + Clone + 'static,
    O: OrderStore + Clone + 'static,
    H: HoldStore + Clone + 'static,
    U: UserDirectory + Clone + 'static,
{
    let requests: Vec<LineRequest> = req
        .items
        .into_iter()
        .map(OrderItemRequest::into_line_request)
        .collect();

    let order = state
        .engine
        .create_order(
            UserId::from_uuid(req.user_id),
            requests,
            req.event_id.map(EventId::from_uuid),
        )
        .await?;

    Ok((
        axum::http::StatusCode::CREATED,
        Json(OrderResponse::from_record(&order)),
    ))
}

/// GET /orders/{id} — load an order by ID.
#[tracing::instrument(skip(state))]
pub async fn get<I, O, H, U>(
    State(state): State<Arc<AppState<I, O, H, U>>>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderResponse>, ApiError>
where
    I: InventoryStore + Clone + 'static,
    O: OrderStore + Clone + 'static,
    H: HoldStore + Clone + 'static,
    U: UserDirectory + Clone + 'static,
{
    let order = state
        .engine
        .get_order(OrderId::from_uuid(id))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("order {id} not found")))?;

    Ok(Json(OrderResponse::from_record(&order)))
}

/// PATCH /orders/{id}/pay — pending -> paid, once.
#[tracing::instrument(skip(state))]
pub async fn pay<I, O, H, U>(
    State(state): State<Arc<AppState<I, O, H, U>>>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderResponse>, ApiError>
where
    I: InventoryStore + Clone + 'static,
    O: OrderStore + Clone + 'static,
    H: HoldStore + Clone + 'static,
    U: UserDirectory + Clone + 'static,
{
    let order = state.engine.pay_order(OrderId::from_uuid(id)).await?;
    Ok(Json(OrderResponse::from_record(&order)))
}

/// PATCH /orders/{id}/cancel — pending -> canceled, releasing tickets.
#[tracing::instrument(skip(state))]
pub async fn cancel<I, O, H, U>(
    State(state): State<Arc<AppState<I, O, H, U>>>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderResponse>, ApiError>
where
    I: InventoryStore + Clone + 'static,
    O: OrderStore + Clone + 'static,
    H: HoldStore + Clone + 'static,
    U: UserDirectory + Clone + 'static,
{
    let order = state.engine.cancel_order(OrderId::from_uuid(id)).await?;
    Ok(Json(OrderResponse::from_record(&order)))
}
