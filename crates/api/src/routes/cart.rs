//! Cart endpoints: the hold registry over HTTP.
//!
//! Session management is out of scope, so every cart call carries the user
//! ID explicitly (query parameter on reads, body field on writes).

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use common::{EventId, TicketId, UserId};
use domain::{CartView, UserDirectory};
use serde::{Deserialize, Serialize};
use ticket_store::{HoldStore, InventoryStore, OrderStore};
use uuid::Uuid;

use crate::AppState;
use crate::error::ApiError;
use crate::routes::orders::OrderResponse;

#[derive(Debug, Deserialize)]
pub struct CartQuery {
    #[serde(rename = "userId")]
    pub user_id: Uuid,
}

/// Add either one specific ticket or a GA quantity for an event.
#[derive(Deserialize)]
#[serde(untagged)]
pub enum AddItemRequest {
    Seat {
        user_id: Uuid,
        ticket_id: Uuid,
    },
    GeneralAdmission {
        user_id: Uuid,
        event_id: Uuid,
        general_admission: u32,
    },
}

#[derive(Deserialize)]
pub struct UserRequest {
    pub user_id: Uuid,
}

#[derive(Serialize)]
pub struct CartItemResponse {
    pub ticket_id: String,
    pub event_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub seat: Option<String>,
    pub price_cents: i64,
}

#[derive(Serialize)]
pub struct CartResponse {
    pub items: Vec<CartItemResponse>,
    pub total_cents: i64,
    pub count: usize,
}

impl CartResponse {
    fn from_view(view: CartView) -> Self {
        let count = view.items.len();
        Self {
            total_cents: view.total.cents(),
            items: view
                .items
                .into_iter()
                .map(|item| CartItemResponse {
                    ticket_id: item.ticket_id.to_string(),
                    event_id: item.event_id.to_string(),
                    kind: item.kind.to_string(),
                    seat: item.seat,
                    price_cents: item.price.cents(),
                })
                .collect(),
            count,
        }
    }
}

#[derive(Serialize)]
pub struct RemovedResponse {
    pub removed: bool,
}

#[derive(Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

/// GET /cart?userId= — the user's current holds, priced live.
#[tracing::instrument(skip(state))]
pub async fn view<I, O, H, U>(
    State(state): State<Arc<AppState<I, O, H, U>>>,
    Query(query): Query<CartQuery>,
) -> Result<Json<CartResponse>, ApiError>
where
    I: InventoryStore + Clone + 'static,
    O: OrderStore + Clone + 'static,
    H: HoldStore + Clone + 'static,
    U: UserDirectory + Clone + 'static,
{
    let view = state.cart.view(UserId::from_uuid(query.user_id)).await?;
    Ok(Json(CartResponse::from_view(view)))
}

/// POST /cart/items — hold a seat or a GA quantity; returns the cart.
#[tracing::instrument(skip(state, req))]
pub async fn add_item<I, O, H, U>(
    State(state): State<Arc<AppState<I, O, H, U>>>,
    Json(req): Json<AddItemRequest>,
) -> Result<Json<CartResponse>, ApiError>
where
    I: InventoryStore + Clone + 'static,
    O: OrderStore + Clone + 'static,
    H: HoldStore + Clone + 'static,
    U: UserDirectory + Clone + 'static,
{
    let user_id = match req {
        AddItemRequest::Seat { user_id, ticket_id } => {
            let user_id = UserId::from_uuid(user_id);
            state
                .cart
                .add_seat(user_id, TicketId::from_uuid(ticket_id))
                .await?;
            user_id
        }
        AddItemRequest::GeneralAdmission {
            user_id,
            event_id,
            general_admission,
        } => {
            let user_id = UserId::from_uuid(user_id);
            state
                .cart
                .add_general_admission(user_id, EventId::from_uuid(event_id), general_admission)
                .await?;
            user_id
        }
    };

    let view = state.cart.view(user_id).await?;
    Ok(Json(CartResponse::from_view(view)))
}

/// DELETE /cart/items/{ticket_id}?userId= — drop one hold.
#[tracing::instrument(skip(state))]
pub async fn remove_item<I, O, H, U>(
    State(state): State<Arc<AppState<I, O, H, U>>>,
    Path(ticket_id): Path<Uuid>,
    Query(query): Query<CartQuery>,
) -> Result<Json<RemovedResponse>, ApiError>
where
    I: InventoryStore + Clone + 'static,
    O: OrderStore + Clone + 'static,
    H: HoldStore + Clone + 'static,
    U: UserDirectory + Clone + 'static,
{
    let removed = state
        .cart
        .remove(
            UserId::from_uuid(query.user_id),
            TicketId::from_uuid(ticket_id),
        )
        .await?;
    Ok(Json(RemovedResponse { removed }))
}

/// POST /cart/clear — drop every hold of the user.
#[tracing::instrument(skip(state, req))]
pub async fn clear<I, O, H, U>(
    State(state): State<Arc<AppState<I, O, H, U>>>,
    Json(req): Json<UserRequest>,
) -> Result<Json<OkResponse>, ApiError>
where
    I: InventoryStore + Clone + 'static,
    O: OrderStore + Clone + 'static,
    H: HoldStore + Clone + 'static,
    U: UserDirectory + Clone + 'static,
{
    state.cart.clear(UserId::from_uuid(req.user_id)).await?;
    Ok(Json(OkResponse { ok: true }))
}

/// POST /cart/checkout — commit the held tickets; the order is paid
/// immediately and the cart cleared only after the commit succeeds.
#[tracing::instrument(skip(state, req))]
pub async fn checkout<I, O, H, U>(
    State(state): State<Arc<AppState<I, O, H, U>>>,
    Json(req): Json<UserRequest>,
) -> Result<(axum::http::StatusCode, Json<OrderResponse>), ApiError>
where
    I: InventoryStore + Clone + 'static,
    O: OrderStore + Clone + 'static,
    H: HoldStore + Clone + 'static,
    U: UserDirectory + Clone + 'static,
{
    let order = state.cart.checkout(UserId::from_uuid(req.user_id)).await?;
    Ok((
        axum::http::StatusCode::CREATED,
        Json(OrderResponse::from_record(&order)),
    ))
}
