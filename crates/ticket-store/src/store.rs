//! Store trait contracts.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use common::{EventId, OrderId, TicketId, UserId};

use crate::{
    Result,
    catalog::{EventDraft, EventRecord},
    order::OrderRecord,
    ticket::{InventorySpec, TicketFilter, TicketUnit},
};

/// Events and their fixed ticket inventory.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Creates an event together with its full ticket inventory as one
    /// atomic operation. Either the event and every unit exist afterwards,
    /// or nothing does.
    async fn create_event(
        &self,
        draft: EventDraft,
        spec: InventorySpec,
    ) -> Result<(EventRecord, Vec<TicketUnit>)>;

    /// Looks up an event by ID.
    async fn get_event(&self, id: EventId) -> Result<Option<EventRecord>>;

    /// Lists all events, newest first.
    async fn list_events(&self) -> Result<Vec<EventRecord>>;

    /// Resolves ticket units by ID. Fails with
    /// [`StoreError::TicketsNotFound`](crate::StoreError::TicketsNotFound)
    /// listing every missing ID if any requested unit does not exist.
    async fn find_by_ids(&self, ids: &[TicketId]) -> Result<Vec<TicketUnit>>;

    /// Lists an event's ticket units matching the filter.
    async fn list_by_event(&self, event_id: EventId, filter: &TicketFilter)
    -> Result<Vec<TicketUnit>>;
}

/// The order collection and its active-reservation index.
///
/// Implementations maintain a unique index over the ticket unit IDs claimed
/// by pending and paid orders. [`OrderStore::insert`] is the commit point
/// for a reservation: it must reject, atomically and authoritatively, any
/// order whose tickets are already in that index.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists a new pending order, claiming its ticket units. Fails with
    /// [`StoreError::ReservationConflict`](crate::StoreError::ReservationConflict)
    /// listing the contested IDs if any unit is already claimed.
    async fn insert(&self, order: OrderRecord) -> Result<OrderRecord>;

    /// Looks up an order by ID.
    async fn get(&self, id: OrderId) -> Result<Option<OrderRecord>>;

    /// Lists all orders. Used by read-side aggregation, not by the
    /// reservation path.
    async fn list(&self) -> Result<Vec<OrderRecord>>;

    /// Conditionally transitions pending -> paid, stamping the payment
    /// time. Fails with `TransitionRefused` if the order is not pending,
    /// `OrderNotFound` if it does not exist.
    async fn mark_paid(&self, id: OrderId, paid_at: DateTime<Utc>) -> Result<OrderRecord>;

    /// Conditionally transitions pending -> canceled, releasing the
    /// order's ticket claims and clearing the payment time.
    async fn mark_canceled(&self, id: OrderId) -> Result<OrderRecord>;

    /// Returns the ticket unit IDs claimed by any pending or paid order.
    async fn reserved_tickets(&self) -> Result<HashSet<TicketId>>;
}

/// Per-user cart holds with a sliding TTL.
///
/// A hold is an uncommitted claim: it excludes a ticket from availability
/// but owns nothing. Holds expire by timestamp comparison alone; there is
/// no sweeper, and no signal is sent to the holder.
#[async_trait]
pub trait HoldStore: Send + Sync {
    /// Adds ticket units to a user's hold set and refreshes the set's TTL.
    /// Re-adding a unit the same user already holds refreshes it in place.
    /// Fails with `ReservationConflict` if any unit is currently held by
    /// another user; the uniqueness check runs inside the store's write
    /// path, so concurrent adds for the same unit cannot both succeed.
    async fn add(&self, user_id: UserId, ticket_ids: &[TicketId]) -> Result<()>;

    /// Returns the user's live (non-expired) held ticket IDs.
    async fn members(&self, user_id: UserId) -> Result<Vec<TicketId>>;

    /// Removes one unit from the user's hold set. Returns whether anything
    /// was removed; removing an absent unit is not an error.
    async fn remove(&self, user_id: UserId, ticket_id: TicketId) -> Result<bool>;

    /// Empties the user's hold set.
    async fn clear(&self, user_id: UserId) -> Result<()>;

    /// Returns every live held ticket ID across all users.
    async fn held_tickets(&self) -> Result<HashSet<TicketId>>;
}
