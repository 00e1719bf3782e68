use thiserror::Error;

use common::{EventId, OrderId, TicketId};

use crate::order::OrderStatus;

/// Errors that can occur when interacting with the marketplace stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// One or more requested ticket units do not exist.
    #[error("tickets not found: {missing:?}")]
    TicketsNotFound { missing: Vec<TicketId> },

    /// One or more ticket units are already claimed by an active
    /// reservation (pending/paid order, or a live hold when committing a
    /// hold). This is the storage-level uniqueness rejection; callers must
    /// treat it as the authoritative conflict signal.
    #[error("tickets already reserved: {conflicting:?}")]
    ReservationConflict { conflicting: Vec<TicketId> },

    /// The event was not found.
    #[error("event not found: {0}")]
    EventNotFound(EventId),

    /// The order was not found.
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    /// A conditional status transition was refused because the order is not
    /// in the required state.
    #[error("order {order_id} is {status}, transition refused")]
    TransitionRefused {
        order_id: OrderId,
        status: OrderStatus,
    },

    /// A seat label appears more than once in an event's inventory.
    #[error("duplicate seat label {label:?} for event {event_id}")]
    DuplicateSeatLabel { event_id: EventId, label: String },

    /// A ticket price in an inventory spec is negative.
    #[error("negative price {price} in inventory spec")]
    NegativePrice { price: i64 },

    /// A database error occurred.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
