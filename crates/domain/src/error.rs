//! Domain error types.

use thiserror::Error;

use common::{OrderId, TicketId, UserId};
use ticket_store::StoreError;

/// Errors that can occur during reservation operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in the storage layer.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The requesting user does not exist.
    #[error("user not found: {0}")]
    UserNotFound(UserId),

    /// The requested ticket unit does not exist.
    #[error("ticket not found: {0}")]
    TicketNotFound(TicketId),

    /// An order was requested with no items.
    #[error("order has no items")]
    NoItems,

    /// Checkout was requested on an empty cart.
    #[error("cart is empty")]
    EmptyCart,

    /// One or more ticket units are claimed by a concurrent reservation.
    #[error("tickets already reserved: {conflicting:?}")]
    Conflict { conflicting: Vec<TicketId> },

    /// Fewer unreserved general-admission units exist than requested.
    #[error("not enough general admission tickets: requested {requested}, available {available}")]
    InsufficientAvailability { requested: u32, available: u32 },

    /// A general-admission request needs an event and none could be
    /// determined.
    #[error("event id required to resolve general admission items")]
    EventRequired,

    /// A general-admission quantity below 1 was requested.
    #[error("invalid general admission quantity: {quantity}")]
    InvalidQuantity { quantity: u32 },

    /// The order is not pending, so it cannot be paid.
    #[error("order {0} is not payable")]
    NotPayable(OrderId),

    /// The order is not pending, so it cannot be canceled.
    #[error("order {0} is not cancellable")]
    NotCancellable(OrderId),
}
