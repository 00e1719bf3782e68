//! Storage layer for the ticket marketplace.
//!
//! Three stores back the reservation engine:
//!
//! - [`InventoryStore`]: events and their fixed ticket inventory
//! - [`OrderStore`]: the order collection plus the active-reservation
//!   unique index that makes reservation commits race-free
//! - [`HoldStore`]: per-user cart holds with a sliding TTL
//!
//! Each store has an in-memory implementation (single write lock per store)
//! and a PostgreSQL implementation (unique constraints do the conflict
//! rejection). The application-level availability check is only a fast
//! path; the store write is authoritative.

mod catalog;
mod error;
mod memory;
mod order;
mod postgres;
mod store;
mod ticket;

pub use catalog::{EventDraft, EventRecord};
pub use error::{Result, StoreError};
pub use memory::{InMemoryHoldStore, InMemoryInventoryStore, InMemoryOrderStore};
pub use order::{OrderLine, OrderRecord, OrderStatus};
pub use postgres::{PostgresHoldStore, PostgresInventoryStore, PostgresOrderStore};
pub use store::{HoldStore, InventoryStore, OrderStore};
pub use ticket::{InventorySpec, TicketFilter, TicketKind, TicketUnit};

// Re-export the shared ID types for convenience.
pub use common::{EventId, Money, OrderId, TicketId, UserId};
