//! The reservation engine.
//!
//! Everything that decides who gets which ticket lives here:
//!
//! - [`AvailabilityResolver`]: computes the exclusion set (pending/paid
//!   orders plus live holds) and the availability view for an event
//! - [`GaAllocator`]: resolves "N general-admission units" into concrete
//!   ticket identities
//! - [`OrderEngine`]: validates and commits reservations as orders and
//!   drives the pending -> paid/canceled transitions
//! - [`CartService`]: the hold registry semantics — time-limited,
//!   uncommitted claims with checkout
//!
//! Side collaborators (cache invalidation, activity, purchase facts) hang
//! off the [`ChangeFeed`]; they are fire-and-forget and never affect the
//! outcome of a reservation.

mod availability;
mod allocator;
mod cart;
mod error;
mod feed;
mod order;
mod users;

pub use allocator::GaAllocator;
pub use availability::{AvailabilityResolver, AvailabilityRow, AvailabilityView};
pub use cart::{CartItem, CartService, CartView};
pub use error::DomainError;
pub use feed::{ChangeFeed, MarketEvent};
pub use order::{LineRequest, OrderEngine};
pub use users::{InMemoryUserDirectory, UserDirectory, UserProfile};

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;
