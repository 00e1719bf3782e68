//! General-admission allocation.
//!
//! GA units are fungible, so a request names a quantity, not identities.
//! The allocator resolves the quantity into concrete ticket IDs against the
//! same exclusion set the availability resolver uses. Selection is stable
//! (ascending ticket ID) so repeated runs over the same state pick the same
//! units.

use common::{EventId, TicketId};
use ticket_store::{HoldStore, InventoryStore, OrderStore, TicketFilter};

use crate::{AvailabilityResolver, DomainError, Result};

/// Resolves abstract GA quantities into concrete ticket unit identities.
#[derive(Clone)]
pub struct GaAllocator<I, O, H> {
    resolver: AvailabilityResolver<I, O, H>,
}

impl<I, O, H> GaAllocator<I, O, H>
where
    I: InventoryStore,
    O: OrderStore,
    H: HoldStore,
{
    /// Creates an allocator over the given stores.
    pub fn new(inventory: I, orders: O, holds: H) -> Self {
        Self {
            resolver: AvailabilityResolver::new(inventory, orders, holds),
        }
    }

    /// Picks `quantity` unreserved GA units for the event, ascending by
    /// ticket ID. Fails with `InsufficientAvailability` when fewer remain.
    ///
    /// The result is a read: the caller still has to commit the IDs as an
    /// order or hold, and the store's uniqueness constraint settles any
    /// race lost between this read and that commit.
    #[tracing::instrument(skip(self))]
    pub async fn allocate(&self, event_id: EventId, quantity: u32) -> Result<Vec<TicketId>> {
        if quantity == 0 {
            return Err(DomainError::InvalidQuantity { quantity });
        }

        let mut units = self
            .resolver
            .available_units(event_id, &TicketFilter::general_admission())
            .await?;

        if (units.len() as u32) < quantity {
            return Err(DomainError::InsufficientAvailability {
                requested: quantity,
                available: units.len() as u32,
            });
        }

        units.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(units
            .into_iter()
            .take(quantity as usize)
            .map(|u| u.id)
            .collect())
    }
}
