//! The cart: hold-registry semantics over the hold store.
//!
//! A cart entry is a time-limited, uncommitted claim. Prices are never
//! snapshotted into the cart; they are re-read from the inventory on every
//! view and at checkout, which is why live holds must count as exclusions
//! even though no order exists yet.

use serde::Serialize;

use common::{EventId, Money, TicketId, UserId};
use ticket_store::{
    HoldStore, InventoryStore, OrderRecord, OrderStore, StoreError, TicketKind,
};

use crate::{
    ChangeFeed, DomainError, GaAllocator, MarketEvent, OrderEngine, Result, UserDirectory,
    order::LineRequest,
};

/// A cart line as shown to the user, priced live.
#[derive(Debug, Clone, Serialize)]
pub struct CartItem {
    pub ticket_id: TicketId,
    pub event_id: EventId,
    pub kind: TicketKind,
    pub seat: Option<String>,
    pub price: Money,
}

/// The user's current cart.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub items: Vec<CartItem>,
    pub total: Money,
}

/// Cart operations for one hold store.
#[derive(Clone)]
pub struct CartService<I, O, H, U> {
    inventory: I,
    orders: O,
    holds: H,
    allocator: GaAllocator<I, O, H>,
    engine: OrderEngine<I, O, H, U>,
    feed: ChangeFeed,
}

impl<I, O, H, U> CartService<I, O, H, U>
where
    I: InventoryStore + Clone,
    O: OrderStore + Clone,
    H: HoldStore + Clone,
    U: UserDirectory + Clone,
{
    /// Creates a cart service over the given stores and collaborators.
    pub fn new(inventory: I, orders: O, holds: H, users: U, feed: ChangeFeed) -> Self {
        Self {
            allocator: GaAllocator::new(inventory.clone(), orders.clone(), holds.clone()),
            engine: OrderEngine::new(
                inventory.clone(),
                orders.clone(),
                holds.clone(),
                users,
                feed.clone(),
            ),
            inventory,
            orders,
            holds,
            feed,
        }
    }

    /// Returns the user's cart with live prices.
    #[tracing::instrument(skip(self))]
    pub async fn view(&self, user_id: UserId) -> Result<CartView> {
        let held = self.holds.members(user_id).await?;
        if held.is_empty() {
            return Ok(CartView {
                items: Vec::new(),
                total: Money::zero(),
            });
        }

        let units = self.inventory.find_by_ids(&held).await?;
        let items: Vec<CartItem> = units
            .into_iter()
            .map(|u| CartItem {
                ticket_id: u.id,
                event_id: u.event_id,
                kind: u.kind,
                seat: u.seat,
                price: u.price,
            })
            .collect();
        let total = items.iter().map(|i| i.price).sum();
        Ok(CartView { items, total })
    }

    /// Holds `quantity` general-admission units for the user, allocated
    /// against the full exclusion set — other carts included — and
    /// refreshes the cart TTL. Returns the allocated unit IDs.
    #[tracing::instrument(skip(self))]
    pub async fn add_general_admission(
        &self,
        user_id: UserId,
        event_id: EventId,
        quantity: u32,
    ) -> Result<Vec<TicketId>> {
        let allocated = self.allocator.allocate(event_id, quantity).await?;

        match self.holds.add(user_id, &allocated).await {
            Ok(()) => {}
            Err(StoreError::ReservationConflict { conflicting }) => {
                // Lost the race between allocation and commit.
                metrics::counter!("reservation_conflicts_total").increment(1);
                return Err(DomainError::Conflict { conflicting });
            }
            Err(e) => return Err(e.into()),
        }

        metrics::counter!("tickets_held_total").increment(allocated.len() as u64);
        let units = self.inventory.find_by_ids(&allocated).await?;
        for unit in units {
            self.feed.publish(MarketEvent::TicketHeld {
                user_id,
                ticket_id: unit.id,
                event_id: unit.event_id,
                kind: unit.kind,
                seat: unit.seat,
                price: unit.price,
            });
        }
        Ok(allocated)
    }

    /// Holds one specific ticket unit for the user.
    ///
    /// Re-adding a unit already in the caller's own cart is a no-op that
    /// succeeds; a unit claimed by any order or another user's cart is a
    /// conflict.
    #[tracing::instrument(skip(self))]
    pub async fn add_seat(&self, user_id: UserId, ticket_id: TicketId) -> Result<()> {
        let units = match self.inventory.find_by_ids(&[ticket_id]).await {
            Ok(units) => units,
            Err(StoreError::TicketsNotFound { .. }) => {
                return Err(DomainError::TicketNotFound(ticket_id));
            }
            Err(e) => return Err(e.into()),
        };

        if self.holds.members(user_id).await?.contains(&ticket_id) {
            return Ok(());
        }

        // Fast-fail against both exclusion sources; the hold store's write
        // path repeats the cross-user check authoritatively.
        let reserved = self.orders.reserved_tickets().await?;
        if reserved.contains(&ticket_id) {
            return Err(DomainError::Conflict {
                conflicting: vec![ticket_id],
            });
        }
        if self.holds.held_tickets().await?.contains(&ticket_id) {
            return Err(DomainError::Conflict {
                conflicting: vec![ticket_id],
            });
        }

        match self.holds.add(user_id, &[ticket_id]).await {
            Ok(()) => {}
            Err(StoreError::ReservationConflict { conflicting }) => {
                metrics::counter!("reservation_conflicts_total").increment(1);
                return Err(DomainError::Conflict { conflicting });
            }
            Err(e) => return Err(e.into()),
        }

        metrics::counter!("tickets_held_total").increment(1);
        if let Some(unit) = units.into_iter().next() {
            self.feed.publish(MarketEvent::TicketHeld {
                user_id,
                ticket_id: unit.id,
                event_id: unit.event_id,
                kind: unit.kind,
                seat: unit.seat,
                price: unit.price,
            });
        }
        Ok(())
    }

    /// Removes one unit from the user's cart. Returns whether anything was
    /// removed; an absent unit is not an error.
    #[tracing::instrument(skip(self))]
    pub async fn remove(&self, user_id: UserId, ticket_id: TicketId) -> Result<bool> {
        let removed = self.holds.remove(user_id, ticket_id).await?;
        if removed {
            self.feed
                .publish(MarketEvent::TicketReleased { user_id, ticket_id });
        }
        Ok(removed)
    }

    /// Empties the user's cart.
    #[tracing::instrument(skip(self))]
    pub async fn clear(&self, user_id: UserId) -> Result<()> {
        Ok(self.holds.clear(user_id).await?)
    }

    /// Checks the cart out: commits the held tickets as an order and pays
    /// it immediately (the cart path short-circuits manual payment).
    ///
    /// The hold set is cleared only after the order commit succeeds; on
    /// any failure — say another path claimed a held ticket in the
    /// meantime — the cart is left untouched and the error surfaces.
    #[tracing::instrument(skip(self))]
    pub async fn checkout(&self, user_id: UserId) -> Result<OrderRecord> {
        let held = self.holds.members(user_id).await?;
        if held.is_empty() {
            return Err(DomainError::EmptyCart);
        }

        let requests = held.into_iter().map(LineRequest::specific).collect();
        let order = self.engine.create_order(user_id, requests, None).await?;
        let paid = self.engine.pay_order(order.id).await?;

        self.holds.clear(user_id).await?;
        metrics::counter!("checkouts_total").increment(1);
        Ok(paid)
    }
}
