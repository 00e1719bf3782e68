//! In-memory store implementations.
//!
//! Each store keeps its state behind a single `RwLock`; conflict checks run
//! under the write lock, which makes the check-and-commit step atomic the
//! same way the PostgreSQL unique constraints do.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tokio::time::Instant;

use common::{EventId, OrderId, TicketId, UserId};

use crate::{
    Result, StoreError,
    catalog::{EventDraft, EventRecord},
    order::{OrderRecord, OrderStatus},
    store::{HoldStore, InventoryStore, OrderStore},
    ticket::{InventorySpec, TicketFilter, TicketUnit},
};

/// In-memory event catalog and ticket inventory.
#[derive(Clone, Default)]
pub struct InMemoryInventoryStore {
    events: Arc<RwLock<HashMap<EventId, EventRecord>>>,
    tickets: Arc<RwLock<HashMap<TicketId, TicketUnit>>>,
}

impl InMemoryInventoryStore {
    /// Creates a new empty inventory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of ticket units stored.
    pub async fn ticket_count(&self) -> usize {
        self.tickets.read().await.len()
    }
}

#[async_trait]
impl InventoryStore for InMemoryInventoryStore {
    async fn create_event(
        &self,
        draft: EventDraft,
        spec: InventorySpec,
    ) -> Result<(EventRecord, Vec<TicketUnit>)> {
        let record = draft.into_record(Utc::now());
        // Validate before touching state so a failure leaves nothing behind.
        spec.validate(record.id)?;
        let units = spec.generate(record.id);

        let mut events = self.events.write().await;
        let mut tickets = self.tickets.write().await;
        events.insert(record.id, record.clone());
        for unit in &units {
            tickets.insert(unit.id, unit.clone());
        }
        Ok((record, units))
    }

    async fn get_event(&self, id: EventId) -> Result<Option<EventRecord>> {
        Ok(self.events.read().await.get(&id).cloned())
    }

    async fn list_events(&self) -> Result<Vec<EventRecord>> {
        let events = self.events.read().await;
        let mut all: Vec<_> = events.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    async fn find_by_ids(&self, ids: &[TicketId]) -> Result<Vec<TicketUnit>> {
        let tickets = self.tickets.read().await;
        let missing: Vec<_> = ids.iter().filter(|id| !tickets.contains_key(*id)).copied().collect();
        if !missing.is_empty() {
            return Err(StoreError::TicketsNotFound { missing });
        }
        Ok(ids.iter().map(|id| tickets[id].clone()).collect())
    }

    async fn list_by_event(
        &self,
        event_id: EventId,
        filter: &TicketFilter,
    ) -> Result<Vec<TicketUnit>> {
        let tickets = self.tickets.read().await;
        Ok(tickets
            .values()
            .filter(|t| t.event_id == event_id && filter.matches(t))
            .cloned()
            .collect())
    }
}

#[derive(Default)]
struct OrderState {
    orders: HashMap<OrderId, OrderRecord>,
    /// Unique index: ticket unit -> the pending/paid order claiming it.
    reserved: HashMap<TicketId, OrderId>,
}

/// In-memory order collection with the active-reservation index.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    state: Arc<RwLock<OrderState>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: OrderRecord) -> Result<OrderRecord> {
        let mut state = self.state.write().await;

        // The index check and the insert happen under the same write lock,
        // so overlapping concurrent inserts cannot both pass.
        let conflicting: Vec<_> = order
            .ticket_ids()
            .filter(|id| state.reserved.contains_key(id))
            .collect();
        if !conflicting.is_empty() {
            return Err(StoreError::ReservationConflict { conflicting });
        }

        for ticket_id in order.ticket_ids() {
            state.reserved.insert(ticket_id, order.id);
        }
        state.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn get(&self, id: OrderId) -> Result<Option<OrderRecord>> {
        Ok(self.state.read().await.orders.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<OrderRecord>> {
        let state = self.state.read().await;
        let mut all: Vec<_> = state.orders.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(all)
    }

    async fn mark_paid(&self, id: OrderId, paid_at: DateTime<Utc>) -> Result<OrderRecord> {
        let mut state = self.state.write().await;
        let order = state
            .orders
            .get_mut(&id)
            .ok_or(StoreError::OrderNotFound(id))?;
        if !order.status.can_pay() {
            return Err(StoreError::TransitionRefused {
                order_id: id,
                status: order.status,
            });
        }
        order.status = OrderStatus::Paid;
        order.paid_at = Some(paid_at);
        Ok(order.clone())
    }

    async fn mark_canceled(&self, id: OrderId) -> Result<OrderRecord> {
        let mut state = self.state.write().await;
        let order = state
            .orders
            .get_mut(&id)
            .ok_or(StoreError::OrderNotFound(id))?;
        if !order.status.can_cancel() {
            return Err(StoreError::TransitionRefused {
                order_id: id,
                status: order.status,
            });
        }
        order.status = OrderStatus::Canceled;
        order.paid_at = None;
        let canceled = order.clone();
        for ticket_id in canceled.ticket_ids() {
            state.reserved.remove(&ticket_id);
        }
        Ok(canceled)
    }

    async fn reserved_tickets(&self) -> Result<HashSet<TicketId>> {
        Ok(self.state.read().await.reserved.keys().copied().collect())
    }
}

struct HoldEntry {
    user_id: UserId,
    expires_at: Instant,
}

/// In-memory hold store keyed by ticket unit.
///
/// Keying by ticket makes the map itself the uniqueness constraint: a unit
/// can have at most one live holder. Expiry uses the tokio clock so tests
/// can drive it with paused time.
#[derive(Clone)]
pub struct InMemoryHoldStore {
    ttl: Duration,
    entries: Arc<RwLock<HashMap<TicketId, HoldEntry>>>,
}

impl InMemoryHoldStore {
    /// Creates a hold store with the given sliding TTL.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn purge_expired(entries: &mut HashMap<TicketId, HoldEntry>, now: Instant) {
        entries.retain(|_, e| e.expires_at > now);
    }
}

#[async_trait]
impl HoldStore for InMemoryHoldStore {
    async fn add(&self, user_id: UserId, ticket_ids: &[TicketId]) -> Result<()> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        Self::purge_expired(&mut entries, now);

        let conflicting: Vec<_> = ticket_ids
            .iter()
            .filter(|id| entries.get(*id).is_some_and(|e| e.user_id != user_id))
            .copied()
            .collect();
        if !conflicting.is_empty() {
            return Err(StoreError::ReservationConflict { conflicting });
        }

        let expires_at = now + self.ttl;
        for &ticket_id in ticket_ids {
            entries.insert(ticket_id, HoldEntry { user_id, expires_at });
        }
        // Sliding TTL: any cart mutation refreshes the whole cart.
        for entry in entries.values_mut().filter(|e| e.user_id == user_id) {
            entry.expires_at = expires_at;
        }
        Ok(())
    }

    async fn members(&self, user_id: UserId) -> Result<Vec<TicketId>> {
        let entries = self.entries.read().await;
        let now = Instant::now();
        let mut held: Vec<_> = entries
            .iter()
            .filter(|(_, e)| e.user_id == user_id && e.expires_at > now)
            .map(|(id, _)| *id)
            .collect();
        held.sort();
        Ok(held)
    }

    async fn remove(&self, user_id: UserId, ticket_id: TicketId) -> Result<bool> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        Self::purge_expired(&mut entries, now);
        match entries.get(&ticket_id) {
            Some(e) if e.user_id == user_id => {
                entries.remove(&ticket_id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn clear(&self, user_id: UserId) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.retain(|_, e| e.user_id != user_id);
        Ok(())
    }

    async fn held_tickets(&self) -> Result<HashSet<TicketId>> {
        let entries = self.entries.read().await;
        let now = Instant::now();
        Ok(entries
            .iter()
            .filter(|(_, e)| e.expires_at > now)
            .map(|(id, _)| *id)
            .collect())
    }
}
