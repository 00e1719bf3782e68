//! The order engine: reservation commits and the order state machine.

use std::collections::HashSet;

use chrono::Utc;

use common::{EventId, OrderId, TicketId, UserId};
use ticket_store::{
    HoldStore, InventoryStore, OrderLine, OrderRecord, OrderStore, StoreError,
};

use crate::{
    ChangeFeed, DomainError, GaAllocator, MarketEvent, Result, UserDirectory,
    order::LineRequest,
};

/// Validates and commits reservations as orders, and drives the
/// pending -> paid/canceled transitions.
///
/// The engine's availability check is a fast path only; the order store's
/// active-reservation index is what actually prevents double booking.
#[derive(Clone)]
pub struct OrderEngine<I, O, H, U> {
    inventory: I,
    orders: O,
    users: U,
    allocator: GaAllocator<I, O, H>,
    feed: ChangeFeed,
}

impl<I, O, H, U> OrderEngine<I, O, H, U>
where
    I: InventoryStore + Clone,
    O: OrderStore + Clone,
    H: HoldStore + Clone,
    U: UserDirectory,
{
    /// Creates an engine over the given stores and collaborators.
    pub fn new(inventory: I, orders: O, holds: H, users: U, feed: ChangeFeed) -> Self {
        Self {
            allocator: GaAllocator::new(inventory.clone(), orders.clone(), holds),
            inventory,
            orders,
            users,
            feed,
        }
    }

    /// Creates a pending order for the requested lines.
    ///
    /// General-admission requests are resolved to concrete units first,
    /// against the event taken from the first specific ticket or from
    /// `event_hint`. Duplicate ticket IDs are collapsed, prices are read
    /// from the store (client-supplied prices are never trusted), and the
    /// direct-order path checks conflicts against order claims only —
    /// cart holds are deliberately bypassed here and settle at checkout.
    #[tracing::instrument(skip(self, requests))]
    pub async fn create_order(
        &self,
        user_id: UserId,
        requests: Vec<LineRequest>,
        event_hint: Option<EventId>,
    ) -> Result<OrderRecord> {
        if !self.users.user_exists(user_id).await? {
            return Err(DomainError::UserNotFound(user_id));
        }
        if requests.is_empty() {
            return Err(DomainError::NoItems);
        }

        let mut ticket_ids = Vec::new();
        let mut ga_quantity: u32 = 0;
        for request in &requests {
            match request {
                LineRequest::Specific(id) => ticket_ids.push(*id),
                LineRequest::GeneralAdmission { quantity } => {
                    if *quantity < 1 {
                        return Err(DomainError::InvalidQuantity {
                            quantity: *quantity,
                        });
                    }
                    ga_quantity += quantity;
                }
            }
        }

        if ga_quantity > 0 {
            let event_id = match ticket_ids.first() {
                Some(first) => {
                    let units = self.inventory.find_by_ids(&[*first]).await?;
                    units[0].event_id
                }
                None => event_hint.ok_or(DomainError::EventRequired)?,
            };
            let allocated = self.allocator.allocate(event_id, ga_quantity).await?;
            ticket_ids.extend(allocated);
        }

        // Idempotent against a caller repeating an ID; first occurrence
        // keeps its position.
        let mut seen = HashSet::new();
        ticket_ids.retain(|id| seen.insert(*id));

        let units = self.inventory.find_by_ids(&ticket_ids).await?;

        // Fast-fail check against committed orders. Holds are not
        // consulted: a direct order may take a ticket out from under a
        // cart, and the cart finds out at checkout.
        let reserved = self.orders.reserved_tickets().await?;
        let conflicting: Vec<TicketId> = ticket_ids
            .iter()
            .filter(|id| reserved.contains(*id))
            .copied()
            .collect();
        if !conflicting.is_empty() {
            metrics::counter!("reservation_conflicts_total").increment(1);
            return Err(DomainError::Conflict { conflicting });
        }

        let lines: Vec<OrderLine> = units
            .iter()
            .map(|u| OrderLine {
                ticket_id: u.id,
                price: u.price,
                kind: u.kind,
                seat: u.seat.clone(),
            })
            .collect();
        let order = OrderRecord::pending(user_id, lines, Utc::now());

        // Commit point. The store re-checks under its uniqueness
        // constraint, so a race lost after the fast path still fails here.
        let order = match self.orders.insert(order).await {
            Ok(order) => order,
            Err(StoreError::ReservationConflict { conflicting }) => {
                metrics::counter!("reservation_conflicts_total").increment(1);
                return Err(DomainError::Conflict { conflicting });
            }
            Err(e) => return Err(e.into()),
        };

        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(order_id = %order.id, user_id = %user_id, total = %order.total, "order created");

        self.feed.publish(MarketEvent::OrdersChanged);
        let event_ids: HashSet<EventId> = units.iter().map(|u| u.event_id).collect();
        for event_id in event_ids {
            self.feed.publish(MarketEvent::UserBoughtEvent { user_id, event_id });
        }

        Ok(order)
    }

    /// Pays a pending order. Fails with `NotPayable` when the order is in
    /// any other state or does not exist.
    #[tracing::instrument(skip(self))]
    pub async fn pay_order(&self, order_id: OrderId) -> Result<OrderRecord> {
        let order = match self.orders.mark_paid(order_id, Utc::now()).await {
            Ok(order) => order,
            Err(StoreError::OrderNotFound(_) | StoreError::TransitionRefused { .. }) => {
                return Err(DomainError::NotPayable(order_id));
            }
            Err(e) => return Err(e.into()),
        };

        metrics::counter!("orders_paid_total").increment(1);
        self.feed.publish(MarketEvent::OrdersChanged);
        Ok(order)
    }

    /// Cancels a pending order, releasing its tickets. Fails with
    /// `NotCancellable` when the order is in any other state or does not
    /// exist.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(&self, order_id: OrderId) -> Result<OrderRecord> {
        match self.orders.mark_canceled(order_id).await {
            Ok(order) => {
                metrics::counter!("orders_canceled_total").increment(1);
                Ok(order)
            }
            Err(StoreError::OrderNotFound(_) | StoreError::TransitionRefused { .. }) => {
                Err(DomainError::NotCancellable(order_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Loads an order by ID. Returns None if it does not exist.
    pub async fn get_order(&self, order_id: OrderId) -> Result<Option<OrderRecord>> {
        Ok(self.orders.get(order_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::time::Duration;
    use ticket_store::{
        EventDraft, InMemoryHoldStore, InMemoryInventoryStore, InMemoryOrderStore, InventorySpec,
        Money, OrderStatus, TicketUnit,
    };

    use crate::InMemoryUserDirectory;

    type TestEngine = OrderEngine<
        InMemoryInventoryStore,
        InMemoryOrderStore,
        InMemoryHoldStore,
        InMemoryUserDirectory,
    >;

    struct Fixture {
        engine: TestEngine,
        holds: InMemoryHoldStore,
        event_id: EventId,
        units: Vec<TicketUnit>,
        user: UserId,
    }

    async fn fixture() -> Fixture {
        let inventory = InMemoryInventoryStore::new();
        let orders = InMemoryOrderStore::new();
        let holds = InMemoryHoldStore::new(Duration::from_secs(900));
        let users = InMemoryUserDirectory::new();

        let (event, units) = inventory
            .create_event(
                EventDraft::new("Rust Conf", "Main Hall", Utc::now()),
                InventorySpec::with_rows(
                    2,
                    Money::from_cents(2500),
                    &["A"],
                    2,
                    Money::from_cents(3500),
                ),
            )
            .await
            .unwrap();

        let user = users.register("Ada".into(), "ada@example.com".into()).await.unwrap().id;

        Fixture {
            engine: OrderEngine::new(
                inventory,
                orders,
                holds.clone(),
                users,
                ChangeFeed::disconnected(),
            ),
            holds,
            event_id: event.id,
            units,
            user,
        }
    }

    fn seat_id(units: &[TicketUnit], label: &str) -> TicketId {
        units.iter().find(|u| u.label() == label).unwrap().id
    }

    #[tokio::test]
    async fn creates_pending_order_with_server_side_total() {
        let f = fixture().await;
        let a1 = seat_id(&f.units, "A1");

        let order = f
            .engine
            .create_order(f.user, vec![LineRequest::specific(a1)], None)
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total.cents(), 3500);
        assert_eq!(order.lines.len(), 1);
        assert_eq!(order.lines[0].price.cents(), 3500);
    }

    #[tokio::test]
    async fn unknown_user_is_rejected() {
        let f = fixture().await;
        let a1 = seat_id(&f.units, "A1");

        let result = f
            .engine
            .create_order(UserId::new(), vec![LineRequest::specific(a1)], None)
            .await;
        assert!(matches!(result, Err(DomainError::UserNotFound(_))));
    }

    #[tokio::test]
    async fn empty_request_is_rejected() {
        let f = fixture().await;
        let result = f.engine.create_order(f.user, vec![], None).await;
        assert!(matches!(result, Err(DomainError::NoItems)));
    }

    #[tokio::test]
    async fn duplicate_ticket_ids_collapse() {
        let f = fixture().await;
        let a1 = seat_id(&f.units, "A1");

        let order = f
            .engine
            .create_order(
                f.user,
                vec![LineRequest::specific(a1), LineRequest::specific(a1)],
                None,
            )
            .await
            .unwrap();
        assert_eq!(order.lines.len(), 1);
        assert_eq!(order.total.cents(), 3500);
    }

    #[tokio::test]
    async fn missing_tickets_are_listed() {
        let f = fixture().await;
        let ghost = TicketId::new();

        let result = f
            .engine
            .create_order(f.user, vec![LineRequest::specific(ghost)], None)
            .await;
        match result {
            Err(DomainError::Store(StoreError::TicketsNotFound { missing })) => {
                assert_eq!(missing, vec![ghost]);
            }
            other => panic!("expected TicketsNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn conflicting_tickets_are_listed() {
        let f = fixture().await;
        let a1 = seat_id(&f.units, "A1");
        let a2 = seat_id(&f.units, "A2");

        f.engine
            .create_order(f.user, vec![LineRequest::specific(a1)], None)
            .await
            .unwrap();

        let result = f
            .engine
            .create_order(
                f.user,
                vec![LineRequest::specific(a1), LineRequest::specific(a2)],
                None,
            )
            .await;
        match result {
            Err(DomainError::Conflict { conflicting }) => assert_eq!(conflicting, vec![a1]),
            other => panic!("expected Conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn ga_quantity_resolves_against_the_hinted_event() {
        let f = fixture().await;

        let order = f
            .engine
            .create_order(
                f.user,
                vec![LineRequest::general_admission(2)],
                Some(f.event_id),
            )
            .await
            .unwrap();

        assert_eq!(order.lines.len(), 2);
        assert_eq!(order.total.cents(), 5000);
        assert!(order.lines.iter().all(|l| l.seat.is_none()));
    }

    #[tokio::test]
    async fn ga_event_derives_from_first_specific_ticket() {
        let f = fixture().await;
        let a1 = seat_id(&f.units, "A1");

        let order = f
            .engine
            .create_order(
                f.user,
                vec![
                    LineRequest::specific(a1),
                    LineRequest::general_admission(1),
                ],
                None,
            )
            .await
            .unwrap();
        assert_eq!(order.lines.len(), 2);
        assert_eq!(order.total.cents(), 6000);
    }

    #[tokio::test]
    async fn ga_without_event_is_rejected() {
        let f = fixture().await;
        let result = f
            .engine
            .create_order(f.user, vec![LineRequest::general_admission(1)], None)
            .await;
        assert!(matches!(result, Err(DomainError::EventRequired)));
    }

    #[tokio::test]
    async fn ga_zero_quantity_is_rejected() {
        let f = fixture().await;
        let result = f
            .engine
            .create_order(
                f.user,
                vec![LineRequest::general_admission(0)],
                Some(f.event_id),
            )
            .await;
        assert!(matches!(
            result,
            Err(DomainError::InvalidQuantity { quantity: 0 })
        ));
    }

    #[tokio::test]
    async fn ga_over_supply_reports_availability() {
        let f = fixture().await;
        let result = f
            .engine
            .create_order(
                f.user,
                vec![LineRequest::general_admission(3)],
                Some(f.event_id),
            )
            .await;
        assert!(matches!(
            result,
            Err(DomainError::InsufficientAvailability {
                requested: 3,
                available: 2,
            })
        ));
    }

    #[tokio::test]
    async fn direct_order_bypasses_holds_for_specific_seats() {
        let f = fixture().await;
        let a1 = seat_id(&f.units, "A1");

        // Another user's cart holds the seat; a direct order still wins.
        f.holds.add(UserId::new(), &[a1]).await.unwrap();

        let order = f
            .engine
            .create_order(f.user, vec![LineRequest::specific(a1)], None)
            .await
            .unwrap();
        assert_eq!(order.lines[0].ticket_id, a1);
    }

    #[tokio::test]
    async fn ga_allocation_respects_holds() {
        let f = fixture().await;
        let ga_ids: Vec<_> = f
            .units
            .iter()
            .filter(|u| u.is_general_admission())
            .map(|u| u.id)
            .collect();
        f.holds.add(UserId::new(), &ga_ids).await.unwrap();

        let result = f
            .engine
            .create_order(
                f.user,
                vec![LineRequest::general_admission(1)],
                Some(f.event_id),
            )
            .await;
        assert!(matches!(
            result,
            Err(DomainError::InsufficientAvailability {
                requested: 1,
                available: 0,
            })
        ));
    }

    #[tokio::test]
    async fn pay_transitions_once() {
        let f = fixture().await;
        let a1 = seat_id(&f.units, "A1");
        let order = f
            .engine
            .create_order(f.user, vec![LineRequest::specific(a1)], None)
            .await
            .unwrap();

        let paid = f.engine.pay_order(order.id).await.unwrap();
        assert_eq!(paid.status, OrderStatus::Paid);
        assert!(paid.paid_at.is_some());

        // Second pay fails and the order stays paid.
        assert!(matches!(
            f.engine.pay_order(order.id).await,
            Err(DomainError::NotPayable(_))
        ));
        let loaded = f.engine.get_order(order.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, OrderStatus::Paid);
    }

    #[tokio::test]
    async fn pay_unknown_order_is_not_payable() {
        let f = fixture().await;
        assert!(matches!(
            f.engine.pay_order(OrderId::new()).await,
            Err(DomainError::NotPayable(_))
        ));
    }

    #[tokio::test]
    async fn cancel_releases_tickets_for_reorder() {
        let f = fixture().await;
        let a1 = seat_id(&f.units, "A1");
        let order = f
            .engine
            .create_order(f.user, vec![LineRequest::specific(a1)], None)
            .await
            .unwrap();

        let canceled = f.engine.cancel_order(order.id).await.unwrap();
        assert_eq!(canceled.status, OrderStatus::Canceled);
        assert!(canceled.paid_at.is_none());

        // The seat is free again.
        f.engine
            .create_order(f.user, vec![LineRequest::specific(a1)], None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn cancel_paid_order_is_refused() {
        let f = fixture().await;
        let a1 = seat_id(&f.units, "A1");
        let order = f
            .engine
            .create_order(f.user, vec![LineRequest::specific(a1)], None)
            .await
            .unwrap();
        f.engine.pay_order(order.id).await.unwrap();

        assert!(matches!(
            f.engine.cancel_order(order.id).await,
            Err(DomainError::NotCancellable(_))
        ));
        let loaded = f.engine.get_order(order.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, OrderStatus::Paid);
    }
}
