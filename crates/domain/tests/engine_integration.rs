//! End-to-end reservation scenarios over the in-memory stores.

use std::time::Duration;

use chrono::Utc;
use common::{Money, TicketId};
use domain::{
    AvailabilityResolver, AvailabilityRow, CartService, ChangeFeed, DomainError,
    InMemoryUserDirectory, LineRequest, OrderEngine, UserDirectory,
};
use ticket_store::{
    EventDraft, InMemoryHoldStore, InMemoryInventoryStore, InMemoryOrderStore, InventorySpec,
    InventoryStore, OrderStatus, TicketFilter, TicketUnit,
};

struct World {
    engine: OrderEngine<
        InMemoryInventoryStore,
        InMemoryOrderStore,
        InMemoryHoldStore,
        InMemoryUserDirectory,
    >,
    cart: CartService<
        InMemoryInventoryStore,
        InMemoryOrderStore,
        InMemoryHoldStore,
        InMemoryUserDirectory,
    >,
    resolver:
        AvailabilityResolver<InMemoryInventoryStore, InMemoryOrderStore, InMemoryHoldStore>,
    users: InMemoryUserDirectory,
    event_id: common::EventId,
    units: Vec<TicketUnit>,
}

async fn world() -> World {
    let inventory = InMemoryInventoryStore::new();
    let orders = InMemoryOrderStore::new();
    let holds = InMemoryHoldStore::new(Duration::from_secs(900));
    let users = InMemoryUserDirectory::new();
    let feed = ChangeFeed::disconnected();

    // Event E with 2 GA units at 25.00 and seats A1, A2 at 35.00.
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

    World {
        engine: OrderEngine::new(
            inventory.clone(),
            orders.clone(),
            holds.clone(),
            users.clone(),
            feed.clone(),
        ),
        cart: CartService::new(
            inventory.clone(),
            orders.clone(),
            holds.clone(),
            users.clone(),
            feed,
        ),
        resolver: AvailabilityResolver::new(inventory, orders, holds),
        users,
        event_id: event.id,
        units,
    }
}

fn seat_id(units: &[TicketUnit], label: &str) -> TicketId {
    units.iter().find(|u| u.label() == label).unwrap().id
}

#[tokio::test]
async fn competing_paths_share_one_inventory() {
    let w = world().await;
    let user_x = w.users.register("X".into(), "x@example.com".into()).await.unwrap().id;
    let user_y = w.users.register("Y".into(), "y@example.com".into()).await.unwrap().id;
    let user_z = w.users.register("Z".into(), "z@example.com".into()).await.unwrap().id;

    // X holds both GA units in their cart.
    let held = w
        .cart
        .add_general_admission(user_x, w.event_id, 2)
        .await
        .unwrap();
    assert_eq!(held.len(), 2);

    // Y buys seat A1 directly; total is the stored seat price.
    let a1 = seat_id(&w.units, "A1");
    let order_y = w
        .engine
        .create_order(user_y, vec![LineRequest::specific(a1)], None)
        .await
        .unwrap();
    assert_eq!(order_y.total.cents(), 3500);

    // Z wants one more GA unit; the supply is exhausted by X's holds.
    match w.cart.add_general_admission(user_z, w.event_id, 1).await {
        Err(DomainError::InsufficientAvailability {
            requested,
            available,
        }) => {
            assert_eq!(requested, 1);
            assert_eq!(available, 0);
        }
        other => panic!("expected InsufficientAvailability, got {other:?}"),
    }

    // X checks out: the order is paid immediately at GA prices.
    let order_x = w.cart.checkout(user_x).await.unwrap();
    assert_eq!(order_x.status, OrderStatus::Paid);
    assert_eq!(order_x.total.cents(), 5000);

    // Only seat A2 remains.
    let view = w
        .resolver
        .list_available(w.event_id, &TicketFilter::default())
        .await
        .unwrap();
    assert_eq!(view.ga_available(), 0);
    assert_eq!(view.rows.len(), 1);
    assert!(matches!(
        &view.rows[0],
        AvailabilityRow::Seat { seat, .. } if seat == "A2"
    ));
}

#[tokio::test]
async fn overlapping_orders_resolve_to_one_winner() {
    let w = world().await;
    let alice = w.users.register("Alice".into(), "alice@example.com".into()).await.unwrap().id;
    let bob = w.users.register("Bob".into(), "bob@example.com".into()).await.unwrap().id;
    let a1 = seat_id(&w.units, "A1");

    // Fire both orders concurrently for the same seat.
    let (first, second) = tokio::join!(
        w.engine
            .create_order(alice, vec![LineRequest::specific(a1)], None),
        w.engine
            .create_order(bob, vec![LineRequest::specific(a1)], None),
    );

    let outcomes = [first, second];
    let won = outcomes.iter().filter(|r| r.is_ok()).count();
    let conflicted = outcomes
        .iter()
        .filter(|r| matches!(r, Err(DomainError::Conflict { .. })))
        .count();
    assert_eq!(won, 1);
    assert_eq!(conflicted, 1);
}

#[tokio::test]
async fn concurrent_ga_allocations_never_overlap() {
    let w = world().await;
    let alice = w.users.register("Alice".into(), "alice@example.com".into()).await.unwrap().id;
    let bob = w.users.register("Bob".into(), "bob@example.com".into()).await.unwrap().id;

    let (first, second) = tokio::join!(
        w.cart.add_general_admission(alice, w.event_id, 1),
        w.cart.add_general_admission(bob, w.event_id, 1),
    );

    // Both may win (2 units exist), but never with the same unit.
    if let (Ok(a), Ok(b)) = (&first, &second) {
        assert!(a.iter().all(|id| !b.contains(id)));
    }

    // Between winners and conflict-losers, supply never goes negative.
    let view = w
        .resolver
        .list_available(w.event_id, &TicketFilter::default())
        .await
        .unwrap();
    let taken = [&first, &second]
        .iter()
        .filter(|r| r.is_ok())
        .count();
    assert_eq!(view.ga_available(), 2 - taken);
}

#[tokio::test]
async fn order_totals_always_match_their_lines() {
    let w = world().await;
    let user = w.users.register("Ada".into(), "ada@example.com".into()).await.unwrap().id;

    let order = w
        .engine
        .create_order(
            user,
            vec![
                LineRequest::specific(seat_id(&w.units, "A1")),
                LineRequest::general_admission(2),
            ],
            Some(w.event_id),
        )
        .await
        .unwrap();

    let line_sum: i64 = order.lines.iter().map(|l| l.price.cents()).sum();
    assert_eq!(order.total.cents(), line_sum);
    assert_eq!(order.total.cents(), 3500 + 2 * 2500);
}
