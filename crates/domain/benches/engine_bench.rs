use std::time::Duration;

use chrono::Utc;
use common::Money;
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{AvailabilityResolver, ChangeFeed, InMemoryUserDirectory, LineRequest, OrderEngine};
use ticket_store::{
    EventDraft, InMemoryHoldStore, InMemoryInventoryStore, InMemoryOrderStore, InventorySpec,
    InventoryStore, TicketFilter,
};

async fn seeded_world() -> (
    OrderEngine<
        InMemoryInventoryStore,
        InMemoryOrderStore,
        InMemoryHoldStore,
        InMemoryUserDirectory,
    >,
    AvailabilityResolver<InMemoryInventoryStore, InMemoryOrderStore, InMemoryHoldStore>,
    InMemoryUserDirectory,
    common::EventId,
) {
    let inventory = InMemoryInventoryStore::new();
    let orders = InMemoryOrderStore::new();
    let holds = InMemoryHoldStore::new(Duration::from_secs(900));
    let users = InMemoryUserDirectory::new();

    let (event, _) = inventory
        .create_event(
            EventDraft::new("Rust Conf", "Main Hall", Utc::now()),
            InventorySpec::with_rows(
                100,
                Money::from_cents(2500),
                &["A", "B"],
                50,
                Money::from_cents(3500),
            ),
        )
        .await
        .unwrap();

    (
        OrderEngine::new(
            inventory.clone(),
            orders.clone(),
            holds.clone(),
            users.clone(),
            ChangeFeed::disconnected(),
        ),
        AvailabilityResolver::new(inventory, orders, holds),
        users,
        event.id,
    )
}

fn bench_list_available(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (_, resolver, _, event_id) = rt.block_on(seeded_world());

    c.bench_function("domain/list_available_200_units", |b| {
        b.iter(|| {
            rt.block_on(async {
                resolver
                    .list_available(event_id, &TicketFilter::default())
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_create_ga_order(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("domain/create_and_cancel_ga_order", |b| {
        let (engine, _, users, event_id) = rt.block_on(seeded_world());
        let user = rt.block_on(users.register("Bench".into(), "bench@example.com".into())).unwrap().id;

        b.iter(|| {
            rt.block_on(async {
                let order = engine
                    .create_order(
                        user,
                        vec![LineRequest::general_admission(2)],
                        Some(event_id),
                    )
                    .await
                    .unwrap();
                // Release the units so the next iteration can claim them.
                engine.cancel_order(order.id).await.unwrap();
            });
        });
    });
}

criterion_group!(benches, bench_list_available, bench_create_ga_order);
criterion_main!(benches);
