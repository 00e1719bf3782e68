//! HTTP API server for the ticket marketplace.
//!
//! Provides REST endpoints for events, availability, orders, and carts,
//! with structured logging (tracing) and Prometheus metrics. The server is
//! generic over the storage backend; `main` picks in-memory or PostgreSQL
//! from the configuration.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use analytics::{ActivityLog, AnalyticsCache, FeedWorker, PurchaseLog};
use axum::Router;
use axum::routing::{delete, get, patch, post};
use domain::{
    AvailabilityResolver, CartService, ChangeFeed, InMemoryUserDirectory, OrderEngine,
    UserDirectory,
};
use metrics_exporter_prometheus::PrometheusHandle;
use ticket_store::{
    HoldStore, InMemoryHoldStore, InMemoryInventoryStore, InMemoryOrderStore, InventoryStore,
    OrderStore,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<I, O, H, U> {
    pub inventory: I,
    pub orders: O,
    pub users: U,
    pub engine: OrderEngine<I, O, H, U>,
    pub cart: CartService<I, O, H, U>,
    pub resolver: AvailabilityResolver<I, O, H>,
    pub feed: ChangeFeed,
    pub analytics: AnalyticsCache,
    pub activity: ActivityLog,
    pub purchases: PurchaseLog,
}

/// The all-in-memory state used by default and in tests.
pub type InMemoryAppState =
    AppState<InMemoryInventoryStore, InMemoryOrderStore, InMemoryHoldStore, InMemoryUserDirectory>;

/// Wires stores and collaborators into shared state and spawns the feed
/// worker that keeps the read side current.
pub fn create_state<I, O, H, U>(inventory: I, orders: O, holds: H, users: U) -> Arc<AppState<I, O, H, U>>
where
    I: InventoryStore + Clone + 'static,
    O: OrderStore + Clone + 'static,
    H: HoldStore + Clone + 'static,
    U: UserDirectory + Clone + 'static,
{
    let (feed, feed_rx) = ChangeFeed::channel();
    let analytics = AnalyticsCache::new();
    let activity = ActivityLog::default();
    let purchases = PurchaseLog::new();

    tokio::spawn(
        FeedWorker::new(analytics.clone(), activity.clone(), purchases.clone()).run(feed_rx),
    );

    Arc::new(AppState {
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
            feed.clone(),
        ),
        resolver: AvailabilityResolver::new(inventory.clone(), orders.clone(), holds),
        inventory,
        orders,
        users,
        feed,
        analytics,
        activity,
        purchases,
    })
}

/// Creates the default in-memory application state.
pub fn create_default_state(hold_ttl: Duration) -> Arc<InMemoryAppState> {
    create_state(
        InMemoryInventoryStore::new(),
        InMemoryOrderStore::new(),
        InMemoryHoldStore::new(hold_ttl),
        InMemoryUserDirectory::new(),
    )
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<I, O, H, U>(
    state: Arc<AppState<I, O, H, U>>,
    metrics_handle: PrometheusHandle,
) -> Router
where
    I: InventoryStore + Clone + 'static,
    O: OrderStore + Clone + 'static,
    H: HoldStore + Clone + 'static,
    U: UserDirectory + Clone + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/events", post(routes::events::create::<I, O, H, U>))
        .route("/events", get(routes::events::list::<I, O, H, U>))
        .route("/events/{id}", get(routes::events::get::<I, O, H, U>))
        .route("/tickets", get(routes::tickets::list::<I, O, H, U>))
        .route("/orders", post(routes::orders::create::<I, O, H, U>))
        .route("/orders/{id}", get(routes::orders::get::<I, O, H, U>))
        .route("/orders/{id}/pay", patch(routes::orders::pay::<I, O, H, U>))
        .route(
            "/orders/{id}/cancel",
            patch(routes::orders::cancel::<I, O, H, U>),
        )
        .route("/cart", get(routes::cart::view::<I, O, H, U>))
        .route("/cart/items", post(routes::cart::add_item::<I, O, H, U>))
        .route(
            "/cart/items/{ticket_id}",
            delete(routes::cart::remove_item::<I, O, H, U>),
        )
        .route("/cart/clear", post(routes::cart::clear::<I, O, H, U>))
        .route(
            "/cart/checkout",
            post(routes::cart::checkout::<I, O, H, U>),
        )
        .route("/users", post(routes::users::create::<I, O, H, U>))
        .route("/users/{id}", get(routes::users::get::<I, O, H, U>))
        .route(
            "/activity/user/{id}",
            get(routes::activity::for_user::<I, O, H, U>),
        )
        .route(
            "/activity/event/{id}",
            get(routes::activity::for_event::<I, O, H, U>),
        )
        .route(
            "/analytics/events/{id}",
            get(routes::analytics::event_sales::<I, O, H, U>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
