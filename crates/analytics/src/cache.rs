//! Cached per-event sales aggregates.
//!
//! The cache is populated lazily by whoever serves the aggregate and
//! dropped wholesale whenever order data changes. Consumers must tolerate
//! a miss; the core never depends on a hit.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;

use common::{EventId, Money, TicketId};
use ticket_store::{OrderRecord, TicketKind};

/// Sales aggregate for one event, over paid orders only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalesSummary {
    pub event_id: EventId,
    pub orders: u64,
    pub tickets_sold: u64,
    pub ga_sold: u64,
    pub seats_sold: u64,
    pub revenue: Money,
}

impl SalesSummary {
    /// Aggregates the paid orders that touch the given event's tickets.
    pub fn compute(
        event_id: EventId,
        orders: &[OrderRecord],
        event_tickets: &HashSet<TicketId>,
    ) -> Self {
        let mut summary = SalesSummary {
            event_id,
            orders: 0,
            tickets_sold: 0,
            ga_sold: 0,
            seats_sold: 0,
            revenue: Money::zero(),
        };

        for order in orders
            .iter()
            .filter(|o| o.status == ticket_store::OrderStatus::Paid)
        {
            let mut touched = false;
            for line in order.lines.iter().filter(|l| event_tickets.contains(&l.ticket_id)) {
                touched = true;
                summary.tickets_sold += 1;
                match line.kind {
                    TicketKind::GeneralAdmission => summary.ga_sold += 1,
                    TicketKind::Seat => summary.seats_sold += 1,
                }
                summary.revenue += line.price;
            }
            if touched {
                summary.orders += 1;
            }
        }
        summary
    }
}

/// Invalidation-driven cache of sales summaries.
#[derive(Clone, Default)]
pub struct AnalyticsCache {
    entries: Arc<RwLock<HashMap<EventId, SalesSummary>>>,
}

impl AnalyticsCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached summary for an event, if fresh.
    pub async fn get(&self, event_id: EventId) -> Option<SalesSummary> {
        let hit = self.entries.read().await.get(&event_id).cloned();
        if hit.is_some() {
            metrics::counter!("analytics_cache_hits_total").increment(1);
        } else {
            metrics::counter!("analytics_cache_misses_total").increment(1);
        }
        hit
    }

    /// Stores a freshly computed summary.
    pub async fn store(&self, summary: SalesSummary) {
        self.entries.write().await.insert(summary.event_id, summary);
    }

    /// Drops every cached aggregate. Called when any order-related data
    /// changes; finer-grained invalidation is not worth tracking.
    pub async fn invalidate_all(&self) {
        let mut entries = self.entries.write().await;
        let dropped = entries.len();
        entries.clear();
        if dropped > 0 {
            tracing::debug!(dropped, "analytics cache invalidated");
        }
    }

    /// Number of cached summaries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
