//! The feed worker: drains the change feed into the read models.

use chrono::Utc;
use domain::MarketEvent;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::{
    ActivityLog, ActivityRecord, AnalyticsCache, CartAction, PurchaseLog,
};

/// Consumes [`MarketEvent`]s and applies them to the analytics cache, the
/// activity log, and the purchase log.
///
/// Runs until the feed's senders are all dropped. Every event is applied
/// best-effort; the read models are infallible in-memory structures, so
/// there is nothing to escalate — by contract there never would be.
#[derive(Clone)]
pub struct FeedWorker {
    cache: AnalyticsCache,
    activity: ActivityLog,
    purchases: PurchaseLog,
}

impl FeedWorker {
    /// Creates a worker over the given read models.
    pub fn new(cache: AnalyticsCache, activity: ActivityLog, purchases: PurchaseLog) -> Self {
        Self {
            cache,
            activity,
            purchases,
        }
    }

    /// Drains the receiver until it closes.
    pub async fn run(self, mut rx: UnboundedReceiver<MarketEvent>) {
        while let Some(event) = rx.recv().await {
            self.apply(event).await;
            metrics::counter!("feed_events_processed_total").increment(1);
        }
        tracing::debug!("change feed closed, worker exiting");
    }

    async fn apply(&self, event: MarketEvent) {
        match event {
            MarketEvent::OrdersChanged => {
                self.cache.invalidate_all().await;
            }
            MarketEvent::TicketHeld {
                user_id,
                ticket_id,
                event_id,
                kind,
                seat,
                price,
            } => {
                self.activity
                    .record(ActivityRecord {
                        at: Utc::now(),
                        action: CartAction::Held,
                        user_id: Some(user_id),
                        ticket_id: Some(ticket_id),
                        event_id: Some(event_id),
                        kind: Some(kind),
                        seat,
                        price: Some(price),
                    })
                    .await;
            }
            MarketEvent::TicketReleased { user_id, ticket_id } => {
                self.activity
                    .record(ActivityRecord {
                        at: Utc::now(),
                        action: CartAction::Released,
                        user_id: Some(user_id),
                        ticket_id: Some(ticket_id),
                        event_id: None,
                        kind: None,
                        seat: None,
                        price: None,
                    })
                    .await;
            }
            MarketEvent::EventViewed { user_id, event_id } => {
                self.activity
                    .record(ActivityRecord {
                        at: Utc::now(),
                        action: CartAction::Viewed,
                        user_id,
                        ticket_id: None,
                        event_id: Some(event_id),
                        kind: None,
                        seat: None,
                        price: None,
                    })
                    .await;
            }
            MarketEvent::UserBoughtEvent { user_id, event_id } => {
                self.purchases.record(user_id, event_id).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{EventId, Money, TicketId, UserId};
    use domain::ChangeFeed;
    use ticket_store::TicketKind;

    fn worker() -> (FeedWorker, AnalyticsCache, ActivityLog, PurchaseLog) {
        let cache = AnalyticsCache::new();
        let activity = ActivityLog::new(10);
        let purchases = PurchaseLog::new();
        (
            FeedWorker::new(cache.clone(), activity.clone(), purchases.clone()),
            cache,
            activity,
            purchases,
        )
    }

    #[tokio::test]
    async fn orders_changed_drops_the_cache() {
        let (worker, cache, _, _) = worker();
        let event_id = EventId::new();
        cache
            .store(crate::SalesSummary {
                event_id,
                orders: 1,
                tickets_sold: 1,
                ga_sold: 1,
                seats_sold: 0,
                revenue: Money::from_cents(2500),
            })
            .await;

        let (feed, rx) = ChangeFeed::channel();
        feed.publish(MarketEvent::OrdersChanged);
        drop(feed);
        worker.run(rx).await;

        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn held_and_released_land_in_the_activity_log() {
        let (worker, _, activity, _) = worker();
        let user = UserId::new();
        let event = EventId::new();
        let ticket = TicketId::new();

        let (feed, rx) = ChangeFeed::channel();
        feed.publish(MarketEvent::TicketHeld {
            user_id: user,
            ticket_id: ticket,
            event_id: event,
            kind: TicketKind::Seat,
            seat: Some("A1".to_string()),
            price: Money::from_cents(3500),
        });
        feed.publish(MarketEvent::TicketReleased {
            user_id: user,
            ticket_id: ticket,
        });
        drop(feed);
        worker.run(rx).await;

        let entries = activity.for_user(user).await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, CartAction::Released);
        assert_eq!(entries[1].action, CartAction::Held);
        assert_eq!(activity.for_event(event).await.len(), 1);
    }

    #[tokio::test]
    async fn purchases_accumulate() {
        let (worker, _, _, purchases) = worker();
        let user = UserId::new();
        let event = EventId::new();

        let (feed, rx) = ChangeFeed::channel();
        feed.publish(MarketEvent::UserBoughtEvent {
            user_id: user,
            event_id: event,
        });
        drop(feed);
        worker.run(rx).await;

        assert_eq!(purchases.events_for_user(user).await, vec![event]);
    }
}
