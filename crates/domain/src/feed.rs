//! The change feed: fire-and-forget facts for side collaborators.
//!
//! The core publishes a message and moves on. Consumers (cache
//! invalidation, activity logging, purchase facts) run in their own task;
//! a missing or dead consumer never blocks or fails a reservation.

use common::{EventId, Money, TicketId, UserId};
use ticket_store::TicketKind;
use tokio::sync::mpsc;

/// A fact about the marketplace, published after the primary operation
/// committed.
#[derive(Debug, Clone)]
pub enum MarketEvent {
    /// Order data changed (created or paid); cached aggregates are stale.
    OrdersChanged,

    /// A ticket unit entered a user's cart.
    TicketHeld {
        user_id: UserId,
        ticket_id: TicketId,
        event_id: EventId,
        kind: TicketKind,
        seat: Option<String>,
        price: Money,
    },

    /// A ticket unit left a user's cart.
    TicketReleased {
        user_id: UserId,
        ticket_id: TicketId,
    },

    /// An event page was viewed.
    EventViewed {
        user_id: Option<UserId>,
        event_id: EventId,
    },

    /// A user bought tickets for an event.
    UserBoughtEvent {
        user_id: UserId,
        event_id: EventId,
    },
}

/// Publishing half of the change feed.
#[derive(Clone)]
pub struct ChangeFeed {
    tx: mpsc::UnboundedSender<MarketEvent>,
}

impl ChangeFeed {
    /// Creates a feed and the receiver a worker should drain.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<MarketEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Creates a feed with no consumer. Publishes are silently dropped;
    /// useful in tests that don't observe side effects.
    pub fn disconnected() -> Self {
        let (feed, _rx) = Self::channel();
        feed
    }

    /// Publishes a fact. Never blocks, never fails the caller: if the
    /// consumer is gone the fact is dropped with a local trace.
    pub fn publish(&self, event: MarketEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("change feed has no consumer, dropping event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn published_events_reach_the_receiver() {
        let (feed, mut rx) = ChangeFeed::channel();
        feed.publish(MarketEvent::OrdersChanged);

        assert!(matches!(rx.recv().await, Some(MarketEvent::OrdersChanged)));
    }

    #[tokio::test]
    async fn publish_without_consumer_is_a_no_op() {
        let feed = ChangeFeed::disconnected();
        // Must not panic or block.
        feed.publish(MarketEvent::OrdersChanged);
        feed.publish(MarketEvent::TicketReleased {
            user_id: UserId::new(),
            ticket_id: TicketId::new(),
        });
    }
}
