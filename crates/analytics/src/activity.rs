//! Bounded in-memory log of cart and viewing activity.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use common::{EventId, Money, TicketId, UserId};
use ticket_store::TicketKind;

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CartAction {
    Held,
    Released,
    Viewed,
}

/// One activity entry, stamped at receipt.
#[derive(Debug, Clone, Serialize)]
pub struct ActivityRecord {
    pub at: DateTime<Utc>,
    pub action: CartAction,
    pub user_id: Option<UserId>,
    pub ticket_id: Option<TicketId>,
    pub event_id: Option<EventId>,
    pub kind: Option<TicketKind>,
    pub seat: Option<String>,
    pub price: Option<Money>,
}

struct ActivityState {
    by_user: HashMap<UserId, VecDeque<ActivityRecord>>,
    by_event: HashMap<EventId, VecDeque<ActivityRecord>>,
}

/// Activity read model, bounded per key.
#[derive(Clone)]
pub struct ActivityLog {
    cap: usize,
    state: Arc<RwLock<ActivityState>>,
}

impl ActivityLog {
    /// Creates a log keeping at most `cap` entries per user and per event.
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            state: Arc::new(RwLock::new(ActivityState {
                by_user: HashMap::new(),
                by_event: HashMap::new(),
            })),
        }
    }

    /// Appends a record to the per-user and per-event logs it belongs to.
    pub async fn record(&self, record: ActivityRecord) {
        let mut state = self.state.write().await;
        if let Some(user_id) = record.user_id {
            let log = state.by_user.entry(user_id).or_default();
            log.push_back(record.clone());
            while log.len() > self.cap {
                log.pop_front();
            }
        }
        if let Some(event_id) = record.event_id {
            let log = state.by_event.entry(event_id).or_default();
            log.push_back(record);
            while log.len() > self.cap {
                log.pop_front();
            }
        }
    }

    /// Returns a user's activity, newest first.
    pub async fn for_user(&self, user_id: UserId) -> Vec<ActivityRecord> {
        let state = self.state.read().await;
        state
            .by_user
            .get(&user_id)
            .map(|log| log.iter().rev().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns an event's activity, newest first.
    pub async fn for_event(&self, event_id: EventId) -> Vec<ActivityRecord> {
        let state = self.state.read().await;
        state
            .by_event
            .get(&event_id)
            .map(|log| log.iter().rev().cloned().collect())
            .unwrap_or_default()
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn held(user_id: UserId, event_id: EventId) -> ActivityRecord {
        ActivityRecord {
            at: Utc::now(),
            action: CartAction::Held,
            user_id: Some(user_id),
            ticket_id: Some(TicketId::new()),
            event_id: Some(event_id),
            kind: Some(TicketKind::GeneralAdmission),
            seat: None,
            price: Some(Money::from_cents(2500)),
        }
    }

    #[tokio::test]
    async fn records_fan_out_to_both_indexes() {
        let log = ActivityLog::new(10);
        let user = UserId::new();
        let event = EventId::new();

        log.record(held(user, event)).await;

        assert_eq!(log.for_user(user).await.len(), 1);
        assert_eq!(log.for_event(event).await.len(), 1);
        assert!(log.for_user(UserId::new()).await.is_empty());
    }

    #[tokio::test]
    async fn newest_entries_come_first_and_old_ones_fall_off() {
        let log = ActivityLog::new(2);
        let user = UserId::new();
        let event = EventId::new();

        for action in [CartAction::Held, CartAction::Released, CartAction::Viewed] {
            log.record(ActivityRecord {
                action,
                ..held(user, event)
            })
            .await;
        }

        let entries = log.for_user(user).await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, CartAction::Viewed);
        assert_eq!(entries[1].action, CartAction::Released);
    }

    #[tokio::test]
    async fn anonymous_views_only_index_by_event() {
        let log = ActivityLog::new(10);
        let event = EventId::new();

        log.record(ActivityRecord {
            at: Utc::now(),
            action: CartAction::Viewed,
            user_id: None,
            ticket_id: None,
            event_id: Some(event),
            kind: None,
            seat: None,
            price: None,
        })
        .await;

        assert_eq!(log.for_event(event).await.len(), 1);
    }
}
