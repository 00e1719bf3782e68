//! Purchase facts: which users bought which events.
//!
//! A shadow of the original graph sync, kept in-process. Powers a trivial
//! "users who bought this also bought" lookup; real recommendation queries
//! are out of scope.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::RwLock;

use common::{EventId, UserId};

struct PurchaseState {
    events_by_user: HashMap<UserId, HashSet<EventId>>,
    users_by_event: HashMap<EventId, HashSet<UserId>>,
}

/// Purchase-fact read model.
#[derive(Clone)]
pub struct PurchaseLog {
    state: Arc<RwLock<PurchaseState>>,
}

impl PurchaseLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(PurchaseState {
                events_by_user: HashMap::new(),
                users_by_event: HashMap::new(),
            })),
        }
    }

    /// Records that a user bought tickets for an event. Idempotent.
    pub async fn record(&self, user_id: UserId, event_id: EventId) {
        let mut state = self.state.write().await;
        state.events_by_user.entry(user_id).or_default().insert(event_id);
        state.users_by_event.entry(event_id).or_default().insert(user_id);
    }

    /// Events the user bought.
    pub async fn events_for_user(&self, user_id: UserId) -> Vec<EventId> {
        let state = self.state.read().await;
        state
            .events_by_user
            .get(&user_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Events bought by buyers of this event, with buyer counts, most
    /// shared buyers first.
    pub async fn also_bought(&self, event_id: EventId) -> Vec<(EventId, usize)> {
        let state = self.state.read().await;
        let Some(buyers) = state.users_by_event.get(&event_id) else {
            return Vec::new();
        };

        let mut counts: HashMap<EventId, usize> = HashMap::new();
        for buyer in buyers {
            if let Some(events) = state.events_by_user.get(buyer) {
                for other in events.iter().filter(|e| **e != event_id) {
                    *counts.entry(*other).or_default() += 1;
                }
            }
        }

        let mut ranked: Vec<_> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.as_uuid().cmp(&b.0.as_uuid())));
        ranked
    }
}

impl Default for PurchaseLog {
    fn default() -> Self {
        Self::new()
    }
}
