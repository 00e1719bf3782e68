//! Event catalog records.
//!
//! Event CRUD proper is a thin collaborator; the store keeps just enough of
//! it to anchor ticket inventory to an event and to create both atomically.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use common::EventId;

/// A stored event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: EventId,
    pub title: String,
    pub venue: String,
    pub starts_at: DateTime<Utc>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating an event.
#[derive(Debug, Clone)]
pub struct EventDraft {
    pub title: String,
    pub venue: String,
    pub starts_at: DateTime<Utc>,
    pub description: Option<String>,
}

impl EventDraft {
    pub fn new(
        title: impl Into<String>,
        venue: impl Into<String>,
        starts_at: DateTime<Utc>,
    ) -> Self {
        Self {
            title: title.into(),
            venue: venue.into(),
            starts_at,
            description: None,
        }
    }

    /// Materializes the draft into a record with a fresh ID.
    pub fn into_record(self, now: DateTime<Utc>) -> EventRecord {
        EventRecord {
            id: EventId::new(),
            title: self.title,
            venue: self.venue,
            starts_at: self.starts_at,
            description: self.description,
            created_at: now,
        }
    }
}
