//! Order records and the order status state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use common::{Money, OrderId, TicketId, UserId};

use crate::ticket::TicketKind;

/// The status of an order in its lifecycle.
///
/// Status transitions:
/// ```text
/// Pending ──pay──► Paid
///    │
///    └───cancel──► Canceled
/// ```
///
/// `Paid` and `Canceled` are terminal; no transition leaves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Reservation committed, awaiting payment.
    #[default]
    Pending,

    /// Payment confirmed (terminal state).
    Paid,

    /// Order was canceled before payment (terminal state).
    Canceled,
}

impl OrderStatus {
    /// Returns true if the order can be paid in this status.
    pub fn can_pay(&self) -> bool {
        matches!(self, OrderStatus::Pending)
    }

    /// Returns true if the order can be canceled in this status.
    pub fn can_cancel(&self) -> bool {
        matches!(self, OrderStatus::Pending)
    }

    /// Returns true if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Paid | OrderStatus::Canceled)
    }

    /// Returns true if orders in this status hold their tickets. Both
    /// pending and paid orders keep their units out of availability.
    pub fn reserves_tickets(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Paid)
    }

    /// Returns the status name as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Canceled => "canceled",
        }
    }

    /// Parses a stored status name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(OrderStatus::Pending),
            "paid" => Some(OrderStatus::Paid),
            "canceled" => Some(OrderStatus::Canceled),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single line in an order: one ticket unit with its price snapshotted at
/// order time. The live ticket price may change later; the line price is
/// what the buyer owes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub ticket_id: TicketId,
    pub price: Money,
    pub kind: TicketKind,
    pub seat: Option<String>,
}

/// A stored order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: OrderId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub status: OrderStatus,
    pub lines: Vec<OrderLine>,
    /// Always the sum of line prices, computed server-side.
    pub total: Money,
    pub paid_at: Option<DateTime<Utc>>,
}

impl OrderRecord {
    /// Creates a new pending order. The total is derived from the lines;
    /// caller-supplied totals are never trusted.
    pub fn pending(user_id: UserId, lines: Vec<OrderLine>, created_at: DateTime<Utc>) -> Self {
        let total = lines.iter().map(|l| l.price).sum();
        Self {
            id: OrderId::new(),
            user_id,
            created_at,
            status: OrderStatus::Pending,
            lines,
            total,
            paid_at: None,
        }
    }

    /// Iterates the ticket unit IDs referenced by this order.
    pub fn ticket_ids(&self) -> impl Iterator<Item = TicketId> + '_ {
        self.lines.iter().map(|l| l.ticket_id)
    }
}
