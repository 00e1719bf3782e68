//! Order line requests.

use common::TicketId;

/// One requested line of an order.
///
/// Seat units are named by identity; general-admission units are fungible
/// and requested by quantity, resolved to concrete IDs by the allocator
/// before anything touches storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineRequest {
    /// A specific ticket unit.
    Specific(TicketId),

    /// N general-admission units for the order's event.
    GeneralAdmission { quantity: u32 },
}

impl LineRequest {
    /// Requests a specific ticket unit.
    pub fn specific(ticket_id: TicketId) -> Self {
        LineRequest::Specific(ticket_id)
    }

    /// Requests a general-admission quantity.
    pub fn general_admission(quantity: u32) -> Self {
        LineRequest::GeneralAdmission { quantity }
    }
}
