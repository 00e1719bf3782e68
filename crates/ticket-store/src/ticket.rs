//! Ticket unit model, inventory specification, and listing filters.

use serde::{Deserialize, Serialize};

use common::{EventId, Money, TicketId};

/// The kind of a ticket unit.
///
/// General-admission units are fungible: any GA unit for an event is
/// interchangeable with any other. Seat units are unique, identified by
/// their seat label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketKind {
    GeneralAdmission,
    Seat,
}

impl TicketKind {
    /// Returns the kind name as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketKind::GeneralAdmission => "general_admission",
            TicketKind::Seat => "seat",
        }
    }

    /// Parses a stored kind name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "general_admission" => Some(TicketKind::GeneralAdmission),
            "seat" => Some(TicketKind::Seat),
            _ => None,
        }
    }
}

impl std::fmt::Display for TicketKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single sellable ticket unit.
///
/// Units are generated in bulk when an event is created and are never
/// deleted; orders and holds only reference them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketUnit {
    pub id: TicketId,
    pub event_id: EventId,
    pub kind: TicketKind,
    /// Seat label, present iff `kind` is [`TicketKind::Seat`].
    pub seat: Option<String>,
    /// Price in minor currency units. Never negative.
    pub price: Money,
}

impl TicketUnit {
    /// Creates a new general-admission unit.
    pub fn general_admission(event_id: EventId, price: Money) -> Self {
        Self {
            id: TicketId::new(),
            event_id,
            kind: TicketKind::GeneralAdmission,
            seat: None,
            price,
        }
    }

    /// Creates a new seat unit with the given label.
    pub fn seat(event_id: EventId, label: impl Into<String>, price: Money) -> Self {
        Self {
            id: TicketId::new(),
            event_id,
            kind: TicketKind::Seat,
            seat: Some(label.into()),
            price,
        }
    }

    /// Returns true if this unit counts as general admission.
    ///
    /// `kind` is the authoritative discriminant; a seat label of `"GA"`
    /// (case-insensitive) is accepted as a legacy representation from
    /// migrated data.
    pub fn is_general_admission(&self) -> bool {
        self.kind == TicketKind::GeneralAdmission
            || self
                .seat
                .as_deref()
                .is_some_and(|s| s.eq_ignore_ascii_case("GA"))
    }

    /// Returns the label used for display and sorting: the seat label for
    /// seats, `"GA"` for general admission.
    pub fn label(&self) -> &str {
        self.seat.as_deref().unwrap_or("GA")
    }
}

/// Specification of the fixed inventory generated for a new event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventorySpec {
    pub ga_count: u32,
    pub ga_price: Money,
    pub seat_labels: Vec<String>,
    pub seat_price: Money,
}

impl InventorySpec {
    /// Generates seat labels as rows of numbered seats, e.g. rows "A","B"
    /// with 50 seats each yield A1..A50, B1..B50.
    pub fn with_rows(
        ga_count: u32,
        ga_price: Money,
        rows: &[&str],
        seats_per_row: u32,
        seat_price: Money,
    ) -> Self {
        let seat_labels = rows
            .iter()
            .flat_map(|row| (1..=seats_per_row).map(move |n| format!("{row}{n}")))
            .collect();
        Self {
            ga_count,
            ga_price,
            seat_labels,
            seat_price,
        }
    }

    /// Checks the spec invariants: non-negative prices and unique seat
    /// labels.
    pub fn validate(&self, event_id: EventId) -> crate::Result<()> {
        if self.ga_price.is_negative() {
            return Err(crate::StoreError::NegativePrice {
                price: self.ga_price.cents(),
            });
        }
        if self.seat_price.is_negative() {
            return Err(crate::StoreError::NegativePrice {
                price: self.seat_price.cents(),
            });
        }
        let mut seen = std::collections::HashSet::new();
        for label in &self.seat_labels {
            if !seen.insert(label.as_str()) {
                return Err(crate::StoreError::DuplicateSeatLabel {
                    event_id,
                    label: label.clone(),
                });
            }
        }
        Ok(())
    }

    /// Materializes the spec into ticket units for an event.
    pub fn generate(&self, event_id: EventId) -> Vec<TicketUnit> {
        let mut units = Vec::with_capacity(self.ga_count as usize + self.seat_labels.len());
        for _ in 0..self.ga_count {
            units.push(TicketUnit::general_admission(event_id, self.ga_price));
        }
        for label in &self.seat_labels {
            units.push(TicketUnit::seat(event_id, label.clone(), self.seat_price));
        }
        units
    }
}

impl Default for InventorySpec {
    /// The stock inventory: 100 GA at 25.00 and seats A1-A50, B1-B50 at
    /// 35.00.
    fn default() -> Self {
        Self::with_rows(
            100,
            Money::from_cents(2500),
            &["A", "B"],
            50,
            Money::from_cents(3500),
        )
    }
}

/// Filter for listing an event's ticket units.
#[derive(Debug, Clone, Default)]
pub struct TicketFilter {
    pub kind: Option<TicketKind>,
    pub min_price: Option<Money>,
    pub max_price: Option<Money>,
    /// Case-insensitive seat-label prefix, e.g. "A" matches A1..A50.
    pub seat_prefix: Option<String>,
}

impl TicketFilter {
    /// A filter matching only general-admission units.
    pub fn general_admission() -> Self {
        Self {
            kind: Some(TicketKind::GeneralAdmission),
            ..Self::default()
        }
    }

    /// Returns true if the unit passes every set criterion.
    pub fn matches(&self, unit: &TicketUnit) -> bool {
        if let Some(kind) = self.kind {
            let ga = unit.is_general_admission();
            match kind {
                TicketKind::GeneralAdmission if !ga => return false,
                TicketKind::Seat if ga => return false,
                _ => {}
            }
        }
        if let Some(min) = self.min_price
            && unit.price < min
        {
            return false;
        }
        if let Some(max) = self.max_price
            && unit.price > max
        {
            return false;
        }
        if let Some(ref prefix) = self.seat_prefix {
            let matches_prefix = unit
                .label()
                .get(..prefix.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(prefix));
            if !matches_prefix {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ga_unit_has_no_seat() {
        let unit = TicketUnit::general_admission(EventId::new(), Money::from_cents(2500));
        assert_eq!(unit.kind, TicketKind::GeneralAdmission);
        assert!(unit.seat.is_none());
        assert!(unit.is_general_admission());
        assert_eq!(unit.label(), "GA");
    }

    #[test]
    fn seat_unit_keeps_label() {
        let unit = TicketUnit::seat(EventId::new(), "A1", Money::from_cents(3500));
        assert_eq!(unit.kind, TicketKind::Seat);
        assert_eq!(unit.label(), "A1");
        assert!(!unit.is_general_admission());
    }

    #[test]
    fn legacy_ga_seat_label_counts_as_ga() {
        // Migrated data sometimes carried the GA marker in the seat field.
        let mut unit = TicketUnit::seat(EventId::new(), "ga", Money::from_cents(2500));
        assert!(unit.is_general_admission());
        unit.seat = Some("GA".to_string());
        assert!(unit.is_general_admission());
    }

    #[test]
    fn default_spec_matches_stock_inventory() {
        let spec = InventorySpec::default();
        assert_eq!(spec.ga_count, 100);
        assert_eq!(spec.seat_labels.len(), 100);
        assert_eq!(spec.seat_labels[0], "A1");
        assert_eq!(spec.seat_labels[49], "A50");
        assert_eq!(spec.seat_labels[50], "B1");
        assert_eq!(spec.seat_labels[99], "B50");
    }

    #[test]
    fn generate_produces_all_units() {
        let event_id = EventId::new();
        let spec = InventorySpec::with_rows(
            2,
            Money::from_cents(2500),
            &["A"],
            2,
            Money::from_cents(3500),
        );
        let units = spec.generate(event_id);
        assert_eq!(units.len(), 4);
        assert_eq!(
            units
                .iter()
                .filter(|u| u.kind == TicketKind::GeneralAdmission)
                .count(),
            2
        );
        assert!(units.iter().all(|u| u.event_id == event_id));
    }

    #[test]
    fn filter_by_kind_uses_ga_policy() {
        let event_id = EventId::new();
        let ga = TicketUnit::general_admission(event_id, Money::from_cents(2500));
        let legacy = TicketUnit::seat(event_id, "GA", Money::from_cents(2500));
        let seat = TicketUnit::seat(event_id, "A1", Money::from_cents(3500));

        let ga_filter = TicketFilter::general_admission();
        assert!(ga_filter.matches(&ga));
        assert!(ga_filter.matches(&legacy));
        assert!(!ga_filter.matches(&seat));

        let seat_filter = TicketFilter {
            kind: Some(TicketKind::Seat),
            ..TicketFilter::default()
        };
        assert!(!seat_filter.matches(&ga));
        assert!(!seat_filter.matches(&legacy));
        assert!(seat_filter.matches(&seat));
    }

    #[test]
    fn filter_by_price_range() {
        let unit = TicketUnit::seat(EventId::new(), "A1", Money::from_cents(3500));
        let filter = TicketFilter {
            min_price: Some(Money::from_cents(3000)),
            max_price: Some(Money::from_cents(4000)),
            ..TicketFilter::default()
        };
        assert!(filter.matches(&unit));

        let filter = TicketFilter {
            max_price: Some(Money::from_cents(3000)),
            ..TicketFilter::default()
        };
        assert!(!filter.matches(&unit));
    }

    #[test]
    fn filter_by_seat_prefix_is_case_insensitive() {
        let unit = TicketUnit::seat(EventId::new(), "A12", Money::from_cents(3500));
        let filter = TicketFilter {
            seat_prefix: Some("a1".to_string()),
            ..TicketFilter::default()
        };
        assert!(filter.matches(&unit));

        let filter = TicketFilter {
            seat_prefix: Some("B".to_string()),
            ..TicketFilter::default()
        };
        assert!(!filter.matches(&unit));
    }
}
