//! Availability resolution.
//!
//! A ticket unit is available when it is neither claimed by a pending/paid
//! order nor held in any user's live cart. The exclusion set is recomputed
//! per query; nothing here mutates state.

use std::collections::HashSet;

use serde::Serialize;

use common::{EventId, Money, TicketId};
use ticket_store::{HoldStore, InventoryStore, OrderStore, TicketFilter, TicketUnit};

use crate::Result;

/// One row of the availability view.
///
/// General-admission units are fungible and collapse into a single row with
/// a count; every available seat is listed individually.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AvailabilityRow {
    GeneralAdmission { price: Money, available: usize },
    Seat { ticket_id: TicketId, seat: String, price: Money },
}

impl AvailabilityRow {
    fn sort_label(&self) -> &str {
        match self {
            // GA sorts first; the empty label does that under the
            // GA-first/lexicographic ordering.
            AvailabilityRow::GeneralAdmission { .. } => "",
            AvailabilityRow::Seat { seat, .. } => seat,
        }
    }
}

/// The availability view for an event under a filter.
#[derive(Debug, Clone, Serialize)]
pub struct AvailabilityView {
    pub rows: Vec<AvailabilityRow>,
}

impl AvailabilityView {
    /// Total number of rows (the GA row counts as one).
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the GA row's available count, or 0 when no GA row exists.
    pub fn ga_available(&self) -> usize {
        self.rows
            .iter()
            .find_map(|row| match row {
                AvailabilityRow::GeneralAdmission { available, .. } => Some(*available),
                _ => None,
            })
            .unwrap_or(0)
    }
}

/// Computes exclusion sets and availability views.
#[derive(Clone)]
pub struct AvailabilityResolver<I, O, H> {
    inventory: I,
    orders: O,
    holds: H,
}

impl<I, O, H> AvailabilityResolver<I, O, H>
where
    I: InventoryStore,
    O: OrderStore,
    H: HoldStore,
{
    /// Creates a resolver over the given stores.
    pub fn new(inventory: I, orders: O, holds: H) -> Self {
        Self {
            inventory,
            orders,
            holds,
        }
    }

    /// Returns the set of ticket unit IDs currently unavailable for new
    /// reservation: the union of order claims (pending/paid) and live
    /// holds across all users.
    #[tracing::instrument(skip(self))]
    pub async fn compute_exclusions(&self) -> Result<HashSet<TicketId>> {
        let mut excluded = self.orders.reserved_tickets().await?;
        excluded.extend(self.holds.held_tickets().await?);
        Ok(excluded)
    }

    /// Returns the event's ticket units that match the filter and are not
    /// excluded.
    pub async fn available_units(
        &self,
        event_id: EventId,
        filter: &TicketFilter,
    ) -> Result<Vec<TicketUnit>> {
        let units = self.inventory.list_by_event(event_id, filter).await?;
        let excluded = self.compute_exclusions().await?;
        Ok(units
            .into_iter()
            .filter(|u| !excluded.contains(&u.id))
            .collect())
    }

    /// Builds the availability view: GA collapsed into one counted row
    /// (priced at the first available GA unit, on the assumption of a
    /// single GA price per event), seats listed individually, sorted GA
    /// first then lexicographically by seat label. Zero remaining GA units
    /// produce no GA row rather than a zero-count row.
    #[tracing::instrument(skip(self))]
    pub async fn list_available(
        &self,
        event_id: EventId,
        filter: &TicketFilter,
    ) -> Result<AvailabilityView> {
        let mut available = self.available_units(event_id, filter).await?;
        // Stable GA pricing and reproducible seat ordering.
        available.sort_by(|a, b| a.id.cmp(&b.id));

        let (ga, seats): (Vec<_>, Vec<_>) = available
            .into_iter()
            .partition(|u| u.is_general_admission());

        let mut rows = Vec::with_capacity(seats.len() + 1);
        if let Some(first) = ga.first() {
            rows.push(AvailabilityRow::GeneralAdmission {
                price: first.price,
                available: ga.len(),
            });
        }
        for unit in seats {
            rows.push(AvailabilityRow::Seat {
                ticket_id: unit.id,
                seat: unit.label().to_string(),
                price: unit.price,
            });
        }
        rows.sort_by(|a, b| a.sort_label().cmp(b.sort_label()));

        Ok(AvailabilityView { rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::time::Duration;
    use ticket_store::{
        EventDraft, InMemoryHoldStore, InMemoryInventoryStore, InMemoryOrderStore, InventorySpec,
        OrderLine, OrderRecord,
    };

    use common::UserId;

    fn resolver() -> (
        AvailabilityResolver<InMemoryInventoryStore, InMemoryOrderStore, InMemoryHoldStore>,
        InMemoryInventoryStore,
        InMemoryOrderStore,
        InMemoryHoldStore,
    ) {
        let inventory = InMemoryInventoryStore::new();
        let orders = InMemoryOrderStore::new();
        let holds = InMemoryHoldStore::new(Duration::from_secs(900));
        (
            AvailabilityResolver::new(inventory.clone(), orders.clone(), holds.clone()),
            inventory,
            orders,
            holds,
        )
    }

    async fn seed(
        inventory: &InMemoryInventoryStore,
    ) -> (EventId, Vec<TicketUnit>) {
        let (event, units) = inventory
            .create_event(
                EventDraft::new("Rust Conf", "Main Hall", Utc::now()),
                InventorySpec::with_rows(
                    2,
                    Money::from_cents(2500),
                    &["A"],
                    2,
                    Money::from_cents(3500),
                ),
            )
            .await
            .unwrap();
        (event.id, units)
    }

    fn line(unit: &TicketUnit) -> OrderLine {
        OrderLine {
            ticket_id: unit.id,
            price: unit.price,
            kind: unit.kind,
            seat: unit.seat.clone(),
        }
    }

    #[tokio::test]
    async fn full_inventory_is_available() {
        let (resolver, inventory, _, _) = resolver();
        let (event_id, _) = seed(&inventory).await;

        let view = resolver
            .list_available(event_id, &TicketFilter::default())
            .await
            .unwrap();

        // One GA row plus two seats.
        assert_eq!(view.len(), 3);
        assert_eq!(view.ga_available(), 2);
        assert_eq!(
            view.rows[0],
            AvailabilityRow::GeneralAdmission {
                price: Money::from_cents(2500),
                available: 2,
            }
        );
    }

    #[tokio::test]
    async fn rows_sort_ga_first_then_by_seat() {
        let (resolver, inventory, _, _) = resolver();
        let (event_id, _) = seed(&inventory).await;

        let view = resolver
            .list_available(event_id, &TicketFilter::default())
            .await
            .unwrap();

        let labels: Vec<_> = view
            .rows
            .iter()
            .map(|r| match r {
                AvailabilityRow::GeneralAdmission { .. } => "GA",
                AvailabilityRow::Seat { seat, .. } => seat.as_str(),
            })
            .collect();
        assert_eq!(labels, vec!["GA", "A1", "A2"]);
    }

    #[tokio::test]
    async fn order_claims_are_excluded() {
        let (resolver, inventory, orders, _) = resolver();
        let (event_id, units) = seed(&inventory).await;

        let seat = units.iter().find(|u| u.label() == "A1").unwrap();
        orders
            .insert(OrderRecord::pending(UserId::new(), vec![line(seat)], Utc::now()))
            .await
            .unwrap();

        let view = resolver
            .list_available(event_id, &TicketFilter::default())
            .await
            .unwrap();
        assert_eq!(view.len(), 2); // GA row + A2
        assert!(view.rows.iter().all(|r| match r {
            AvailabilityRow::Seat { seat, .. } => seat != "A1",
            _ => true,
        }));
    }

    #[tokio::test]
    async fn holds_are_excluded_for_every_user() {
        let (resolver, inventory, _, holds) = resolver();
        let (event_id, units) = seed(&inventory).await;

        let ga_unit = units.iter().find(|u| u.is_general_admission()).unwrap();
        holds.add(UserId::new(), &[ga_unit.id]).await.unwrap();

        let view = resolver
            .list_available(event_id, &TicketFilter::default())
            .await
            .unwrap();
        assert_eq!(view.ga_available(), 1);

        let exclusions = resolver.compute_exclusions().await.unwrap();
        assert!(exclusions.contains(&ga_unit.id));
    }

    #[tokio::test]
    async fn no_ga_row_when_all_ga_taken() {
        let (resolver, inventory, _, holds) = resolver();
        let (event_id, units) = seed(&inventory).await;

        let ga_ids: Vec<_> = units
            .iter()
            .filter(|u| u.is_general_admission())
            .map(|u| u.id)
            .collect();
        holds.add(UserId::new(), &ga_ids).await.unwrap();

        let view = resolver
            .list_available(event_id, &TicketFilter::default())
            .await
            .unwrap();
        assert_eq!(view.ga_available(), 0);
        assert!(view.rows.iter().all(|r| matches!(r, AvailabilityRow::Seat { .. })));
    }

    #[tokio::test]
    async fn filter_narrows_the_view() {
        let (resolver, inventory, _, _) = resolver();
        let (event_id, _) = seed(&inventory).await;

        let view = resolver
            .list_available(
                event_id,
                &TicketFilter {
                    seat_prefix: Some("A1".to_string()),
                    ..TicketFilter::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(view.len(), 1);
        assert!(matches!(&view.rows[0], AvailabilityRow::Seat { seat, .. } if seat == "A1"));
    }
}
