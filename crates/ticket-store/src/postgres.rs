//! PostgreSQL-backed store implementations.
//!
//! The `reservations` primary key and the `holds` primary key carry the
//! double-booking guarantee: every claim commit goes through a conditional
//! insert (`ON CONFLICT DO NOTHING` / conditional `DO UPDATE`), and the set
//! of rows actually written is compared against the set requested. Losing
//! writers roll back and report the contested ticket IDs.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use common::{EventId, Money, OrderId, TicketId, UserId};

use crate::{
    Result, StoreError,
    catalog::{EventDraft, EventRecord},
    order::{OrderLine, OrderRecord, OrderStatus},
    store::{HoldStore, InventoryStore, OrderStore},
    ticket::{InventorySpec, TicketFilter, TicketKind, TicketUnit},
};

fn decode_error(message: impl Into<String>) -> StoreError {
    StoreError::Serialization(serde_json::Error::io(std::io::Error::other(message.into())))
}

fn row_to_event(row: PgRow) -> Result<EventRecord> {
    Ok(EventRecord {
        id: EventId::from_uuid(row.try_get::<Uuid, _>("id")?),
        title: row.try_get("title")?,
        venue: row.try_get("venue")?,
        starts_at: row.try_get("starts_at")?,
        description: row.try_get("description")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_ticket(row: PgRow) -> Result<TicketUnit> {
    let kind_str: String = row.try_get("kind")?;
    let kind = TicketKind::parse(&kind_str)
        .ok_or_else(|| decode_error(format!("unknown ticket kind {kind_str:?}")))?;
    Ok(TicketUnit {
        id: TicketId::from_uuid(row.try_get::<Uuid, _>("id")?),
        event_id: EventId::from_uuid(row.try_get::<Uuid, _>("event_id")?),
        kind,
        seat: row.try_get("seat")?,
        price: Money::from_cents(row.try_get("price_cents")?),
    })
}

fn row_to_line(row: PgRow) -> Result<OrderLine> {
    let kind_str: String = row.try_get("kind")?;
    let kind = TicketKind::parse(&kind_str)
        .ok_or_else(|| decode_error(format!("unknown ticket kind {kind_str:?}")))?;
    Ok(OrderLine {
        ticket_id: TicketId::from_uuid(row.try_get::<Uuid, _>("ticket_id")?),
        price: Money::from_cents(row.try_get("price_cents")?),
        kind,
        seat: row.try_get("seat")?,
    })
}

fn row_to_order(row: PgRow, lines: Vec<OrderLine>) -> Result<OrderRecord> {
    let status_str: String = row.try_get("status")?;
    let status = OrderStatus::parse(&status_str)
        .ok_or_else(|| decode_error(format!("unknown order status {status_str:?}")))?;
    Ok(OrderRecord {
        id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
        user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
        created_at: row.try_get("created_at")?,
        status,
        lines,
        total: Money::from_cents(row.try_get("total_cents")?),
        paid_at: row.try_get("paid_at")?,
    })
}

/// PostgreSQL event catalog and ticket inventory.
#[derive(Clone)]
pub struct PostgresInventoryStore {
    pool: PgPool,
}

impl PostgresInventoryStore {
    /// Creates a new PostgreSQL inventory store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }
}

#[async_trait]
impl InventoryStore for PostgresInventoryStore {
    async fn create_event(
        &self,
        draft: EventDraft,
        spec: InventorySpec,
    ) -> Result<(EventRecord, Vec<TicketUnit>)> {
        let record = draft.into_record(Utc::now());
        spec.validate(record.id)?;
        let units = spec.generate(record.id);

        // One transaction: the event and its inventory commit together or
        // not at all.
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO events (id, title, venue, starts_at, description, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(&record.title)
        .bind(&record.venue)
        .bind(record.starts_at)
        .bind(&record.description)
        .bind(record.created_at)
        .execute(&mut *tx)
        .await?;

        for unit in &units {
            sqlx::query(
                r#"
                INSERT INTO tickets (id, event_id, kind, seat, price_cents)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(unit.id.as_uuid())
            .bind(unit.event_id.as_uuid())
            .bind(unit.kind.as_str())
            .bind(&unit.seat)
            .bind(unit.price.cents())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok((record, units))
    }

    async fn get_event(&self, id: EventId) -> Result<Option<EventRecord>> {
        let row = sqlx::query(
            "SELECT id, title, venue, starts_at, description, created_at FROM events WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(row_to_event).transpose()
    }

    async fn list_events(&self) -> Result<Vec<EventRecord>> {
        let rows = sqlx::query(
            "SELECT id, title, venue, starts_at, description, created_at FROM events ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_event).collect()
    }

    async fn find_by_ids(&self, ids: &[TicketId]) -> Result<Vec<TicketUnit>> {
        let uuids: Vec<Uuid> = ids.iter().map(|id| id.as_uuid()).collect();
        let rows = sqlx::query(
            "SELECT id, event_id, kind, seat, price_cents FROM tickets WHERE id = ANY($1)",
        )
        .bind(&uuids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_id = HashMap::with_capacity(rows.len());
        for row in rows {
            let unit = row_to_ticket(row)?;
            by_id.insert(unit.id, unit);
        }

        let missing: Vec<_> = ids.iter().filter(|id| !by_id.contains_key(*id)).copied().collect();
        if !missing.is_empty() {
            return Err(StoreError::TicketsNotFound { missing });
        }
        Ok(ids.iter().map(|id| by_id[id].clone()).collect())
    }

    async fn list_by_event(
        &self,
        event_id: EventId,
        filter: &TicketFilter,
    ) -> Result<Vec<TicketUnit>> {
        let rows = sqlx::query(
            "SELECT id, event_id, kind, seat, price_cents FROM tickets WHERE event_id = $1",
        )
        .bind(event_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        // Kind matching includes the legacy "GA" seat-label policy, so
        // filtering happens here rather than in SQL.
        let mut units = Vec::new();
        for row in rows {
            let unit = row_to_ticket(row)?;
            if filter.matches(&unit) {
                units.push(unit);
            }
        }
        Ok(units)
    }
}

/// PostgreSQL order collection with the active-reservation index.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_lines(&self, order_id: OrderId) -> Result<Vec<OrderLine>> {
        let rows = sqlx::query(
            r#"
            SELECT ticket_id, price_cents, kind, seat
            FROM order_lines
            WHERE order_id = $1
            ORDER BY position ASC
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_line).collect()
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    async fn insert(&self, order: OrderRecord) -> Result<OrderRecord> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, created_at, status, total_cents, paid_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.user_id.as_uuid())
        .bind(order.created_at)
        .bind(order.status.as_str())
        .bind(order.total.cents())
        .bind(order.paid_at)
        .execute(&mut *tx)
        .await?;

        for (position, line) in order.lines.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_lines (order_id, position, ticket_id, price_cents, kind, seat)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(order.id.as_uuid())
            .bind(position as i32)
            .bind(line.ticket_id.as_uuid())
            .bind(line.price.cents())
            .bind(line.kind.as_str())
            .bind(&line.seat)
            .execute(&mut *tx)
            .await?;
        }

        // The conditional insert is the commit point: rows that collide
        // with an existing claim are skipped, and the shortfall tells us
        // exactly which tickets were contested.
        let requested: Vec<Uuid> = order.ticket_ids().map(|id| id.as_uuid()).collect();
        let claimed_rows = sqlx::query(
            r#"
            INSERT INTO reservations (ticket_id, order_id)
            SELECT unnest($1::uuid[]), $2
            ON CONFLICT (ticket_id) DO NOTHING
            RETURNING ticket_id
            "#,
        )
        .bind(&requested)
        .bind(order.id.as_uuid())
        .fetch_all(&mut *tx)
        .await?;

        let claimed: HashSet<Uuid> = claimed_rows
            .into_iter()
            .map(|row| row.try_get::<Uuid, _>("ticket_id"))
            .collect::<std::result::Result<_, _>>()?;

        if claimed.len() != requested.len() {
            let conflicting: Vec<_> = order
                .ticket_ids()
                .filter(|id| !claimed.contains(&id.as_uuid()))
                .collect();
            tx.rollback().await?;
            return Err(StoreError::ReservationConflict { conflicting });
        }

        tx.commit().await?;
        Ok(order)
    }

    async fn get(&self, id: OrderId) -> Result<Option<OrderRecord>> {
        let row = sqlx::query(
            "SELECT id, user_id, created_at, status, total_cents, paid_at FROM orders WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let lines = self.load_lines(id).await?;
                Ok(Some(row_to_order(row, lines)?))
            }
            None => Ok(None),
        }
    }

    async fn list(&self) -> Result<Vec<OrderRecord>> {
        let rows = sqlx::query(
            "SELECT id, user_id, created_at, status, total_cents, paid_at FROM orders ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            let id = OrderId::from_uuid(row.try_get::<Uuid, _>("id")?);
            let lines = self.load_lines(id).await?;
            orders.push(row_to_order(row, lines)?);
        }
        Ok(orders)
    }

    async fn mark_paid(&self, id: OrderId, paid_at: DateTime<Utc>) -> Result<OrderRecord> {
        let updated = sqlx::query(
            r#"
            UPDATE orders
            SET status = 'paid', paid_at = $2
            WHERE id = $1 AND status = 'pending'
            RETURNING id
            "#,
        )
        .bind(id.as_uuid())
        .bind(paid_at)
        .fetch_optional(&self.pool)
        .await?;

        if updated.is_none() {
            let status: Option<String> =
                sqlx::query_scalar("SELECT status FROM orders WHERE id = $1")
                    .bind(id.as_uuid())
                    .fetch_optional(&self.pool)
                    .await?;
            return match status {
                Some(s) => Err(StoreError::TransitionRefused {
                    order_id: id,
                    status: OrderStatus::parse(&s)
                        .ok_or_else(|| decode_error(format!("unknown order status {s:?}")))?,
                }),
                None => Err(StoreError::OrderNotFound(id)),
            };
        }

        self.get(id).await?.ok_or(StoreError::OrderNotFound(id))
    }

    async fn mark_canceled(&self, id: OrderId) -> Result<OrderRecord> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE orders
            SET status = 'canceled', paid_at = NULL
            WHERE id = $1 AND status = 'pending'
            RETURNING id
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?;

        if updated.is_none() {
            tx.rollback().await?;
            let status: Option<String> =
                sqlx::query_scalar("SELECT status FROM orders WHERE id = $1")
                    .bind(id.as_uuid())
                    .fetch_optional(&self.pool)
                    .await?;
            return match status {
                Some(s) => Err(StoreError::TransitionRefused {
                    order_id: id,
                    status: OrderStatus::parse(&s)
                        .ok_or_else(|| decode_error(format!("unknown order status {s:?}")))?,
                }),
                None => Err(StoreError::OrderNotFound(id)),
            };
        }

        // Release the ticket claims together with the status change.
        sqlx::query("DELETE FROM reservations WHERE order_id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        self.get(id).await?.ok_or(StoreError::OrderNotFound(id))
    }

    async fn reserved_tickets(&self) -> Result<HashSet<TicketId>> {
        let rows = sqlx::query("SELECT ticket_id FROM reservations")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|row| {
                Ok(TicketId::from_uuid(row.try_get::<Uuid, _>("ticket_id")?))
            })
            .collect()
    }
}

/// PostgreSQL hold store.
///
/// The primary key on `holds.ticket_id` makes one live holder per unit a
/// database invariant; expired rows are purged lazily on write and ignored
/// by every read.
#[derive(Clone)]
pub struct PostgresHoldStore {
    pool: PgPool,
    ttl: chrono::Duration,
}

impl PostgresHoldStore {
    /// Creates a hold store with the given sliding TTL.
    pub fn new(pool: PgPool, ttl: std::time::Duration) -> Self {
        Self {
            pool,
            ttl: chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::seconds(900)),
        }
    }
}

#[async_trait]
impl HoldStore for PostgresHoldStore {
    async fn add(&self, user_id: UserId, ticket_ids: &[TicketId]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM holds WHERE expires_at <= now()")
            .execute(&mut *tx)
            .await?;

        let expires_at = Utc::now() + self.ttl;
        let requested: Vec<Uuid> = ticket_ids.iter().map(|id| id.as_uuid()).collect();

        // A colliding row is only overwritten when it already belongs to
        // the same user (re-add refreshes in place); rows held by someone
        // else are skipped and show up as a shortfall.
        let claimed_rows = sqlx::query(
            r#"
            INSERT INTO holds (ticket_id, user_id, expires_at)
            SELECT unnest($1::uuid[]), $2, $3
            ON CONFLICT (ticket_id) DO UPDATE SET expires_at = EXCLUDED.expires_at
            WHERE holds.user_id = EXCLUDED.user_id
            RETURNING ticket_id
            "#,
        )
        .bind(&requested)
        .bind(user_id.as_uuid())
        .bind(expires_at)
        .fetch_all(&mut *tx)
        .await?;

        let claimed: HashSet<Uuid> = claimed_rows
            .into_iter()
            .map(|row| row.try_get::<Uuid, _>("ticket_id"))
            .collect::<std::result::Result<_, _>>()?;

        if claimed.len() != requested.len() {
            let conflicting: Vec<_> = ticket_ids
                .iter()
                .filter(|id| !claimed.contains(&id.as_uuid()))
                .copied()
                .collect();
            tx.rollback().await?;
            return Err(StoreError::ReservationConflict { conflicting });
        }

        // Sliding TTL: refresh the rest of the user's cart too.
        sqlx::query("UPDATE holds SET expires_at = $2 WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .bind(expires_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn members(&self, user_id: UserId) -> Result<Vec<TicketId>> {
        let rows = sqlx::query(
            "SELECT ticket_id FROM holds WHERE user_id = $1 AND expires_at > now() ORDER BY ticket_id",
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|row| {
                Ok(TicketId::from_uuid(row.try_get::<Uuid, _>("ticket_id")?))
            })
            .collect()
    }

    async fn remove(&self, user_id: UserId, ticket_id: TicketId) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM holds WHERE ticket_id = $1 AND user_id = $2 AND expires_at > now()",
        )
        .bind(ticket_id.as_uuid())
        .bind(user_id.as_uuid())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear(&self, user_id: UserId) -> Result<()> {
        sqlx::query("DELETE FROM holds WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn held_tickets(&self) -> Result<HashSet<TicketId>> {
        let rows = sqlx::query("SELECT ticket_id FROM holds WHERE expires_at > now()")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|row| {
                Ok(TicketId::from_uuid(row.try_get::<Uuid, _>("ticket_id")?))
            })
            .collect()
    }
}
