//! PostgreSQL-backed implementations of the storage ports
//!
//! The per-day counter lives in `order_sequence_counters`. Every allocation is
//! a single `INSERT ... ON CONFLICT DO UPDATE ... RETURNING` statement, which
//! PostgreSQL executes atomically: the first order of a day inserts the row at
//! 1, concurrent first orders fall through to the update branch, and the row
//! lock taken by the update is held until the surrounding transaction ends.

use crate::domain::config_types::LockTimeoutMs;
use crate::domain::identifiers::{OrderId, ProductId, UserId};
use crate::domain::order::{Order, OrderDraft, OrderItem, OrderStatus};
use crate::domain::order_number::{DateKey, PublicOrderId, SequenceNumber};
use crate::domain::repository::{OrderStore, StoreError};
use crate::domain::sequence::{AllocationError, SequenceCounter, SequenceStore};
use crate::domain::types::{Price, ProductName, Quantity};
use crate::domain::validation_constants::order_number::MAX_SEQUENCE;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgExecutor, PgPool, Postgres, Row, Transaction};
use std::collections::HashMap;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// SQLSTATE codes that mean "another transaction holds what we need"
mod sqlstate {
    pub const LOCK_NOT_AVAILABLE: &str = "55P03";
    pub const DEADLOCK_DETECTED: &str = "40P01";
    pub const SERIALIZATION_FAILURE: &str = "40001";
}

const NEXT_SEQUENCE_SQL: &str = r#"
    INSERT INTO order_sequence_counters (date_key, last_sequence)
    VALUES ($1, 1)
    ON CONFLICT (date_key) DO UPDATE
        SET last_sequence = order_sequence_counters.last_sequence + 1,
            updated_at = NOW()
        WHERE order_sequence_counters.last_sequence < $2
    RETURNING last_sequence
"#;

const ORDER_COLUMNS: &str =
    "id, public_id, user_id, status, order_price, created_at, updated_at";

/// Map a database failure during allocation onto the allocation error model
fn classify(err: sqlx::Error, partition: DateKey) -> AllocationError {
    if let sqlx::Error::Database(db_err) = &err {
        if matches!(
            db_err.code().as_deref(),
            Some(
                sqlstate::LOCK_NOT_AVAILABLE
                    | sqlstate::DEADLOCK_DETECTED
                    | sqlstate::SERIALIZATION_FAILURE
            )
        ) {
            warn!(%partition, code = ?db_err.code(), "order sequence counter contended");
            return AllocationError::ContentionTimeout { partition };
        }
    }
    AllocationError::StorageUnavailable(err.to_string())
}

fn storage(err: sqlx::Error) -> StoreError {
    StoreError::Storage(err.to_string())
}

fn corrupt(what: &str, detail: impl std::fmt::Display) -> StoreError {
    StoreError::Storage(format!("invalid {what} in database: {detail}"))
}

/// Atomically issue the next sequence number of `partition`
async fn increment_counter<'e, E>(
    executor: E,
    partition: DateKey,
) -> Result<SequenceNumber, AllocationError>
where
    E: PgExecutor<'e>,
{
    let max = i32::try_from(MAX_SEQUENCE).unwrap_or(i32::MAX);
    let issued: Option<i32> = sqlx::query_scalar(NEXT_SEQUENCE_SQL)
        .bind(partition.date())
        .bind(max)
        .fetch_optional(executor)
        .await
        .map_err(|err| classify(err, partition))?;

    // No row back means the update's WHERE clause refused to go past the maximum
    let issued = issued.ok_or(AllocationError::SequenceExhausted { partition })?;
    u32::try_from(issued)
        .ok()
        .and_then(|value| SequenceNumber::try_new(value).ok())
        .ok_or(AllocationError::SequenceExhausted { partition })
}

/// Bound how long this transaction waits for row locks
async fn set_lock_timeout(
    tx: &mut Transaction<'static, Postgres>,
    lock_timeout: LockTimeoutMs,
    partition: DateKey,
) -> Result<(), AllocationError> {
    sqlx::query("SELECT set_config('lock_timeout', $1, true)")
        .bind(format!("{}ms", lock_timeout.into_inner()))
        .execute(&mut **tx)
        .await
        .map_err(|err| classify(err, partition))?;
    Ok(())
}

/// Counter store that commits each allocation on its own
///
/// A number issued here is consumed even if the caller never uses it.
#[derive(Debug, Clone)]
pub struct PostgresSequenceStore {
    pool: PgPool,
    lock_timeout: LockTimeoutMs,
}

impl PostgresSequenceStore {
    pub fn new(pool: PgPool, lock_timeout: LockTimeoutMs) -> Self {
        Self { pool, lock_timeout }
    }
}

#[async_trait]
impl SequenceStore for PostgresSequenceStore {
    #[instrument(skip(self))]
    async fn next_sequence(&self, partition: DateKey) -> Result<SequenceNumber, AllocationError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|err| classify(err, partition))?;
        set_lock_timeout(&mut tx, self.lock_timeout, partition).await?;
        let sequence = increment_counter(&mut *tx, partition).await?;
        tx.commit().await.map_err(|err| classify(err, partition))?;
        Ok(sequence)
    }

    async fn last_sequence(
        &self,
        partition: DateKey,
    ) -> Result<Option<SequenceNumber>, AllocationError> {
        let last: Option<i32> = sqlx::query_scalar(
            "SELECT last_sequence FROM order_sequence_counters WHERE date_key = $1",
        )
        .bind(partition.date())
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| classify(err, partition))?;

        Ok(last
            .and_then(|value| u32::try_from(value).ok())
            .and_then(|value| SequenceNumber::try_new(value).ok()))
    }

    async fn counters(&self) -> Result<Vec<SequenceCounter>, AllocationError> {
        let unavailable = |err: sqlx::Error| AllocationError::StorageUnavailable(err.to_string());
        let rows = sqlx::query(
            "SELECT date_key, last_sequence FROM order_sequence_counters ORDER BY date_key",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable)?;

        let mut counters = Vec::with_capacity(rows.len());
        for row in &rows {
            let date: NaiveDate = row.try_get("date_key").map_err(unavailable)?;
            let last: i32 = row.try_get("last_sequence").map_err(unavailable)?;

            let partition = DateKey::try_new(date).map_err(|err| {
                AllocationError::StorageUnavailable(format!("invalid date_key {date}: {err}"))
            })?;
            let last_sequence = u32::try_from(last)
                .ok()
                .and_then(|value| SequenceNumber::try_new(value).ok())
                .ok_or_else(|| {
                    AllocationError::StorageUnavailable(format!(
                        "invalid last_sequence {last} for {partition}"
                    ))
                })?;

            counters.push(SequenceCounter {
                partition,
                last_sequence,
            });
        }
        Ok(counters)
    }
}

/// Order store where counter increment, order row and item rows share one
/// transaction
///
/// If anything after the increment fails the transaction rolls back, counter
/// included. The counter row stays locked until then, so no other
/// transaction can have observed the rolled-back value.
#[derive(Debug, Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
    lock_timeout: LockTimeoutMs,
}

impl PostgresOrderStore {
    pub fn new(pool: PgPool, lock_timeout: LockTimeoutMs) -> Self {
        Self { pool, lock_timeout }
    }

    pub fn sequences(&self) -> PostgresSequenceStore {
        PostgresSequenceStore::new(self.pool.clone(), self.lock_timeout)
    }

    async fn load_items(
        &self,
        order_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<OrderItem>>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT order_id, product_id, product_name, quantity, item_price
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY order_id, position
            "#,
        )
        .bind(order_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        let mut items: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
        for row in &rows {
            let order_id: Uuid = row.try_get("order_id").map_err(storage)?;
            items.entry(order_id).or_default().push(item_from_row(row)?);
        }
        Ok(items)
    }

    async fn load_orders(&self, rows: Vec<PgRow>) -> Result<Vec<Order>, StoreError> {
        let ids = rows
            .iter()
            .map(|row| row.try_get::<Uuid, _>("id"))
            .collect::<Result<Vec<_>, _>>()
            .map_err(storage)?;
        let mut items = self.load_items(&ids).await?;

        rows.iter()
            .map(|row| {
                let id: Uuid = row.try_get("id").map_err(storage)?;
                order_from_row(row, items.remove(&id).unwrap_or_default())
            })
            .collect()
    }
}

fn item_from_row(row: &PgRow) -> Result<OrderItem, StoreError> {
    let product_id: Uuid = row.try_get("product_id").map_err(storage)?;
    let name: String = row.try_get("product_name").map_err(storage)?;
    let quantity: i32 = row.try_get("quantity").map_err(storage)?;
    let price: Decimal = row.try_get("item_price").map_err(storage)?;

    Ok(OrderItem {
        product_id: ProductId::new(product_id),
        product_name: ProductName::try_new(name).map_err(|err| corrupt("product_name", err))?,
        quantity: u32::try_from(quantity)
            .ok()
            .and_then(|value| Quantity::try_new(value).ok())
            .ok_or_else(|| corrupt("quantity", quantity))?,
        item_price: Price::try_new(price).map_err(|err| corrupt("item_price", err))?,
    })
}

fn order_from_row(row: &PgRow, items: Vec<OrderItem>) -> Result<Order, StoreError> {
    let id: Uuid = row.try_get("id").map_err(storage)?;
    let public_id: String = row.try_get("public_id").map_err(storage)?;
    let user_id: Uuid = row.try_get("user_id").map_err(storage)?;
    let status: String = row.try_get("status").map_err(storage)?;

    Ok(Order {
        id: OrderId::new(id),
        public_id: public_id
            .parse()
            .map_err(|err| corrupt("public_id", err))?,
        user_id: UserId::new(user_id),
        status: status.parse().map_err(|err| corrupt("status", err))?,
        items,
        order_price: row.try_get("order_price").map_err(storage)?,
        created_at: row.try_get("created_at").map_err(storage)?,
        updated_at: row.try_get("updated_at").map_err(storage)?,
    })
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    #[instrument(skip(self, draft), fields(user_id = %draft.user_id))]
    async fn insert_order(
        &self,
        partition: DateKey,
        draft: OrderDraft,
    ) -> Result<Order, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|err| classify(err, partition))?;
        set_lock_timeout(&mut tx, self.lock_timeout, partition).await?;

        let sequence = increment_counter(&mut *tx, partition).await?;
        let public_id = PublicOrderId::new(partition, sequence);
        let order = draft.into_order(OrderId::generate(), public_id);

        sqlx::query(
            r#"
            INSERT INTO orders (id, public_id, user_id, status, order_price, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(order.id.into_inner())
        .bind(public_id.to_string())
        .bind(order.user_id.into_inner())
        .bind(order.status.as_str())
        .bind(order.order_price)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(storage)?;

        for (position, item) in order.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, position, product_id, product_name, quantity, item_price)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(order.id.into_inner())
            .bind(i32::try_from(position).unwrap_or(i32::MAX))
            .bind(item.product_id.into_inner())
            .bind(item.product_name.as_ref())
            .bind(i32::try_from(item.quantity.value()).unwrap_or(i32::MAX))
            .bind(item.item_price.amount())
            .execute(&mut *tx)
            .await
            .map_err(storage)?;
        }

        tx.commit().await.map_err(|err| classify(err, partition))?;
        debug!(%public_id, "order stored");

        Ok(order)
    }

    async fn find_order(&self, public_id: PublicOrderId) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE public_id = $1"
        ))
        .bind(public_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;

        match row {
            Some(row) => Ok(self.load_orders(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 \
             ORDER BY created_at DESC, public_id DESC"
        ))
        .bind(user_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        self.load_orders(rows).await
    }

    async fn all_orders(&self) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC, public_id DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        self.load_orders(rows).await
    }

    #[instrument(skip(self))]
    async fn transition_status(
        &self,
        public_id: PublicOrderId,
        expected: OrderStatus,
        next: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<Order, StoreError> {
        let updated = sqlx::query(
            r#"
            UPDATE orders SET status = $1, updated_at = $2
            WHERE public_id = $3 AND status = $4
            "#,
        )
        .bind(next.as_str())
        .bind(at)
        .bind(public_id.to_string())
        .bind(expected.as_str())
        .execute(&self.pool)
        .await
        .map_err(storage)?
        .rows_affected();

        let order = self
            .find_order(public_id)
            .await?
            .ok_or(StoreError::NotFound(public_id))?;

        if updated == 0 {
            return Err(StoreError::StaleStatus {
                public_id,
                expected,
            });
        }
        Ok(order)
    }
}
