//! Postgres-backed part store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (unique violation) | `23505` | `DuplicateId` | Part id already present |
//! | Database (check constraint violation) | `23514` | `NegativeStock` | `stock >= 0` would be violated |
//! | Database (other) | Any other | `Backend` | Serialization failures, deadlocks, ... |
//! | PoolClosed / Io / other | N/A | `Backend` | Connection failures |
//!
//! ## Locking
//!
//! Build transactions lock every touched row with `SELECT ... FOR UPDATE`, in
//! ascending id order so two builds sharing constituents never wait on each
//! other in opposite orders.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{instrument, Span};

use partstock_core::PartId;
use partstock_parts::{Constituent, Part, PartKind};

use super::r#trait::{PartStore, PartTransaction, StoreError};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS parts (
        id          TEXT PRIMARY KEY,
        name        TEXT NOT NULL,
        kind        TEXT NOT NULL CHECK (kind IN ('RAW', 'ASSEMBLED')),
        stock       BIGINT NOT NULL DEFAULT 0 CHECK (stock >= 0),
        created_at  TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS part_constituents (
        part_id         TEXT NOT NULL REFERENCES parts (id),
        position        INTEGER NOT NULL,
        constituent_id  TEXT NOT NULL REFERENCES parts (id),
        quantity        INTEGER NOT NULL CHECK (quantity >= 1),
        PRIMARY KEY (part_id, position)
    )
    "#,
];

/// Postgres-backed part store.
///
/// `PostgresPartStore` is `Send + Sync`; the SQLx pool handles connection
/// sharing.
#[derive(Debug, Clone)]
pub struct PostgresPartStore {
    pool: Arc<PgPool>,
}

impl PostgresPartStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create tables if they do not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        }
        Ok(())
    }
}

#[async_trait]
impl PartStore for PostgresPartStore {
    #[instrument(skip(self), fields(part_id = %id), err)]
    async fn find_by_id(&self, id: &PartId) -> Result<Option<Part>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, kind, stock, created_at
            FROM parts
            WHERE id = $1
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_part", e))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let constituent_rows = sqlx::query(
            r#"
            SELECT constituent_id, quantity
            FROM part_constituents
            WHERE part_id = $1
            ORDER BY position ASC
            "#,
        )
        .bind(id.as_str())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_constituents", e))?;

        let constituents = constituent_rows
            .iter()
            .map(constituent_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        part_from_row(&row, constituents).map(Some)
    }

    #[instrument(skip(self, part), fields(part_id = %part.id_typed(), kind = %part.kind()), err)]
    async fn insert(&self, part: Part) -> Result<Part, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        sqlx::query(
            r#"
            INSERT INTO parts (id, name, kind, stock, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(part.id_typed().as_str())
        .bind(part.name())
        .bind(part.kind().as_str())
        .bind(to_db_stock(part.id_typed(), part.stock())?)
        .bind(part.created_at())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::DuplicateId(part.id_typed().clone())
            } else {
                map_sqlx_error("insert_part", e)
            }
        })?;

        for (position, c) in part.constituents().iter().enumerate() {
            let quantity = i32::try_from(c.quantity).map_err(|_| {
                StoreError::Backend(format!("constituent quantity {} out of range", c.quantity))
            })?;
            sqlx::query(
                r#"
                INSERT INTO part_constituents (part_id, position, constituent_id, quantity)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(part.id_typed().as_str())
            .bind(position as i32)
            .bind(c.part_id.as_str())
            .bind(quantity)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_constituent", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(part)
    }

    #[instrument(skip(self), fields(part_id = %id), err)]
    async fn increment_stock(&self, id: &PartId, delta: i64) -> Result<(), StoreError> {
        add_stock(&*self.pool, id, delta).await
    }

    async fn begin(&self) -> Result<Box<dyn PartTransaction>, StoreError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        Ok(Box::new(PostgresPartTransaction { tx }))
    }
}

/// Transaction over a [`PostgresPartStore`].
///
/// SQLx rolls the underlying transaction back when it is dropped uncommitted.
struct PostgresPartTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl PartTransaction for PostgresPartTransaction {
    #[instrument(skip(self, ids), fields(requested = ids.len(), locked = tracing::field::Empty), err)]
    async fn lock_stock(&mut self, ids: &[PartId]) -> Result<HashMap<PartId, u64>, StoreError> {
        let mut sorted: Vec<String> = ids.iter().map(|id| id.as_str().to_string()).collect();
        sorted.sort();
        sorted.dedup();

        let rows = sqlx::query(
            r#"
            SELECT id, stock
            FROM parts
            WHERE id = ANY($1)
            ORDER BY id ASC
            FOR UPDATE
            "#,
        )
        .bind(sorted.as_slice())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("lock_stock", e))?;

        let mut out = HashMap::with_capacity(rows.len());
        for row in rows {
            let id: String = row
                .try_get("id")
                .map_err(|e| StoreError::Corrupt(e.to_string()))?;
            let id = PartId::from(id);
            let stock = from_db_stock(&id, get(&row, "stock")?)?;
            out.insert(id, stock);
        }

        Span::current().record("locked", out.len());
        Ok(out)
    }

    async fn increment_stock(&mut self, id: &PartId, delta: i64) -> Result<(), StoreError> {
        add_stock(&mut *self.tx, id, delta).await
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx
            .rollback()
            .await
            .map_err(|e| map_sqlx_error("rollback", e))
    }
}

async fn add_stock<'e, E>(executor: E, id: &PartId, delta: i64) -> Result<(), StoreError>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        r#"
        UPDATE parts
        SET stock = stock + $2
        WHERE id = $1
        "#,
    )
    .bind(id.as_str())
    .bind(delta)
    .execute(executor)
    .await
    .map_err(|e| {
        if is_check_violation(&e) {
            StoreError::NegativeStock(id.clone())
        } else {
            map_sqlx_error("increment_stock", e)
        }
    })?;

    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound(id.clone()));
    }
    Ok(())
}

fn get<'r, T>(row: &'r PgRow, column: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(column)
        .map_err(|e| StoreError::Corrupt(format!("column {column}: {e}")))
}

fn part_from_row(row: &PgRow, constituents: Vec<Constituent>) -> Result<Part, StoreError> {
    let id = PartId::from(get::<String>(row, "id")?);
    let name: String = get(row, "name")?;
    let kind: String = get(row, "kind")?;
    let kind: PartKind = kind
        .parse()
        .map_err(|e| StoreError::Corrupt(format!("part {id}: {e}")))?;
    let stock = from_db_stock(&id, get(row, "stock")?)?;
    let created_at: DateTime<Utc> = get(row, "created_at")?;

    Part::restore(id.clone(), name, kind, stock, constituents, created_at)
        .map_err(|e| StoreError::Corrupt(format!("part {id}: {e}")))
}

fn constituent_from_row(row: &PgRow) -> Result<Constituent, StoreError> {
    let part_id: String = get(row, "constituent_id")?;
    let quantity: i32 = get(row, "quantity")?;
    let quantity = u32::try_from(quantity)
        .map_err(|_| StoreError::Corrupt(format!("constituent {part_id} has quantity {quantity}")))?;
    Ok(Constituent::new(part_id, quantity))
}

fn to_db_stock(id: &PartId, stock: u64) -> Result<i64, StoreError> {
    i64::try_from(stock).map_err(|_| StoreError::Backend(format!("stock of part {id} out of range")))
}

fn from_db_stock(id: &PartId, stock: i64) -> Result<u64, StoreError> {
    u64::try_from(stock).map_err(|_| StoreError::Corrupt(format!("part {id} has stock {stock}")))
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            StoreError::Backend(format!("database error in {}: {}", operation, db_err.message()))
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}

fn db_code(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().map(|c| c.into_owned()),
        _ => None,
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    db_code(err).as_deref() == Some("23505")
}

fn is_check_violation(err: &sqlx::Error) -> bool {
    db_code(err).as_deref() == Some("23514")
}
