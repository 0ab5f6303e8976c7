//! Postgres event store.
//!
//! Schema: four append-only event tables plus one singleton checkpoint
//! row, all created idempotently at startup. Upserts are
//! `ON CONFLICT (id) DO NOTHING`, and the checkpoint update carries a
//! `last_processed_block < $1` guard so it can never move backwards.

use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, QueryBuilder, Row};

use super::{EventFilter, EventPage, EventStore};
use crate::error::IndexerError;
use crate::events::types::{EventKind, EventPayload, EventRecord};

/// Default connection pool size.
const DEFAULT_MAX_CONNECTIONS: u32 = 8;

const CREATE_TABLES: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS entropy_requested (
        id TEXT PRIMARY KEY,
        block_number BIGINT NOT NULL,
        transaction_hash TEXT NOT NULL,
        request_id TEXT NOT NULL,
        hashed_consumer TEXT NOT NULL,
        hashed_tag TEXT NOT NULL,
        fee_paid TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    "CREATE TABLE IF NOT EXISTS entropy_fulfilled (
        id TEXT PRIMARY KEY,
        block_number BIGINT NOT NULL,
        transaction_hash TEXT NOT NULL,
        request_id TEXT NOT NULL,
        hashed_consumer TEXT NOT NULL,
        hashed_tag TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    "CREATE TABLE IF NOT EXISTS fee_recipient_updated (
        id TEXT PRIMARY KEY,
        block_number BIGINT NOT NULL,
        transaction_hash TEXT NOT NULL,
        old_recipient TEXT NOT NULL,
        new_recipient TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    "CREATE TABLE IF NOT EXISTS chaos_engine_updated (
        id TEXT PRIMARY KEY,
        block_number BIGINT NOT NULL,
        transaction_hash TEXT NOT NULL,
        old_engine TEXT NOT NULL,
        new_engine TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    "CREATE TABLE IF NOT EXISTS indexer_checkpoint (
        id BOOLEAN PRIMARY KEY DEFAULT TRUE CHECK (id),
        last_processed_block BIGINT NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    "CREATE INDEX IF NOT EXISTS idx_entropy_requested_block
        ON entropy_requested (block_number DESC)",
    "CREATE INDEX IF NOT EXISTS idx_entropy_requested_request
        ON entropy_requested (request_id)",
    "CREATE INDEX IF NOT EXISTS idx_entropy_fulfilled_block
        ON entropy_fulfilled (block_number DESC)",
    "CREATE INDEX IF NOT EXISTS idx_entropy_fulfilled_request
        ON entropy_fulfilled (request_id)",
    "CREATE INDEX IF NOT EXISTS idx_fee_recipient_updated_block
        ON fee_recipient_updated (block_number DESC)",
    "CREATE INDEX IF NOT EXISTS idx_chaos_engine_updated_block
        ON chaos_engine_updated (block_number DESC)",
];

/// Postgres-backed event store.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connects with the default pool size.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub async fn connect(database_url: &str) -> Result<Self, IndexerError> {
        Self::connect_with(database_url, DEFAULT_MAX_CONNECTIONS).await
    }

    /// Connects with a bounded pool; the read API uses a pool of its own.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub async fn connect_with(
        database_url: &str,
        max_connections: u32,
    ) -> Result<Self, IndexerError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Wraps an existing pool.
    #[must_use]
    pub const fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Appends the filter predicate to a query. Must agree with
/// [`EventFilter::matches`].
fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &EventFilter) {
    if let Some(request_id) = &filter.request_id {
        builder.push(" AND request_id = ");
        builder.push_bind(request_id.clone());
    }
    if let Some(tx_hash) = &filter.transaction_hash {
        builder.push(" AND transaction_hash = ");
        builder.push_bind(tx_hash.to_ascii_lowercase());
    }
    if let Some(from_block) = filter.from_block {
        builder.push(" AND block_number >= ");
        builder.push_bind(to_signed(from_block));
    }
    if let Some(to_block) = filter.to_block {
        builder.push(" AND block_number <= ");
        builder.push_bind(to_signed(to_block));
    }
}

/// Clamps a u64 into the signed range the BIGINT columns hold. Values past
/// `i64::MAX` cannot exist in the store, so clamping preserves semantics.
const fn to_signed(value: u64) -> i64 {
    if value > i64::MAX as u64 {
        i64::MAX
    } else {
        value as i64
    }
}

fn row_to_record(kind: EventKind, row: &PgRow) -> Result<EventRecord, sqlx::Error> {
    let payload = match kind {
        EventKind::EntropyRequested => EventPayload::EntropyRequested {
            request_id: row.try_get("request_id")?,
            hashed_consumer: row.try_get("hashed_consumer")?,
            hashed_tag: row.try_get("hashed_tag")?,
            fee_paid: row.try_get("fee_paid")?,
        },
        EventKind::EntropyFulfilled => EventPayload::EntropyFulfilled {
            request_id: row.try_get("request_id")?,
            hashed_consumer: row.try_get("hashed_consumer")?,
            hashed_tag: row.try_get("hashed_tag")?,
        },
        EventKind::FeeRecipientUpdated => EventPayload::FeeRecipientUpdated {
            old_recipient: row.try_get("old_recipient")?,
            new_recipient: row.try_get("new_recipient")?,
        },
        EventKind::ChaosEngineUpdated => EventPayload::ChaosEngineUpdated {
            old_engine: row.try_get("old_engine")?,
            new_engine: row.try_get("new_engine")?,
        },
    };

    Ok(EventRecord {
        id: row.try_get("id")?,
        kind,
        block_number: row.try_get::<i64, _>("block_number")? as u64,
        transaction_hash: row.try_get("transaction_hash")?,
        created_at: row.try_get("created_at")?,
        payload,
    })
}

#[async_trait]
impl EventStore for PgStore {
    async fn initialize(&self, start_block: u64) -> Result<(), IndexerError> {
        for statement in CREATE_TABLES {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        // Two racing process starts both pass harmlessly; the first insert
        // wins and the second is ignored.
        sqlx::query(
            "INSERT INTO indexer_checkpoint (id, last_processed_block)
             VALUES (TRUE, $1)
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(start_block as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn upsert_event(&self, record: &EventRecord) -> Result<(), IndexerError> {
        let block_number = record.block_number as i64;
        match &record.payload {
            EventPayload::EntropyRequested {
                request_id,
                hashed_consumer,
                hashed_tag,
                fee_paid,
            } => {
                sqlx::query(
                    "INSERT INTO entropy_requested
                        (id, block_number, transaction_hash, request_id,
                         hashed_consumer, hashed_tag, fee_paid, created_at)
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                     ON CONFLICT (id) DO NOTHING",
                )
                .bind(&record.id)
                .bind(block_number)
                .bind(&record.transaction_hash)
                .bind(request_id)
                .bind(hashed_consumer)
                .bind(hashed_tag)
                .bind(fee_paid)
                .bind(record.created_at)
                .execute(&self.pool)
                .await?;
            }
            EventPayload::EntropyFulfilled {
                request_id,
                hashed_consumer,
                hashed_tag,
            } => {
                sqlx::query(
                    "INSERT INTO entropy_fulfilled
                        (id, block_number, transaction_hash, request_id,
                         hashed_consumer, hashed_tag, created_at)
                     VALUES ($1, $2, $3, $4, $5, $6, $7)
                     ON CONFLICT (id) DO NOTHING",
                )
                .bind(&record.id)
                .bind(block_number)
                .bind(&record.transaction_hash)
                .bind(request_id)
                .bind(hashed_consumer)
                .bind(hashed_tag)
                .bind(record.created_at)
                .execute(&self.pool)
                .await?;
            }
            EventPayload::FeeRecipientUpdated {
                old_recipient,
                new_recipient,
            } => {
                sqlx::query(
                    "INSERT INTO fee_recipient_updated
                        (id, block_number, transaction_hash,
                         old_recipient, new_recipient, created_at)
                     VALUES ($1, $2, $3, $4, $5, $6)
                     ON CONFLICT (id) DO NOTHING",
                )
                .bind(&record.id)
                .bind(block_number)
                .bind(&record.transaction_hash)
                .bind(old_recipient)
                .bind(new_recipient)
                .bind(record.created_at)
                .execute(&self.pool)
                .await?;
            }
            EventPayload::ChaosEngineUpdated {
                old_engine,
                new_engine,
            } => {
                sqlx::query(
                    "INSERT INTO chaos_engine_updated
                        (id, block_number, transaction_hash,
                         old_engine, new_engine, created_at)
                     VALUES ($1, $2, $3, $4, $5, $6)
                     ON CONFLICT (id) DO NOTHING",
                )
                .bind(&record.id)
                .bind(block_number)
                .bind(&record.transaction_hash)
                .bind(old_engine)
                .bind(new_engine)
                .bind(record.created_at)
                .execute(&self.pool)
                .await?;
            }
        }
        Ok(())
    }

    async fn read_checkpoint(&self) -> Result<u64, IndexerError> {
        let row = sqlx::query("SELECT last_processed_block FROM indexer_checkpoint WHERE id")
            .fetch_optional(&self.pool)
            .await?;
        let row = row.ok_or_else(|| {
            IndexerError::Store("checkpoint row missing; store not initialized".into())
        })?;
        Ok(row.try_get::<i64, _>("last_processed_block")? as u64)
    }

    async fn advance_checkpoint(&self, new_value: u64) -> Result<(), IndexerError> {
        sqlx::query(
            "UPDATE indexer_checkpoint
             SET last_processed_block = $1, updated_at = now()
             WHERE id AND last_processed_block < $1",
        )
        .bind(new_value as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn query_events(&self, filter: &EventFilter) -> Result<EventPage, IndexerError> {
        // A request id filter on a kind that has no request id column can
        // never match; answer without touching the database.
        if filter.request_id.is_some() && !filter.kind.has_request_id() {
            return Ok(EventPage {
                events: Vec::new(),
                total: 0,
            });
        }

        let mut query = QueryBuilder::new(format!(
            "SELECT * FROM {} WHERE 1=1",
            filter.kind.table()
        ));
        push_filters(&mut query, filter);
        query.push(" ORDER BY block_number DESC, id ASC LIMIT ");
        query.push_bind(to_signed(filter.limit));
        query.push(" OFFSET ");
        query.push_bind(to_signed(filter.offset));

        let rows = query.build().fetch_all(&self.pool).await?;
        let events = rows
            .iter()
            .map(|row| row_to_record(filter.kind, row))
            .collect::<Result<Vec<_>, _>>()?;

        let mut count_query = QueryBuilder::new(format!(
            "SELECT COUNT(*) AS total FROM {} WHERE 1=1",
            filter.kind.table()
        ));
        push_filters(&mut count_query, filter);
        let total_row = count_query.build().fetch_one(&self.pool).await?;
        let total = total_row.try_get::<i64, _>("total")? as u64;

        Ok(EventPage { events, total })
    }

    async fn count_by_kind(&self) -> Result<Vec<(EventKind, u64)>, IndexerError> {
        let mut counts = Vec::with_capacity(EventKind::ALL.len());
        for kind in EventKind::ALL {
            let row = sqlx::query(&format!("SELECT COUNT(*) AS total FROM {}", kind.table()))
                .fetch_one(&self.pool)
                .await?;
            counts.push((kind, row.try_get::<i64, _>("total")? as u64));
        }
        Ok(counts)
    }

    async fn ping(&self) -> Result<(), IndexerError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
