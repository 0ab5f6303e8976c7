//! Event store.
//!
//! One append-only table per event type plus a singleton checkpoint row.
//! The [`EventStore`] trait is the seam between the scheduler, the read
//! API, and the actual database; [`PgStore`] is the production Postgres
//! implementation and [`MemoryStore`] an in-process fake for tests.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::error::IndexerError;
use crate::events::types::{EventKind, EventRecord};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Default page size for event queries.
pub const DEFAULT_LIMIT: u64 = 50;

/// Hard cap on the page size a caller may request.
pub const MAX_LIMIT: u64 = 500;

/// Filter for an event query. All set fields combine with AND semantics.
#[derive(Debug, Clone)]
pub struct EventFilter {
    /// Which event table to read.
    pub kind: EventKind,
    /// Exact request id match (entropy events only).
    pub request_id: Option<String>,
    /// Exact transaction hash match, case-insensitive.
    pub transaction_hash: Option<String>,
    /// Minimum block number, inclusive.
    pub from_block: Option<u64>,
    /// Maximum block number, inclusive.
    pub to_block: Option<u64>,
    /// Page size.
    pub limit: u64,
    /// Page offset.
    pub offset: u64,
}

impl EventFilter {
    /// Creates a filter for the given kind with default pagination.
    #[must_use]
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            request_id: None,
            transaction_hash: None,
            from_block: None,
            to_block: None,
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }

    /// Sets the request id filter.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Sets the transaction hash filter.
    #[must_use]
    pub fn with_transaction_hash(mut self, hash: impl Into<String>) -> Self {
        self.transaction_hash = Some(hash.into());
        self
    }

    /// Sets the inclusive block range filter.
    #[must_use]
    pub const fn with_block_range(mut self, from: Option<u64>, to: Option<u64>) -> Self {
        self.from_block = from;
        self.to_block = to;
        self
    }

    /// Sets the page size and offset. The size is capped at [`MAX_LIMIT`];
    /// the offset is clamped to the signed 64-bit range the SQL `OFFSET`
    /// clause accepts.
    #[must_use]
    pub fn with_page(mut self, limit: u64, offset: u64) -> Self {
        self.limit = limit.min(MAX_LIMIT);
        self.offset = offset.min(i64::MAX as u64);
        self
    }

    /// Returns true if a record matches every set filter field.
    ///
    /// This is the reference predicate; [`MemoryStore`] applies it
    /// directly, and the SQL built by [`PgStore`] must agree with it.
    #[must_use]
    pub fn matches(&self, record: &EventRecord) -> bool {
        if record.kind != self.kind {
            return false;
        }
        if let Some(want) = &self.request_id {
            if record.payload.request_id() != Some(want.as_str()) {
                return false;
            }
        }
        if let Some(want) = &self.transaction_hash {
            if !record.transaction_hash.eq_ignore_ascii_case(want) {
                return false;
            }
        }
        if let Some(from) = self.from_block {
            if record.block_number < from {
                return false;
            }
        }
        if let Some(to) = self.to_block {
            if record.block_number > to {
                return false;
            }
        }
        true
    }
}

/// One page of query results plus the unpaginated total.
#[derive(Debug, Clone)]
pub struct EventPage {
    /// Records in this page, block number descending.
    pub events: Vec<EventRecord>,
    /// Total matching records ignoring limit/offset.
    pub total: u64,
}

impl EventPage {
    /// Returns true if rows exist beyond `offset + limit`. The add
    /// saturates, so a caller-supplied offset near `u64::MAX` reads as
    /// "past the end" rather than overflowing.
    #[must_use]
    pub const fn has_more(&self, limit: u64, offset: u64) -> bool {
        offset.saturating_add(limit) < self.total
    }
}

/// Relational ledger for oracle events and the scan checkpoint.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Creates all tables and seeds the checkpoint row idempotently.
    ///
    /// Safe under concurrent or repeated invocation; the checkpoint is
    /// seeded with `start_block` only if no row exists yet.
    async fn initialize(&self, start_block: u64) -> Result<(), IndexerError>;

    /// Inserts a record, ignoring it if the id already exists.
    async fn upsert_event(&self, record: &EventRecord) -> Result<(), IndexerError>;

    /// Reads the last fully processed block.
    async fn read_checkpoint(&self) -> Result<u64, IndexerError>;

    /// Advances the checkpoint. A value at or below the current one is a
    /// no-op; monotonicity is enforced here, not assumed by callers.
    async fn advance_checkpoint(&self, new_value: u64) -> Result<(), IndexerError>;

    /// Runs a filtered, paginated query plus the matching total count.
    async fn query_events(&self, filter: &EventFilter) -> Result<EventPage, IndexerError>;

    /// Returns the row count per event type.
    async fn count_by_kind(&self) -> Result<Vec<(EventKind, u64)>, IndexerError>;

    /// Trivial round-trip used by the health endpoint.
    async fn ping(&self) -> Result<(), IndexerError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::types::EventPayload;
    use chrono::Utc;

    fn record(block: u64, request_id: &str, tx: &str) -> EventRecord {
        EventRecord {
            id: format!("{tx}-{block}"),
            kind: EventKind::EntropyRequested,
            block_number: block,
            transaction_hash: tx.into(),
            created_at: Utc::now(),
            payload: EventPayload::EntropyRequested {
                request_id: request_id.into(),
                hashed_consumer: "0x11".into(),
                hashed_tag: "0x22".into(),
                fee_paid: "0".into(),
            },
        }
    }

    #[test]
    fn filter_matches_and_semantics() {
        let filter = EventFilter::new(EventKind::EntropyRequested)
            .with_request_id("42")
            .with_block_range(Some(100), Some(200));

        assert!(filter.matches(&record(150, "42", "0xabc")));
        assert!(!filter.matches(&record(150, "43", "0xabc")));
        assert!(!filter.matches(&record(99, "42", "0xabc")));
        assert!(!filter.matches(&record(201, "42", "0xabc")));
    }

    #[test]
    fn filter_tx_hash_is_case_insensitive() {
        let filter =
            EventFilter::new(EventKind::EntropyRequested).with_transaction_hash("0xABC");
        assert!(filter.matches(&record(1, "1", "0xabc")));
    }

    #[test]
    fn filter_limit_is_capped() {
        let filter = EventFilter::new(EventKind::EntropyRequested).with_page(10_000, 0);
        assert_eq!(filter.limit, MAX_LIMIT);
    }

    #[test]
    fn filter_offset_is_clamped_to_signed_range() {
        let filter = EventFilter::new(EventKind::EntropyRequested).with_page(50, u64::MAX);
        assert_eq!(filter.offset, i64::MAX as u64);
    }

    #[test]
    fn page_has_more() {
        let page = EventPage {
            events: vec![],
            total: 100,
        };
        assert!(page.has_more(50, 0));
        assert!(page.has_more(50, 49));
        assert!(!page.has_more(50, 50));
        assert!(!page.has_more(100, 0));
    }

    #[test]
    fn page_has_more_saturates_on_extreme_offset() {
        let page = EventPage {
            events: vec![],
            total: 100,
        };
        assert!(!page.has_more(50, u64::MAX));
        assert!(!page.has_more(u64::MAX, u64::MAX));
    }
}
