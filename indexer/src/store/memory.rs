//! In-memory event store for tests and ephemeral runs.
//!
//! Implements the same contract as the Postgres store over a `HashMap`,
//! including checkpoint monotonicity and insert-or-ignore semantics, so
//! the scheduler and the read API can be exercised without a database.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::{EventFilter, EventPage, EventStore};
use crate::error::IndexerError;
use crate::events::types::{EventKind, EventRecord};

#[derive(Default)]
struct Inner {
    events: HashMap<String, EventRecord>,
    checkpoint: u64,
    initialized: bool,
}

/// In-memory event store.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().events.len()
    }

    /// Returns true if no records are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a snapshot of all stored records, unordered.
    #[must_use]
    pub fn records(&self) -> Vec<EventRecord> {
        self.lock().events.values().cloned().collect()
    }

    /// The state is a plain map plus a counter, valid after any partial
    /// mutation, so a poisoned lock is recovered rather than propagated.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn initialize(&self, start_block: u64) -> Result<(), IndexerError> {
        let mut inner = self.lock();
        if !inner.initialized {
            inner.checkpoint = start_block;
            inner.initialized = true;
        }
        Ok(())
    }

    async fn upsert_event(&self, record: &EventRecord) -> Result<(), IndexerError> {
        let mut inner = self.lock();
        inner
            .events
            .entry(record.id.clone())
            .or_insert_with(|| record.clone());
        Ok(())
    }

    async fn read_checkpoint(&self) -> Result<u64, IndexerError> {
        Ok(self.lock().checkpoint)
    }

    async fn advance_checkpoint(&self, new_value: u64) -> Result<(), IndexerError> {
        let mut inner = self.lock();
        if new_value > inner.checkpoint {
            inner.checkpoint = new_value;
        }
        Ok(())
    }

    async fn query_events(&self, filter: &EventFilter) -> Result<EventPage, IndexerError> {
        let inner = self.lock();
        let mut matching: Vec<EventRecord> = inner
            .events
            .values()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect();

        // Same total order as the SQL query: block descending, id as the
        // tiebreaker so pagination is stable.
        matching.sort_by(|a, b| {
            b.block_number
                .cmp(&a.block_number)
                .then_with(|| a.id.cmp(&b.id))
        });

        let total = matching.len() as u64;
        let events = matching
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .collect();

        Ok(EventPage { events, total })
    }

    async fn count_by_kind(&self) -> Result<Vec<(EventKind, u64)>, IndexerError> {
        let inner = self.lock();
        Ok(EventKind::ALL
            .into_iter()
            .map(|kind| {
                let count = inner.events.values().filter(|r| r.kind == kind).count() as u64;
                (kind, count)
            })
            .collect())
    }

    async fn ping(&self) -> Result<(), IndexerError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::types::EventPayload;
    use chrono::Utc;

    fn record(id: &str, block: u64) -> EventRecord {
        EventRecord {
            id: id.into(),
            kind: EventKind::EntropyRequested,
            block_number: block,
            transaction_hash: "0xabc".into(),
            created_at: Utc::now(),
            payload: EventPayload::EntropyRequested {
                request_id: "1".into(),
                hashed_consumer: "0x11".into(),
                hashed_tag: "0x22".into(),
                fee_paid: "0".into(),
            },
        }
    }

    #[tokio::test]
    async fn initialize_is_idempotent() {
        let store = MemoryStore::new();
        store.initialize(1_000).await.unwrap();
        store.advance_checkpoint(1_500).await.unwrap();
        // A second racing initialize must not reset progress.
        store.initialize(1_000).await.unwrap();
        assert_eq!(store.read_checkpoint().await.unwrap(), 1_500);
    }

    #[tokio::test]
    async fn upsert_ignores_duplicate_ids() {
        let store = MemoryStore::new();
        store.upsert_event(&record("a", 1)).await.unwrap();
        store.upsert_event(&record("a", 999)).await.unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.records()[0].block_number, 1);
    }

    #[tokio::test]
    async fn checkpoint_is_monotonic() {
        let store = MemoryStore::new();
        store.initialize(100).await.unwrap();
        store.advance_checkpoint(200).await.unwrap();
        store.advance_checkpoint(150).await.unwrap();
        assert_eq!(store.read_checkpoint().await.unwrap(), 200);
    }

    #[tokio::test]
    async fn query_orders_block_descending() {
        let store = MemoryStore::new();
        store.upsert_event(&record("a", 10)).await.unwrap();
        store.upsert_event(&record("b", 30)).await.unwrap();
        store.upsert_event(&record("c", 20)).await.unwrap();

        let page = store
            .query_events(&EventFilter::new(EventKind::EntropyRequested))
            .await
            .unwrap();
        let blocks: Vec<u64> = page.events.iter().map(|e| e.block_number).collect();
        assert_eq!(blocks, vec![30, 20, 10]);
        assert_eq!(page.total, 3);
    }

    #[tokio::test]
    async fn count_by_kind_covers_all_kinds() {
        let store = MemoryStore::new();
        store.upsert_event(&record("a", 1)).await.unwrap();

        let counts = store.count_by_kind().await.unwrap();
        assert_eq!(counts.len(), 4);
        assert_eq!(counts[0], (EventKind::EntropyRequested, 1));
        assert_eq!(counts[1], (EventKind::EntropyFulfilled, 0));
    }
}
