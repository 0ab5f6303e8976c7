//! Range fetcher for the four tracked event signatures.
//!
//! Issues one filtered log query per signature, concurrently, and joins
//! the results before anything is persisted. Any provider error fails the
//! whole range; partial results are never returned.

use std::sync::Arc;

use futures::future::try_join_all;

use super::types::EventKind;
use crate::error::IndexerError;
use crate::rpc::{ChainClient, RawLog};

/// A raw log tagged with the event kind whose filter matched it.
#[derive(Debug, Clone)]
pub struct TaggedLog {
    /// Which signature filter returned this log.
    pub kind: EventKind,
    /// The raw log as the provider sent it.
    pub log: RawLog,
}

/// Fetches logs for a bounded block range.
pub struct Fetcher<C> {
    client: Arc<C>,
    topics: [(EventKind, String); 4],
}

impl<C: ChainClient> Fetcher<C> {
    /// Creates a fetcher over the given chain client.
    #[must_use]
    pub fn new(client: Arc<C>) -> Self {
        let topics = EventKind::ALL.map(|kind| (kind, kind.topic0()));
        Self { client, topics }
    }

    /// Fetches all tracked logs in `[from, to]` (inclusive), tagged by kind.
    ///
    /// The caller bounds the range; this issues the four signature queries
    /// concurrently and flattens the results.
    ///
    /// # Errors
    ///
    /// Returns the first provider error; the whole range must then be
    /// treated as failed.
    pub async fn fetch_range(&self, from: u64, to: u64) -> Result<Vec<TaggedLog>, IndexerError> {
        let queries = self.topics.iter().map(|(kind, topic0)| {
            let client = Arc::clone(&self.client);
            async move {
                let logs = client.get_logs(from, to, topic0).await?;
                Ok::<_, IndexerError>((*kind, logs))
            }
        });

        let per_kind = try_join_all(queries).await?;

        let mut tagged = Vec::new();
        for (kind, logs) in per_kind {
            tagged.extend(logs.into_iter().map(|log| TaggedLog { kind, log }));
        }
        Ok(tagged)
    }
}
