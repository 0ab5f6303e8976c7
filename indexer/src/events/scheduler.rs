//! The scan scheduler.
//!
//! Drives fetch → normalize → persist → advance-checkpoint cycles as a
//! single sequential loop. A tick reads the chain head and the persisted
//! checkpoint; if the head is ahead, the gap is processed as bounded
//! batches, each committed atomically before the checkpoint moves. Any
//! fetch or store error aborts the current batch with the checkpoint
//! untouched, so the same range is retried on the next tick. Undecodable
//! logs are skipped, never batch-fatal.
//!
//! There is no cancel signal: all progress lives in the store, so killing
//! the process and restarting resumes from the last advanced checkpoint.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use super::cursor::{Plan, ScanCursor};
use super::decode::{decode_log, DecodeOutcome};
use super::fetcher::Fetcher;
use super::metrics::IndexerMetrics;
use crate::config::IndexerConfig;
use crate::error::IndexerError;
use crate::rpc::ChainClient;
use crate::store::EventStore;

/// Observable state of the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// No new blocks to process.
    Idle,
    /// Processing one or more bounded batches.
    CatchingUp,
}

/// Summary of one tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickOutcome {
    /// Batches committed this tick.
    pub batches: u64,
    /// Event records persisted this tick.
    pub events: u64,
    /// Undecodable logs skipped this tick.
    pub skipped: u64,
    /// Checkpoint value after the tick.
    pub checkpoint: u64,
}

/// Summary of one committed batch.
#[derive(Debug, Clone, Copy, Default)]
struct BatchOutcome {
    events: u64,
    skipped: u64,
}

/// The scan scheduler.
///
/// Generic over the chain client and the store so it can be driven with
/// fakes in tests.
pub struct Scheduler<C, S> {
    client: Arc<C>,
    store: Arc<S>,
    fetcher: Fetcher<C>,
    batch_size: u64,
    poll_interval: std::time::Duration,
    metrics: Arc<IndexerMetrics>,
    state: SchedulerState,
}

impl<C: ChainClient, S: EventStore> Scheduler<C, S> {
    /// Creates a scheduler over the given client and store.
    #[must_use]
    pub fn new(client: Arc<C>, store: Arc<S>, config: &IndexerConfig) -> Self {
        Self {
            fetcher: Fetcher::new(Arc::clone(&client)),
            client,
            store,
            batch_size: config.batch_size,
            poll_interval: config.poll_interval(),
            metrics: Arc::new(IndexerMetrics::new()),
            state: SchedulerState::Idle,
        }
    }

    /// Returns a handle to the metrics.
    #[must_use]
    pub fn metrics(&self) -> Arc<IndexerMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> SchedulerState {
        self.state
    }

    /// Runs one tick: poll the head and catch up to it.
    ///
    /// Strictly sequential: each batch is fully persisted and its
    /// checkpoint advance durable before the next batch starts.
    ///
    /// # Errors
    ///
    /// Returns the first fetch or store error. The checkpoint reflects
    /// only fully persisted batches; the failed range is retried on the
    /// next tick.
    pub async fn tick(&mut self) -> Result<TickOutcome, IndexerError> {
        let head = self.client.block_number().await?;
        let checkpoint = self.store.read_checkpoint().await?;

        let mut cursor = ScanCursor::new(head, checkpoint, self.batch_size);
        let mut outcome = TickOutcome {
            checkpoint,
            ..TickOutcome::default()
        };

        if !cursor.has_pending() {
            self.state = SchedulerState::Idle;
            return Ok(outcome);
        }

        self.state = SchedulerState::CatchingUp;
        info!(
            head,
            checkpoint,
            batches = cursor.batches_remaining(),
            "catching up"
        );

        while let Plan::Fetch { from, to } = cursor.next_batch() {
            let batch = self.run_batch(from, to).await?;
            cursor.mark_committed(to);
            outcome.batches += 1;
            outcome.events += batch.events;
            outcome.skipped += batch.skipped;
            outcome.checkpoint = to;
        }

        self.state = SchedulerState::Idle;
        Ok(outcome)
    }

    /// Fetches, normalizes, and persists one bounded batch, then advances
    /// the checkpoint. The advance happens only after every upsert in the
    /// batch has succeeded.
    async fn run_batch(&self, from: u64, to: u64) -> Result<BatchOutcome, IndexerError> {
        let started = Instant::now();
        let logs = self.fetcher.fetch_range(from, to).await?;

        let mut batch = BatchOutcome::default();
        for tagged in &logs {
            match decode_log(tagged.kind, &tagged.log) {
                DecodeOutcome::Decoded(record) => {
                    self.store.upsert_event(&record).await?;
                    batch.events += 1;
                }
                DecodeOutcome::Fallback(record) => {
                    warn!(
                        id = %record.id,
                        kind = %record.kind,
                        "structured decode failed; stored fields recovered from topics"
                    );
                    self.store.upsert_event(&record).await?;
                    batch.events += 1;
                }
                DecodeOutcome::Failed(err) => {
                    warn!(
                        kind = %tagged.kind,
                        tx = %tagged.log.transaction_hash,
                        error = %err,
                        "skipping undecodable log"
                    );
                    batch.skipped += 1;
                }
            }
        }

        self.store.advance_checkpoint(to).await?;
        self.metrics
            .record_batch(batch.events, batch.skipped, started.elapsed());
        debug!(
            from,
            to,
            events = batch.events,
            skipped = batch.skipped,
            "batch committed"
        );
        Ok(batch)
    }

    /// Runs the scheduler loop forever.
    ///
    /// Errors are logged and the loop keeps going; the failed range is
    /// retried on the next tick because the checkpoint never advanced.
    pub async fn run(&mut self) {
        info!(
            batch_size = self.batch_size,
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "scheduler started"
        );

        loop {
            match self.tick().await {
                Ok(outcome) if outcome.batches > 0 => {
                    info!(
                        batches = outcome.batches,
                        events = outcome.events,
                        skipped = outcome.skipped,
                        checkpoint = outcome.checkpoint,
                        "caught up"
                    );
                }
                Ok(_) => debug!("idle; no new blocks"),
                Err(err) => {
                    self.metrics.record_error();
                    warn!(error = %err, "tick failed; retrying next tick");
                }
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
