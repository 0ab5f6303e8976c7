//! Event scanning pipeline for the entropy oracle.
//!
//! This module provides the components that turn raw chain logs into
//! persisted event records.
//!
//! # Components
//!
//! - [`types`]: `EventKind`, `EventRecord`, `EventPayload`
//! - [`decode`]: the log normalizer (structured + fallback paths)
//! - [`fetcher`]: per-signature concurrent log fetching
//! - [`cursor`]: pure batch-range arithmetic
//! - [`scheduler`]: the fetch → persist → advance-checkpoint loop
//! - [`metrics`]: scan loop metrics

pub mod cursor;
pub mod decode;
pub mod fetcher;
pub mod metrics;
pub mod scheduler;
pub mod types;

pub use cursor::{plan_tick, Plan, ScanCursor};
pub use decode::{decode_log, event_id, DecodeOutcome};
pub use fetcher::{Fetcher, TaggedLog};
pub use metrics::IndexerMetrics;
pub use scheduler::{Scheduler, SchedulerState, TickOutcome};
pub use types::{EventKind, EventPayload, EventRecord};
