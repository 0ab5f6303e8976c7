//! Entroscan indexer.
//!
//! Incrementally scans a chain for the entropy oracle's four event types
//! and persists them into a queryable Postgres ledger. Progress is
//! tracked by a single monotonic checkpoint that only advances after a
//! batch is durably persisted, so the scan survives restarts and
//! duplicate delivery without losing or double-counting events.
//!
//! # Modules
//!
//! - [`config`]: environment-driven process configuration
//! - [`error`]: the indexer error taxonomy
//! - [`rpc`]: the JSON-RPC chain client and its trait seam
//! - [`events`]: kinds, records, decoding, fetching, and the scheduler
//! - [`store`]: the Postgres ledger and its in-memory fake

pub mod config;
pub mod error;
pub mod events;
pub mod rpc;
pub mod store;

pub use config::{ConfigError, IndexerConfig};
pub use error::{DecodeError, IndexerError};
pub use events::{EventKind, EventPayload, EventRecord, Scheduler};
pub use rpc::{ChainClient, RawLog, RpcClient};
pub use store::{EventFilter, EventPage, EventStore, MemoryStore, PgStore};
