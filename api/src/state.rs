//! Shared application state.

use std::sync::Arc;

use entroscan_indexer::store::EventStore;

/// State shared across request handlers: a handle to the event store.
///
/// The API never writes; it is an independent consumer of the ledger the
/// indexer maintains, holding its own bounded connection pool.
#[derive(Clone)]
pub struct AppState {
    /// The event store handle.
    pub store: Arc<dyn EventStore>,
}

impl AppState {
    /// Creates state over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }
}
