//! Entroscan read API.
//!
//! A stateless HTTP query layer over the event ledger the indexer
//! maintains. It never writes: beyond store-level atomicity of
//! individual upserts, no coordination with the indexer is needed.
//!
//! # Endpoints
//!
//! - `GET /health`: liveness via a trivial store round-trip
//! - `GET /api/events`: filtered, paginated read of one event table
//! - `GET /api/events/summary`: row count per event type

pub mod error;
pub mod routes;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use routes::{router, EventsQuery, EventsResponse, Pagination, SummaryResponse};
pub use server::{Server, ServerConfig};
pub use state::AppState;
